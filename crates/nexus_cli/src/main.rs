//! `nexus` admin and preview CLI.
//!
//! # Responsibility
//! - Load `nexus.toml`, start logging, open the site database.
//! - Expose catalog, team, countdown and inbox operations as subcommands.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use nexus_core::db::Connection;
use nexus_core::{
    import_seed, init_from_config, open_db, CatalogStore, Clock, ContentCategory, ContentDraft,
    CountdownEvent, CountdownScheduler, FeedbackFilter, FeedbackService, FeedbackStatus, ListQuery,
    OrgRow, OrgTreeView, SeedBundle, SiteConfig, SortOrder, SqliteContentRepository,
    SqliteFeedbackRepository, SqliteTeamRepository, SystemClock, TeamService, TickGranularity,
};
use std::path::PathBuf;
use std::thread;

#[derive(Parser)]
#[command(name = "nexus")]
#[command(version)]
#[command(about = "Manage and preview Nexus club site content", long_about = None)]
struct Cli {
    /// Path to the site config file
    #[arg(short, long, global = true, default_value = "nexus.toml")]
    config: PathBuf,
    /// Evaluate against this instant (RFC 3339) instead of the wall clock
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSON seed bundle
    Seed { file: PathBuf },
    /// List content items
    #[clap(visible_alias = "ls")]
    List {
        #[arg(short = 'k', long, value_enum)]
        category: Option<CategoryArg>,
        /// Sort by date instead of insertion order
        #[arg(long)]
        chronological: bool,
    },
    /// Show one content item
    Show { id: String },
    /// Create a content item
    Add {
        #[arg(long)]
        title: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// HH:MM, HH:MM:SS or hh:mm AM
        #[arg(long, default_value = "")]
        time: String,
        #[arg(short = 'k', long, value_enum)]
        category: CategoryArg,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        registration_link: String,
        /// Promote the new item to the hero section
        #[arg(long)]
        pin: bool,
    },
    /// Delete a content item
    #[clap(visible_alias = "rm")]
    Delete { id: String },
    /// Pin an item to the hero section
    Pin { id: String },
    /// Clear the hero pin
    Unpin,
    /// Run a live countdown for an upcoming item
    Countdown {
        /// Item id; defaults to the pinned item, then the soonest upcoming one
        id: Option<String>,
        /// Print the current breakdown and exit
        #[arg(long)]
        once: bool,
        #[arg(long, value_enum)]
        granularity: Option<GranularityArg>,
    },
    /// Print the org tree
    Tree {
        /// Extra node ids to expand
        #[arg(short, long)]
        expand: Vec<String>,
        /// Member id to show in the detail panel
        #[arg(short, long)]
        select: Option<String>,
    },
    /// List roster members
    Members {
        /// Roster season such as 2024-25
        #[arg(short, long)]
        year: Option<String>,
    },
    /// Contact form inbox
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },
}

#[derive(Subcommand)]
enum FeedbackCommands {
    List {
        #[arg(long)]
        unread: bool,
        #[arg(long)]
        join: bool,
    },
    Submit {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        join: bool,
    },
    Read { id: String },
    Delete { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Upcoming,
    Past,
    Magazine,
    Gallery,
}

impl From<CategoryArg> for ContentCategory {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Upcoming => Self::Upcoming,
            CategoryArg::Past => Self::Past,
            CategoryArg::Magazine => Self::Magazine,
            CategoryArg::Gallery => Self::Gallery,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GranularityArg {
    Second,
    Minute,
}

impl From<GranularityArg> for TickGranularity {
    fn from(value: GranularityArg) -> Self {
        match value {
            GranularityArg::Second => Self::Second,
            GranularityArg::Minute => Self::Minute,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = SiteConfig::load(&cli.config)?;
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    config.resolve_relative_paths(&cwd);
    init_from_config(&config.logging).context("failed to start logging")?;

    let conn = open_db(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let now = cli.now.unwrap_or_else(|| SystemClock.now());
    info!("event=cli_command module=cli status=start now={now}");

    match cli.command {
        Commands::Seed { file } => {
            let bundle = SeedBundle::load(&file)?;
            let report = import_seed(&conn, bundle, now)?;
            println!(
                "imported {} items, {} members, {} org nodes, {} feedback ({} reclassified)",
                report.content_items,
                report.members,
                report.org_nodes,
                report.feedback,
                report.reclassified
            );
        }
        Commands::List {
            category,
            chronological,
        } => {
            let store = CatalogStore::load(SqliteContentRepository::new(&conn), now)?;
            let query = ListQuery {
                category: category.map(Into::into),
                window: None,
                order: if chronological {
                    SortOrder::Chronological
                } else {
                    SortOrder::Insertion
                },
            };
            for item in store.list(&query) {
                println!(
                    "{}{:<38} {:<9} {} {}",
                    if item.is_pinned { "*" } else { " " },
                    item.id,
                    item.category.as_str(),
                    item.primary_timestamp().format("%Y-%m-%d %H:%M"),
                    item.title
                );
            }
        }
        Commands::Show { id } => {
            let store = CatalogStore::load(SqliteContentRepository::new(&conn), now)?;
            let item = store.get(&id)?;
            println!("{} [{}]{}", item.title, item.category, pin_marker(item.is_pinned));
            println!("when: {}", item.primary_timestamp().format("%Y-%m-%d %H:%M UTC"));
            for (label, value) in [
                ("summary", &item.summary),
                ("description", &item.description),
                ("register", &item.registration_link),
                ("issue", &item.issue_label),
                ("download", &item.download_link),
                ("related", &item.related_item_id),
            ] {
                if let Some(value) = value {
                    println!("{label}: {value}");
                }
            }
            for (index, media) in item.media.iter().enumerate() {
                println!("media[{index}]: {}", media.url);
            }
        }
        Commands::Add {
            title,
            date,
            time,
            category,
            description,
            registration_link,
            pin,
        } => {
            let mut store = CatalogStore::load(SqliteContentRepository::new(&conn), now)?;
            let draft = ContentDraft {
                title,
                date,
                time,
                category: ContentCategory::from(category).as_str().to_string(),
                description,
                registration_link,
                pin,
                ..ContentDraft::default()
            };
            let id = store.admin().create(draft, now)?;
            println!("{id}");
        }
        Commands::Delete { id } => {
            let mut store = CatalogStore::load(SqliteContentRepository::new(&conn), now)?;
            store.admin().delete(&id)?;
        }
        Commands::Pin { id } => {
            let mut store = CatalogStore::load(SqliteContentRepository::new(&conn), now)?;
            store.admin().set_pinned(&id)?;
        }
        Commands::Unpin => {
            let mut store = CatalogStore::load(SqliteContentRepository::new(&conn), now)?;
            match store.admin().clear_pinned()? {
                Some(id) => println!("unpinned {id}"),
                None => println!("nothing was pinned"),
            }
        }
        Commands::Countdown {
            id,
            once,
            granularity,
        } => {
            let granularity = granularity
                .map(TickGranularity::from)
                .unwrap_or(config.countdown.granularity);
            run_countdown(&conn, id, once, granularity, cli.now)?;
        }
        Commands::Tree { expand, select } => {
            let team = TeamService::new(SqliteTeamRepository::new(&conn));
            let expanded = config.team.default_expanded.iter().cloned().chain(expand);
            let mut view = OrgTreeView::new(team.org_tree()?, expanded);
            if let Some(member_id) = select {
                view.select(&member_id)?;
            }
            print_tree(&view);
        }
        Commands::Members { year } => {
            let team = TeamService::new(SqliteTeamRepository::new(&conn));
            let year = year.or(config.team.default_year);
            for member in team.roster(year.as_deref())? {
                println!(
                    "{:<24} {:<24} {}",
                    member.name,
                    member.position,
                    member.roster_year.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Feedback { command } => {
            run_feedback(FeedbackService::new(SqliteFeedbackRepository::new(&conn)), command, now)?
        }
    }
    Ok(())
}

fn run_countdown(
    conn: &Connection,
    id: Option<String>,
    once: bool,
    granularity: TickGranularity,
    fixed_now: Option<DateTime<Utc>>,
) -> Result<()> {
    let clock = SystemClock;
    let now = fixed_now.unwrap_or_else(|| clock.now());
    let mut store = CatalogStore::load(SqliteContentRepository::new(conn), now)?;

    let item = match id {
        Some(id) => store.get(&id)?.clone(),
        None => match store
            .pinned()
            .filter(|item| item.category == ContentCategory::Upcoming)
            .or_else(|| {
                store
                    .list(&ListQuery::for_display(ContentCategory::Upcoming))
                    .into_iter()
                    .next()
            }) {
            Some(item) => item.clone(),
            None => bail!("no upcoming item to count down to"),
        },
    };

    let scheduler = CountdownScheduler::new();
    let Some(handle) = scheduler.watch_item(&item, granularity, now) else {
        bail!("`{}` is not upcoming ({})", item.id, item.category);
    };
    println!("{} starts {}", item.title, item.primary_timestamp());

    let mut tick_at = now;
    loop {
        for notice in scheduler.tick(tick_at) {
            match notice.event {
                CountdownEvent::Tick(breakdown) => println!("{breakdown}"),
                CountdownEvent::Completed => {
                    let moved = store.reclassify(tick_at);
                    println!("started; moved {} item(s) to past", moved.len());
                }
            }
        }
        if once || !handle.is_active() {
            break;
        }
        thread::sleep(granularity.interval().to_std()?);
        tick_at = match fixed_now {
            Some(_) => tick_at + granularity.interval(),
            None => clock.now(),
        };
    }
    Ok(())
}

fn run_feedback(
    service: FeedbackService<SqliteFeedbackRepository<'_>>,
    command: FeedbackCommands,
    now: DateTime<Utc>,
) -> Result<()> {
    match command {
        FeedbackCommands::List { unread, join } => {
            let filter = FeedbackFilter {
                status: unread.then_some(FeedbackStatus::New),
                join_interest_only: join,
            };
            for feedback in service.inbox(&filter)? {
                println!(
                    "{} {} {}{} {}",
                    feedback.id,
                    feedback.submitted_at.format("%Y-%m-%d %H:%M"),
                    feedback.status.as_str(),
                    if feedback.is_join_interest { " join" } else { "" },
                    feedback.subject
                );
            }
            println!("{} unread", service.unread_count()?);
        }
        FeedbackCommands::Submit {
            subject,
            message,
            join,
        } => println!("{}", service.submit(&subject, &message, join, now)?),
        FeedbackCommands::Read { id } => service.mark_read(&id)?,
        FeedbackCommands::Delete { id } => service.delete(&id)?,
    }
    Ok(())
}

fn print_tree(view: &OrgTreeView) {
    for row in view.visible_rows() {
        let indent = "  ".repeat(row.depth());
        match row {
            OrgRow::Node { node, expanded, .. } => {
                println!("{indent}{} {}", if expanded { "v" } else { ">" }, node.name())
            }
            OrgRow::Lead { member, .. } => {
                println!("{indent}* {} ({})", member.name, member.position)
            }
            OrgRow::Member { member, .. } => {
                println!("{indent}- {} ({})", member.name, member.position)
            }
        }
    }
    if let Some(member) = view.selected() {
        println!();
        println!("{} - {}", member.name, member.position);
        for value in [&member.bio, &member.email, &member.linkedin, &member.github]
            .into_iter()
            .flatten()
        {
            println!("  {value}");
        }
    }
}

fn pin_marker(pinned: bool) -> &'static str {
    if pinned {
        " (pinned)"
    } else {
        ""
    }
}
