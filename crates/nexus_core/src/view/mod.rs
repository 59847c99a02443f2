pub mod fetch;
pub mod lightbox;
pub mod org_tree;
