//! Catalog logic shared by the category, product and review handlers.

pub mod rating;
pub mod slug;
pub mod tree;

pub use rating::{mean_rating, recompute_rating};
pub use slug::slugify;
pub use tree::{resolve_descendant_ids, CategoryForest};
