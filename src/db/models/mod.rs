//! Database models split into domain-specific modules.

pub mod category;
pub mod error_log;
pub mod product;
pub mod review;
pub mod user;

pub use category::*;
pub use error_log::*;
pub use product::*;
pub use review::*;
pub use user::*;
