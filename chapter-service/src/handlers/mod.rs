pub mod chapter;
pub mod health;

pub use chapter::get_chapter;
pub use health::{health_check, metrics_endpoint, root};
