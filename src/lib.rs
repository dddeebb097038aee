pub mod api;
pub mod capabilities;
pub mod config;
pub mod providers;
pub mod router;
pub mod types;

pub use config::Config;
pub use types::*;
