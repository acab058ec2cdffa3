pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, CrawlConfig};
pub use error::{PagewatchError, Result};
pub use types::*;
