pub mod config;
pub mod error;
pub mod types;

pub use config::{BatchOptions, CacheOptions, ConfigError, NounbaseConfig};
pub use error::ServiceError;
pub use types::{ListOptions, new_id, now_rfc3339, parse_instant};
