pub mod clock;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod dates;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod jobs;
pub mod logging;
pub mod observability;
pub mod scheduler;
pub mod store;
pub mod types;

pub use dataset::{merge, Dataset, MergeStats};
pub use error::{Result, ScraperError};
