pub mod aggregate;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod query;
pub mod types;
pub mod version;
pub mod window;

pub use aggregate::{AggregationResult, Mode};
pub use config::Config;
pub use error::{ConfigError, ParseFailure, QueryError};
pub use parser::ArtifactParser;
pub use pipeline::{CensusPipeline, Inventory, PipelineOptions};
pub use types::*;
