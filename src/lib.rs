pub mod analysis;
pub mod config;
pub mod date_code;
pub mod error;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod types;
pub mod visualize;

pub use config::{PipelineConfig, RegionSource};
pub use error::PipelineError;
