pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod reader;
pub mod session;
pub mod standardize;
pub mod table;

pub use config::{PartnerConfig, PartnerConfigs, PhonePolicy};
pub use error::{PipelineError, Result};
pub use pipeline::{run, PipelineSettings, RunSummary};
pub use table::{Frame, Tabular};
