//! External service clients

mod analyzer_client;

pub use analyzer_client::{
    AnalyzerApi, AnalyzerConfig, AnalyzerError, AnalyzerOutput, AnalyzerProgress,
    HttpAnalyzerClient, ProgressSink,
};
