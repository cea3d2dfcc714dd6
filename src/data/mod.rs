//! Dataset references and the analysis collaborator.

pub mod csv_analyzer;
pub mod summary;

pub use csv_analyzer::{describe, CsvAnalyzer};
pub use summary::{DataSummary, DatasetAnalyzer, DatasetReference, NumericStats, Shape};
