//! Data processing modules.

pub mod handlers;
pub mod manager;
pub mod motion;

// Re-export key types for convenience
pub use handlers::{DerivedDataset, DerivedKind};
pub use manager::{list_available_datasets, AnalysisError, AnalyzerManager, DatasetAnalyzer};
pub use motion::{extract_motion_table, generate_motion_table, MotionError};
