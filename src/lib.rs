//! Motion dataset table extraction from recorded machine logs.
//!
//! This crate provides tools for:
//! - Parsing graph descriptors (`dataset?key=value&...`)
//! - Replaying indexed status logs at a fixed segment time
//! - Computing raw and derived datasets over an analysis window
//! - Writing the aligned table to CSV or rendering it for the console
//!
//! # Example
//!
//! ```no_run
//! use motan_log::{core::window::AnalysisWindow, processors::extract_motion_table};
//! use std::path::Path;
//!
//! let window = AnalysisWindow::new(0.0, 5.0, 0.0001).unwrap();
//! let graph = vec![vec!["status(hall_filament_width_sensor.Diameter)"]];
//! let table = extract_motion_table(Path::new("mylog"), &window, &graph).unwrap();
//! println!("{} rows", table.num_rows());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{GraphSpec, MotionConfig, OutputConfig, WindowConfig};
pub use core::table::ResultTable;
pub use core::window::AnalysisWindow;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
