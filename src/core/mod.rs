//! Core data types and I/O operations.

pub mod descriptor;
pub mod loaders;
pub mod table;
pub mod window;
pub mod writers;

pub use descriptor::{parse_graph_description, DescriptorError, GraphDescriptor, ParamValue, Params};
pub use loaders::{LogError, LogManager, LogSource};
pub use table::{ResultTable, TableError};
pub use window::{AnalysisWindow, WindowError};
pub use writers::{render_table, write_table_csv, WriteError};
