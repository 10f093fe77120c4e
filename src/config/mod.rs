//! Configuration types for motion table extraction.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::core::window::{AnalysisWindow, WindowError};

/// Descriptor graphed when none is requested.
pub const DEFAULT_GRAPH_DESCRIPTOR: &str = "status(hall_filament_width_sensor.Diameter)?color=green";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid graph (expected a JSON array of rows of descriptor strings): {0}")]
    InvalidGraph(String),
}

/// Analysis window defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Seconds to skip from the start of the log
    #[serde(default)]
    pub skip: f64,

    /// Seconds of log to analyze
    #[serde(default = "default_duration")]
    pub duration: f64,

    /// Analysis segment time in seconds
    #[serde(default = "default_segment_time")]
    pub segment_time: f64,
}

fn default_duration() -> f64 {
    5.0
}

fn default_segment_time() -> f64 {
    0.0001
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            skip: 0.0,
            duration: default_duration(),
            segment_time: default_segment_time(),
        }
    }
}

impl WindowConfig {
    /// Validate into an [`AnalysisWindow`].
    pub fn to_window(&self) -> Result<AnalysisWindow, WindowError> {
        AnalysisWindow::new(self.skip, self.duration, self.segment_time)
    }
}

/// Console output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Tables longer than this are elided when printed
    #[serde(default = "default_print_max_rows")]
    pub print_max_rows: usize,
}

fn default_print_max_rows() -> usize {
    60
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            print_max_rows: default_print_max_rows(),
        }
    }
}

/// Rows of graph descriptors.
///
/// Rows only matter for plot layout; table generation flattens them. A flat
/// list of descriptors is read as a single row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GraphSpec {
    rows: Vec<Vec<String>>,
}

impl<'de> Deserialize<'de> for GraphSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum GraphLiteral {
            Rows(Vec<Vec<String>>),
            Flat(Vec<String>),
        }

        Ok(match GraphLiteral::deserialize(deserializer)? {
            GraphLiteral::Rows(rows) => Self { rows },
            GraphLiteral::Flat(descs) => Self { rows: vec![descs] },
        })
    }
}

impl Default for GraphSpec {
    fn default() -> Self {
        Self {
            rows: vec![vec![DEFAULT_GRAPH_DESCRIPTOR.to_string()]],
        }
    }
}

impl GraphSpec {
    /// Build a graph from explicit rows.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Parse a JSON graph literal such as `[["status(a.b)", "status(c.d)?color=red"]]`.
    ///
    /// Only arrays of strings, or arrays of arrays of strings, are accepted.
    pub fn parse(literal: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(literal).map_err(|e| ConfigError::InvalidGraph(e.to_string()))
    }

    #[inline]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Total number of descriptors across all rows.
    pub fn num_descriptors(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// Main configuration combining all sub-configs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub graph: GraphSpec,

    #[serde(default)]
    pub output: OutputConfig,
}

impl MotionConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: MotionConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MotionConfig::default();
        assert_eq!(config.window.skip, 0.0);
        assert_eq!(config.window.duration, 5.0);
        assert_eq!(config.window.segment_time, 0.0001);
        assert_eq!(config.output.print_max_rows, 60);
        assert_eq!(
            config.graph.rows(),
            &[vec![DEFAULT_GRAPH_DESCRIPTOR.to_string()]]
        );
    }

    #[test]
    fn test_graph_rows() {
        let spec = GraphSpec::parse(r#"[["a(x)", "b(y)?color=red"], ["c(z)"]]"#).unwrap();
        assert_eq!(spec.rows().len(), 2);
        assert_eq!(spec.rows()[0][1], "b(y)?color=red");
        assert_eq!(spec.num_descriptors(), 3);
    }

    #[test]
    fn test_graph_flat_list_is_one_row() {
        let spec = GraphSpec::parse(r#"["a(x)", "b(y)"]"#).unwrap();
        assert_eq!(spec.rows(), &[vec!["a(x)".to_string(), "b(y)".to_string()]]);
    }

    #[test]
    fn test_graph_rejects_other_shapes() {
        assert!(matches!(GraphSpec::parse("[1, 2]"), Err(ConfigError::InvalidGraph(_))));
        assert!(matches!(GraphSpec::parse(r#"{"a": "b"}"#), Err(ConfigError::InvalidGraph(_))));
        assert!(matches!(GraphSpec::parse("__import__('os')"), Err(ConfigError::InvalidGraph(_))));
        assert!(matches!(GraphSpec::parse(r#"[["a", 3]]"#), Err(ConfigError::InvalidGraph(_))));
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("motan.yaml");
        let config = MotionConfig {
            window: WindowConfig {
                skip: 1.5,
                duration: 2.0,
                segment_time: 0.001,
            },
            graph: GraphSpec::from_rows(vec![vec!["status(a.b)".to_string()]]),
            output: OutputConfig { print_max_rows: 20 },
        };

        config.to_yaml(&path).unwrap();
        let loaded = MotionConfig::from_yaml(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("motan.yaml");
        std::fs::write(&path, "window:\n  duration: 1.0\ngraph:\n  - status(a.b)\n").unwrap();

        let config = MotionConfig::from_yaml(&path).unwrap();

        assert_eq!(config.window.duration, 1.0);
        assert_eq!(config.window.segment_time, 0.0001);
        assert_eq!(config.graph.rows(), &[vec!["status(a.b)".to_string()]]);
        assert_eq!(config.output.print_max_rows, 60);
    }

    #[test]
    fn test_window_validation() {
        let config = WindowConfig {
            segment_time: 0.0,
            ..WindowConfig::default()
        };
        assert!(config.to_window().is_err());
        assert_eq!(WindowConfig::default().to_window().unwrap().num_segments(), 50_000);
    }
}
