//! Motion data table generation.
//!
//! Drives a [`DatasetAnalyzer`] from graph descriptors and assembles the
//! computed series into a single time-aligned [`ResultTable`].

use std::collections::HashSet;
use std::path::Path;

use log::info;
use thiserror::Error;

use super::manager::{AnalysisError, AnalyzerManager, DatasetAnalyzer};
use crate::core::descriptor::{DescriptorError, GraphDescriptor};
use crate::core::loaders::{LogError, LogManager, LogSource};
use crate::core::table::{ResultTable, TableError};
use crate::core::window::AnalysisWindow;

/// Errors that abort table generation.
#[derive(Error, Debug)]
pub enum MotionError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Log(#[from] LogError),
}

/// Result type for table generation.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Register every descriptor, compute the datasets and build the table.
///
/// Rows only group descriptors for plotting and are flattened here. All
/// descriptors are parsed before anything is registered, so a malformed
/// parameter aborts without touching the analyzer. Each distinct dataset
/// name is registered once, with the params of its first occurrence, and
/// becomes one column in registration order, followed by `Time`.
pub fn generate_motion_table<A, S>(amanager: &mut A, graph_descs: &[Vec<S>]) -> Result<ResultTable>
where
    A: DatasetAnalyzer + ?Sized,
    S: AsRef<str>,
{
    let descriptors = graph_descs
        .iter()
        .flatten()
        .map(|desc| GraphDescriptor::parse(desc.as_ref()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    for desc in &descriptors {
        if seen.insert(desc.dataset.trim()) {
            amanager.register_dataset(&desc.dataset, &desc.params)?;
        }
    }
    amanager.run()?;

    let series: Vec<(String, Vec<f64>)> = amanager
        .datasets()
        .into_iter()
        .map(|name| {
            let values = amanager.series(name).map(<[f64]>::to_vec).unwrap_or_default();
            (name.to_string(), values)
        })
        .collect();

    let table = ResultTable::new(series, amanager.time_axis().to_vec())?;
    Ok(table)
}

/// Open the log at `log_prefix` and generate the table for `window`.
pub fn extract_motion_table<S: AsRef<str>>(
    log_prefix: &Path,
    window: &AnalysisWindow,
    graph_descs: &[Vec<S>],
) -> Result<ResultTable> {
    let mut lmanager = LogManager::open(log_prefix)?;
    lmanager.build_index()?;
    lmanager.seek(window.skip())?;

    let mut amanager = AnalyzerManager::for_window(lmanager, window)?;
    let table = generate_motion_table(&mut amanager, graph_descs)?;

    info!(
        "Generated {} rows x {} columns",
        table.num_rows(),
        table.num_columns()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::Params;
    use crate::core::writers::write_table_csv;
    use crate::processors::manager;
    use std::collections::HashMap;
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Analyzer returning canned series for a fixed catalog.
    struct CannedAnalyzer {
        catalog: HashMap<&'static str, Vec<f64>>,
        registered: Vec<(String, Params)>,
        register_calls: usize,
        times: Vec<f64>,
        runs: usize,
    }

    impl CannedAnalyzer {
        fn new(rows: usize) -> Self {
            let mut catalog = HashMap::new();
            catalog.insert("status(x.Diameter)", vec![1.75; rows]);
            catalog.insert("status(toolhead.velocity)", (0..rows).map(|i| i as f64).collect());
            Self {
                catalog,
                registered: Vec::new(),
                register_calls: 0,
                times: (0..rows).map(|i| (i + 1) as f64 * 0.5).collect(),
                runs: 0,
            }
        }
    }

    impl DatasetAnalyzer for CannedAnalyzer {
        fn register_dataset(&mut self, name: &str, params: &Params) -> manager::Result<()> {
            self.register_calls += 1;
            if !self.catalog.contains_key(name) {
                return Err(AnalysisError::UnknownDataset(name.to_string()));
            }
            if !self.registered.iter().any(|(n, _)| n == name) {
                self.registered.push((name.to_string(), params.clone()));
            }
            Ok(())
        }

        fn run(&mut self) -> manager::Result<()> {
            self.runs += 1;
            Ok(())
        }

        fn datasets(&self) -> Vec<&str> {
            self.registered.iter().map(|(n, _)| n.as_str()).collect()
        }

        fn series(&self, name: &str) -> Option<&[f64]> {
            self.catalog.get(name).map(|v| v.as_slice())
        }

        fn time_axis(&self) -> &[f64] {
            &self.times
        }
    }

    fn graph(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_rows_flattened_and_deduplicated() -> Result<()> {
        let mut am = CannedAnalyzer::new(3);
        let descs = graph(&[
            &["status(x.Diameter)?color=green", "status(toolhead.velocity)"],
            &["status(x.Diameter)?color=red&alpha=0.4"],
        ]);

        let table = generate_motion_table(&mut am, &descs)?;

        assert_eq!(
            table.column_names(),
            vec!["status(x.Diameter)", "status(toolhead.velocity)", "Time"]
        );
        assert_eq!(table.num_rows(), 3);
        assert_eq!(am.runs, 1);
        assert_eq!(am.register_calls, 2);
        // Params reach the analyzer
        assert_eq!(am.registered[0].1["color"].as_str(), Some("green"));
        Ok(())
    }

    #[test]
    fn test_each_distinct_name_registered_once() -> Result<()> {
        let mut am = CannedAnalyzer::new(2);
        let descs = graph(&[
            &["status(toolhead.velocity)?color=blue", " status(toolhead.velocity)"],
            &["status(toolhead.velocity)?color=red"],
        ]);

        let table = generate_motion_table(&mut am, &descs)?;

        assert_eq!(am.register_calls, 1);
        assert_eq!(am.registered[0].1["color"].as_str(), Some("blue"));
        assert_eq!(table.column_names(), vec!["status(toolhead.velocity)", "Time"]);
        Ok(())
    }

    #[test]
    fn test_columns_aligned() -> Result<()> {
        let mut am = CannedAnalyzer::new(7);
        let table = generate_motion_table(&mut am, &graph(&[&["status(toolhead.velocity)"]]))?;

        for column in table.columns() {
            assert_eq!(column.values.len(), 7, "column {}", column.name);
        }
        Ok(())
    }

    #[test]
    fn test_zero_rows() -> Result<()> {
        let mut am = CannedAnalyzer::new(0);
        let table = generate_motion_table(&mut am, &graph(&[&["status(x.Diameter)"]]))?;

        assert!(table.is_empty());
        assert_eq!(table.column_names(), vec!["status(x.Diameter)", "Time"]);
        Ok(())
    }

    #[test]
    fn test_unknown_dataset_propagates() {
        let mut am = CannedAnalyzer::new(3);
        let err = generate_motion_table(&mut am, &graph(&[&["status(nope.nothing)"]])).unwrap_err();
        assert!(matches!(
            err,
            MotionError::Analysis(AnalysisError::UnknownDataset(name)) if name == "status(nope.nothing)"
        ));
        assert_eq!(am.runs, 0);
    }

    #[test]
    fn test_invalid_parameter_aborts_before_registration() {
        let mut am = CannedAnalyzer::new(3);
        let descs = graph(&[&["status(x.Diameter)", "status(toolhead.velocity)?alpha=abc"]]);

        let err = generate_motion_table(&mut am, &descs).unwrap_err();

        assert!(matches!(err, MotionError::Descriptor(DescriptorError::InvalidParameter { .. })));
        assert!(am.registered.is_empty());
    }

    fn write_filament_log(dir: &TempDir, seconds: usize) -> PathBuf {
        let file = File::create(dir.path().join("filament.json")).unwrap();
        let mut writer = BufWriter::new(file);
        for i in 0..=seconds * 10 {
            let t = 3000.0 + i as f64 * 0.1;
            let diameter = if i % 2 == 0 { 1.75 } else { 1.70 };
            writeln!(
                writer,
                r#"{{"time": {}, "status": {{"hall_filament_width_sensor": {{"Diameter": {}}}}}}}"#,
                t, diameter
            )
            .unwrap();
        }
        writer.flush().unwrap();
        dir.path().join("filament")
    }

    #[test]
    fn test_extract_and_save_default_window() {
        let dir = TempDir::new().unwrap();
        let prefix = write_filament_log(&dir, 6);
        let window = AnalysisWindow::new(0.0, 5.0, 0.0001).unwrap();
        let descs = graph(&[&["status(hall_filament_width_sensor.Diameter)?color=green"]]);

        let table = extract_motion_table(&prefix, &window, &descs).unwrap();

        assert_eq!(table.num_rows(), 50_000);
        assert_eq!(
            table.column_names(),
            vec!["status(hall_filament_width_sensor.Diameter)", "Time"]
        );
        let diameter = table.column("status(hall_filament_width_sensor.Diameter)").unwrap();
        assert_eq!(diameter[0], 1.75);
        assert_eq!(diameter[49_998], 1.70);
        assert!((table.times()[49_999] - 5.0).abs() < 1e-9);

        let out = dir.path().join("out.csv");
        write_table_csv(&out, &table).unwrap();
        let content = fs::read_to_string(&out).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("status(hall_filament_width_sensor.Diameter),Time"));
        assert_eq!(lines.count(), 50_000);
    }

    #[test]
    fn test_extract_with_skip_and_derivative() {
        let dir = TempDir::new().unwrap();
        let prefix = write_filament_log(&dir, 4);
        let window = AnalysisWindow::new(2.0, 1.0, 0.1).unwrap();
        let descs = graph(&[&["derivative(status(hall_filament_width_sensor.Diameter))"]]);

        let table = extract_motion_table(&prefix, &window, &descs).unwrap();

        assert_eq!(table.num_rows(), 10);
        assert_eq!(
            table.column_names(),
            vec![
                "status(hall_filament_width_sensor.Diameter)",
                "derivative(status(hall_filament_width_sensor.Diameter))",
                "Time"
            ]
        );
        assert!((table.times()[0] - 2.1).abs() < 1e-9);
        assert_eq!(table.column("derivative(status(hall_filament_width_sensor.Diameter))").unwrap()[0], 0.0);
    }

    #[test]
    fn test_unknown_dataset_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let prefix = write_filament_log(&dir, 1);
        let window = AnalysisWindow::new(0.0, 1.0, 0.01).unwrap();
        let out = dir.path().join("out.csv");

        let result = extract_motion_table(&prefix, &window, &graph(&[&["velocity(x)"]]));
        if let Ok(table) = &result {
            write_table_csv(&out, table).unwrap();
        }

        assert!(matches!(
            result,
            Err(MotionError::Analysis(AnalysisError::UnknownDataset(_)))
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_log() {
        let dir = TempDir::new().unwrap();
        let window = AnalysisWindow::new(0.0, 1.0, 0.01).unwrap();
        let result = extract_motion_table(&dir.path().join("absent"), &window, &graph(&[&["status(a.b)"]]));
        assert!(matches!(result, Err(MotionError::Log(LogError::Io { .. }))));
    }
}
