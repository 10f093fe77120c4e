//! Dataset registration and computation over an analysis window.

use std::collections::HashMap;

use log::{debug, info};
use thiserror::Error;

use super::handlers::{self, parse_dataset_name, DerivedDataset};
use crate::core::descriptor::Params;
use crate::core::loaders::{self, lookup_status_field, value_to_f64, LogError, LogSource, RAW_DATASET_TYPES};
use crate::core::window::{checked_segment_count, AnalysisWindow, WindowError};

/// Errors raised while registering or computing datasets.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("invalid dataset '{dataset}': {reason}")]
    InvalidArgument { dataset: String, reason: String },

    #[error("datasets cannot be registered after they have been generated")]
    AlreadyGenerated,

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Log(#[from] LogError),
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Registers named datasets and computes them into aligned series.
pub trait DatasetAnalyzer {
    /// Register `name` for computation. Registering a name that is already
    /// known is a no-op; the first registration's params are kept.
    fn register_dataset(&mut self, name: &str, params: &Params) -> Result<()>;

    /// Compute every registered dataset over the configured window.
    fn run(&mut self) -> Result<()>;

    /// Registered dataset names, in registration order.
    fn datasets(&self) -> Vec<&str>;

    /// Computed series for `name`.
    fn series(&self, name: &str) -> Option<&[f64]>;

    /// Shared time axis, one entry per segment.
    fn time_axis(&self) -> &[f64];

    /// Every dataset kind that can be requested, with a description.
    fn list_available_datasets(&self) -> Vec<(&'static str, &'static str)> {
        list_available_datasets()
    }
}

/// Raw and derived dataset kinds, raw first.
pub fn list_available_datasets() -> Vec<(&'static str, &'static str)> {
    let mut datasets = loaders::list_datasets();
    datasets.extend(handlers::list_datasets());
    datasets
}

#[derive(Debug)]
enum Handler {
    /// Sampled from log status at every segment.
    Status { field_parts: Vec<String> },
    Derived(DerivedDataset),
}

#[derive(Debug)]
struct Dataset {
    name: String,
    params: Params,
    handler: Handler,
    values: Vec<f64>,
}

/// [`DatasetAnalyzer`] backed by a [`LogSource`].
///
/// The log source must already be indexed and seeked to the start of the
/// window; sampling begins one segment after its start time.
pub struct AnalyzerManager<L: LogSource> {
    log: L,
    segment_time: f64,
    duration: f64,
    datasets: Vec<Dataset>,
    lookup: HashMap<String, usize>,
    times: Vec<f64>,
    generated: bool,
}

impl<L: LogSource> AnalyzerManager<L> {
    /// Create a manager sampling `log` every `segment_time` seconds.
    pub fn new(log: L, segment_time: f64) -> Result<Self> {
        if !segment_time.is_finite() || segment_time <= 0.0 {
            return Err(WindowError::InvalidSegmentTime(segment_time).into());
        }
        Ok(Self {
            log,
            segment_time,
            duration: 5.0,
            datasets: Vec::new(),
            lookup: HashMap::new(),
            times: Vec::new(),
            generated: false,
        })
    }

    /// Create a manager for `window`. The log must already be seeked to the
    /// window's skip time.
    pub fn for_window(log: L, window: &AnalysisWindow) -> Result<Self> {
        let mut manager = Self::new(log, window.segment_time())?;
        manager.set_duration(window.duration())?;
        Ok(manager)
    }

    /// Set the number of seconds to compute.
    pub fn set_duration(&mut self, duration: f64) -> Result<()> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(WindowError::InvalidDuration(duration).into());
        }
        self.duration = duration;
        Ok(())
    }

    #[inline]
    pub fn segment_time(&self) -> f64 {
        self.segment_time
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Params of the registration that created `name`.
    pub fn params(&self, name: &str) -> Option<&Params> {
        self.lookup.get(name).map(|&idx| &self.datasets[idx].params)
    }

    /// Consume the manager and return its log source.
    pub fn into_log(self) -> L {
        self.log
    }

    fn sample_status(&mut self, count: usize) -> Result<()> {
        let raw: Vec<usize> = self
            .datasets
            .iter()
            .enumerate()
            .filter(|(_, ds)| matches!(ds.handler, Handler::Status { .. }))
            .map(|(idx, _)| idx)
            .collect();
        for &idx in &raw {
            self.datasets[idx].values.reserve_exact(count);
        }

        let initial_start_time = self.log.initial_start_time();
        let start_time = self.log.start_time();
        self.times.reserve_exact(count);

        for i in 0..count {
            let t = start_time + (i + 1) as f64 * self.segment_time;
            self.times.push(t - initial_start_time);

            let status = self.log.pull_status(t)?;
            for &idx in &raw {
                let ds = &mut self.datasets[idx];
                if let Handler::Status { field_parts } = &ds.handler {
                    ds.values.push(value_to_f64(lookup_status_field(status, field_parts)));
                }
            }
        }
        Ok(())
    }

    fn generate_derived(&mut self) {
        for idx in 0..self.datasets.len() {
            let values = match &self.datasets[idx].handler {
                Handler::Derived(derived) => {
                    // Sources are always registered before their dependents
                    let sources: Vec<&[f64]> = derived
                        .sources()
                        .iter()
                        .map(|name| self.datasets[self.lookup[name]].values.as_slice())
                        .collect();
                    derived.generate(&sources, self.segment_time)
                }
                Handler::Status { .. } => continue,
            };
            self.datasets[idx].values = values;
        }
    }
}

impl<L: LogSource> DatasetAnalyzer for AnalyzerManager<L> {
    fn register_dataset(&mut self, name: &str, params: &Params) -> Result<()> {
        let name = name.trim();
        if let Some(&idx) = self.lookup.get(name) {
            if &self.datasets[idx].params != params {
                debug!(
                    "Dataset '{}' already registered; ignoring differing params {:?}",
                    name, params
                );
            }
            return Ok(());
        }
        if self.generated {
            return Err(AnalysisError::AlreadyGenerated);
        }

        let (kind, args) =
            parse_dataset_name(name).ok_or_else(|| AnalysisError::UnknownDataset(name.to_string()))?;

        let handler = if RAW_DATASET_TYPES.contains(&kind) {
            let field = args.trim();
            if field.is_empty() || field.split('.').any(str::is_empty) {
                return Err(AnalysisError::InvalidArgument {
                    dataset: name.to_string(),
                    reason: format!("invalid status field '{}'", field),
                });
            }
            Handler::Status {
                field_parts: field.split('.').map(str::to_string).collect(),
            }
        } else {
            let derived = DerivedDataset::setup(name, kind, args)?;
            for source in derived.sources() {
                self.register_dataset(source, &Params::new())?;
            }
            Handler::Derived(derived)
        };

        debug!("Registered dataset '{}'", name);
        self.lookup.insert(name.to_string(), self.datasets.len());
        self.datasets.push(Dataset {
            name: name.to_string(),
            params: params.clone(),
            handler,
            values: Vec::new(),
        });
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        if self.generated {
            return Ok(());
        }
        let count = checked_segment_count(self.duration, self.segment_time)?;
        info!(
            "Generating {} datasets over {} segments of {}s",
            self.datasets.len(),
            count,
            self.segment_time
        );

        self.sample_status(count)?;
        self.generate_derived();
        self.generated = true;
        Ok(())
    }

    fn datasets(&self) -> Vec<&str> {
        self.datasets.iter().map(|ds| ds.name.as_str()).collect()
    }

    fn series(&self, name: &str) -> Option<&[f64]> {
        self.lookup
            .get(name)
            .map(|&idx| self.datasets[idx].values.as_slice())
    }

    fn time_axis(&self) -> &[f64] {
        &self.times
    }
}
