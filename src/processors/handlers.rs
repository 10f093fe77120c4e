//! Derived datasets computed from other datasets.
//!
//! Derived datasets are named like function calls over other dataset names,
//! e.g. `derivative(status(toolhead.position.0))` or
//! `smooth(status(extruder.temperature),0.050)`. They are generated after
//! all raw datasets have been sampled.

use super::manager::AnalysisError;

/// Kind of derived computation.
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedKind {
    Derivative,
    Integral,
    Deviation,
    Smooth { smooth_time: f64 },
}

/// A derived dataset and the datasets it is computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedDataset {
    kind: DerivedKind,
    sources: Vec<String>,
}

/// Split a dataset name of the form `kind(args)`.
pub fn parse_dataset_name(name: &str) -> Option<(&str, &str)> {
    let (kind, rest) = name.split_once('(')?;
    let args = rest.strip_suffix(')')?;
    let kind = kind.trim();
    if kind.is_empty() {
        return None;
    }
    Some((kind, args))
}

/// Split dataset arguments on commas that are not nested in parentheses.
pub fn split_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

fn invalid(dataset: &str, reason: impl Into<String>) -> AnalysisError {
    AnalysisError::InvalidArgument {
        dataset: dataset.to_string(),
        reason: reason.into(),
    }
}

impl DerivedDataset {
    /// Build the handler for `name`, already split into `kind` and `args`.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::UnknownDataset`] if `kind` is not a derived dataset,
    /// [`AnalysisError::InvalidArgument`] if the arguments do not fit it.
    pub fn setup(name: &str, kind: &str, args: &str) -> Result<Self, AnalysisError> {
        let parts = split_args(args);
        let expect = |count: usize| -> Result<(), AnalysisError> {
            if parts.len() != count || parts.iter().any(|p| p.is_empty()) {
                return Err(invalid(
                    name,
                    format!("expected {} argument(s), got {}", count, parts.len()),
                ));
            }
            Ok(())
        };

        let (kind, sources) = match kind {
            "derivative" => {
                expect(1)?;
                (DerivedKind::Derivative, vec![parts[0]])
            }
            "integral" => {
                expect(1)?;
                (DerivedKind::Integral, vec![parts[0]])
            }
            "deviation" => {
                expect(2)?;
                (DerivedKind::Deviation, vec![parts[0], parts[1]])
            }
            "smooth" => {
                expect(2)?;
                let smooth_time: f64 = parts[1]
                    .parse()
                    .map_err(|_| invalid(name, format!("invalid smooth time '{}'", parts[1])))?;
                if !smooth_time.is_finite() || smooth_time <= 0.0 {
                    return Err(invalid(name, "smooth time must be positive"));
                }
                (DerivedKind::Smooth { smooth_time }, vec![parts[0]])
            }
            _ => return Err(AnalysisError::UnknownDataset(name.to_string())),
        };

        Ok(Self {
            kind,
            sources: sources.into_iter().map(str::to_string).collect(),
        })
    }

    #[inline]
    pub fn kind(&self) -> &DerivedKind {
        &self.kind
    }

    /// Names of the datasets this one is computed from.
    #[inline]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Compute the dataset from its sources, given in [`Self::sources`] order.
    pub fn generate(&self, sources: &[&[f64]], segment_time: f64) -> Vec<f64> {
        match self.kind {
            DerivedKind::Derivative => derivative(sources[0], segment_time),
            DerivedKind::Integral => integral(sources[0], segment_time),
            DerivedKind::Deviation => deviation(sources[0], sources[1]),
            DerivedKind::Smooth { smooth_time } => {
                let src = sources[0];
                let window = ((smooth_time / segment_time).round() as usize)
                    .clamp(1, src.len().max(1));
                moving_average(src, window)
            }
        }
    }
}

/// Rate of change per second; the first sample is zero.
pub fn derivative(src: &[f64], segment_time: f64) -> Vec<f64> {
    if src.is_empty() {
        return Vec::new();
    }
    let inv_seg_time = 1.0 / segment_time;
    std::iter::once(0.0)
        .chain(src.windows(2).map(|w| (w[1] - w[0]) * inv_seg_time))
        .collect()
}

/// Running integral; the first sample is zero.
pub fn integral(src: &[f64], segment_time: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(src.len());
    let mut total = 0.0;
    for (i, &v) in src.iter().enumerate() {
        if i > 0 {
            total += v * segment_time;
        }
        out.push(total);
    }
    out
}

/// Element-wise `a - b`.
pub fn deviation(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Centered moving average over `window` samples, ignoring `NaN` samples.
pub fn moving_average(src: &[f64], window: usize) -> Vec<f64> {
    let n = src.len();
    let mut sums = Vec::with_capacity(n + 1);
    let mut counts = Vec::with_capacity(n + 1);
    sums.push(0.0);
    counts.push(0usize);
    for &v in src {
        let (s, c) = (sums[sums.len() - 1], counts[counts.len() - 1]);
        if v.is_nan() {
            sums.push(s);
            counts.push(c);
        } else {
            sums.push(s + v);
            counts.push(c + 1);
        }
    }

    let half = window / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = i.saturating_add(window - half).min(n);
            let count = counts[hi] - counts[lo];
            if count == 0 {
                f64::NAN
            } else {
                (sums[hi] - sums[lo]) / count as f64
            }
        })
        .collect()
}

/// Derived datasets and their descriptions.
pub fn list_datasets() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "derivative(<dataset>)",
            "Calculate a derivative (rate of change) of a dataset",
        ),
        (
            "integral(<dataset>)",
            "Calculate the running integral of a dataset",
        ),
        (
            "deviation(<dataset1>,<dataset2>)",
            "Calculate the difference between two datasets",
        ),
        (
            "smooth(<dataset>,<smooth_time>)",
            "Generate moving average of a dataset",
        ),
    ]
}
