//! Graph descriptor parsing.
//!
//! A graph descriptor names a dataset and optionally carries query-style
//! parameters, e.g. `status(extruder.temperature)?color=red&alpha=0.5`.
//! Parameters are either plot styling hints or inputs to the dataset's
//! computation; this module does not care which.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Parameter keys whose values are coerced to floating point.
pub const NUMERIC_PARAMS: &[&str] = &["alpha"];

/// Errors that can occur while parsing a descriptor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("invalid value '{value}' for parameter '{key}'")]
    InvalidParameter { key: String, value: String },
}

/// Result type for descriptor parsing.
pub type Result<T> = std::result::Result<T, DescriptorError>;

/// A single descriptor parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Number(f64),
}

impl ParamValue {
    /// Returns the text form, if this is a string parameter.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Number(_) => None,
        }
    }

    /// Returns the numeric form, if this is a numeric parameter.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Number(v) => write!(f, "{}", v),
        }
    }
}

/// Descriptor parameters keyed by name.
pub type Params = HashMap<String, ParamValue>;

/// A parsed graph descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDescriptor {
    /// Dataset name, passed verbatim to the analyzer.
    pub dataset: String,
    /// Decoded parameters.
    pub params: Params,
}

impl GraphDescriptor {
    /// Parse a descriptor string. See [`parse_graph_description`].
    pub fn parse(desc: &str) -> Result<Self> {
        let (dataset, params) = parse_graph_description(desc)?;
        Ok(Self { dataset, params })
    }
}

/// Split a descriptor into its dataset name and decoded parameters.
///
/// Everything before the first `?` is the dataset name. The remainder is
/// parsed as `application/x-www-form-urlencoded`; on repeated keys the last
/// occurrence wins, and pairs with an empty value are dropped. Keys listed in
/// [`NUMERIC_PARAMS`] are converted to `f64`.
///
/// # Errors
///
/// Returns [`DescriptorError::InvalidParameter`] if a numeric parameter does
/// not parse as a float.
///
/// # Example
///
/// ```
/// use motan_log::core::descriptor::{parse_graph_description, ParamValue};
///
/// let (name, params) = parse_graph_description("d?alpha=0.5&color=red").unwrap();
/// assert_eq!(name, "d");
/// assert_eq!(params["alpha"], ParamValue::Number(0.5));
/// ```
pub fn parse_graph_description(desc: &str) -> Result<(String, Params)> {
    let Some((dataset, query)) = desc.split_once('?') else {
        return Ok((desc.to_string(), Params::new()));
    };

    let mut params = Params::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        params.insert(key.into_owned(), ParamValue::Text(value.into_owned()));
    }

    for &fkey in NUMERIC_PARAMS {
        if let Some(ParamValue::Text(raw)) = params.get(fkey) {
            let parsed: f64 = raw
                .trim()
                .parse()
                .map_err(|_| DescriptorError::InvalidParameter {
                    key: fkey.to_string(),
                    value: raw.clone(),
                })?;
            params.insert(fkey.to_string(), ParamValue::Number(parsed));
        }
    }

    Ok((dataset.to_string(), params))
}
