//! Encoding properties: the parameter record handed to the encoder
//!
//! Field names on the wire follow the event log service's JSON contract
//! (`case_name`, `min_suffix_size`, ...). Rust-side names describe what the
//! field controls.

use crate::error::{LogprepError, LogprepResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Window size policy for the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowSizeRepr", into = "String")]
pub enum WindowSize {
    /// Let the encoder pick the window from the data
    Auto,
    /// Fixed number of events per window
    Fixed(u32),
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::Auto
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(n) => write!(f, "{}", n),
        }
    }
}

impl From<WindowSize> for String {
    fn from(value: WindowSize) -> Self {
        value.to_string()
    }
}

/// Accepted wire forms: `"auto"`, `"12"` or `12`
#[derive(Deserialize)]
#[serde(untagged)]
enum WindowSizeRepr {
    Number(u64),
    Text(String),
}

impl TryFrom<WindowSizeRepr> for WindowSize {
    type Error = String;

    fn try_from(repr: WindowSizeRepr) -> Result<Self, Self::Error> {
        let n = match repr {
            WindowSizeRepr::Number(n) => n,
            WindowSizeRepr::Text(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("auto") {
                    return Ok(Self::Auto);
                }
                s.parse::<u64>()
                    .map_err(|_| format!("window_size must be \"auto\" or a positive integer, got {:?}", s))?
            }
        };

        match u32::try_from(n) {
            Ok(0) => Err("window_size must be at least 1".to_string()),
            Ok(n) => Ok(Self::Fixed(n)),
            Err(_) => Err(format!("window_size {} is too large", n)),
        }
    }
}

/// Complete encoding parameter record
///
/// Produced by merging request overrides onto dataset defaults. Two records
/// that compare equal always fingerprint identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingProperties {
    #[serde(rename = "case_name")]
    pub case_id_column: String,

    #[serde(rename = "concept_name")]
    pub activity_column: String,

    #[serde(rename = "timestamp_name")]
    pub timestamp_column: String,

    #[serde(rename = "date_format")]
    pub timestamp_format: String,

    #[serde(rename = "time_since_case_start_column")]
    pub case_elapsed_column: String,

    #[serde(rename = "time_since_last_event_column")]
    pub event_elapsed_column: String,

    #[serde(rename = "day_in_week_column")]
    pub day_of_week_column: String,

    pub seconds_in_day_column: String,

    /// Minimum event-sequence length eligible for inclusion
    #[serde(rename = "min_suffix_size")]
    pub min_suffix_length: u32,

    #[serde(rename = "train_validation_size")]
    pub validation_fraction: f64,

    #[serde(rename = "test_validation_size")]
    pub test_fraction: f64,

    pub window_size: WindowSize,

    pub categorical_columns: Vec<String>,

    pub continuous_columns: Vec<String>,

    pub continuous_positive_columns: Vec<String>,
}

impl Default for EncodingProperties {
    fn default() -> Self {
        Self {
            case_id_column: String::new(),
            activity_column: String::new(),
            timestamp_column: String::new(),
            timestamp_format: "%Y/%m/%d %H:%M:%S.%f".to_string(),
            case_elapsed_column: "case_elapsed_time".to_string(),
            event_elapsed_column: "event_elapsed_time".to_string(),
            day_of_week_column: "day_in_week".to_string(),
            seconds_in_day_column: "seconds_in_day".to_string(),
            min_suffix_length: 5,
            validation_fraction: 0.15,
            test_fraction: 0.2,
            window_size: WindowSize::Auto,
            categorical_columns: vec![],
            continuous_columns: vec![],
            continuous_positive_columns: vec![],
        }
    }
}

impl EncodingProperties {
    /// Check the record before it is fingerprinted or handed to an encoder
    pub fn validate(&self) -> LogprepResult<()> {
        let required = [
            ("case_name", &self.case_id_column),
            ("concept_name", &self.activity_column),
            ("timestamp_name", &self.timestamp_column),
            ("date_format", &self.timestamp_format),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(LogprepError::invalid(format!("{} must not be empty", field)));
            }
        }

        if self.min_suffix_length == 0 {
            return Err(LogprepError::invalid("min_suffix_size must be at least 1"));
        }

        check_fraction("train_validation_size", self.validation_fraction)?;
        check_fraction("test_validation_size", self.test_fraction)?;
        let total = self.validation_fraction + self.test_fraction;
        if total >= 1.0 {
            return Err(LogprepError::invalid(format!(
                "train_validation_size + test_validation_size must be below 1, got {}",
                total
            )));
        }

        let mut seen = HashSet::new();
        for column in self.role_columns() {
            if !seen.insert(column) {
                return Err(LogprepError::invalid(format!(
                    "column {:?} is listed more than once across the role lists",
                    column
                )));
            }
        }

        Ok(())
    }

    /// Categorical, continuous and continuous-positive columns, in that order
    pub fn role_columns(&self) -> impl Iterator<Item = &str> {
        self.categorical_columns
            .iter()
            .chain(&self.continuous_columns)
            .chain(&self.continuous_positive_columns)
            .map(String::as_str)
    }
}

fn check_fraction(field: &str, value: f64) -> LogprepResult<()> {
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        return Err(LogprepError::invalid(format!(
            "{} must be in [0, 1), got {}",
            field, value
        )));
    }
    Ok(())
}

/// Partial properties as sent by a client or stored in `default_props.json`
///
/// Unset fields fall through to the next layer when merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyOverrides {
    #[serde(rename = "case_name", skip_serializing_if = "Option::is_none")]
    pub case_id_column: Option<String>,

    #[serde(rename = "concept_name", skip_serializing_if = "Option::is_none")]
    pub activity_column: Option<String>,

    #[serde(rename = "timestamp_name", skip_serializing_if = "Option::is_none")]
    pub timestamp_column: Option<String>,

    #[serde(rename = "date_format", skip_serializing_if = "Option::is_none")]
    pub timestamp_format: Option<String>,

    #[serde(
        rename = "time_since_case_start_column",
        skip_serializing_if = "Option::is_none"
    )]
    pub case_elapsed_column: Option<String>,

    #[serde(
        rename = "time_since_last_event_column",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_elapsed_column: Option<String>,

    #[serde(rename = "day_in_week_column", skip_serializing_if = "Option::is_none")]
    pub day_of_week_column: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_in_day_column: Option<String>,

    #[serde(rename = "min_suffix_size", skip_serializing_if = "Option::is_none")]
    pub min_suffix_length: Option<u32>,

    #[serde(rename = "train_validation_size", skip_serializing_if = "Option::is_none")]
    pub validation_fraction: Option<f64>,

    #[serde(rename = "test_validation_size", skip_serializing_if = "Option::is_none")]
    pub test_fraction: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<WindowSize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub categorical_columns: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuous_columns: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuous_positive_columns: Option<Vec<String>>,
}

impl PropertyOverrides {
    /// Layer these overrides on top of `base`
    pub fn apply_to(self, base: EncodingProperties) -> EncodingProperties {
        EncodingProperties {
            case_id_column: self.case_id_column.unwrap_or(base.case_id_column),
            activity_column: self.activity_column.unwrap_or(base.activity_column),
            timestamp_column: self.timestamp_column.unwrap_or(base.timestamp_column),
            timestamp_format: self.timestamp_format.unwrap_or(base.timestamp_format),
            case_elapsed_column: self.case_elapsed_column.unwrap_or(base.case_elapsed_column),
            event_elapsed_column: self
                .event_elapsed_column
                .unwrap_or(base.event_elapsed_column),
            day_of_week_column: self.day_of_week_column.unwrap_or(base.day_of_week_column),
            seconds_in_day_column: self
                .seconds_in_day_column
                .unwrap_or(base.seconds_in_day_column),
            min_suffix_length: self.min_suffix_length.unwrap_or(base.min_suffix_length),
            validation_fraction: self.validation_fraction.unwrap_or(base.validation_fraction),
            test_fraction: self.test_fraction.unwrap_or(base.test_fraction),
            window_size: self.window_size.unwrap_or(base.window_size),
            categorical_columns: self.categorical_columns.unwrap_or(base.categorical_columns),
            continuous_columns: self.continuous_columns.unwrap_or(base.continuous_columns),
            continuous_positive_columns: self
                .continuous_positive_columns
                .unwrap_or(base.continuous_positive_columns),
        }
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
