//! Request fingerprints for content-addressed caching
//!
//! Same dataset + same merged properties = same fingerprint, regardless of
//! the field order the client used.

use crate::encoding::EncodingProperties;
use crate::error::LogprepResult;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Fingerprint length in bytes (128 bits)
pub const FINGERPRINT_LEN: usize = 16;

/// Deterministic identifier of a (dataset, result name, properties) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Hash the canonical JSON form of the request
    pub fn compute(
        dataset_name: &str,
        result_name: &str,
        properties: &EncodingProperties,
    ) -> LogprepResult<Self> {
        let properties = serde_json::to_value(properties)?;
        let input = json!({
            "dataset_name": dataset_name,
            "result_name": result_name,
            "properties": properties,
        });

        let mut hasher = Sha256::new();
        hasher.update(canonical_json(&input).as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(&digest[..FINGERPRINT_LEN]);
        Ok(Self(bytes))
    }

    /// Lowercase hex rendering used in file names
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the hex rendering back
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s).ok()?;
        let bytes: [u8; FINGERPRINT_LEN] = raw.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Render JSON with object keys sorted at every level and no whitespace
///
/// `-0.0` renders as `0.0`; both pass validation and encode the same split.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Number(n) if n.as_f64() == Some(0.0) && n.is_f64() => "0.0".to_string(),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let items: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}
