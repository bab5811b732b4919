//! Chunk Codec

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use thiserror::Error;

use super::MetricsRecord;

/// Why a chunk could not be turned into a [`MetricsRecord`]
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not a single JSON object, or a field has the wrong type
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Decode one raw chunk.
///
/// The whole chunk must be a single JSON value; trailing whitespace is
/// allowed, anything else after the value is an error. `null` yields the
/// zero record.
pub fn decode_chunk(bytes: &[u8]) -> Result<MetricsRecord, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Which record field a key names, ignoring ASCII case
fn field_for(key: &str) -> Option<Field> {
    if key.eq_ignore_ascii_case("cpu") {
        Some(Field::Cpu)
    } else if key.eq_ignore_ascii_case("memory") {
        Some(Field::Memory)
    } else {
        None
    }
}

enum Field {
    Cpu,
    Memory,
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = MetricsRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object with cpu and memory fields")
    }

    fn visit_unit<E: de::Error>(self) -> Result<MetricsRecord, E> {
        Ok(MetricsRecord::default())
    }

    // Keys are matched case-insensitively and a later key overrides an
    // earlier one. A null value leaves the field as it was.
    fn visit_map<A>(self, mut map: A) -> Result<MetricsRecord, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut record = MetricsRecord::default();

        while let Some(key) = map.next_key::<String>()? {
            let slot = match field_for(&key) {
                Some(Field::Cpu) => &mut record.cpu,
                Some(Field::Memory) => &mut record.memory,
                None => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };

            if let Some(value) = map.next_value::<Option<f64>>()? {
                *slot = value;
            }
        }

        Ok(record)
    }
}

impl<'de> Deserialize<'de> for MetricsRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RecordVisitor)
    }
}
