//! Decoding of rendered view payloads.
//!
//! A render is a JSON document, usually gzip compressed:
//!
//! ```json
//! {
//!   "units": [
//!     {"path": "250010101001", "geography": "MULTIPOLYGON(...)",
//!      "internal_point": "POINT(...)", "values": {"total_pop": 1021}}
//!   ],
//!   "plans": {"ma_congress_2021": {"250010101001": "9"}}
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;

use flate2::read::GzDecoder;
use geo_types::Geometry;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::ColumnType;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to decompress payload")]
    Decompress(#[source] std::io::Error),
    #[error("failed to parse payload")]
    Parse(#[source] serde_json::Error),
    #[error("invalid geometry for unit '{unit}': {message}")]
    Geometry { unit: String, message: String },
    #[error("value of column '{column}' for unit '{unit}' is not a valid {expected}")]
    ColumnType {
        unit: String,
        column: String,
        expected: ColumnType,
    },
    #[error("unit '{0}' appears more than once")]
    DuplicateUnit(String),
    #[error("edge ({left}, {right}) references unknown unit '{unit}'")]
    UnknownUnit {
        left: String,
        right: String,
        unit: String,
    },
}

/// The rendered content of a view.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RenderedView {
    pub units: Vec<RenderedUnit>,
    /// Plans attached to the view, by plan path.
    #[serde(default)]
    pub plans: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RenderedUnit {
    pub path: String,
    pub geography: Option<String>,
    pub internal_point: Option<String>,
    #[serde(default)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Parse a JSON payload, decompressing it first if it is gzipped.
pub(crate) fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PayloadError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decompressed = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decompressed)
            .map_err(PayloadError::Decompress)?;
        serde_json::from_slice(&decompressed).map_err(PayloadError::Parse)
    } else {
        serde_json::from_slice(bytes).map_err(PayloadError::Parse)
    }
}

/// Parse a WKT geometry of `unit`.
pub(crate) fn parse_wkt(unit: &str, wkt: &str) -> Result<Geometry<f64>, PayloadError> {
    let invalid = |message: String| PayloadError::Geometry {
        unit: unit.to_string(),
        message,
    };
    wkt::Wkt::<f64>::from_str(wkt)
        .map_err(|e| invalid(format!("{e:?}")))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| invalid(format!("{e:?}")))
        })
}

/// District label of a plan assignment, labels may be strings or numbers.
pub(crate) fn district_label(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(label) => Some(label.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use geo_types::{Geometry, point};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn render() -> serde_json::Value {
        json!({
            "units": [
                {"path": "a", "geography": "POLYGON((0 0,1 0,1 1,0 0))", "internal_point": "POINT(0.5 0.25)", "values": {"total_pop": 10}},
            ],
            "plans": {"plan": {"a": 1}},
        })
    }

    #[test]
    fn plain_json_is_decoded() {
        let bytes = serde_json::to_vec(&render()).unwrap();
        let decoded: RenderedView = decode_json(&bytes).unwrap();
        assert_eq!(decoded.units.len(), 1);
        assert_eq!(decoded.units[0].values["total_pop"], json!(10));
        assert_eq!(district_label(&decoded.plans["plan"]["a"]), Some("1".to_string()));
    }

    #[test]
    fn gzipped_json_is_decoded() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&serde_json::to_vec(&render()).unwrap())
            .unwrap();
        let bytes = encoder.finish().unwrap();

        let decoded: RenderedView = decode_json(&bytes).unwrap();
        assert_eq!(decoded.units[0].path, "a");
    }

    #[test]
    fn truncated_gzip_is_rejected() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&serde_json::to_vec(&render()).unwrap())
            .unwrap();
        let bytes = encoder.finish().unwrap();

        let result = decode_json::<RenderedView>(&bytes[..bytes.len() / 2]);
        assert!(
            matches!(
                result,
                Err(PayloadError::Decompress(_) | PayloadError::Parse(_))
            ),
            "expected a decoding error, found: {result:?}"
        );
    }

    #[test]
    fn wkt_points_are_parsed() {
        let geometry = parse_wkt("a", "POINT(0.5 0.25)").unwrap();
        assert_eq!(geometry, Geometry::Point(point!(x: 0.5, y: 0.25)));
    }

    #[test]
    fn invalid_wkt_is_reported_with_unit() {
        let result = parse_wkt("a", "POLYGON((0 0");
        assert!(
            matches!(&result, Err(PayloadError::Geometry { unit, .. }) if unit == "a"),
            "expected PayloadError::Geometry, found: {result:?}"
        );
    }
}
