//! Feed document validation and record mapping
//!
//! Untyped GeoJSON is turned into a [`FeedSnapshot`] in two steps:
//! 1. Shape validation of the document, which can fail as a whole
//! 2. Per-record mapping, where bad records are dropped and counted

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use quake_core::{FeedSnapshot, FeedValidationError, SeismicEvent};

/// Collection-type marker every feed document must carry
const FEATURE_COLLECTION: &str = "FeatureCollection";

/// Result of parsing one feed document
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub snapshot: FeedSnapshot,
    /// Records dropped during mapping
    pub dropped: usize,
}

/// Why a single record was excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRejection {
    NotAnObject,
    MissingId,
    MissingCoordinates,
    NonFiniteCoordinates,
}

/// Parse a feed body.
///
/// `fetched_at` stands in for a missing `metadata.generated` and
/// `fallback_url` for a missing `metadata.url`.
pub fn parse_feed(
    body: &str,
    fetched_at: i64,
    fallback_url: &str,
) -> Result<ParsedFeed, FeedValidationError> {
    let document: Value = serde_json::from_str(body)
        .map_err(|e| FeedValidationError::InvalidFormat(format!("not JSON: {e}")))?;
    parse_document(&document, fetched_at, fallback_url)
}

/// Validate and map an already-decoded document
pub fn parse_document(
    document: &Value,
    fetched_at: i64,
    fallback_url: &str,
) -> Result<ParsedFeed, FeedValidationError> {
    let object = document
        .as_object()
        .ok_or_else(|| FeedValidationError::InvalidFormat(json_kind(document).to_string()))?;

    match object.get("type").and_then(Value::as_str) {
        Some(FEATURE_COLLECTION) => {}
        Some(other) => return Err(FeedValidationError::InvalidGeojson(other.to_string())),
        None => return Err(FeedValidationError::InvalidGeojson("no type".to_string())),
    }

    let features = object
        .get("features")
        .and_then(Value::as_array)
        .ok_or(FeedValidationError::InvalidFeatures)?;

    let mut events: Vec<SeismicEvent> = Vec::with_capacity(features.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(features.len());
    let mut dropped = 0usize;

    for (index, feature) in features.iter().enumerate() {
        match map_feature(feature) {
            Ok(event) => match positions.get(&event.id) {
                Some(&at) => {
                    debug!("Duplicate event id {} replaces earlier record", event.id);
                    events[at] = event;
                }
                None => {
                    positions.insert(event.id.clone(), events.len());
                    events.push(event);
                }
            },
            Err(reason) => {
                debug!("Dropping feature #{}: {:?}", index, reason);
                dropped += 1;
            }
        }
    }

    let metadata = object.get("metadata");
    let generated_at = metadata
        .and_then(|m| m.get("generated"))
        .and_then(as_epoch_ms)
        .unwrap_or(fetched_at);
    let source_url = metadata
        .and_then(|m| m.get("url"))
        .and_then(Value::as_str)
        .unwrap_or(fallback_url);
    let title = metadata
        .and_then(|m| m.get("title"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(ParsedFeed {
        snapshot: FeedSnapshot::new(generated_at, source_url, title, events),
        dropped,
    })
}

/// Map one GeoJSON feature to an event, applying field defaults
pub fn map_feature(feature: &Value) -> Result<SeismicEvent, RecordRejection> {
    let object = feature.as_object().ok_or(RecordRejection::NotAnObject)?;

    let id = match object.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(RecordRejection::MissingId),
    };

    let coordinates = object
        .get("geometry")
        .and_then(|g| g.get("coordinates"))
        .and_then(Value::as_array)
        .ok_or(RecordRejection::MissingCoordinates)?;

    let longitude = coordinates.first().and_then(Value::as_f64);
    let latitude = coordinates.get(1).and_then(Value::as_f64);
    let (longitude, latitude) = match (longitude, latitude) {
        (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => (lon, lat),
        _ => return Err(RecordRejection::NonFiniteCoordinates),
    };
    let depth = coordinates
        .get(2)
        .and_then(Value::as_f64)
        .unwrap_or(f64::NAN);

    let properties = object.get("properties");
    let prop = |key: &str| properties.and_then(|p| p.get(key));

    Ok(SeismicEvent {
        id,
        latitude,
        longitude,
        depth,
        magnitude: prop("mag").and_then(Value::as_f64).unwrap_or(0.0),
        place: prop("place")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        time: prop("time").and_then(as_epoch_ms).unwrap_or(0),
        source_url: prop("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        raw: feature.clone(),
    })
}

/// Epoch milliseconds written as an integer or as a finite float
fn as_epoch_ms(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f as i64)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FETCHED_AT: i64 = 1_700_000_000_000;
    const FALLBACK: &str = "https://example.test/feed";

    fn feature(id: &str, coords: Value, props: Value) -> Value {
        json!({
            "type": "Feature",
            "id": id,
            "properties": props,
            "geometry": { "type": "Point", "coordinates": coords }
        })
    }

    #[test]
    fn test_rejects_non_object() {
        let err = parse_feed("[1, 2, 3]", FETCHED_AT, FALLBACK).unwrap_err();
        assert_eq!(err, FeedValidationError::InvalidFormat("array".to_string()));

        let err = parse_feed("<html>", FETCHED_AT, FALLBACK).unwrap_err();
        assert!(matches!(err, FeedValidationError::InvalidFormat(_)));
    }

    #[test]
    fn test_rejects_wrong_collection_type() {
        let err = parse_feed(r#"{"type": "Feature", "features": []}"#, FETCHED_AT, FALLBACK)
            .unwrap_err();
        assert_eq!(err, FeedValidationError::InvalidGeojson("Feature".to_string()));

        let err = parse_feed(r#"{"features": []}"#, FETCHED_AT, FALLBACK).unwrap_err();
        assert!(matches!(err, FeedValidationError::InvalidGeojson(_)));
    }

    #[test]
    fn test_rejects_missing_features() {
        let err = parse_feed(r#"{"type": "FeatureCollection"}"#, FETCHED_AT, FALLBACK).unwrap_err();
        assert_eq!(err, FeedValidationError::InvalidFeatures);

        let err = parse_feed(
            r#"{"type": "FeatureCollection", "features": {"a": 1}}"#,
            FETCHED_AT,
            FALLBACK,
        )
        .unwrap_err();
        assert_eq!(err, FeedValidationError::InvalidFeatures);
    }

    #[test]
    fn test_drops_non_finite_coordinates() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                feature("bad", json!(["x", 10.0, 5.0]), json!({ "mag": 2.0 })),
                feature("good", json!([-122.5, 38.1, 7.25]), json!({ "mag": 3.1 })),
            ]
        });

        let parsed = parse_document(&doc, FETCHED_AT, FALLBACK).unwrap();
        assert_eq!(parsed.dropped, 1);
        assert_eq!(parsed.snapshot.event_count(), 1);
        assert_eq!(parsed.snapshot.event_count(), parsed.snapshot.events().len());

        let event = &parsed.snapshot.events()[0];
        assert_eq!(event.id, "good");
        assert_eq!(event.longitude, -122.5);
        assert_eq!(event.latitude, 38.1);
        assert_eq!(event.depth, 7.25);
    }

    #[test]
    fn test_defaults_for_missing_properties() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [ feature("ak1", json!([150.0, 60.0]), json!({ "mag": null })) ]
        });

        let parsed = parse_document(&doc, FETCHED_AT, FALLBACK).unwrap();
        let event = &parsed.snapshot.events()[0];
        assert_eq!(event.magnitude, 0.0);
        assert_eq!(event.place, "Unknown");
        assert_eq!(event.time, 0);
        assert_eq!(event.source_url, "");
        assert!(event.depth.is_nan());
        assert_eq!(event.raw["id"], "ak1");
    }

    #[test]
    fn test_metadata_and_fallbacks() {
        let with_meta = json!({
            "type": "FeatureCollection",
            "metadata": { "generated": 42, "url": "https://feed.test", "title": "Past Day" },
            "features": []
        });
        let parsed = parse_document(&with_meta, FETCHED_AT, FALLBACK).unwrap();
        assert_eq!(parsed.snapshot.generated_at(), 42);
        assert_eq!(parsed.snapshot.source_url(), "https://feed.test");
        assert_eq!(parsed.snapshot.title(), "Past Day");

        let bare = json!({ "type": "FeatureCollection", "features": [] });
        let parsed = parse_document(&bare, FETCHED_AT, FALLBACK).unwrap();
        assert_eq!(parsed.snapshot.generated_at(), FETCHED_AT);
        assert_eq!(parsed.snapshot.source_url(), FALLBACK);
        assert_eq!(parsed.snapshot.title(), "");
        assert!(parsed.snapshot.is_empty());
    }

    #[test]
    fn test_float_timestamps_are_kept() {
        let doc = json!({
            "type": "FeatureCollection",
            "metadata": { "generated": 1_700_000_100_000.0 },
            "features": [
                feature("f", json!([10.0, 20.0]), json!({ "time": 1_700_000_000_000.0 })),
                feature("n", json!([10.0, 20.0]), json!({ "time": "yesterday" })),
            ]
        });

        let parsed = parse_document(&doc, FETCHED_AT, FALLBACK).unwrap();
        assert_eq!(parsed.snapshot.generated_at(), 1_700_000_100_000);
        assert_eq!(parsed.snapshot.events()[0].time, 1_700_000_000_000);
        assert_eq!(parsed.snapshot.events()[1].time, 0);
    }

    #[test]
    fn test_duplicate_ids_overwrite() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                feature("dup", json!([1.0, 1.0]), json!({ "mag": 1.0 })),
                feature("other", json!([2.0, 2.0]), json!({ "mag": 2.0 })),
                feature("dup", json!([3.0, 3.0]), json!({ "mag": 3.0 })),
            ]
        });

        let parsed = parse_document(&doc, FETCHED_AT, FALLBACK).unwrap();
        let events = parsed.snapshot.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "dup");
        assert_eq!(events[0].magnitude, 3.0);
        assert_eq!(parsed.dropped, 0);
    }

    #[test]
    fn test_map_feature_rejections() {
        assert_eq!(map_feature(&json!(3)), Err(RecordRejection::NotAnObject));
        assert_eq!(
            map_feature(&json!({ "geometry": { "coordinates": [1.0, 2.0] } })),
            Err(RecordRejection::MissingId)
        );
        assert_eq!(
            map_feature(&json!({ "id": "x", "geometry": null })),
            Err(RecordRejection::MissingCoordinates)
        );
        assert_eq!(
            map_feature(&json!({ "id": "x", "geometry": { "coordinates": [1.0] } })),
            Err(RecordRejection::NonFiniteCoordinates)
        );
    }
}
