//! Seismic events and feed snapshots
//!
//! A snapshot is the immutable result of one successful fetch. It is never
//! mutated after construction; a newer fetch supersedes it with a new value.

use serde::{Deserialize, Deserializer, Serialize};

/// One observed seismic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicEvent {
    /// Identifier, unique within a snapshot
    pub id: String,
    /// Degrees, always finite in a validated snapshot
    pub latitude: f64,
    /// Degrees, always finite in a validated snapshot
    pub longitude: f64,
    /// Kilometers; NaN when the source did not report a usable depth
    #[serde(default = "unknown_depth", deserialize_with = "depth_or_unknown")]
    pub depth: f64,
    pub magnitude: f64,
    pub place: String,
    /// Epoch milliseconds
    pub time: i64,
    /// Link to the upstream event page
    pub source_url: String,
    /// Untouched source record
    #[serde(default)]
    pub raw: serde_json::Value,
}

fn unknown_depth() -> f64 {
    f64::NAN
}

/// JSON writes NaN as `null`; read it back as unknown depth
fn depth_or_unknown<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl SeismicEvent {
    /// Create an event with default metadata at the given position
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            depth: f64::NAN,
            magnitude: 0.0,
            place: "Unknown".to_string(),
            time: 0,
            source_url: String::new(),
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = magnitude;
        self
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_time(mut self, time: i64) -> Self {
        self.time = time;
        self
    }

    pub fn with_place(mut self, place: &str) -> Self {
        self.place = place.to_string();
        self
    }

    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = url.to_string();
        self
    }

    /// Depth if the source reported a finite value
    pub fn known_depth(&self) -> Option<f64> {
        self.depth.is_finite().then_some(self.depth)
    }

    /// Whether both coordinates are finite numbers
    pub fn has_valid_position(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Immutable result of one successful fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    generated_at: i64,
    source_url: String,
    title: String,
    event_count: usize,
    events: Vec<SeismicEvent>,
}

impl FeedSnapshot {
    /// Build a snapshot; `event_count` is derived from `events`
    pub fn new(
        generated_at: i64,
        source_url: impl Into<String>,
        title: impl Into<String>,
        events: Vec<SeismicEvent>,
    ) -> Self {
        Self {
            generated_at,
            source_url: source_url.into(),
            title: title.into(),
            event_count: events.len(),
            events,
        }
    }

    /// Epoch milliseconds reported by the source (or the fetch time)
    pub fn generated_at(&self) -> i64 {
        self.generated_at
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Events in source order
    pub fn events(&self) -> &[SeismicEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Look up an event by id
    pub fn get(&self, id: &str) -> Option<&SeismicEvent> {
        self.events.iter().find(|e| e.id == id)
    }
}
