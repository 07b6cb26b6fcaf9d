//! User-adjustable filter configuration
//!
//! `FilterConfig` is owned by the state store; consumers submit partial
//! updates as [`FilterUpdate`] and read the merged result.

use serde::{Deserialize, Serialize};

use crate::{SeismicEvent, DEFAULT_MAGNITUDE_MAX, DEFAULT_MAGNITUDE_MIN};

/// Sliding time bound applied against `now - event.time`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RecencyWindow {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[default]
    #[serde(rename = "24h")]
    Day,
}

impl RecencyWindow {
    pub const ALL: [RecencyWindow; 4] = [
        RecencyWindow::OneHour,
        RecencyWindow::SixHours,
        RecencyWindow::TwelveHours,
        RecencyWindow::Day,
    ];

    pub fn hours(&self) -> i64 {
        match self {
            RecencyWindow::OneHour => 1,
            RecencyWindow::SixHours => 6,
            RecencyWindow::TwelveHours => 12,
            RecencyWindow::Day => 24,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.hours() * 60 * 60 * 1000
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecencyWindow::OneHour => "1h",
            RecencyWindow::SixHours => "6h",
            RecencyWindow::TwelveHours => "12h",
            RecencyWindow::Day => "24h",
        }
    }

    /// Parse a label such as `"6h"`
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.label() == label)
    }
}

/// Which attribute drives point colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ColorMode {
    #[default]
    ByMagnitude,
    ByDepth,
}

/// Current filter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub magnitude_min: f64,
    pub magnitude_max: f64,
    pub recency_window: RecencyWindow,
    pub clustering_enabled: bool,
    pub color_mode: ColorMode,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            magnitude_min: DEFAULT_MAGNITUDE_MIN,
            magnitude_max: DEFAULT_MAGNITUDE_MAX,
            recency_window: RecencyWindow::default(),
            clustering_enabled: true,
            color_mode: ColorMode::default(),
        }
    }
}

/// Partial filter update; `None` fields are left unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterUpdate {
    pub magnitude_min: Option<f64>,
    pub magnitude_max: Option<f64>,
    pub recency_window: Option<RecencyWindow>,
    pub clustering_enabled: Option<bool>,
    pub color_mode: Option<ColorMode>,
}

impl FilterUpdate {
    pub fn magnitude(min: f64, max: f64) -> Self {
        Self {
            magnitude_min: Some(min),
            magnitude_max: Some(max),
            ..Default::default()
        }
    }

    pub fn recency(window: RecencyWindow) -> Self {
        Self {
            recency_window: Some(window),
            ..Default::default()
        }
    }

    pub fn clustering(enabled: bool) -> Self {
        Self {
            clustering_enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn color_mode(mode: ColorMode) -> Self {
        Self {
            color_mode: Some(mode),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl FilterConfig {
    /// Merge the given fields; returns true if anything changed
    pub fn apply(&mut self, update: FilterUpdate) -> bool {
        let before = *self;
        if let Some(v) = update.magnitude_min {
            self.magnitude_min = v;
        }
        if let Some(v) = update.magnitude_max {
            self.magnitude_max = v;
        }
        if let Some(v) = update.recency_window {
            self.recency_window = v;
        }
        if let Some(v) = update.clustering_enabled {
            self.clustering_enabled = v;
        }
        if let Some(v) = update.color_mode {
            self.color_mode = v;
        }
        *self != before
    }

    /// Whether a single event passes the magnitude and recency bounds
    pub fn matches(&self, event: &SeismicEvent, now_ms: i64) -> bool {
        let oldest = now_ms - self.recency_window.duration_ms();
        event.magnitude >= self.magnitude_min
            && event.magnitude <= self.magnitude_max
            && event.time >= oldest
    }
}

/// Keep events inside the magnitude range and the recency window.
///
/// `now_ms` is read once by the caller so the result is a pure function of
/// its inputs. Source order is preserved.
pub fn filter_events(
    events: &[SeismicEvent],
    filters: &FilterConfig,
    now_ms: i64,
) -> Vec<SeismicEvent> {
    events
        .iter()
        .filter(|e| filters.matches(e, now_ms))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: i64 = 60 * 1000;
    const HOUR: i64 = 60 * MINUTE;

    #[test]
    fn test_filter_by_magnitude_and_recency() {
        let now = 1_700_000_000_000;
        let events = vec![
            SeismicEvent::new("a", 0.0, 0.0)
                .with_magnitude(1.5)
                .with_time(now - 30 * MINUTE),
            SeismicEvent::new("b", 0.0, 0.0)
                .with_magnitude(3.0)
                .with_time(now - 2 * HOUR),
            SeismicEvent::new("c", 0.0, 0.0)
                .with_magnitude(5.5)
                .with_time(now - 25 * HOUR),
        ];
        let filters = FilterConfig {
            magnitude_min: 2.0,
            magnitude_max: 6.0,
            recency_window: RecencyWindow::Day,
            ..Default::default()
        };

        let kept = filter_events(&events, &filters, now);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "b");
        assert_eq!(kept[0].magnitude, 3.0);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let now = 10 * HOUR;
        let filters = FilterConfig {
            magnitude_min: 2.0,
            magnitude_max: 4.0,
            recency_window: RecencyWindow::OneHour,
            ..Default::default()
        };

        let at_floor = SeismicEvent::new("a", 0.0, 0.0)
            .with_magnitude(2.0)
            .with_time(now - HOUR);
        let at_ceiling = SeismicEvent::new("b", 0.0, 0.0)
            .with_magnitude(4.0)
            .with_time(now);
        let too_old = SeismicEvent::new("c", 0.0, 0.0)
            .with_magnitude(3.0)
            .with_time(now - HOUR - 1);

        assert!(filters.matches(&at_floor, now));
        assert!(filters.matches(&at_ceiling, now));
        assert!(!filters.matches(&too_old, now));
    }

    #[test]
    fn test_apply_partial_update() {
        let mut filters = FilterConfig::default();
        let changed = filters.apply(FilterUpdate::recency(RecencyWindow::SixHours));

        assert!(changed);
        assert_eq!(filters.recency_window, RecencyWindow::SixHours);
        assert_eq!(filters.magnitude_min, 0.0);
        assert_eq!(filters.magnitude_max, 10.0);
        assert!(filters.clustering_enabled);

        assert!(!filters.apply(FilterUpdate::default()));
        assert!(!filters.apply(FilterUpdate::clustering(true)));
    }

    #[test]
    fn test_recency_labels() {
        for window in RecencyWindow::ALL {
            assert_eq!(RecencyWindow::from_label(window.label()), Some(window));
        }
        assert_eq!(RecencyWindow::from_label("48h"), None);
        assert_eq!(RecencyWindow::Day.duration_ms(), 24 * HOUR);

        let json = serde_json::to_string(&RecencyWindow::TwelveHours).unwrap();
        assert_eq!(json, "\"12h\"");
    }

    #[test]
    fn test_color_mode_serde() {
        let json = serde_json::to_string(&ColorMode::ByDepth).unwrap();
        assert_eq!(json, "\"by-depth\"");
    }
}
