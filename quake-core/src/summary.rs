//! Summary statistics over an event set

use serde::Serialize;

use crate::SeismicEvent;

/// Aggregate figures for summary cards
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FeedSummary {
    /// Events in the filtered view
    pub visible_count: usize,
    /// Events in the whole snapshot
    pub total_count: usize,
    /// Id and magnitude of the strongest visible event
    pub strongest: Option<(String, f64)>,
    pub mean_magnitude: Option<f64>,
    /// Deepest finite depth among visible events, in km
    pub max_depth: Option<f64>,
}

impl FeedSummary {
    pub fn compute(visible: &[SeismicEvent], total_count: usize) -> Self {
        if visible.is_empty() {
            return Self {
                total_count,
                ..Default::default()
            };
        }

        let strongest = visible
            .iter()
            .filter(|e| e.magnitude.is_finite())
            .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
            .map(|e| (e.id.clone(), e.magnitude));

        let magnitudes: Vec<f64> = visible
            .iter()
            .map(|e| e.magnitude)
            .filter(|m| m.is_finite())
            .collect();
        let mean_magnitude = if magnitudes.is_empty() {
            None
        } else {
            Some(magnitudes.iter().sum::<f64>() / magnitudes.len() as f64)
        };

        let max_depth = visible
            .iter()
            .filter_map(SeismicEvent::known_depth)
            .max_by(f64::total_cmp);

        Self {
            visible_count: visible.len(),
            total_count,
            strongest,
            mean_magnitude,
            max_depth,
        }
    }
}
