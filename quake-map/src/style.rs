//! Point colour and size rules
//!
//! Magnitude and depth colouring are independent axes; the active
//! [`ColorMode`] picks one. Palettes run from least to most severe.

use serde::Serialize;

use quake_core::{ColorMode, SeismicEvent};

/// Magnitude bands: <2, [2,3), [3,4), [4,5), [5,6), >=6
pub const MAGNITUDE_PALETTE: [&str; 6] = [
    "#ffffb2", "#fed976", "#feb24c", "#fd8d3c", "#f03b20", "#bd0026",
];

/// Lower edges of magnitude bands 1 to 5
pub const MAGNITUDE_THRESHOLDS: [f64; 5] = [2.0, 3.0, 4.0, 5.0, 6.0];

/// Depth bands in km: <10, [10,30), [30,70), [70,150), [150,300), >=300
pub const DEPTH_PALETTE: [&str; 6] = [
    "#d73027", "#fc8d59", "#fee08b", "#d9ef8b", "#91bfdb", "#4575b4",
];

pub const DEPTH_THRESHOLDS_KM: [f64; 5] = [10.0, 30.0, 70.0, 150.0, 300.0];

/// Colour for events without a usable depth
pub const UNKNOWN_DEPTH_COLOR: &str = "#9e9e9e";

/// Smallest leaf radius in pixels
pub const MIN_POINT_RADIUS: f64 = 4.0;

/// Index of the first band whose lower edge is above `value`
fn band(value: f64, thresholds: &[f64]) -> usize {
    thresholds.iter().take_while(|&&t| value >= t).count()
}

/// Six-band magnitude colour; non-finite values get the lightest band
pub fn color_by_magnitude(magnitude: f64) -> &'static str {
    if !magnitude.is_finite() {
        return MAGNITUDE_PALETTE[0];
    }
    MAGNITUDE_PALETTE[band(magnitude, &MAGNITUDE_THRESHOLDS)]
}

/// Six-band depth colour, plus a neutral colour for unknown depth
pub fn color_by_depth(depth_km: f64) -> &'static str {
    if !depth_km.is_finite() {
        return UNKNOWN_DEPTH_COLOR;
    }
    DEPTH_PALETTE[band(depth_km, &DEPTH_THRESHOLDS_KM)]
}

/// Leaf radius: `max(4, magnitude * 3)`
pub fn size_by_magnitude(magnitude: f64) -> f64 {
    (magnitude * 3.0).max(MIN_POINT_RADIUS)
}

/// Cluster radius grows with member count, clamped to `[12, 40]`
pub fn cluster_radius(count: usize) -> f64 {
    let count = count.min(u32::MAX as usize) as f64;
    (10.0 + count).clamp(12.0, 40.0)
}

/// Colour for an event under the active mode
pub fn event_color(event: &SeismicEvent, mode: ColorMode) -> &'static str {
    match mode {
        ColorMode::ByMagnitude => color_by_magnitude(event.magnitude),
        ColorMode::ByDepth => color_by_depth(event.depth),
    }
}

/// One legend row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: &'static str,
}

fn banded_legend(thresholds: &[f64], palette: &[&'static str], unit: &str) -> Vec<LegendEntry> {
    let mut entries = Vec::with_capacity(palette.len());
    for (i, color) in palette.iter().enumerate() {
        let label = match (i.checked_sub(1).map(|p| thresholds[p]), thresholds.get(i)) {
            (None, Some(hi)) => format!("< {hi}{unit}"),
            (Some(lo), Some(hi)) => format!("{lo}-{hi}{unit}"),
            (Some(lo), None) => format!("{lo}+{unit}"),
            (None, None) => String::new(),
        };
        entries.push(LegendEntry { label, color });
    }
    entries
}

/// Legend rows for magnitude colouring
pub fn magnitude_legend() -> Vec<LegendEntry> {
    banded_legend(&MAGNITUDE_THRESHOLDS, &MAGNITUDE_PALETTE, "")
}

/// Legend rows for depth colouring, ending with the unknown-depth row
pub fn depth_legend() -> Vec<LegendEntry> {
    let mut entries = banded_legend(&DEPTH_THRESHOLDS_KM, &DEPTH_PALETTE, " km");
    entries.push(LegendEntry {
        label: "unknown".to_string(),
        color: UNKNOWN_DEPTH_COLOR,
    });
    entries
}

/// Legend for the active mode
pub fn legend(mode: ColorMode) -> Vec<LegendEntry> {
    match mode {
        ColorMode::ByMagnitude => magnitude_legend(),
        ColorMode::ByDepth => depth_legend(),
    }
}
