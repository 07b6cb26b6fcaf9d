//! Viewport clustering pipeline
//!
//! Turns a filtered event list plus the current viewport into render nodes:
//! - Points inside the viewport are projected to world pixels at the zoom
//! - Points within the pixel radius of a seed point merge into a cluster
//! - Isolated points, and every point at high zoom, stay leaves
//! - With clustering disabled, every event becomes a detailed leaf

use std::collections::HashMap;

use chrono::DateTime;
use serde::Serialize;
use tracing::debug;

use quake_core::{
    ColorMode, FilterConfig, SeismicEvent, DEFAULT_CLUSTER_RADIUS_PX, DEFAULT_MAX_CLUSTER_ZOOM,
};

use crate::{
    cluster_radius, event_color, project, size_by_magnitude, unproject, LngLat, PixelPoint,
    Viewport, TILE_SIZE,
};

/// Zoom levels gained when a cluster is selected
pub const CLUSTER_ZOOM_STEP: f64 = 2.0;

/// Clustering policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
    /// Merge radius in screen pixels
    pub radius_px: f64,
    /// Zoom at and above which nothing is clustered
    pub max_cluster_zoom: f64,
    pub tile_size: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            radius_px: DEFAULT_CLUSTER_RADIUS_PX,
            max_cluster_zoom: DEFAULT_MAX_CLUSTER_ZOOM,
            tile_size: TILE_SIZE,
        }
    }
}

/// Aggregate of several nearby events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterNode {
    /// Stable id derived from the seed event
    pub id: String,
    /// Mean member position
    pub center: LngLat,
    pub count: usize,
    /// Render radius in pixels
    pub radius: f64,
    pub member_ids: Vec<String>,
}

/// Popup content for a leaf rendered without clustering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupDetail {
    pub place: String,
    pub depth: String,
    pub time: String,
    pub source_url: String,
}

impl PopupDetail {
    pub fn from_event(event: &SeismicEvent) -> Self {
        Self {
            place: event.place.clone(),
            depth: format_depth(event.depth),
            time: format_time(event.time),
            source_url: event.source_url.clone(),
        }
    }
}

/// A single event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafNode {
    pub id: String,
    pub position: LngLat,
    pub magnitude: f64,
    pub color: &'static str,
    pub radius: f64,
    /// Present only on the unclustered path
    pub detail: Option<PopupDetail>,
}

impl LeafNode {
    fn from_event(event: &SeismicEvent, mode: ColorMode, detailed: bool) -> Self {
        Self {
            id: event.id.clone(),
            position: LngLat::new(event.longitude, event.latitude),
            magnitude: event.magnitude,
            color: event_color(event, mode),
            radius: size_by_magnitude(event.magnitude),
            detail: detailed.then(|| PopupDetail::from_event(event)),
        }
    }
}

/// One renderable map primitive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderNode {
    Cluster(ClusterNode),
    Leaf(LeafNode),
}

impl RenderNode {
    /// Number of events this node stands for
    pub fn weight(&self) -> usize {
        match self {
            RenderNode::Cluster(c) => c.count,
            RenderNode::Leaf(_) => 1,
        }
    }

    pub fn as_cluster(&self) -> Option<&ClusterNode> {
        match self {
            RenderNode::Cluster(c) => Some(c),
            RenderNode::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            RenderNode::Leaf(l) => Some(l),
            RenderNode::Cluster(_) => None,
        }
    }
}

/// Request for the renderer to move the view
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecenterIntent {
    pub center: LngLat,
    pub zoom: f64,
}

/// The clustering pipeline
#[derive(Debug, Clone, Default)]
pub struct ClusterPipeline {
    config: ClusterConfig,
}

impl ClusterPipeline {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Render nodes for the current filters and viewport
    pub fn render(
        &self,
        events: &[SeismicEvent],
        viewport: &Viewport,
        filters: &FilterConfig,
    ) -> Vec<RenderNode> {
        if filters.clustering_enabled {
            self.cluster(events, viewport, filters.color_mode)
        } else {
            self.detailed_leaves(events, filters.color_mode)
        }
    }

    /// One detailed leaf per event, no grouping and no viewport culling
    pub fn detailed_leaves(&self, events: &[SeismicEvent], mode: ColorMode) -> Vec<RenderNode> {
        events
            .iter()
            .map(|e| RenderNode::Leaf(LeafNode::from_event(e, mode, true)))
            .collect()
    }

    /// Group visible events into clusters and reduced-detail leaves
    pub fn cluster(
        &self,
        events: &[SeismicEvent],
        viewport: &Viewport,
        mode: ColorMode,
    ) -> Vec<RenderNode> {
        let visible: Vec<&SeismicEvent> = events
            .iter()
            .filter(|e| e.has_valid_position())
            .filter(|e| viewport.bounds.contains(LngLat::new(e.longitude, e.latitude)))
            .collect();

        if viewport.zoom >= self.config.max_cluster_zoom || self.config.radius_px <= 0.0 {
            return visible
                .into_iter()
                .map(|e| RenderNode::Leaf(LeafNode::from_event(e, mode, false)))
                .collect();
        }

        let zoom = viewport.zoom;
        let tile_size = self.config.tile_size;
        let radius = self.config.radius_px;
        let radius_sq = radius * radius;

        // Across the antimeridian, continue longitudes east of 180 so both
        // sides of the seam stay adjacent in pixel space
        let seam_west = viewport
            .bounds
            .crosses_antimeridian()
            .then_some(viewport.bounds.west);
        let points: Vec<PixelPoint> = visible
            .iter()
            .map(|e| {
                let longitude = match seam_west {
                    Some(west) if e.longitude < west => e.longitude + 360.0,
                    _ => e.longitude,
                };
                project(LngLat::new(longitude, e.latitude), zoom, tile_size)
            })
            .collect();

        let cell_of = |p: &PixelPoint| {
            (
                (p.x / radius).floor() as i64,
                (p.y / radius).floor() as i64,
            )
        };
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            grid.entry(cell_of(p)).or_default().push(i);
        }

        let mut assigned = vec![false; points.len()];
        let mut nodes = Vec::new();

        for seed in 0..points.len() {
            if assigned[seed] {
                continue;
            }
            let (cx, cy) = cell_of(&points[seed]);

            let mut members = Vec::new();
            for gx in cx - 1..=cx + 1 {
                for gy in cy - 1..=cy + 1 {
                    let Some(cell) = grid.get(&(gx, gy)) else {
                        continue;
                    };
                    members.extend(cell.iter().copied().filter(|&j| {
                        !assigned[j] && points[seed].distance_squared(&points[j]) <= radius_sq
                    }));
                }
            }
            members.sort_unstable();

            if members.len() <= 1 {
                assigned[seed] = true;
                let leaf = LeafNode::from_event(visible[seed], mode, false);
                nodes.push(RenderNode::Leaf(leaf));
                continue;
            }

            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for &j in &members {
                assigned[j] = true;
                sum_x += points[j].x;
                sum_y += points[j].y;
            }
            let n = members.len() as f64;
            let mut center = unproject(
                PixelPoint {
                    x: sum_x / n,
                    y: sum_y / n,
                },
                zoom,
                tile_size,
            );
            if center.longitude > 180.0 {
                center.longitude -= 360.0;
            }

            nodes.push(RenderNode::Cluster(ClusterNode {
                id: format!("cluster-{}", visible[seed].id),
                center,
                count: members.len(),
                radius: cluster_radius(members.len()),
                member_ids: members.iter().map(|&j| visible[j].id.clone()).collect(),
            }));
        }

        debug!(
            "Clustered {} visible events into {} nodes at zoom {:.1}",
            visible.len(),
            nodes.len(),
            zoom
        );
        nodes
    }

    /// Selecting a cluster zooms in on it instead of expanding it in place
    pub fn select_cluster(&self, cluster: &ClusterNode, current_zoom: f64) -> RecenterIntent {
        RecenterIntent {
            center: cluster.center,
            zoom: (current_zoom + CLUSTER_ZOOM_STEP).min(self.config.max_cluster_zoom),
        }
    }
}

fn format_depth(depth_km: f64) -> String {
    if depth_km.is_finite() {
        format!("{depth_km:.1} km")
    } else {
        "unknown".to_string()
    }
}

fn format_time(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bounds, MAGNITUDE_PALETTE};

    fn quake(id: &str, lon: f64, lat: f64, mag: f64) -> SeismicEvent {
        SeismicEvent::new(id, lat, lon).with_magnitude(mag)
    }

    fn world(zoom: f64) -> Viewport {
        Viewport::world(zoom).unwrap()
    }

    #[test]
    fn test_nearby_points_cluster_at_low_zoom() {
        let events = vec![
            quake("a", -122.40, 37.70, 2.0),
            quake("b", -122.41, 37.71, 3.0),
            quake("c", -122.42, 37.72, 4.0),
            quake("far", 140.0, 35.0, 5.0),
        ];
        let pipeline = ClusterPipeline::default();
        let nodes = pipeline.cluster(&events, &world(3.0), ColorMode::ByMagnitude);

        assert_eq!(nodes.len(), 2);
        let cluster = nodes[0].as_cluster().unwrap();
        assert_eq!(cluster.count, 3);
        assert_eq!(cluster.member_ids, vec!["a", "b", "c"]);
        assert_eq!(cluster.radius, 13.0);
        assert_eq!(cluster.id, "cluster-a");
        assert!((cluster.center.longitude - -122.41).abs() < 1e-6);

        let leaf = nodes[1].as_leaf().unwrap();
        assert_eq!(leaf.id, "far");
        assert!(leaf.detail.is_none());

        let total: usize = nodes.iter().map(RenderNode::weight).sum();
        assert_eq!(total, events.len());
    }

    #[test]
    fn test_no_clustering_at_max_zoom() {
        let events = vec![quake("a", 10.0, 10.0, 1.0), quake("b", 10.0, 10.0, 1.0)];
        let pipeline = ClusterPipeline::default();

        let nodes = pipeline.cluster(&events, &world(16.0), ColorMode::ByMagnitude);
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.as_leaf().is_some()));

        let nodes = pipeline.cluster(&events, &world(15.0), ColorMode::ByMagnitude);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].weight(), 2);
    }

    #[test]
    fn test_points_apart_stay_leaves() {
        // ~0.5 degrees apart is far more than 60 px at zoom 10
        let events = vec![quake("a", 0.0, 0.0, 1.0), quake("b", 0.5, 0.0, 1.0)];
        let pipeline = ClusterPipeline::default();
        let nodes = pipeline.cluster(&events, &world(10.0), ColorMode::ByMagnitude);
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.as_leaf().is_some()));
    }

    #[test]
    fn test_viewport_culls_points() {
        let events = vec![quake("in", 5.0, 5.0, 1.0), quake("out", 50.0, 5.0, 1.0)];
        let viewport = Viewport::new(Bounds::new(0.0, 0.0, 10.0, 10.0).unwrap(), 12.0).unwrap();
        let pipeline = ClusterPipeline::default();
        let nodes = pipeline.cluster(&events, &viewport, ColorMode::ByMagnitude);

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].as_leaf().unwrap().id, "in");
    }

    #[test]
    fn test_clustering_disabled_emits_detailed_leaves() {
        let events = vec![
            quake("a", 10.0, 10.0, 6.2)
                .with_depth(12.34)
                .with_place("Offshore")
                .with_time(0)
                .with_source_url("https://example.test/a"),
            quake("b", 10.0, 10.0, 1.0),
        ];
        let filters = FilterConfig {
            clustering_enabled: false,
            ..Default::default()
        };
        let nodes = ClusterPipeline::default().render(&events, &world(2.0), &filters);

        assert_eq!(nodes.len(), 2);
        let leaf = nodes[0].as_leaf().unwrap();
        assert_eq!(leaf.color, MAGNITUDE_PALETTE[5]);
        assert_eq!(leaf.radius, 6.2 * 3.0);

        let detail = leaf.detail.as_ref().unwrap();
        assert_eq!(detail.place, "Offshore");
        assert_eq!(detail.depth, "12.3 km");
        assert_eq!(detail.time, "1970-01-01 00:00:00 UTC");
        assert_eq!(detail.source_url, "https://example.test/a");

        let other = nodes[1].as_leaf().unwrap().detail.as_ref().unwrap();
        assert_eq!(other.depth, "unknown");
    }

    #[test]
    fn test_select_cluster_recenters_and_caps_zoom() {
        let pipeline = ClusterPipeline::default();
        let cluster = ClusterNode {
            id: "cluster-a".to_string(),
            center: LngLat::new(12.5, 41.9),
            count: 4,
            radius: cluster_radius(4),
            member_ids: vec![],
        };

        let intent = pipeline.select_cluster(&cluster, 5.0);
        assert_eq!(intent.zoom, 7.0);
        assert_eq!(intent.center, cluster.center);

        assert_eq!(pipeline.select_cluster(&cluster, 15.0).zoom, 16.0);
        assert_eq!(pipeline.select_cluster(&cluster, 16.0).zoom, 16.0);
        assert_eq!(pipeline.select_cluster(&cluster, 20.0).zoom, 16.0);
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let events: Vec<_> = (0..50)
            .map(|i| quake(&format!("q{i}"), (i % 7) as f64 * 0.3, (i / 7) as f64 * 0.3, 2.0))
            .collect();
        let pipeline = ClusterPipeline::default();
        let a = pipeline.cluster(&events, &world(5.0), ColorMode::ByDepth);
        let b = pipeline.cluster(&events, &world(5.0), ColorMode::ByDepth);
        assert_eq!(a, b);

        let total: usize = a.iter().map(RenderNode::weight).sum();
        assert_eq!(total, events.len());
    }

    #[test]
    fn test_clusters_across_antimeridian() {
        let events = vec![
            quake("east", 179.9, 0.0, 2.0),
            quake("west", -179.9, 0.1, 3.0),
            quake("mid", 0.0, 0.0, 4.0),
        ];
        let bounds = Bounds::new(170.0, -20.0, -170.0, 20.0).unwrap();
        let viewport = Viewport::new(bounds, 3.0).unwrap();

        let nodes = ClusterPipeline::default().cluster(&events, &viewport, ColorMode::ByMagnitude);
        assert_eq!(nodes.len(), 1);
        let cluster = nodes[0].as_cluster().unwrap();
        assert_eq!(cluster.member_ids, vec!["east", "west"]);
        assert!(cluster.center.longitude.abs() > 179.0);
        assert!(cluster.center.longitude <= 180.0);
        assert!(bounds.contains(cluster.center));
    }
}
