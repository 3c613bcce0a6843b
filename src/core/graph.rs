//! Graph - a set of series sharing one vertical scale
//!
//! Each repaint runs `prepare`, which trims every series to what the view
//! can show, refreshes the shared max (autoscaled graphs only) and produces
//! the scaled `[0, 1]` copies the renderer draws. The scaled copies are
//! derived data and never stored.

use super::color::{Color, ColorResolver, DEFAULT_GRID_COLOR, DEFAULT_SERIES_COLOR};
use super::series::{DataSeries, SeriesId};
use super::units::format_metric_pretty;

/// Below this max nothing is drawn (avoids dividing by ~0)
pub const MAX_EPSILON: f64 = 1e-5;

/// Samples retained by the compact bar graph
pub const BAR_GRAPH_SAMPLES: usize = 3;

/// Theme key of the grid lines
pub const GRID_COLOR_KEY: &str = "grid-color";

/// How many samples a graph keeps per series on each render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// One sample per pixel column plus one (line graph)
    PixelWidth,
    /// A fixed number of samples regardless of width (bar graph)
    Fixed(usize),
}

impl Retention {
    pub fn keep(self, pixel_width: usize) -> usize {
        match self {
            Retention::PixelWidth => pixel_width + 1,
            Retention::Fixed(n) => n,
        }
    }
}

/// Graph construction options
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOptions {
    pub autoscale: bool,
    /// Fixed max used when `autoscale` is off
    pub max: f64,
    pub units: String,
    pub show_max: bool,
    pub retention: Retention,
}

impl Default for GraphOptions {
    fn default() -> Self {
        GraphOptions {
            autoscale: true,
            max: 0.0,
            units: String::new(),
            show_max: true,
            retention: Retention::PixelWidth,
        }
    }
}

impl GraphOptions {
    /// Options of a compact bar graph: values are already normalized
    pub fn bars() -> Self {
        GraphOptions {
            autoscale: false,
            max: 1.0,
            units: String::new(),
            show_max: false,
            retention: Retention::Fixed(BAR_GRAPH_SAMPLES),
        }
    }
}

/// A series ready to be drawn
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledSeries {
    pub values: Vec<f64>,
    pub color: Color,
}

/// A graph owning its series in render order
#[derive(Debug, Clone)]
pub struct Graph {
    series: Vec<DataSeries>,
    max: f64,
    options: GraphOptions,
    grid_color: Option<Color>,
    max_label: Option<String>,
    max_label_dirty: bool,
}

impl Graph {
    pub fn new(options: GraphOptions) -> Self {
        let mut graph = Graph {
            series: Vec::new(),
            max: -1.0,
            options,
            grid_color: None,
            max_label: None,
            max_label_dirty: false,
        };

        if !graph.options.autoscale {
            graph.max = graph.options.max;
            graph.update_max_label();
        }

        graph
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Register a series with an empty buffer. Must happen before the first
    /// data point for it is added.
    pub fn add_data_set(&mut self, id: &str, color_key: &str) -> SeriesId {
        self.series.push(DataSeries::new(id, color_key));
        SeriesId(self.series.len() - 1)
    }

    /// Append one sample to a series
    pub fn add_data_point(&mut self, id: SeriesId, value: f64) {
        if let Some(series) = self.series.get_mut(id.0) {
            series.push(value);
        }
    }

    pub fn find(&self, id: &str) -> Option<SeriesId> {
        self.series.iter().position(|s| s.id() == id).map(SeriesId)
    }

    pub fn series(&self, id: SeriesId) -> Option<&DataSeries> {
        self.series.get(id.0)
    }

    pub fn series_mut(&mut self, id: SeriesId) -> Option<&mut DataSeries> {
        self.series.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataSeries> {
        self.series.iter()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Current shared max (-1 before the first autoscale pass)
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_autoscale(&self) -> bool {
        self.options.autoscale
    }

    /// Pin a fixed-scale graph to a new max. Ignored for autoscaled graphs.
    pub fn set_fixed_max(&mut self, max: f64) {
        if self.options.autoscale {
            return;
        }
        self.options.max = max;
        if self.max != max {
            self.max = max;
            self.update_max_label();
        }
    }

    /// Change the symbolic color of a series
    pub fn set_color_key(&mut self, id: SeriesId, key: &str) {
        if let Some(series) = self.series.get_mut(id.0) {
            series.set_color_key(key);
        }
    }

    /// Drop every cached color; the next draw re-resolves them
    pub fn invalidate_colors(&mut self) {
        self.grid_color = None;
        for series in &mut self.series {
            series.invalidate_color();
        }
    }

    /// Resolve the colors that are not cached yet
    pub fn resolve_colors(&mut self, resolver: &dyn ColorResolver) {
        if self.grid_color.is_none() {
            self.grid_color = Some(resolver.resolve(GRID_COLOR_KEY).unwrap_or(DEFAULT_GRID_COLOR));
        }
        for series in &mut self.series {
            if series.resolved_color().is_none() {
                let color = resolver
                    .resolve(series.color_key())
                    .unwrap_or(DEFAULT_SERIES_COLOR);
                series.set_resolved_color(color);
            }
        }
    }

    pub fn grid_color(&self) -> Color {
        self.grid_color.unwrap_or(DEFAULT_GRID_COLOR)
    }

    /// Trim, autoscale and scale every series for a view `pixel_width` wide.
    ///
    /// Returns `None` when the max is too small to divide by; the caller
    /// then skips drawing the series entirely.
    pub fn prepare(&mut self, pixel_width: usize) -> Option<Vec<ScaledSeries>> {
        let keep = self.options.retention.keep(pixel_width);

        for series in &mut self.series {
            series.truncate_front(keep);
            if self.options.autoscale {
                series.update_max();
            }
        }

        if self.options.autoscale {
            // Fold over every series, not just the last one in render order
            let max = self
                .series
                .iter()
                .map(DataSeries::running_max)
                .fold(0.0, f64::max);
            if max != self.max {
                self.max = max;
                self.update_max_label();
            }
        }

        if self.max <= MAX_EPSILON {
            return None;
        }

        let max = self.max;
        Some(
            self.series
                .iter()
                .map(|series| ScaledSeries {
                    values: series.values().iter().map(|v| v / max).collect(),
                    color: series.resolved_color().unwrap_or(DEFAULT_SERIES_COLOR),
                })
                .collect(),
        )
    }

    /// Text of the max overlay label, if the graph shows one
    pub fn max_label(&self) -> Option<&str> {
        self.max_label.as_deref()
    }

    /// The max label when it changed since the last call
    pub fn take_max_label_change(&mut self) -> Option<&str> {
        if self.max_label_dirty {
            self.max_label_dirty = false;
            self.max_label.as_deref()
        } else {
            None
        }
    }

    fn update_max_label(&mut self) {
        if self.options.show_max {
            self.max_label = Some(format_metric_pretty(self.max, &self.options.units));
            self.max_label_dirty = true;
        }
    }

    /// Drop every sample
    pub fn clear(&mut self) {
        for series in &mut self.series {
            series.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, Color>);

    impl ColorResolver for MapResolver {
        fn resolve(&self, key: &str) -> Option<Color> {
            self.0.get(key).copied()
        }
    }

    fn autoscaled() -> Graph {
        Graph::new(GraphOptions {
            units: "b/s".to_string(),
            ..GraphOptions::default()
        })
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_fixed_graph_sets_max_and_label_at_construction() {
        let mut graph = Graph::new(GraphOptions {
            autoscale: false,
            max: 2048.0,
            units: "B".to_string(),
            ..GraphOptions::default()
        });
        assert_eq!(graph.max(), 2048.0);
        assert_eq!(graph.take_max_label_change(), Some("2.00 KiB"));
        assert_eq!(graph.take_max_label_change(), None);
    }

    #[test]
    fn test_hidden_max_label() {
        let graph = Graph::new(GraphOptions {
            autoscale: false,
            max: 100.0,
            units: "%".to_string(),
            show_max: false,
            ..GraphOptions::default()
        });
        assert_eq!(graph.max_label(), None);
    }

    #[test]
    fn test_add_data_set_returns_render_order_ids() {
        let mut graph = autoscaled();
        let a = graph.add_data_set("in", "network-in-color");
        let b = graph.add_data_set("out", "network-out-color");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(graph.find("out"), Some(b));
        assert_eq!(graph.find("missing"), None);
    }

    // ==================== Autoscale Tests ====================

    #[test]
    fn test_autoscale_folds_over_all_series() {
        let mut graph = autoscaled();
        let a = graph.add_data_set("in", "c");
        let b = graph.add_data_set("out", "c");
        graph.add_data_point(a, 10.0);
        graph.add_data_point(a, 40.0);
        graph.add_data_point(b, 5.0);

        let scaled = graph.prepare(100).expect("max above epsilon");
        // The last series alone would give 5; the fold must give 40
        assert_eq!(graph.max(), 40.0);
        assert_eq!(scaled[0].values, vec![0.25, 1.0]);
        assert_eq!(scaled[1].values, vec![0.125]);
    }

    #[test]
    fn test_autoscale_max_shrinks_after_truncation() {
        let mut graph = autoscaled();
        let a = graph.add_data_set("in", "c");
        graph.add_data_point(a, 100.0);
        for _ in 0..5 {
            graph.add_data_point(a, 2.0);
        }
        graph.prepare(10);
        assert_eq!(graph.max(), 100.0);

        // Width 2 keeps 3 samples, the spike falls out of the window
        graph.prepare(2);
        assert_eq!(graph.max(), 2.0);
        assert_eq!(graph.max_label(), Some("2.00 b/s"));
    }

    #[test]
    fn test_max_label_changes_immediately_on_growth() {
        let mut graph = autoscaled();
        let a = graph.add_data_set("in", "c");
        graph.add_data_point(a, 4096.0);
        graph.prepare(10);
        assert_eq!(graph.take_max_label_change(), Some("4.00 Kib/s"));

        graph.add_data_point(a, 1024.0);
        graph.prepare(10);
        assert_eq!(graph.take_max_label_change(), None);
    }

    #[test]
    fn test_empty_autoscaled_graph_skips_render() {
        let mut graph = autoscaled();
        graph.add_data_set("in", "c");
        assert!(graph.prepare(50).is_none());
        assert_eq!(graph.max(), 0.0);
    }

    #[test]
    fn test_near_zero_max_skips_render() {
        let mut graph = autoscaled();
        let a = graph.add_data_set("in", "c");
        graph.add_data_point(a, 1e-7);
        assert!(graph.prepare(50).is_none());
    }

    #[test]
    fn test_fixed_max_is_never_recomputed() {
        let mut graph = Graph::new(GraphOptions {
            autoscale: false,
            max: 100.0,
            ..GraphOptions::default()
        });
        let a = graph.add_data_set("cpu", "c");
        graph.add_data_point(a, 50.0);
        graph.add_data_point(a, 25.0);
        let scaled = graph.prepare(10).expect("fixed max");
        assert_eq!(graph.max(), 100.0);
        assert_eq!(scaled[0].values, vec![0.5, 0.25]);
    }

    #[test]
    fn test_set_fixed_max_ignored_when_autoscaling() {
        let mut graph = autoscaled();
        graph.set_fixed_max(10.0);
        assert_eq!(graph.max(), -1.0);
    }

    // ==================== Retention Tests ====================

    #[test]
    fn test_bar_graph_keeps_three_samples() {
        let mut graph = Graph::new(GraphOptions::bars());
        let a = graph.add_data_set("cpu_0", "cpu-color");
        graph.add_data_point(a, 0.1);
        graph.prepare(1000);
        assert_eq!(graph.series(a).map(DataSeries::len), Some(1));

        for v in [0.2, 0.3, 0.4, 0.5] {
            graph.add_data_point(a, v);
        }
        let scaled = graph.prepare(1000).expect("bars use max 1");
        assert_eq!(scaled[0].values, vec![0.3, 0.4, 0.5]);
    }

    // ==================== Color Tests ====================

    #[test]
    fn test_resolve_colors_falls_back_to_default() {
        let mut graph = autoscaled();
        let a = graph.add_data_set("in", "network-in-color");
        let b = graph.add_data_set("out", "unknown-key");
        let resolver = MapResolver(HashMap::from([
            ("network-in-color", Color::rgb(1, 2, 3)),
            ("grid-color", Color::rgb(9, 9, 9)),
        ]));

        graph.resolve_colors(&resolver);
        assert_eq!(graph.series(a).and_then(|s| s.resolved_color()), Some(Color::rgb(1, 2, 3)));
        assert_eq!(graph.series(b).and_then(|s| s.resolved_color()), Some(DEFAULT_SERIES_COLOR));
        assert_eq!(graph.grid_color(), Color::rgb(9, 9, 9));
    }

    #[test]
    fn test_resolve_colors_keeps_cache_until_invalidated() {
        let mut graph = autoscaled();
        let a = graph.add_data_set("in", "k");
        graph.resolve_colors(&MapResolver(HashMap::from([("k", Color::rgb(1, 1, 1))])));

        // A new theme is not consulted while the cache is valid
        let other = MapResolver(HashMap::from([("k", Color::rgb(2, 2, 2))]));
        graph.resolve_colors(&other);
        assert_eq!(graph.series(a).and_then(|s| s.resolved_color()), Some(Color::rgb(1, 1, 1)));

        graph.invalidate_colors();
        graph.resolve_colors(&other);
        assert_eq!(graph.series(a).and_then(|s| s.resolved_color()), Some(Color::rgb(2, 2, 2)));
    }

    // ==================== Property Tests ====================

    proptest! {
        #[test]
        fn prop_truncation_keeps_newest_samples(
            samples in proptest::collection::vec(0.0f64..1e9, 0..300),
            width in 0usize..200,
        ) {
            let mut graph = autoscaled();
            let a = graph.add_data_set("s", "c");
            for v in &samples {
                graph.add_data_point(a, *v);
            }
            graph.prepare(width);

            let kept: Vec<f64> = graph.series(a).unwrap().values().iter().copied().collect();
            prop_assert!(kept.len() <= width + 1);
            let start = samples.len() - kept.len();
            prop_assert_eq!(&kept[..], &samples[start..]);
        }

        #[test]
        fn prop_autoscaled_values_are_normalized(
            first in proptest::collection::vec(0.0f64..1e6, 1..100),
            second in proptest::collection::vec(0.0f64..1e6, 1..100),
            width in 1usize..150,
        ) {
            let mut graph = autoscaled();
            let a = graph.add_data_set("a", "c");
            let b = graph.add_data_set("b", "c");
            for v in &first {
                graph.add_data_point(a, *v);
            }
            for v in &second {
                graph.add_data_point(b, *v);
            }

            let scaled = graph.prepare(width);
            let retained_max = graph
                .iter()
                .flat_map(|s| s.values().iter().copied())
                .fold(0.0, f64::max);
            prop_assert_eq!(graph.max(), retained_max);

            match scaled {
                Some(scaled) => {
                    for (series, raw) in scaled.iter().zip(graph.iter()) {
                        for (s, r) in series.values.iter().zip(raw.values()) {
                            prop_assert!((0.0..=1.0).contains(s));
                            prop_assert_eq!(*s, r / retained_max);
                        }
                    }
                }
                None => prop_assert!(retained_max <= MAX_EPSILON),
            }
        }
    }
}
