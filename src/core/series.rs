//! Data series - a per-metric value buffer with its display color
//!
//! Writers only ever append; the render pass trims the front to the visible
//! width. The two are driven by independent timers, so the buffer is allowed
//! to grow between repaints.

use std::collections::VecDeque;

use super::color::Color;

/// Handle to a series inside its owning graph (index in render order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId(pub(crate) usize);

impl SeriesId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single named series of samples
#[derive(Debug, Clone)]
pub struct DataSeries {
    id: String,
    /// Symbolic theme key, e.g. `"cpu-color"`
    color_key: String,
    /// Concrete color resolved from the theme; `None` when stale
    resolved_color: Option<Color>,
    values: VecDeque<f64>,
    running_max: f64,
}

impl DataSeries {
    pub fn new(id: &str, color_key: &str) -> Self {
        DataSeries {
            id: id.to_string(),
            color_key: color_key.to_string(),
            resolved_color: None,
            values: VecDeque::new(),
            running_max: 0.0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn color_key(&self) -> &str {
        &self.color_key
    }

    /// Change the symbolic color. Only invalidates the cached color when the
    /// key actually changed.
    pub fn set_color_key(&mut self, key: &str) {
        if self.color_key != key {
            self.color_key = key.to_string();
            self.resolved_color = None;
        }
    }

    pub fn resolved_color(&self) -> Option<Color> {
        self.resolved_color
    }

    pub fn set_resolved_color(&mut self, color: Color) {
        self.resolved_color = Some(color);
    }

    pub fn invalidate_color(&mut self) {
        self.resolved_color = None;
    }

    /// Append one sample
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
    }

    pub fn values(&self) -> &VecDeque<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Drop the oldest samples so that at most `keep` remain
    pub fn truncate_front(&mut self, keep: usize) {
        let excess = self.values.len().saturating_sub(keep);
        if excess > 0 {
            self.values.drain(..excess);
        }
    }

    /// Recompute the running max over the retained samples (0 when empty)
    pub fn update_max(&mut self) -> f64 {
        self.running_max = self.values.iter().copied().fold(0.0, f64::max);
        self.running_max
    }

    pub fn running_max(&self) -> f64 {
        self.running_max
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.running_max = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_series_is_empty() {
        let series = DataSeries::new("cpu_0", "cpu-color");
        assert_eq!(series.id(), "cpu_0");
        assert_eq!(series.color_key(), "cpu-color");
        assert!(series.is_empty());
        assert_eq!(series.running_max(), 0.0);
        assert!(series.resolved_color().is_none());
    }

    #[test]
    fn test_truncate_front_keeps_newest_in_order() {
        let mut series = DataSeries::new("s", "c");
        for v in 0..10 {
            series.push(v as f64);
        }
        series.truncate_front(4);
        let kept: Vec<f64> = series.values().iter().copied().collect();
        assert_eq!(kept, vec![6.0, 7.0, 8.0, 9.0]);

        // Truncating to a larger size is a no-op
        series.truncate_front(100);
        assert_eq!(series.len(), 4);
    }

    #[test]
    fn test_update_max_defaults_to_zero() {
        let mut series = DataSeries::new("s", "c");
        assert_eq!(series.update_max(), 0.0);
        series.push(3.0);
        series.push(7.5);
        series.push(1.0);
        assert_eq!(series.update_max(), 7.5);
    }

    #[test]
    fn test_color_key_change_invalidates_cache() {
        let mut series = DataSeries::new("s", "swap-used-color");
        series.set_resolved_color(Color::rgb(1, 2, 3));

        series.set_color_key("swap-used-color");
        assert!(series.resolved_color().is_some());

        series.set_color_key("swap-used-bad-color");
        assert!(series.resolved_color().is_none());
    }
}
