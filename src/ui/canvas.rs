//! Render surface abstraction
//!
//! The renderers only ever emit path and paint primitives through `Canvas`
//! and text through `LabelSink`. `RecordingCanvas` keeps every primitive so
//! a host (or a test) can replay or inspect a frame.

use std::collections::BTreeMap;

use crate::core::Color;

/// Cairo-like immediate-mode drawing context
pub trait Canvas {
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn close_path(&mut self);
    fn set_source_color(&mut self, color: Color);
    fn set_line_width(&mut self, width: f64);
    /// An empty pattern means a solid line
    fn set_dash(&mut self, dashes: &[f64], offset: f64);
    fn fill(&mut self);
    fn stroke(&mut self);
}

/// A surface the renderer can draw on
pub trait DrawingArea {
    /// Size in device pixels
    fn surface_size(&self) -> (usize, usize);

    /// Drawing context, or `None` when there is no valid surface yet
    fn context(&mut self) -> Option<&mut dyn Canvas>;
}

/// Receiver of overlay and readout text
pub trait LabelSink {
    fn set_text(&mut self, label: &str, text: &str);
}

/// One recorded drawing operation
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    ClosePath,
    SetSourceColor(Color),
    SetLineWidth(f64),
    SetDash(Vec<f64>, f64),
    Fill,
    Stroke,
}

/// Canvas that records primitives instead of rasterizing them
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    primitives: Vec<Primitive>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        RecordingCanvas::default()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    /// Hand the recorded frame over, leaving the canvas empty
    pub fn take(&mut self) -> Vec<Primitive> {
        std::mem::take(&mut self.primitives)
    }

    pub fn fill_count(&self) -> usize {
        self.count(|p| matches!(p, Primitive::Fill))
    }

    pub fn stroke_count(&self) -> usize {
        self.count(|p| matches!(p, Primitive::Stroke))
    }

    pub fn count(&self, pred: impl Fn(&Primitive) -> bool) -> usize {
        self.primitives.iter().filter(|p| pred(p)).count()
    }
}

impl Canvas for RecordingCanvas {
    fn move_to(&mut self, x: f64, y: f64) {
        self.primitives.push(Primitive::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.primitives.push(Primitive::LineTo(x, y));
    }

    fn close_path(&mut self) {
        self.primitives.push(Primitive::ClosePath);
    }

    fn set_source_color(&mut self, color: Color) {
        self.primitives.push(Primitive::SetSourceColor(color));
    }

    fn set_line_width(&mut self, width: f64) {
        self.primitives.push(Primitive::SetLineWidth(width));
    }

    fn set_dash(&mut self, dashes: &[f64], offset: f64) {
        self.primitives
            .push(Primitive::SetDash(dashes.to_vec(), offset));
    }

    fn fill(&mut self) {
        self.primitives.push(Primitive::Fill);
    }

    fn stroke(&mut self) {
        self.primitives.push(Primitive::Stroke);
    }
}

/// Drawing area backed by a `RecordingCanvas`
#[derive(Debug, Clone)]
pub struct RecordingArea {
    width: usize,
    height: usize,
    has_surface: bool,
    canvas: RecordingCanvas,
}

impl RecordingArea {
    pub fn new(width: usize, height: usize) -> Self {
        RecordingArea {
            width,
            height,
            has_surface: true,
            canvas: RecordingCanvas::new(),
        }
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Simulate a surface that is not realized yet
    pub fn set_has_surface(&mut self, has_surface: bool) {
        self.has_surface = has_surface;
    }

    pub fn canvas(&self) -> &RecordingCanvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut RecordingCanvas {
        &mut self.canvas
    }
}

impl DrawingArea for RecordingArea {
    fn surface_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn context(&mut self) -> Option<&mut dyn Canvas> {
        if self.has_surface {
            Some(&mut self.canvas)
        } else {
            None
        }
    }
}

/// Label sink remembering the latest text of every label
#[derive(Debug, Clone, Default)]
pub struct RecordingLabels {
    labels: BTreeMap<String, String>,
    updates: usize,
}

impl RecordingLabels {
    pub fn new() -> Self {
        RecordingLabels::default()
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.labels.get(label).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of `set_text` calls received
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl LabelSink for RecordingLabels {
    fn set_text(&mut self, label: &str, text: &str) {
        self.updates += 1;
        self.labels.insert(label.to_string(), text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_canvas_keeps_order() {
        let mut canvas = RecordingCanvas::new();
        canvas.move_to(0.0, 1.0);
        canvas.line_to(2.0, 3.0);
        canvas.set_dash(&[2.0, 1.0], 0.0);
        canvas.stroke();

        assert_eq!(
            canvas.primitives(),
            &[
                Primitive::MoveTo(0.0, 1.0),
                Primitive::LineTo(2.0, 3.0),
                Primitive::SetDash(vec![2.0, 1.0], 0.0),
                Primitive::Stroke,
            ]
        );
        assert_eq!(canvas.stroke_count(), 1);
        assert_eq!(canvas.take().len(), 4);
        assert!(canvas.primitives().is_empty());
    }

    #[test]
    fn test_area_without_surface_has_no_context() {
        let mut area = RecordingArea::new(10, 5);
        assert!(area.context().is_some());
        area.set_has_surface(false);
        assert!(area.context().is_none());
        assert_eq!(area.surface_size(), (10, 5));
    }

    #[test]
    fn test_recording_labels() {
        let mut labels = RecordingLabels::new();
        labels.set_text("cpu.max", "1");
        labels.set_text("cpu.max", "2");
        assert_eq!(labels.get("cpu.max"), Some("2"));
        assert_eq!(labels.updates(), 2);
        assert_eq!(labels.get("missing"), None);
    }
}
