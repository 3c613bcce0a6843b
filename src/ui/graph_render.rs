//! Graph rendering
//!
//! Turns scaled series into canvas primitives. Two forms exist:
//! - the line graph of the popup, one sample per pixel column
//! - the compact bar graph of the panel, one bar per series

use bitflags::bitflags;

use super::canvas::Canvas;
use crate::core::{Color, ScaledSeries};

/// Opacity of the area under the first popup series
const LINE_FILL_ALPHA: f64 = 0.2;

/// Opacity of the minor popup grid lines
const MINOR_GRID_ALPHA: f64 = 0.2;

/// Opacity of a compact bar body; its top edge is opaque
const BAR_FILL_ALPHA: f64 = 0.8;

const GRID_DASH: [f64; 2] = [2.0, 1.0];

bitflags! {
    /// Host-reported state of the actor a graph lives in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ViewState: u8 {
        const MAPPED   = 0b0001;
        const VISIBLE  = 0b0010;
        /// Attached to a stage
        const ON_STAGE = 0b0100;
        /// The desktop overview covers the panel
        const OVERVIEW = 0b1000;
    }
}

impl ViewState {
    /// A normal, visible panel
    pub fn shown() -> Self {
        ViewState::MAPPED | ViewState::VISIBLE | ViewState::ON_STAGE
    }

    /// Liveness check run before every draw
    pub fn can_draw(self) -> bool {
        self.contains(Self::shown()) && !self.contains(ViewState::OVERVIEW)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::shown()
    }
}

/// Size and spacing of the compact indicator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompactLayout {
    pub bar_width: f64,
    pub bar_padding: f64,
    /// Width requested for the whole indicator
    pub width: f64,
}

impl CompactLayout {
    /// Layout of `series` bars, in device pixels
    pub fn for_series(series: usize, bar_width: f64, bar_padding: f64, scale_factor: f64) -> Self {
        let bar_width = bar_width * scale_factor;
        let bar_padding = bar_padding * scale_factor;
        CompactLayout {
            bar_width,
            bar_padding,
            width: series as f64 * (bar_width + bar_padding) + bar_padding * 2.0 - 1.0,
        }
    }

    pub fn bar_outer_width(&self) -> f64 {
        self.bar_width + self.bar_padding
    }
}

/// Geometry of one repaint; recomputed every time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderGeometry {
    pub width: f64,
    pub height: f64,
    pub grid_lines: usize,
    pub layout: Option<CompactLayout>,
}

impl RenderGeometry {
    pub fn popup(width: usize, height: usize, grid_lines: usize) -> Self {
        RenderGeometry {
            width: width as f64,
            height: height as f64,
            grid_lines,
            layout: None,
        }
    }

    pub fn compact(width: usize, height: usize, grid_lines: usize, layout: CompactLayout) -> Self {
        RenderGeometry {
            width: width as f64,
            height: height as f64,
            grid_lines,
            layout: Some(layout),
        }
    }

    /// Spacing of the major popup grid lines
    pub fn popup_grid_offset(&self) -> f64 {
        (self.height / (self.grid_lines + 1) as f64).floor()
    }

    /// Spacing of the compact grid lines
    pub fn compact_grid_offset(&self) -> f64 {
        (self.height / (self.grid_lines + 2) as f64).floor()
    }
}

fn draw_grid_lines(cr: &mut dyn Canvas, width: f64, offset: f64, count: usize, color: Color) {
    for i in 1..=count {
        let y = i as f64 * offset + 0.5;
        cr.move_to(0.0, y);
        cr.line_to(width, y);
    }
    cr.set_source_color(color);
    cr.set_line_width(1.0);
    cr.set_dash(&GRID_DASH, 0.0);
    cr.stroke();
}

fn plot_data_set(cr: &mut dyn Canvas, height: f64, values: &[f64]) {
    let first = values.first().copied().unwrap_or(0.0);
    cr.move_to(0.0, (1.0 - first) * height);
    for (x, value) in values.iter().enumerate().skip(1) {
        cr.line_to(x as f64, (1.0 - value) * height);
    }
}

/// Draw the popup line graph.
///
/// The grid is always drawn; `series` is `None` when the graph max is too
/// small to scale by, in which case nothing else is.
pub fn render_line_graph(
    cr: &mut dyn Canvas,
    geometry: &RenderGeometry,
    grid_color: Color,
    series: Option<&[ScaledSeries]>,
) {
    let offset = geometry.popup_grid_offset();
    // Major, then minor divisions
    draw_grid_lines(cr, geometry.width, offset, geometry.grid_lines, grid_color);
    draw_grid_lines(
        cr,
        geometry.width,
        offset / 2.0,
        geometry.grid_lines * 2 + 1,
        grid_color.scale_alpha(MINOR_GRID_ALPHA),
    );

    let Some(series) = series else {
        return;
    };
    let height = geometry.height;

    for (index, data) in series.iter().enumerate() {
        if data.values.is_empty() {
            continue;
        }

        if index == 0 {
            plot_data_set(cr, height, &data.values);
            cr.line_to((data.values.len() - 1) as f64, height);
            cr.line_to(0.0, height);
            cr.close_path();
            cr.set_source_color(data.color.scale_alpha(LINE_FILL_ALPHA));
            cr.fill();
        }

        plot_data_set(cr, height, &data.values);
        cr.set_source_color(data.color);
        cr.set_line_width(1.0);
        cr.set_dash(&[], 0.0);
        cr.stroke();
    }
}

fn plot_bar(cr: &mut dyn Canvas, layout: &CompactLayout, height: f64, position: usize, value: f64, nudge: f64) {
    let outer = layout.bar_outer_width();
    let y = (1.0 - value) * height + nudge;
    cr.move_to(position as f64 * outer + layout.bar_padding, y);
    cr.line_to((position + 1) as f64 * outer, y);
}

/// Draw the compact bar graph: one bar per series showing the oldest
/// retained sample.
pub fn render_bar_graph(
    cr: &mut dyn Canvas,
    geometry: &RenderGeometry,
    layout: &CompactLayout,
    grid_color: Color,
    series: &[ScaledSeries],
) {
    let offset = geometry.compact_grid_offset();
    for i in 0..=geometry.grid_lines + 2 {
        let y = i as f64 * offset;
        cr.move_to(0.0, y);
        cr.line_to(geometry.width, y);
    }
    cr.set_source_color(grid_color);
    cr.set_line_width(1.0);
    cr.set_dash(&GRID_DASH, 0.0);
    cr.stroke();

    let height = geometry.height;
    let outer = layout.bar_outer_width();

    for (position, data) in series.iter().enumerate() {
        let value = data.values.first().copied().unwrap_or(0.0);

        plot_bar(cr, layout, height, position, value, 0.0);
        cr.line_to((position + 1) as f64 * outer, height);
        cr.line_to(position as f64 * outer + layout.bar_padding, height);
        cr.close_path();
        cr.set_source_color(data.color.scale_alpha(BAR_FILL_ALPHA));
        cr.fill();

        plot_bar(cr, layout, height, position, value, 0.5);
        cr.set_source_color(data.color);
        cr.set_line_width(1.0);
        cr.set_dash(&[], 0.0);
        cr.stroke();
    }
}
