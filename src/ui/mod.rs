//! UI module
//!
//! This module contains the rendering side of the panel:
//! - Canvas: render surface traits and a recording implementation
//! - Theme: symbolic color keys to concrete colors
//! - GraphRender: line (popup) and bar (compact) graph renderers
//! - StatsPanel: the panel instance, timers and hover debounce

mod canvas;
mod graph_render;
mod panel;
mod theme;

pub use canvas::*;
pub use graph_render::*;
pub use panel::*;
pub use theme::*;
