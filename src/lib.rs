//! statsplus - live CPU, memory, swap and network graphs
//!
//! Indicators sample an opaque `MetricsProvider` on independent timers,
//! normalize the readings and render them as a compact bar graph plus an
//! expandable line graph through the `Canvas` abstraction.

pub mod core;
pub mod meters;
pub mod platform;
pub mod ui;

pub use crate::core::Settings;
pub use crate::platform::{default_provider, MetricsProvider};
pub use crate::ui::StatsPanel;
