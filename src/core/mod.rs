//! Core module containing the sampling and scaling pipeline
//!
//! This module contains:
//! - DataSeries: an append-only sample buffer with its color
//! - Graph: series sharing a scale, truncated and autoscaled per repaint
//! - RateEstimator: counter deltas to rates with decaying ceilings
//! - Scheduler: timer sources of the event loop
//! - Settings: user configuration

mod color;
mod graph;
mod rate;
mod scheduler;
mod series;
mod settings;
mod units;

pub use color::*;
pub use graph::*;
pub use rate::*;
pub use scheduler::*;
pub use series::*;
pub use settings::*;
pub use units::*;
