//! Meters module
//!
//! Every indicator of the panel is an `Indicator<S>`: one shared engine
//! (timers, compact and popup graphs, readouts, liveness checks) driven by
//! a small per-metric `MeterStrategy`. The panel only sees `Box<dyn Meter>`.

mod cpu_meter;
mod memory_meter;
mod network_meter;
mod swap_meter;

use std::fmt;

use log::{debug, info, warn};

use crate::core::{
    ColorResolver, Graph, GraphOptions, IndicatorConfig, MeterId, MeterKind, Retention,
    Scheduler, SourceId, Task,
};
use crate::platform::{MetricsProvider, ProviderError};
use crate::ui::{
    render_bar_graph, render_line_graph, CompactLayout, DrawingArea, LabelSink, RenderGeometry,
    ViewState,
};

pub use cpu_meter::*;
pub use memory_meter::*;
pub use network_meter::*;
pub use swap_meter::*;

/// Repaint cadence of an open popup graph
pub const POPUP_REPAINT_INTERVAL_MS: u64 = 250;

/// One text row of a popup
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    /// Stable key, also the label suffix (`"<meter>.<key>"`)
    pub key: &'static str,
    /// Heading the row is listed under (e.g. "Current:")
    pub section: &'static str,
    pub title: &'static str,
    value: Option<String>,
    dirty: bool,
}

impl Readout {
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Ordered readout rows of one indicator
#[derive(Debug, Clone, Default)]
pub struct Readouts {
    rows: Vec<Readout>,
}

impl Readouts {
    pub fn new() -> Self {
        Readouts::default()
    }

    /// Add an empty row at the end
    pub fn declare(&mut self, section: &'static str, key: &'static str, title: &'static str) {
        self.rows.push(Readout {
            key,
            section,
            title,
            value: None,
            dirty: false,
        });
    }

    /// Add an empty row ahead of `before`, or at the end if that row is
    /// missing. Declaring an existing key does nothing.
    pub fn declare_before(
        &mut self,
        before: &str,
        section: &'static str,
        key: &'static str,
        title: &'static str,
    ) {
        if self.contains(key) {
            return;
        }
        let at = self
            .rows
            .iter()
            .position(|r| r.key == before)
            .unwrap_or(self.rows.len());
        self.rows.insert(
            at,
            Readout {
                key,
                section,
                title,
                value: None,
                dirty: false,
            },
        );
    }

    /// Set the text of a row; unknown keys are ignored
    pub fn set(&mut self, key: &str, text: String) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.key == key) {
            if row.value.as_deref() != Some(text.as_str()) {
                row.value = Some(text);
                row.dirty = true;
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.key == key)
            .and_then(Readout::value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rows.iter().any(|r| r.key == key)
    }

    pub fn rows(&self) -> &[Readout] {
        &self.rows
    }

    /// Rows whose text changed since the last call
    pub fn take_changes(&mut self) -> Vec<(&'static str, String)> {
        self.rows
            .iter_mut()
            .filter(|r| r.dirty)
            .filter_map(|r| {
                r.dirty = false;
                r.value.clone().map(|v| (r.key, v))
            })
            .collect()
    }
}

/// Everything a strategy writes into
#[derive(Debug, Clone)]
pub struct IndicatorGraphs {
    /// Panel bar graph, values already normalized to [0, 1]
    pub compact: Graph,
    /// Popup line graph in raw units
    pub popup: Graph,
    pub readouts: Readouts,
}

impl IndicatorGraphs {
    pub fn new(config: &IndicatorConfig) -> Self {
        IndicatorGraphs {
            compact: Graph::new(GraphOptions::bars()),
            popup: Graph::new(popup_options(config)),
            readouts: Readouts::new(),
        }
    }
}

fn popup_options(config: &IndicatorConfig) -> GraphOptions {
    GraphOptions {
        autoscale: config.autoscale,
        max: config.fixed_max.unwrap_or(0.0),
        units: config.units.clone(),
        show_max: config.show_max,
        retention: Retention::PixelWidth,
    }
}

/// The per-metric part of an indicator
pub trait MeterStrategy: fmt::Debug {
    fn kind(&self) -> MeterKind;

    /// Declare series and readouts and take the initial counter baselines.
    /// Provider failures here are logged; sampling retries later.
    fn init(&mut self, graphs: &mut IndicatorGraphs, provider: &mut dyn MetricsProvider);

    /// Pull one reading and append it. On error nothing is appended.
    fn sample_tick(
        &mut self,
        graphs: &mut IndicatorGraphs,
        provider: &mut dyn MetricsProvider,
        now_ms: u64,
    ) -> Result<(), ProviderError>;

    /// Size of the compact indicator
    fn graph_layout(
        &self,
        graphs: &IndicatorGraphs,
        config: &IndicatorConfig,
        scale_factor: f64,
    ) -> CompactLayout {
        CompactLayout::for_series(
            graphs.compact.len(),
            config.bar_width,
            config.bar_padding,
            scale_factor,
        )
    }

    /// Drop counter baselines on teardown
    fn reset(&mut self) {}
}

/// Meter trait - the panel drives indicators through this
pub trait Meter: fmt::Debug {
    fn kind(&self) -> MeterKind;

    /// Get the meter name
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Start the sample and repaint timers. Enabling twice is a no-op.
    fn enable(&mut self, scheduler: &mut Scheduler, now_ms: u64);

    /// Cancel every timer; no callback of this meter fires afterwards
    fn disable(&mut self, scheduler: &mut Scheduler);

    /// Disable and release graphs and counter state
    fn destroy(&mut self, scheduler: &mut Scheduler);

    fn is_enabled(&self) -> bool;

    /// Sample task body
    fn sample(&mut self, provider: &mut dyn MetricsProvider, now_ms: u64);

    /// Draw the compact bar graph
    fn draw(&mut self, area: &mut dyn DrawingArea, view: ViewState, resolver: &dyn ColorResolver);

    /// Draw the popup line graph; max label changes go to `labels`
    fn draw_popup(
        &mut self,
        area: &mut dyn DrawingArea,
        view: ViewState,
        resolver: &dyn ColorResolver,
        labels: &mut dyn LabelSink,
    );

    fn show_popup(&mut self, scheduler: &mut Scheduler, now_ms: u64);
    fn hide_popup(&mut self, scheduler: &mut Scheduler);
    fn is_popup_showing(&self) -> bool;

    /// The theme changed: drop every cached color
    fn style_changed(&mut self);

    fn layout(&self) -> CompactLayout;

    /// Where the max overlay goes for a popup graph placed at (x, y)
    fn overlay_position(&self, x: f64, y: f64) -> (f64, f64);

    /// Push changed readouts and max label to the sink
    fn flush_labels(&mut self, labels: &mut dyn LabelSink);

    fn readouts(&self) -> &Readouts;
    fn compact_graph(&self) -> &Graph;
    fn popup_graph(&self) -> &Graph;
}

/// Label name of a readout or overlay of a meter
pub fn label_name(meter: &str, key: &str) -> String {
    format!("{}.{}", meter, key)
}

/// Generic indicator engine
#[derive(Debug)]
pub struct Indicator<S: MeterStrategy> {
    id: MeterId,
    strategy: S,
    config: IndicatorConfig,
    graphs: IndicatorGraphs,
    layout: CompactLayout,
    /// Compact series count `layout` was computed for
    series_in_layout: usize,
    scale_factor: f64,
    grid_lines: usize,

    sample_source: Option<SourceId>,
    repaint_source: Option<SourceId>,
    popup_source: Option<SourceId>,

    ready: bool,
    popup_ready: bool,
    destroyed: bool,
    /// Set while the provider keeps failing, to log a failure once
    failing: bool,
}

impl<S: MeterStrategy> Indicator<S> {
    pub fn new(
        id: MeterId,
        mut strategy: S,
        config: IndicatorConfig,
        scale_factor: f64,
        grid_lines: usize,
        provider: &mut dyn MetricsProvider,
    ) -> Self {
        let mut graphs = IndicatorGraphs::new(&config);
        strategy.init(&mut graphs, provider);
        let layout = strategy.graph_layout(&graphs, &config, scale_factor);
        let series_in_layout = graphs.compact.len();

        Indicator {
            id,
            strategy,
            config,
            graphs,
            layout,
            series_in_layout,
            scale_factor,
            grid_lines,
            sample_source: None,
            repaint_source: None,
            popup_source: None,
            ready: false,
            popup_ready: false,
            destroyed: false,
            failing: false,
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    fn remove_source(scheduler: &mut Scheduler, source: &mut Option<SourceId>) {
        if let Some(id) = source.take() {
            scheduler.source_remove(id);
        }
    }
}

impl<S: MeterStrategy> Meter for Indicator<S> {
    fn kind(&self) -> MeterKind {
        self.strategy.kind()
    }

    fn enable(&mut self, scheduler: &mut Scheduler, now_ms: u64) {
        if self.destroyed {
            return;
        }

        let interval = self.config.update_interval_ms;
        if self.sample_source.is_none() {
            self.sample_source = Some(scheduler.timeout_add(now_ms, interval, Task::Sample(self.id)));
        }
        if self.repaint_source.is_none() {
            self.repaint_source =
                Some(scheduler.timeout_add(now_ms, interval, Task::Repaint(self.id)));
        }

        if !self.ready {
            info!("{}: enabled, sampling every {} ms", self.name(), interval);
        }
        self.ready = true;
    }

    fn disable(&mut self, scheduler: &mut Scheduler) {
        if self.ready {
            info!("{}: disabled", self.name());
        }
        self.ready = false;
        Self::remove_source(scheduler, &mut self.sample_source);
        Self::remove_source(scheduler, &mut self.repaint_source);
        self.hide_popup(scheduler);
    }

    fn destroy(&mut self, scheduler: &mut Scheduler) {
        self.disable(scheduler);
        self.graphs.compact.clear();
        self.graphs.popup.clear();
        self.strategy.reset();
        self.destroyed = true;
        debug!("{}: destroyed", self.name());
    }

    fn is_enabled(&self) -> bool {
        self.ready
    }

    fn sample(&mut self, provider: &mut dyn MetricsProvider, now_ms: u64) {
        if !self.ready {
            return;
        }

        match self.strategy.sample_tick(&mut self.graphs, provider, now_ms) {
            Ok(()) => {
                // A strategy may register series late (e.g. after a failed init)
                if self.series_in_layout != self.graphs.compact.len() {
                    self.layout = self
                        .strategy
                        .graph_layout(&self.graphs, &self.config, self.scale_factor);
                    self.series_in_layout = self.graphs.compact.len();
                }
                if self.failing {
                    info!("{}: provider recovered", self.name());
                    self.failing = false;
                }
            }
            Err(e) => {
                if self.failing {
                    debug!("{}: sampling failed again: {}", self.name(), e);
                } else {
                    warn!("{}: sampling failed: {}", self.name(), e);
                    self.failing = true;
                }
            }
        }
    }

    fn draw(&mut self, area: &mut dyn DrawingArea, view: ViewState, resolver: &dyn ColorResolver) {
        if !self.ready || !view.can_draw() {
            return;
        }

        let (width, height) = area.surface_size();
        self.graphs.compact.resolve_colors(resolver);
        let Some(cr) = area.context() else {
            return;
        };

        let geometry = RenderGeometry::compact(width, height, self.grid_lines, self.layout);
        let scaled = self.graphs.compact.prepare(width).unwrap_or_default();
        render_bar_graph(
            cr,
            &geometry,
            &self.layout,
            self.graphs.compact.grid_color(),
            &scaled,
        );
    }

    fn draw_popup(
        &mut self,
        area: &mut dyn DrawingArea,
        view: ViewState,
        resolver: &dyn ColorResolver,
        labels: &mut dyn LabelSink,
    ) {
        if !self.popup_ready || !view.can_draw() {
            return;
        }

        let (width, height) = area.surface_size();
        self.graphs.popup.resolve_colors(resolver);
        let Some(cr) = area.context() else {
            return;
        };

        let geometry = RenderGeometry::popup(width, height, self.grid_lines);
        let scaled = self.graphs.popup.prepare(width);
        if let Some(text) = self.graphs.popup.take_max_label_change() {
            labels.set_text(&label_name(self.strategy.kind().name(), "max"), text);
        }
        render_line_graph(
            cr,
            &geometry,
            self.graphs.popup.grid_color(),
            scaled.as_deref(),
        );
    }

    fn show_popup(&mut self, scheduler: &mut Scheduler, now_ms: u64) {
        if self.destroyed {
            return;
        }
        if self.popup_source.is_none() {
            self.popup_source = Some(scheduler.timeout_add(
                now_ms,
                POPUP_REPAINT_INTERVAL_MS,
                Task::PopupRepaint(self.id),
            ));
        }
        if !self.popup_ready {
            debug!("{}: popup shown", self.name());
        }
        self.popup_ready = true;
    }

    fn hide_popup(&mut self, scheduler: &mut Scheduler) {
        if self.popup_ready {
            debug!("{}: popup hidden", self.name());
        }
        self.popup_ready = false;
        Self::remove_source(scheduler, &mut self.popup_source);
    }

    fn is_popup_showing(&self) -> bool {
        self.popup_ready
    }

    fn style_changed(&mut self) {
        self.graphs.compact.invalidate_colors();
        self.graphs.popup.invalidate_colors();
    }

    fn layout(&self) -> CompactLayout {
        self.layout
    }

    fn overlay_position(&self, x: f64, y: f64) -> (f64, f64) {
        (x + self.config.offset_x, y + self.config.offset_y)
    }

    fn flush_labels(&mut self, labels: &mut dyn LabelSink) {
        let name = self.strategy.kind().name();
        if let Some(text) = self.graphs.popup.take_max_label_change() {
            labels.set_text(&label_name(name, "max"), text);
        }
        for (key, text) in self.graphs.readouts.take_changes() {
            labels.set_text(&label_name(name, key), &text);
        }
    }

    fn readouts(&self) -> &Readouts {
        &self.graphs.readouts
    }

    fn compact_graph(&self) -> &Graph {
        &self.graphs.compact
    }

    fn popup_graph(&self) -> &Graph {
        &self.graphs.popup
    }
}

/// Create the indicator of a meter kind
pub fn create_meter(
    id: MeterId,
    kind: MeterKind,
    config: &IndicatorConfig,
    scale_factor: f64,
    grid_lines: usize,
    provider: &mut dyn MetricsProvider,
) -> Box<dyn Meter> {
    let config = config.clone();
    match kind {
        MeterKind::Cpu => Box::new(Indicator::new(
            id,
            CpuStrategy::new(&config),
            config,
            scale_factor,
            grid_lines,
            provider,
        )),
        MeterKind::Memory => Box::new(Indicator::new(
            id,
            MemoryStrategy::new(&config),
            config,
            scale_factor,
            grid_lines,
            provider,
        )),
        MeterKind::Swap => Box::new(Indicator::new(
            id,
            SwapStrategy::new(&config),
            config,
            scale_factor,
            grid_lines,
            provider,
        )),
        MeterKind::Network => Box::new(Indicator::new(
            id,
            NetworkStrategy::new(&config),
            config,
            scale_factor,
            grid_lines,
            provider,
        )),
    }
}
