//! StatsPanel - the panel instance holding every indicator
//!
//! The host creates one `StatsPanel`, drives it with `enable`,
//! `dispatch_due`, the draw calls and hover events, and finally hands it
//! back to `destroy`. All timers live in the panel's `Scheduler`.

use log::{debug, info};

use super::canvas::{DrawingArea, LabelSink};
use super::graph_render::ViewState;
use super::theme::Theme;
use crate::core::{MeterId, MeterKind, Scheduler, Settings, SourceId, Task};
use crate::meters::{create_meter, Meter};
use crate::platform::MetricsProvider;

/// A repaint the host should service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repaint {
    /// Compact bar graph in the panel
    Compact(MeterId),
    /// Expanded popup graph
    Popup(MeterId),
}

pub struct StatsPanel {
    meters: Vec<Box<dyn Meter>>,
    provider: Box<dyn MetricsProvider>,
    scheduler: Scheduler,
    theme: Theme,
    view: ViewState,

    hover_timeout_ms: u64,
    show_popup_source: Option<SourceId>,
    reset_hover_source: Option<SourceId>,
    /// A popup was shown recently; the next hover opens immediately
    popup_showing: bool,

    repaints: Vec<Repaint>,
}

impl StatsPanel {
    /// Create one indicator per enabled meter
    pub fn new(settings: &Settings, mut provider: Box<dyn MetricsProvider>) -> Self {
        let mut meters = Vec::new();
        for kind in MeterKind::all() {
            let config = settings.indicator(*kind);
            if !config.enabled {
                info!("{}: disabled in settings", kind.name());
                continue;
            }
            let id = meters.len();
            meters.push(create_meter(
                id,
                *kind,
                config,
                settings.scale_factor,
                settings.grid_lines,
                provider.as_mut(),
            ));
        }

        StatsPanel {
            meters,
            provider,
            scheduler: Scheduler::new(),
            theme: Theme::from_settings(settings),
            view: ViewState::default(),
            hover_timeout_ms: settings.hover_timeout_ms,
            show_popup_source: None,
            reset_hover_source: None,
            popup_showing: false,
            repaints: Vec::new(),
        }
    }

    pub fn meters(&self) -> &[Box<dyn Meter>] {
        &self.meters
    }

    pub fn meter(&self, id: MeterId) -> Option<&dyn Meter> {
        self.meters.get(id).map(|m| m.as_ref())
    }

    /// Id of the indicator of a meter kind, if it is enabled
    pub fn find(&self, kind: MeterKind) -> Option<MeterId> {
        self.meters.iter().position(|m| m.kind() == kind)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn enable(&mut self, now_ms: u64) {
        for meter in &mut self.meters {
            debug!("indicator::enable {}", meter.name());
            meter.enable(&mut self.scheduler, now_ms);
        }
    }

    pub fn disable(&mut self) {
        for meter in &mut self.meters {
            meter.disable(&mut self.scheduler);
        }
        self.cancel_hover_timers();
        self.popup_showing = false;
        self.repaints.clear();
    }

    /// Tear down every indicator and timer
    pub fn destroy(mut self) {
        for meter in &mut self.meters {
            meter.destroy(&mut self.scheduler);
        }
        self.cancel_hover_timers();
        self.scheduler.clear();
        self.meters.clear();
        info!("panel destroyed");
    }

    fn cancel_hover_timers(&mut self) {
        if let Some(id) = self.show_popup_source.take() {
            self.scheduler.source_remove(id);
        }
        if let Some(id) = self.reset_hover_source.take() {
            self.scheduler.source_remove(id);
        }
    }

    /// Hover state of an indicator changed
    pub fn on_hover(&mut self, id: MeterId, hovered: bool, now_ms: u64) {
        if id >= self.meters.len() {
            return;
        }

        if hovered {
            if self.show_popup_source.is_none() {
                let timeout = if self.popup_showing {
                    0
                } else {
                    self.hover_timeout_ms
                };
                self.show_popup_source =
                    Some(self.scheduler.timeout_add_once(now_ms, timeout, Task::ShowPopup(id)));
                if let Some(reset) = self.reset_hover_source.take() {
                    self.scheduler.source_remove(reset);
                }
            }
        } else {
            if let Some(show) = self.show_popup_source.take() {
                self.scheduler.source_remove(show);
            }
            self.meters[id].hide_popup(&mut self.scheduler);
            if self.popup_showing {
                if let Some(reset) = self.reset_hover_source.take() {
                    self.scheduler.source_remove(reset);
                }
                self.reset_hover_source = Some(self.scheduler.timeout_add_once(
                    now_ms,
                    self.hover_timeout_ms,
                    Task::ResetHover,
                ));
            }
        }
    }

    /// Whether the debounce currently treats a popup as showing
    pub fn is_popup_showing(&self) -> bool {
        self.popup_showing
    }

    pub fn has_pending_show(&self) -> bool {
        self.show_popup_source.is_some()
    }

    pub fn has_pending_reset(&self) -> bool {
        self.reset_hover_source.is_some()
    }

    /// When the next timer is due
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    /// Run every task due at `now_ms`, one at a time. Returns how many ran.
    pub fn dispatch_due(&mut self, now_ms: u64) -> usize {
        let mut ran = 0;
        while let Some((_, task)) = self.scheduler.pop_due(now_ms) {
            ran += 1;
            match task {
                Task::Sample(id) => {
                    if let Some(meter) = self.meters.get_mut(id) {
                        meter.sample(self.provider.as_mut(), now_ms);
                    }
                }
                Task::Repaint(id) => {
                    if self.meters.get(id).is_some_and(|m| m.is_enabled()) {
                        self.request(Repaint::Compact(id));
                    }
                }
                Task::PopupRepaint(id) => {
                    if self.meters.get(id).is_some_and(|m| m.is_popup_showing()) {
                        self.request(Repaint::Popup(id));
                    }
                }
                Task::ShowPopup(id) => {
                    self.show_popup_source = None;
                    self.popup_showing = true;
                    if let Some(meter) = self.meters.get_mut(id) {
                        meter.show_popup(&mut self.scheduler, now_ms);
                        self.repaints.push(Repaint::Popup(id));
                    }
                }
                Task::ResetHover => {
                    self.reset_hover_source = None;
                    self.popup_showing = false;
                }
            }
        }
        ran
    }

    fn request(&mut self, repaint: Repaint) {
        if !self.repaints.contains(&repaint) {
            self.repaints.push(repaint);
        }
    }

    /// Repaints requested since the last call
    pub fn take_repaints(&mut self) -> Vec<Repaint> {
        std::mem::take(&mut self.repaints)
    }

    pub fn draw(&mut self, id: MeterId, area: &mut dyn DrawingArea) {
        if let Some(meter) = self.meters.get_mut(id) {
            meter.draw(area, self.view, &self.theme);
        }
    }

    pub fn draw_popup(&mut self, id: MeterId, area: &mut dyn DrawingArea, labels: &mut dyn LabelSink) {
        if let Some(meter) = self.meters.get_mut(id) {
            meter.draw_popup(area, self.view, &self.theme, labels);
        }
    }

    /// Push changed readout and overlay text of every indicator
    pub fn flush_labels(&mut self, labels: &mut dyn LabelSink) {
        for meter in &mut self.meters {
            meter.flush_labels(labels);
        }
    }

    pub fn view_state(&self) -> ViewState {
        self.view
    }

    pub fn set_view_state(&mut self, view: ViewState) {
        self.view = view;
    }

    pub fn set_overview(&mut self, overview: bool) {
        self.view.set(ViewState::OVERVIEW, overview);
    }

    /// Switch theme; every cached color is resolved again on next draw
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        for meter in &mut self.meters {
            meter.style_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::FakeProvider;

    fn panel() -> StatsPanel {
        StatsPanel::new(&Settings::new(), Box::new(FakeProvider::new()))
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_one_indicator_per_enabled_meter() {
        let mut settings = Settings::new();
        settings.swap.enabled = false;
        let panel = StatsPanel::new(&settings, Box::new(FakeProvider::new()));

        assert_eq!(panel.meters().len(), 3);
        assert_eq!(panel.find(MeterKind::Cpu), Some(0));
        assert_eq!(panel.find(MeterKind::Swap), None);
        assert_eq!(panel.find(MeterKind::Network), Some(2));
        assert_eq!(panel.meter(2).map(|m| m.name()), Some("network"));
    }

    // ==================== Hover Tests ====================

    #[test]
    fn test_hover_shows_after_timeout() {
        let mut panel = panel();
        panel.on_hover(0, true, 1000);
        assert!(panel.has_pending_show());

        panel.dispatch_due(1299);
        assert!(!panel.meters()[0].is_popup_showing());

        panel.dispatch_due(1300);
        assert!(panel.meters()[0].is_popup_showing());
        assert!(panel.is_popup_showing());
        assert!(!panel.has_pending_show());
        assert!(panel.take_repaints().contains(&Repaint::Popup(0)));
    }

    #[test]
    fn test_unhover_cancels_pending_show() {
        let mut panel = panel();
        panel.on_hover(0, true, 0);
        panel.on_hover(0, false, 100);
        assert!(!panel.has_pending_show());
        // No popup was showing, so no reset either
        assert!(!panel.has_pending_reset());

        panel.dispatch_due(10_000);
        assert!(!panel.meters()[0].is_popup_showing());
    }

    #[test]
    fn test_only_one_hover_timer_at_a_time() {
        let mut panel = panel();
        panel.on_hover(0, true, 0);
        panel.dispatch_due(300);

        panel.on_hover(0, false, 400);
        assert!(panel.has_pending_reset());
        assert!(!panel.has_pending_show());
        assert!(!panel.meters()[0].is_popup_showing());

        // Moving to the next indicator opens it immediately
        panel.on_hover(1, true, 450);
        assert!(panel.has_pending_show());
        assert!(!panel.has_pending_reset());
        panel.dispatch_due(450);
        assert!(panel.meters()[1].is_popup_showing());
    }

    #[test]
    fn test_reset_hover_expires() {
        let mut panel = panel();
        panel.on_hover(0, true, 0);
        panel.dispatch_due(300);
        panel.on_hover(0, false, 400);

        panel.dispatch_due(700);
        assert!(!panel.is_popup_showing());
        assert!(!panel.has_pending_reset());

        // Back to the slow path
        panel.on_hover(0, true, 800);
        panel.dispatch_due(800);
        assert!(!panel.meters()[0].is_popup_showing());
    }

    #[test]
    fn test_hover_unknown_meter_is_ignored() {
        let mut panel = panel();
        panel.on_hover(42, true, 0);
        assert!(!panel.has_pending_show());
    }

    // ==================== Dispatch Tests ====================

    #[test]
    fn test_enable_schedules_sampling_and_repaint() {
        let mut panel = panel();
        panel.enable(0);
        assert_eq!(panel.scheduler().len(), 8);
        assert_eq!(panel.next_deadline(), Some(250));

        // CPU and network at 250 ms: two samples and two repaints
        assert_eq!(panel.dispatch_due(250), 4);
        let repaints = panel.take_repaints();
        assert!(repaints.contains(&Repaint::Compact(0)));
        assert!(repaints.contains(&Repaint::Compact(3)));
        assert!(!repaints.contains(&Repaint::Compact(1)));
    }

    #[test]
    fn test_disable_stops_everything() {
        let mut panel = panel();
        panel.enable(0);
        panel.on_hover(0, true, 0);
        panel.disable();

        assert!(panel.scheduler().is_empty());
        assert_eq!(panel.dispatch_due(100_000), 0);
        assert!(panel.take_repaints().is_empty());
    }

    #[test]
    fn test_overview_flag() {
        let mut panel = panel();
        panel.set_overview(true);
        assert!(!panel.view_state().can_draw());
        panel.set_overview(false);
        assert!(panel.view_state().can_draw());
    }
}
