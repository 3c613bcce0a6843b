//! Scheduler - timer sources for the single-threaded event loop
//!
//! Every periodic or one-shot callback of the panel is a `Source` keyed by a
//! `SourceId`. The loop pops due sources one at a time, so a source removed
//! by an earlier callback in the same pass never fires afterwards.

use std::collections::BTreeMap;

/// Identifies an indicator inside the panel
pub type MeterId = usize;

/// Handle returned by `timeout_add`; stays unique for the scheduler's life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Pull counters from the provider into the indicator's series
    Sample(MeterId),
    /// Request a repaint of the compact bar graph
    Repaint(MeterId),
    /// Request a repaint of the expanded popup graph
    PopupRepaint(MeterId),
    /// Hover debounce elapsed: show the popup of a meter
    ShowPopup(MeterId),
    /// Un-hover debounce elapsed: forget that a popup was showing
    ResetHover,
}

#[derive(Debug, Clone)]
struct Source {
    task: Task,
    /// `None` for one-shot sources
    interval_ms: Option<u64>,
    due_ms: u64,
}

/// Registry of active timer sources
#[derive(Debug, Default)]
pub struct Scheduler {
    sources: BTreeMap<SourceId, Source>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Add a repeating source firing every `interval_ms` starting at
    /// `now_ms + interval_ms`
    pub fn timeout_add(&mut self, now_ms: u64, interval_ms: u64, task: Task) -> SourceId {
        self.insert(task, Some(interval_ms.max(1)), now_ms + interval_ms.max(1))
    }

    /// Add a one-shot source firing once at `now_ms + delay_ms`
    pub fn timeout_add_once(&mut self, now_ms: u64, delay_ms: u64, task: Task) -> SourceId {
        self.insert(task, None, now_ms + delay_ms)
    }

    fn insert(&mut self, task: Task, interval_ms: Option<u64>, due_ms: u64) -> SourceId {
        self.next_id += 1;
        let id = SourceId(self.next_id);
        self.sources.insert(
            id,
            Source {
                task,
                interval_ms,
                due_ms,
            },
        );
        id
    }

    /// Cancel a source. Returns false if it was not active.
    pub fn source_remove(&mut self, id: SourceId) -> bool {
        self.sources.remove(&id).is_some()
    }

    pub fn is_active(&self, id: SourceId) -> bool {
        self.sources.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Earliest deadline among active sources
    pub fn next_deadline(&self) -> Option<u64> {
        self.sources.values().map(|s| s.due_ms).min()
    }

    /// Pop the earliest source due at `now_ms`.
    ///
    /// Repeating sources are rescheduled one interval after `now_ms` (missed
    /// ticks are not replayed); one-shot sources are removed.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(SourceId, Task)> {
        let (&id, _) = self
            .sources
            .iter()
            .filter(|(_, s)| s.due_ms <= now_ms)
            .min_by_key(|(id, s)| (s.due_ms, **id))?;

        let source = self.sources.get_mut(&id)?;
        let task = source.task;
        match source.interval_ms {
            Some(interval) => source.due_ms = now_ms + interval,
            None => {
                self.sources.remove(&id);
            }
        }
        Some((id, task))
    }

    /// Cancel everything
    pub fn clear(&mut self) {
        self.sources.clear();
    }
}
