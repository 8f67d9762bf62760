//! Build lifecycle notifications.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use crate::bundler::BuildOutput;
use crate::error::BuildError;

/// Emitted once per build attempt: `Started`, any number of `Progress`,
/// then exactly one of `Completed` or `Failed`.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    Started,
    /// Fraction of the build done, in `0.0..=1.0`, never decreasing
    Progress(f64),
    Completed(BuildOutput),
    Failed(Arc<BuildError>),
}

pub type EventSender = UnboundedSender<BuildEvent>;

/// Callback receiving progress fractions.
pub type ProgressReporter = Arc<dyn Fn(f64) + Send + Sync>;

/// Fans progress out to a callback and an event channel, dropping any
/// value below the last one reported.
#[derive(Clone, Default)]
pub(crate) struct ProgressTracker {
    last: Arc<Mutex<Option<f64>>>,
    reporter: Option<ProgressReporter>,
    events: Option<EventSender>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("last", &*self.last.lock())
            .finish_non_exhaustive()
    }
}

impl ProgressTracker {
    pub(crate) fn new(reporter: Option<ProgressReporter>, events: Option<EventSender>) -> Self {
        Self {
            last: Arc::default(),
            reporter,
            events,
        }
    }

    /// Start a new build at zero.
    pub(crate) fn reset(&self) {
        *self.last.lock() = None;
    }

    pub(crate) fn report(&self, value: f64) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        {
            let mut last = self.last.lock();
            if last.is_some_and(|previous| value <= previous) {
                return;
            }
            *last = Some(value);
        }
        if let Some(reporter) = &self.reporter {
            reporter(value);
        }
        self.send(BuildEvent::Progress(value));
    }

    pub(crate) fn send(&self, event: BuildEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening.
            let _ = events.send(event);
        }
    }
}
