//! Overall progress for a flow, assembled from per-phase percentages.
//!
//! Each phase reports 0–100 for its own work; a [`Band`] rescales that into
//! the slice of the overall bar the phase owns. The tracker only ever moves
//! forward until it is explicitly reset.

use std::sync::{Arc, Mutex};

use sealdrop_transfer::ProgressFn;

/// Observer for `(stage, overall percent)` updates.
///
/// Called synchronously from the transfer loop; it must not block.
pub type ProgressObserver = Arc<dyn Fn(&'static str, f64) + Send + Sync>;

/// A slice `[start, end]` of the overall progress bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub start: f64,
    pub end: f64,
}

impl Band {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Map a phase percentage into this band. Input is clamped to `[0, 100]`.
    ///
    /// Bands are ascending: `start <= end`.
    pub fn map(&self, phase_percent: f64) -> f64 {
        let p = if phase_percent.is_nan() {
            0.0
        } else {
            phase_percent.clamp(0.0, 100.0)
        };
        (self.start + p / 100.0 * (self.end - self.start)).min(self.end)
    }
}

#[derive(Debug)]
struct Snapshot {
    stage: &'static str,
    percent: f64,
}

struct Inner {
    snapshot: Mutex<Snapshot>,
    observer: Option<ProgressObserver>,
}

/// Shared, monotonic progress value.
///
/// Clones share the same value, so a clone can be handed to the transfer
/// layer's progress callback while the flow keeps reading it.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Inner>,
}

impl ProgressTracker {
    pub fn new(observer: Option<ProgressObserver>) -> Self {
        Self {
            inner: Arc::new(Inner {
                snapshot: Mutex::new(Snapshot {
                    stage: "idle",
                    percent: 0.0,
                }),
                observer,
            }),
        }
    }

    pub fn percent(&self) -> f64 {
        self.lock().percent
    }

    pub fn stage(&self) -> &'static str {
        self.lock().stage
    }

    /// Move to `percent` if it is ahead of the current value.
    pub fn advance(&self, percent: f64) {
        let update = {
            let mut snap = self.lock();
            if percent > snap.percent {
                snap.percent = percent.min(100.0);
                Some((snap.stage, snap.percent))
            } else {
                None
            }
        };
        if let Some((stage, percent)) = update {
            self.notify(stage, percent);
        }
    }

    /// Record a stage change without moving the value.
    pub fn set_stage(&self, stage: &'static str) {
        let percent = {
            let mut snap = self.lock();
            snap.stage = stage;
            snap.percent
        };
        self.notify(stage, percent);
    }

    /// Back to 0. Only for an explicit restart of the whole flow.
    pub fn reset(&self) {
        let mut snap = self.lock();
        snap.stage = "idle";
        snap.percent = 0.0;
    }

    /// A transfer-layer callback that feeds this tracker through `band`.
    pub fn band_callback(&self, band: Band) -> ProgressFn {
        let tracker = self.clone();
        Arc::new(move |phase_percent| tracker.advance(band.map(phase_percent)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.inner
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, stage: &'static str, percent: f64) {
        if let Some(observer) = &self.inner.observer {
            observer(stage, percent);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snap = self.lock();
        f.debug_struct("ProgressTracker")
            .field("stage", &snap.stage)
            .field("percent", &snap.percent)
            .finish()
    }
}
