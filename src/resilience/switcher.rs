//! Sliding-window fallback switcher.
//!
//! # States
//! - Normal: initial mode
//! - Fallback: degraded mode with a fixed dwell time
//!
//! # State Transitions
//! ```text
//! Normal → Fallback: trigger() count >= events_threshold within fallback_timeout
//! Fallback → Normal: restore_timeout after entering Fallback
//! ```
//!
//! # Design Decisions
//! - Triggers while in Fallback are recorded but never extend the dwell time
//! - The window is pruned lazily on trigger(); an idle switcher does no work
//! - The window is cleared on restore, so re-entering needs a fresh burst
//! - Exactly one restore timer is armed while in Fallback, none in Normal

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::SwitcherSettings;
use crate::observability::metrics;

/// Thresholds for a [`SlidingWindowFallbackSwitcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitcherConfig {
    pub events_threshold: usize,
    pub fallback_timeout: Duration,
    pub restore_timeout: Duration,
}

impl Default for SwitcherConfig {
    fn default() -> Self {
        SwitcherSettings::default().into()
    }
}

impl From<SwitcherSettings> for SwitcherConfig {
    fn from(settings: SwitcherSettings) -> Self {
        Self {
            events_threshold: settings.events_threshold.max(1),
            fallback_timeout: Duration::from_millis(settings.fallback_timeout_ms),
            restore_timeout: Duration::from_millis(settings.restore_timeout_ms),
        }
    }
}

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Flips between normal and fallback mode based on a burst of reported events.
pub struct SlidingWindowFallbackSwitcher {
    inner: Arc<SwitcherInner>,
}

struct SwitcherInner {
    name: String,
    config: SwitcherConfig,
    state: Mutex<SwitcherState>,
    on_fallback: Callback,
    on_restore: Callback,
}

#[derive(Default)]
struct SwitcherState {
    events: VecDeque<Instant>,
    is_fallback: bool,
    restore_timer: Option<JoinHandle<()>>,
}

impl SlidingWindowFallbackSwitcher {
    pub fn new(name: impl Into<String>, config: SwitcherConfig) -> Self {
        Self::with_callbacks(name, config, || {}, || {})
    }

    /// `on_fallback` and `on_restore` run once per transition, synchronously,
    /// with no internal lock held.
    pub fn with_callbacks<F, R>(
        name: impl Into<String>,
        config: SwitcherConfig,
        on_fallback: F,
        on_restore: R,
    ) -> Self
    where
        F: Fn() + Send + Sync + 'static,
        R: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SwitcherInner {
                name: name.into(),
                config,
                state: Mutex::new(SwitcherState::default()),
                on_fallback: Arc::new(on_fallback),
                on_restore: Arc::new(on_restore),
            }),
        }
    }

    /// Record one event. Must be called from within a Tokio runtime.
    pub fn trigger(&self) {
        let inner = &self.inner;
        let now = Instant::now();

        let entered = {
            let mut state = inner.lock_state();
            if let Some(cutoff) = now.checked_sub(inner.config.fallback_timeout) {
                while state.events.front().is_some_and(|&t| t < cutoff) {
                    state.events.pop_front();
                }
            }
            state.events.push_back(now);

            if state.is_fallback || state.events.len() < inner.config.events_threshold {
                false
            } else {
                state.is_fallback = true;
                if let Some(previous) = state.restore_timer.take() {
                    previous.abort();
                }
                state.restore_timer = Some(tokio::spawn(restore_after(
                    Arc::downgrade(inner),
                    inner.config.restore_timeout,
                )));
                true
            }
        };

        if entered {
            tracing::warn!(
                switcher = %inner.name,
                events = inner.config.events_threshold,
                window_ms = inner.config.fallback_timeout.as_millis() as u64,
                restore_ms = inner.config.restore_timeout.as_millis() as u64,
                "Entering fallback mode"
            );
            metrics::record_fallback_mode(&inner.name, true);
            (inner.on_fallback)();
        }
    }

    pub fn is_fallback_mode(&self) -> bool {
        self.inner.lock_state().is_fallback
    }

    /// Events currently held in the window (pruned on the last trigger).
    pub fn event_count(&self) -> usize {
        self.inner.lock_state().events.len()
    }

    pub fn config(&self) -> SwitcherConfig {
        self.inner.config
    }
}

impl fmt::Debug for SlidingWindowFallbackSwitcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidingWindowFallbackSwitcher")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .field("fallback", &self.is_fallback_mode())
            .finish()
    }
}

impl SwitcherInner {
    fn lock_state(&self) -> MutexGuard<'_, SwitcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SwitcherInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.restore_timer.take() {
            timer.abort();
        }
    }
}

async fn restore_after(inner: Weak<SwitcherInner>, after: Duration) {
    time::sleep(after).await;
    let Some(inner) = inner.upgrade() else { return };

    let restored = {
        let mut state = inner.lock_state();
        if state.is_fallback {
            state.is_fallback = false;
            state.restore_timer = None;
            state.events.clear();
            true
        } else {
            false
        }
    };

    if restored {
        tracing::info!(switcher = %inner.name, "Restored normal mode");
        metrics::record_fallback_mode(&inner.name, false);
        (inner.on_restore)();
    }
}
