//! Debounced click and double blink state machine.
//!
//! Closed-eye readings arrive every frame a blink lasts. A primary click
//! fires only when the last click is more than `cooldown` in the past; the
//! secondary action additionally needs the previous *fired* blink to be less
//! than `double_blink_window` ago. Suppressed readings leave the timers
//! untouched, so with `double_blink_window <= cooldown` the secondary action
//! can never fire. That limitation is kept as-is.

use log::{debug, info};
use std::time::Duration;

/// Timestamps of the last fired click, as offsets from session start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickTimerState {
    pub last_click: Option<Duration>,
    pub last_blink: Option<Duration>,
}

/// What a reading asks the action sink to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Nothing to do
    None,
    /// Primary click
    Click,
    /// Primary click followed by the secondary compound key action
    ClickAndSecondary,
}

impl ClickAction {
    #[must_use]
    pub const fn clicks(self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub const fn secondary(self) -> bool {
        matches!(self, Self::ClickAndSecondary)
    }
}

/// Cooldown and double blink logic
#[derive(Debug, Clone)]
pub struct ClickStateMachine {
    cooldown: Duration,
    double_blink_window: Duration,
    timers: ClickTimerState,
}

impl ClickStateMachine {
    #[must_use]
    pub fn new(cooldown: Duration, double_blink_window: Duration) -> Self {
        Self {
            cooldown,
            double_blink_window,
            timers: ClickTimerState::default(),
        }
    }

    #[must_use]
    pub const fn timers(&self) -> ClickTimerState {
        self.timers
    }

    /// Whether two fired blinks can ever be close enough for the secondary
    /// action
    #[must_use]
    pub fn secondary_reachable(&self) -> bool {
        self.double_blink_window > self.cooldown
    }

    /// Whether `now` still falls inside the cooldown of the last click
    ///
    /// A timestamp earlier than the last click counts as inside.
    #[must_use]
    pub fn in_cooldown(&self, now: Duration) -> bool {
        self.timers
            .last_click
            .is_some_and(|last| now.saturating_sub(last) <= self.cooldown)
    }

    /// Feed one frame's classification taken at `now`
    pub fn update(&mut self, closed: bool, now: Duration) -> ClickAction {
        if !closed {
            return ClickAction::None;
        }
        if self.in_cooldown(now) {
            debug!("Blink at {:.3}s suppressed by cooldown", now.as_secs_f64());
            return ClickAction::None;
        }

        let double = self
            .timers
            .last_blink
            .is_some_and(|last| now.saturating_sub(last) < self.double_blink_window);

        self.timers.last_blink = Some(now);
        self.timers.last_click = Some(now);

        if double {
            info!("Double blink at {:.3}s", now.as_secs_f64());
            ClickAction::ClickAndSecondary
        } else {
            info!("Blink click at {:.3}s", now.as_secs_f64());
            ClickAction::Click
        }
    }

    /// Forget all timers
    pub fn reset(&mut self) {
        self.timers = ClickTimerState::default();
    }
}
