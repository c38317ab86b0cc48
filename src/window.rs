//! Pure start/stop window logic for scheduled actions.
//!
//! Nothing here reads a clock or touches storage: every decision is a function of
//! the persisted flags and the `now` passed in, so it can be re-derived on every
//! sweep without double-firing.

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Ms;

/// The persisted flags an action's lifecycle depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionWindow {
    pub start_at: Option<Ms>,
    pub stop_at: Option<Ms>,
    pub started: bool,
    pub stopped: bool,
    pub force_start_now: bool,
    pub force_run_now: bool,
}

/// Lifecycle state derived from the `(started, stopped)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Pending,
    Active,
    Ended,
}

/// What a run should do for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Start,
    Stop,
    /// The window closed before the action ever started: start fires, then stop.
    StartThenStop,
    /// Re-fire the activate effect of an already active, repeatable action.
    Reapply,
}

impl ActionWindow {
    /// Both ends set and `start_at < stop_at`.
    pub fn is_ready(&self) -> bool {
        matches!((self.start_at, self.stop_at), (Some(start), Some(stop)) if start < stop)
    }

    pub fn state(&self) -> ActionState {
        match (self.started, self.stopped) {
            (_, true) => ActionState::Ended,
            (true, false) => ActionState::Active,
            (false, false) => ActionState::Pending,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.started && !self.stopped
    }

    pub fn is_in_now(&self, now: Ms) -> bool {
        matches!((self.start_at, self.stop_at), (Some(start), Some(stop)) if start < now && now < stop)
    }

    pub fn is_in_past(&self, now: Ms) -> bool {
        self.stop_at.is_some_and(|stop| stop < now)
    }

    pub fn is_in_future(&self, now: Ms) -> bool {
        self.start_at.is_some_and(|start| start > now)
    }

    pub fn should_start(&self, now: Ms) -> bool {
        if self.stopped || self.started {
            return false;
        }
        if self.force_start_now {
            return true;
        }
        self.is_in_now(now)
    }

    pub fn should_stop(&self, now: Ms) -> bool {
        if self.stopped {
            return false;
        }
        // Force-start on a running action is the panic stop.
        if self.started && self.force_start_now {
            return true;
        }
        self.stop_at.is_some_and(|stop| now > stop)
    }
}

/// Decide the transition for one run. Not-ready windows never transition.
pub fn compute_transition(window: &ActionWindow, now: Ms, repeatable: bool) -> Transition {
    if !window.is_ready() || window.stopped {
        return Transition::None;
    }
    let start = window.should_start(now);
    let stop = window.should_stop(now);
    match (start, stop) {
        (true, true) => Transition::StartThenStop,
        (true, false) => Transition::Start,
        (false, true) => {
            if window.started {
                Transition::Stop
            } else {
                Transition::StartThenStop
            }
        }
        (false, false) => {
            if repeatable && window.is_activated() && window.force_run_now && window.is_in_now(now) {
                Transition::Reapply
            } else {
                Transition::None
            }
        }
    }
}

/// Default window for a new action: 00:01 on the first day of next month until
/// 23:59 on the last day of next month, UTC.
pub fn next_month_window(now: Ms) -> Option<(Ms, Ms)> {
    let now = Utc.timestamp_millis_opt(now).single()?;
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (after_year, after_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let last = NaiveDate::from_ymd_opt(after_year, after_month, 1)? - Duration::days(1);
    let start = first.and_hms_opt(0, 1, 0)?.and_utc().timestamp_millis();
    let stop = last.and_hms_opt(23, 59, 0)?.and_utc().timestamp_millis();
    Some((start, stop))
}

/// `dd-mm-YYYY` for action titles; `?` when the instant is unset.
pub fn format_day(at: Option<Ms>) -> String {
    at.and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format("%d-%m-%Y").to_string())
        .unwrap_or_else(|| "?".to_string())
}
