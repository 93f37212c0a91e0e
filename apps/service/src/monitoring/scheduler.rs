use std::time::{Duration, Instant};

/// Burst-mode tick period
pub const STARTUP_WATCH_TICK: Duration = Duration::from_secs(1);

/// Burst-mode duration cap
pub const STARTUP_WATCH_CAP: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerMode {
    Stopped,
    Normal,
    StartupWatch,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Stopped,
    Normal { interval: Duration },
    StartupWatch { tick: Duration, entered: Instant, cap: Duration },
}

/// Timing state machine for the engine's sweep loop.
///
/// Owns the single armed deadline: every mode switch cancels the previous
/// deadline before arming the next, so two timers can never coexist. The
/// scheduler itself never sleeps: the engine's select loop sleeps until
/// `next_fire` and reports back through `on_fired`. Keeping the transitions
/// pure over caller-supplied instants keeps them testable without timers.
#[derive(Debug)]
pub struct Scheduler {
    state: State,
    next_fire: Option<Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { state: State::Stopped, next_fire: None }
    }

    pub fn mode(&self) -> SchedulerMode {
        match self.state {
            State::Stopped => SchedulerMode::Stopped,
            State::Normal { .. } => SchedulerMode::Normal,
            State::StartupWatch { .. } => SchedulerMode::StartupWatch,
        }
    }

    pub fn in_startup_watch(&self) -> bool {
        self.mode() == SchedulerMode::StartupWatch
    }

    /// The currently armed deadline, if any
    pub fn next_fire(&self) -> Option<Instant> {
        self.next_fire
    }

    /// Enter Normal mode: an immediate sweep, then one every `interval`.
    pub fn start_normal(&mut self, interval: Duration, now: Instant) {
        self.state = State::Normal { interval };
        self.next_fire = Some(now);
    }

    /// Enter the startup watch: an immediate sweep, then one every tick
    /// until the cap elapses or the engine reports every enabled target up.
    pub fn enter_startup_watch(&mut self, now: Instant) {
        self.state = State::StartupWatch {
            tick: STARTUP_WATCH_TICK,
            entered: now,
            cap: STARTUP_WATCH_CAP,
        };
        self.next_fire = Some(now);
    }

    /// Cancel whichever deadline is armed.
    pub fn stop(&mut self) {
        self.state = State::Stopped;
        self.next_fire = None;
    }

    /// Apply a new interval. In Normal mode the deadline is re-armed so the
    /// change takes effect immediately rather than after the current period;
    /// the startup watch keeps its own cadence and picks the interval up on
    /// return to Normal; nothing is armed while stopped.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        if let State::Normal { interval: current } = &mut self.state {
            *current = interval;
            self.next_fire = Some(now + interval);
        }
    }

    /// Advance past a fired deadline, arming the next one.
    pub fn on_fired(&mut self, now: Instant) {
        self.next_fire = match self.state {
            State::Stopped => None,
            State::Normal { interval } => Some(now + interval),
            State::StartupWatch { tick, .. } => Some(now + tick),
        };
    }

    /// Re-arm an immediate fire without changing mode. No-op while stopped.
    pub fn rearm_now(&mut self, now: Instant) {
        if !matches!(self.state, State::Stopped) {
            self.next_fire = Some(now);
        }
    }

    /// Time left before the burst cap, while the startup watch is active
    pub fn burst_remaining(&self, now: Instant) -> Option<Duration> {
        match self.state {
            State::StartupWatch { entered, cap, .. } => {
                Some(cap.saturating_sub(now.duration_since(entered)))
            }
            _ => None,
        }
    }

    /// Whether the startup watch should end: the cap has elapsed, or every
    /// enabled target is up. Zero enabled targets never satisfies the all-up
    /// condition; an empty burst runs to its cap.
    pub fn burst_should_exit(&self, now: Instant, up_count: usize, enabled_count: usize) -> bool {
        match self.state {
            State::StartupWatch { entered, cap, .. } => {
                now.duration_since(entered) >= cap
                    || (enabled_count > 0 && up_count == enabled_count)
            }
            _ => false,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
