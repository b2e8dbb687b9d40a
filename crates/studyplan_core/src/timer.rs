//! Focus (pomodoro) timer with an explicit, cancellable tick schedule.
//!
//! # Responsibility
//! - Count down work and break sessions one second per tick.
//! - Alternate work sessions with short breaks, inserting a long break
//!   after every N-th completed work session.
//!
//! # Invariants
//! - At most one tick schedule is active per timer; starting always
//!   cancels the previous schedule first.
//! - Ticks carrying a token other than the active one are ignored, so a
//!   tick already in flight from a cancelled schedule cannot mutate state.
//! - A completed session stops ticking and waits for the next `start`.

use log::info;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Tick period of a running timer.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub work_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    /// Long break after this many completed work sessions.
    pub long_break_every: u32,
}

/// `None` when the minute count does not fit in seconds.
pub fn minutes_to_secs(minutes: u64) -> Option<u64> {
    minutes.checked_mul(60)
}

impl TimerSettings {
    pub fn from_minutes(
        work: u64,
        short_break: u64,
        long_break: u64,
        long_break_every: u32,
    ) -> Option<Self> {
        Some(Self {
            work_secs: minutes_to_secs(work)?,
            short_break_secs: minutes_to_secs(short_break)?,
            long_break_secs: minutes_to_secs(long_break)?,
            long_break_every,
        })
    }

    pub fn duration_secs(&self, kind: SessionKind) -> u64 {
        match kind {
            SessionKind::Work => self.work_secs,
            SessionKind::ShortBreak => self.short_break_secs,
            SessionKind::LongBreak => self.long_break_secs,
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            long_break_every: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::ShortBreak => "short_break",
            Self::LongBreak => "long_break",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Work Session",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }
}

impl Display for SessionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub session: SessionKind,
    pub remaining_secs: u64,
    pub completed_work_sessions: u32,
}

/// Identity of one tick schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickToken(u64);

/// Source of periodic ticks.
pub trait TickScheduler {
    /// Begins delivering ticks tagged with the returned token.
    fn schedule(&mut self, period: Duration) -> TickToken;
    /// Stops the schedule. Unknown tokens are ignored.
    fn cancel(&mut self, token: TickToken);
}

/// Scheduler that only records schedules; ticks are fed by the caller.
#[derive(Debug, Default)]
pub struct ManualTickScheduler {
    next: u64,
    active: Vec<TickToken>,
}

impl ManualTickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tokens(&self) -> &[TickToken] {
        &self.active
    }
}

impl TickScheduler for ManualTickScheduler {
    fn schedule(&mut self, _period: Duration) -> TickToken {
        let token = TickToken(self.next);
        self.next += 1;
        self.active.push(token);
        token
    }

    fn cancel(&mut self, token: TickToken) {
        self.active.retain(|active| *active != token);
    }
}

/// Scheduler backed by one sleeper thread per schedule.
///
/// Ticks arrive on the receiver returned by `new`; the owner forwards them
/// to `FocusTimer::on_tick` on its own thread.
pub struct ThreadTickScheduler {
    sender: Sender<TickToken>,
    next: u64,
    running: HashMap<TickToken, Arc<AtomicBool>>,
}

impl ThreadTickScheduler {
    pub fn new() -> (Self, Receiver<TickToken>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender,
                next: 0,
                running: HashMap::new(),
            },
            receiver,
        )
    }
}

impl TickScheduler for ThreadTickScheduler {
    fn schedule(&mut self, period: Duration) -> TickToken {
        let token = TickToken(self.next);
        self.next += 1;
        let stopped = Arc::new(AtomicBool::new(false));
        let worker_stopped = Arc::clone(&stopped);
        let sender = self.sender.clone();
        thread::spawn(move || loop {
            thread::sleep(period);
            if worker_stopped.load(Ordering::Acquire) || sender.send(token).is_err() {
                break;
            }
        });
        self.running.insert(token, stopped);
        token
    }

    fn cancel(&mut self, token: TickToken) {
        if let Some(stopped) = self.running.remove(&token) {
            stopped.store(true, Ordering::Release);
        }
    }
}

impl Drop for ThreadTickScheduler {
    fn drop(&mut self) {
        for stopped in self.running.values() {
            stopped.store(true, Ordering::Release);
        }
    }
}

/// Result of feeding one tick to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale or unexpected tick; state unchanged.
    Ignored,
    Ticked { remaining_secs: u64 },
    SessionCompleted {
        finished: SessionKind,
        next: SessionKind,
    },
}

pub struct FocusTimer<S: TickScheduler> {
    settings: TimerSettings,
    scheduler: S,
    phase: TimerPhase,
    session: SessionKind,
    remaining_secs: u64,
    completed_work_sessions: u32,
    active: Option<TickToken>,
}

impl<S: TickScheduler> FocusTimer<S> {
    pub fn new(settings: TimerSettings, scheduler: S) -> Self {
        Self {
            settings,
            scheduler,
            phase: TimerPhase::Idle,
            session: SessionKind::Work,
            remaining_secs: settings.work_secs,
            completed_work_sessions: 0,
            active: None,
        }
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase,
            session: self.session,
            remaining_secs: self.remaining_secs,
            completed_work_sessions: self.completed_work_sessions,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Starts or resumes the countdown with a fresh tick schedule.
    pub fn start(&mut self) {
        self.cancel_schedule();
        self.active = Some(self.scheduler.schedule(TICK_PERIOD));
        self.phase = TimerPhase::Running;
        info!(
            "event=timer_start module=timer status=ok session={} remaining_secs={}",
            self.session.as_str(),
            self.remaining_secs
        );
    }

    pub fn pause(&mut self) {
        if self.phase != TimerPhase::Running {
            return;
        }
        self.cancel_schedule();
        self.phase = TimerPhase::Paused;
        info!(
            "event=timer_pause module=timer status=ok session={} remaining_secs={}",
            self.session.as_str(),
            self.remaining_secs
        );
    }

    /// Start/pause button semantics.
    pub fn toggle(&mut self) {
        if self.is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Back to an idle work session with the counter zeroed.
    pub fn reset(&mut self) {
        self.cancel_schedule();
        self.phase = TimerPhase::Idle;
        self.session = SessionKind::Work;
        self.remaining_secs = self.settings.work_secs;
        self.completed_work_sessions = 0;
        info!("event=timer_reset module=timer status=ok");
    }

    pub fn on_tick(&mut self, token: TickToken) -> TickOutcome {
        if self.phase != TimerPhase::Running || self.active != Some(token) {
            return TickOutcome::Ignored;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return TickOutcome::Ticked {
                remaining_secs: self.remaining_secs,
            };
        }

        self.cancel_schedule();
        let finished = self.session;
        let next = match finished {
            SessionKind::Work => {
                self.completed_work_sessions += 1;
                let every = self.settings.long_break_every.max(1);
                if self.completed_work_sessions % every == 0 {
                    SessionKind::LongBreak
                } else {
                    SessionKind::ShortBreak
                }
            }
            SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Work,
        };
        self.session = next;
        self.remaining_secs = self.settings.duration_secs(next);
        self.phase = TimerPhase::Idle;
        info!(
            "event=timer_session module=timer status=completed finished={} next={} completed_work_sessions={}",
            finished.as_str(),
            next.as_str(),
            self.completed_work_sessions
        );
        TickOutcome::SessionCompleted { finished, next }
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_countdown(self.remaining_secs)
    }

    fn cancel_schedule(&mut self) {
        if let Some(token) = self.active.take() {
            self.scheduler.cancel(token);
        }
    }
}

pub fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::{
        format_countdown, FocusTimer, ManualTickScheduler, TickScheduler, ThreadTickScheduler,
        TimerSettings,
    };
    use std::time::Duration;

    #[test]
    fn countdown_formats_minutes_and_seconds() {
        assert_eq!(format_countdown(25 * 60), "25:00");
        assert_eq!(format_countdown(61), "01:01");
        assert_eq!(format_countdown(0), "00:00");
    }

    #[test]
    fn default_settings_are_classic_pomodoro() {
        let settings = TimerSettings::default();
        assert_eq!(settings.work_secs, 1500);
        assert_eq!(settings.short_break_secs, 300);
        assert_eq!(settings.long_break_secs, 900);
        assert_eq!(settings.long_break_every, 4);
        assert_eq!(TimerSettings::from_minutes(25, 5, 15, 4), Some(settings));
    }

    #[test]
    fn minute_conversion_refuses_overflow() {
        assert_eq!(TimerSettings::from_minutes(u64::MAX, 5, 15, 4), None);
        assert_eq!(TimerSettings::from_minutes(25, 5, u64::MAX / 60 + 1, 4), None);
    }

    #[test]
    fn pause_while_idle_is_a_no_op() {
        let mut timer = FocusTimer::new(TimerSettings::default(), ManualTickScheduler::new());
        timer.pause();
        assert!(!timer.is_running());
        assert!(timer.scheduler().active_tokens().is_empty());
    }

    #[test]
    fn thread_scheduler_stops_after_cancel() {
        let (mut scheduler, ticks) = ThreadTickScheduler::new();
        let token = scheduler.schedule(Duration::from_millis(5));
        let first = ticks
            .recv_timeout(Duration::from_secs(2))
            .expect("tick should arrive");
        assert_eq!(first, token);
        scheduler.cancel(token);
        while ticks.recv_timeout(Duration::from_millis(50)).is_ok() {}
        assert!(ticks.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
