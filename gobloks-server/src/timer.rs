//! Pausable countdown clocks
//!
//! A running timer owns one tokio task that sleeps until the deadline.
//! Pausing aborts that task and banks the elapsed time, less the bonus.
//! Each start bumps a generation counter so a task that already woke up
//! cannot fire for a run that has since been paused.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("timer started outside a tokio runtime")]
    NoRuntime,
    #[error("timer deadline out of range")]
    DeadlineOverflow,
}

type Callback = Arc<dyn Fn() + Send + Sync>;

struct TimerState {
    remaining: Duration,
    started: Option<Instant>,
    expired: bool,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

pub struct Timer {
    state: Arc<Mutex<TimerState>>,
    bonus: Duration,
    on_expire: Callback,
}

fn lock(state: &Mutex<TimerState>) -> MutexGuard<'_, TimerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Timer {
    pub fn new(budget: Duration, bonus: Duration, on_expire: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState {
                remaining: budget,
                started: None,
                expired: false,
                generation: 0,
                task: None,
            })),
            bonus,
            on_expire: Arc::new(on_expire),
        }
    }

    /// Start counting down. No-op if already running or expired.
    pub fn start(&self) -> Result<(), TimerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let mut state = lock(&self.state);
        if state.expired || state.started.is_some() {
            return Ok(());
        }

        let now = Instant::now();
        let deadline = now
            .checked_add(state.remaining)
            .ok_or(TimerError::DeadlineOverflow)?;
        state.started = Some(now);
        state.generation += 1;
        let generation = state.generation;

        let shared = Arc::clone(&self.state);
        let on_expire = Arc::clone(&self.on_expire);
        state.task = Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut state = lock(&shared);
                if state.generation != generation || state.expired {
                    return;
                }
                state.expired = true;
                state.remaining = Duration::ZERO;
                state.started = None;
                state.task = None;
            }
            on_expire();
        }));
        Ok(())
    }

    /// Stop counting down, charging `max(elapsed - bonus, 0)` to the budget
    pub fn pause(&self) {
        let mut state = lock(&self.state);
        let Some(started) = state.started.take() else {
            return;
        };
        let charged = started.elapsed().saturating_sub(self.bonus);
        state.remaining = state.remaining.saturating_sub(charged);
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).started.is_some()
    }

    pub fn expired(&self) -> bool {
        lock(&self.state).expired
    }

    pub fn time_left(&self) -> Duration {
        let state = lock(&self.state);
        match state.started {
            Some(started) => state.remaining.saturating_sub(started.elapsed()),
            None => state.remaining,
        }
    }

    pub fn time_left_ms(&self) -> u64 {
        self.time_left().as_millis() as u64
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.state).task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("time_left", &self.time_left())
            .field("running", &self.is_running())
            .field("expired", &self.expired())
            .finish()
    }
}
