//! Leading/trailing/max-wait debounce on the Tokio timer.
//!
//! Semantics follow the classic debounce contract: calls within `wait` of
//! each other collapse into one invocation with the latest arguments; a
//! `max_wait` bounds how long invocation can be postponed; `cancel` drops a
//! pending trailing call and `flush` runs it immediately.
//!
//! The timer is a spawned Tokio task, so [`Debouncer::call`] must run inside
//! a Tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// Timing configuration for a [`Debouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceOptions {
    /// Quiet period after the last call before the trailing invocation
    pub wait_ms: u64,
    /// Invoke on the first call of a burst
    pub leading: bool,
    /// Invoke after the burst settles
    pub trailing: bool,
    /// Longest time invocation may be deferred during a continuous burst
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_ms: Option<u64>,
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            wait_ms: 0,
            leading: false,
            trailing: true,
            max_wait_ms: None,
        }
    }
}

impl DebounceOptions {
    pub fn trailing(wait_ms: u64) -> Self {
        Self {
            wait_ms,
            ..Self::default()
        }
    }

    pub fn with_leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    pub fn with_trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn with_max_wait(mut self, max_wait_ms: u64) -> Self {
        self.max_wait_ms = Some(max_wait_ms);
        self
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    /// Effective max wait; never shorter than `wait`.
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms
            .map(|ms| Duration::from_millis(ms.max(self.wait_ms)))
    }
}

struct DebounceState<A> {
    last_args: Option<A>,
    last_call_time: Option<Instant>,
    last_invoke_time: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    /// Identifies the live timer; stale timer tasks compare and bail out
    timer_generation: u64,
}

struct Inner<A> {
    func: Box<dyn Fn(A) + Send + Sync>,
    wait: Duration,
    max_wait: Option<Duration>,
    leading: bool,
    trailing: bool,
    state: Mutex<DebounceState<A>>,
}

/// Debounced wrapper around a callback taking arguments `A`.
pub struct Debouncer<A> {
    inner: Arc<Inner<A>>,
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new(options: DebounceOptions, func: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                func: Box::new(func),
                wait: options.wait(),
                max_wait: options.max_wait(),
                leading: options.leading,
                trailing: options.trailing,
                state: Mutex::new(DebounceState {
                    last_args: None,
                    last_call_time: None,
                    last_invoke_time: None,
                    timer: None,
                    timer_generation: 0,
                }),
            }),
        }
    }

    /// Record a call. The callback runs now (leading edge, or max-wait
    /// elapsed) or later from the timer.
    pub fn call(&self, args: A) {
        let inner = &self.inner;
        let time = Instant::now();
        let mut state = inner.lock();

        let is_invoking = inner.should_invoke(&state, time);
        state.last_args = Some(args);
        state.last_call_time = Some(time);

        if is_invoking {
            if state.timer.is_none() {
                // Leading edge of a new burst
                state.last_invoke_time = Some(time);
                Inner::start_timer(inner, &mut state, inner.wait);
                let args = if inner.leading {
                    state.last_args.take()
                } else {
                    None
                };
                drop(state);
                inner.invoke(args);
                return;
            }
            if inner.max_wait.is_some() {
                // Continuous burst hit max_wait: invoke and keep the timer running
                Inner::start_timer(inner, &mut state, inner.wait);
                state.last_invoke_time = Some(time);
                let args = state.last_args.take();
                drop(state);
                inner.invoke(args);
                return;
            }
        }

        if state.timer.is_none() {
            Inner::start_timer(inner, &mut state, inner.wait);
        }
    }

    /// Drop any pending invocation and reset timing state.
    pub fn cancel(&self) {
        let mut state = self.inner.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.timer_generation += 1;
        state.last_args = None;
        state.last_call_time = None;
        state.last_invoke_time = None;
        trace!("debounce cancelled");
    }

    /// Run a pending trailing invocation immediately.
    pub fn flush(&self) {
        let mut state = self.inner.lock();
        if state.timer.is_none() {
            return;
        }
        let args = self.inner.trailing_edge(&mut state, Instant::now());
        drop(state);
        self.inner.invoke(args);
    }

    /// Whether a timer is running, i.e. a trailing invocation may still happen.
    pub fn is_pending(&self) -> bool {
        self.inner.lock().timer.is_some()
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

impl<A: Send + 'static> Inner<A> {
    fn lock(&self) -> MutexGuard<'_, DebounceState<A>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn should_invoke(&self, state: &DebounceState<A>, time: Instant) -> bool {
        let Some(last_call) = state.last_call_time else {
            return true;
        };
        if time.duration_since(last_call) >= self.wait {
            return true;
        }
        match (self.max_wait, state.last_invoke_time) {
            (Some(max_wait), Some(last_invoke)) => time.duration_since(last_invoke) >= max_wait,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn remaining_wait(&self, state: &DebounceState<A>, time: Instant) -> Duration {
        let since_call = state
            .last_call_time
            .map(|t| time.duration_since(t))
            .unwrap_or_default();
        let waiting = self.wait.saturating_sub(since_call);
        match (self.max_wait, state.last_invoke_time) {
            (Some(max_wait), Some(last_invoke)) => {
                waiting.min(max_wait.saturating_sub(time.duration_since(last_invoke)))
            }
            _ => waiting,
        }
    }

    /// Clear the timer and hand back the arguments to invoke with, if any.
    fn trailing_edge(&self, state: &mut DebounceState<A>, time: Instant) -> Option<A> {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.timer_generation += 1;
        if self.trailing && state.last_args.is_some() {
            state.last_invoke_time = Some(time);
            return state.last_args.take();
        }
        state.last_args = None;
        None
    }

    fn start_timer(inner: &Arc<Self>, state: &mut DebounceState<A>, delay: Duration) {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.timer_generation += 1;
        let generation = state.timer_generation;
        let weak: Weak<Self> = Arc::downgrade(inner);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                Inner::timer_expired(&inner, generation);
            }
        }));
    }

    fn timer_expired(inner: &Arc<Self>, generation: u64) {
        let time = Instant::now();
        let mut state = inner.lock();
        if state.timer_generation != generation {
            return;
        }

        if inner.should_invoke(&state, time) {
            // Our own handle: detach instead of aborting the running task
            state.timer.take();
            state.timer_generation += 1;
            let args = if inner.trailing && state.last_args.is_some() {
                state.last_invoke_time = Some(time);
                state.last_args.take()
            } else {
                state.last_args = None;
                None
            };
            drop(state);
            inner.invoke(args);
        } else {
            let remaining = inner.remaining_wait(&state, time);
            state.timer.take();
            Inner::start_timer(inner, &mut state, remaining);
        }
    }

    fn invoke(&self, args: Option<A>) {
        if let Some(args) = args {
            trace!("debounced call invoked");
            (self.func)(args);
        }
    }
}
