//! Fixed-delay background ticker with cooperative cancellation and join.
//!
//! The loop sleeps by waiting on a cancellation channel, so [`Ticker::stop`]
//! wakes it immediately instead of waiting out the current delay. The thread
//! owns the sending half of a completion channel; when the thread exits (or
//! unwinds) the channel disconnects, which is what `stop` waits for.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{TickerError, TickerResult};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a [`Ticker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TickerState {
    Idle = 0,
    Running = 1,
    Cancelling = 2,
    Stopped = 3,
}

impl TickerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TickerState::Idle,
            1 => TickerState::Running,
            2 => TickerState::Cancelling,
            _ => TickerState::Stopped,
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    ticks: AtomicU64,
    active: AtomicBool,
}

impl Shared {
    fn set_state(&self, state: TickerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// What a tick hook gets to see.
pub struct TickContext<'a> {
    ticks: u64,
    shared: &'a Shared,
}

impl TickContext<'_> {
    /// Number of ticks so far, including this one.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// False once cancellation was requested. Long hooks should poll this.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }
}

struct Control {
    cancel_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

/// Runs a hook every `delay` on a dedicated thread until stopped.
pub struct Ticker {
    delay: Duration,
    stop_timeout: Duration,
    shared: Arc<Shared>,
    control: Option<Control>,
}

impl Ticker {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            shared: Arc::new(Shared {
                state: AtomicU8::new(TickerState::Idle as u8),
                ticks: AtomicU64::new(0),
                active: AtomicBool::new(false),
            }),
            control: None,
        }
    }

    /// How long [`Ticker::stop`] waits for the thread before giving up.
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> TickerState {
        TickerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Acquire)
    }

    /// Spawn the ticker thread. The first tick fires after one `delay`.
    ///
    /// The hook returns whether the loop should continue.
    pub fn start<F>(&mut self, mut hook: F) -> TickerResult<()>
    where
        F: FnMut(&TickContext<'_>) -> bool + Send + 'static,
    {
        if self.state() != TickerState::Idle {
            return Err(TickerError::AlreadyStarted);
        }

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let (done_tx, done_rx) = bounded::<()>(0);
        let shared = Arc::clone(&self.shared);
        let delay = self.delay;

        shared.active.store(true, Ordering::Release);
        let handle = thread::Builder::new()
            .name("tickline-ticker".to_string())
            .spawn(move || {
                // Disconnects the completion channel on every exit path.
                let _done = done_tx;
                loop {
                    match cancel_rx.recv_timeout(delay) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    if !shared.active.load(Ordering::Acquire) {
                        break;
                    }
                    let ticks = shared.ticks.fetch_add(1, Ordering::AcqRel) + 1;
                    let context = TickContext {
                        ticks,
                        shared: &shared,
                    };
                    if !hook(&context) {
                        break;
                    }
                }
            });

        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.active.store(false, Ordering::Release);
                return Err(TickerError::Spawn(e));
            }
        };

        self.control = Some(Control {
            cancel_tx,
            done_rx,
            handle,
        });
        self.shared.set_state(TickerState::Running);
        tracing::debug!(target: "tickline::ticker", delay_ms = delay.as_millis() as u64, "ticker started");
        Ok(())
    }

    /// Request cancellation and block until the thread has exited.
    ///
    /// Calling it again, or on a ticker that never started, returns at once.
    pub fn stop(&mut self) -> TickerResult<()> {
        let Some(control) = self.control.take() else {
            if self.state() == TickerState::Idle {
                self.shared.set_state(TickerState::Stopped);
            }
            return Ok(());
        };

        self.shared.set_state(TickerState::Cancelling);
        self.shared.active.store(false, Ordering::Release);
        // The thread may already be gone if the hook asked to stop.
        let _ = control.cancel_tx.try_send(());

        match control.done_rx.recv_timeout(self.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                return Err(TickerError::StopTimeout {
                    waited: self.stop_timeout,
                });
            }
        }

        let joined = control.handle.join();
        self.shared.set_state(TickerState::Stopped);
        tracing::debug!(target: "tickline::ticker", ticks = self.ticks(), "ticker stopped");
        joined.map_err(|_| TickerError::HookPanicked)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!(target: "tickline::ticker", "failed to stop ticker on drop: {e}");
        }
    }
}
