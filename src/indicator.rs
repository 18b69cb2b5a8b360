//! Public entry point: run work while a ticker keeps a status line fresh.
//!
//! ```no_run
//! use tickline::ProgressIndicator;
//!
//! let progress = ProgressIndicator::new();
//! progress.set_total(3);
//! progress.set_step("uploading");
//! progress.launch(|p| {
//!     for part in ["a.zip", "b.zip", "c.zip"] {
//!         p.increment_scoped(part, || std::thread::sleep(std::time::Duration::from_millis(50)));
//!     }
//! });
//! ```

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ProgressConfig;
use crate::context::{ContextLease, ContextRegistry};
use crate::format;
use crate::render::{RenderOptions, Snapshot, render};
use crate::error::TickerError;
use crate::sink::DisplaySink;
use crate::stack::MessageStack;
use crate::state::ProgressState;
use crate::ticker::{DEFAULT_DELAY, DEFAULT_STOP_TIMEOUT, Ticker};

/// Per-tick replacement for the default render. Receives an immutable
/// snapshot and the sink of the current display context. It runs under the
/// render lock, so it must not call back into [`ProgressIndicator::update`].
pub type UpdateStrategy = Arc<dyn Fn(&Snapshot, &dyn DisplaySink) + Send + Sync>;

struct Shared {
    state: ProgressState,
    /// Attached by the ticker on its first tick, detached when `launch` ends.
    sink: Mutex<Option<Arc<dyn DisplaySink>>>,
    /// Serializes renders so lines from the ticker and the caller never interleave.
    render_lock: Mutex<()>,
}

impl Shared {
    fn attach(&self, sink: &Arc<dyn DisplaySink>) {
        let mut slot = self.sink.lock();
        if slot.is_none() {
            *slot = Some(Arc::clone(sink));
        }
    }

    fn detach(&self) {
        self.sink.lock().take();
    }

    fn update(&self, options: &RenderOptions) {
        let Some(sink) = self.sink.lock().clone() else {
            return;
        };
        let _render = self.render_lock.lock();
        let line = render(&self.state.snapshot(), options);
        best_effort(|| sink.progress(&line));
    }

    fn update_with(&self, strategy: &UpdateStrategy, sink: &dyn DisplaySink) {
        let _render = self.render_lock.lock();
        let snapshot = self.state.snapshot();
        best_effort(|| strategy(&snapshot, sink));
    }
}

/// Run a sink call, swallowing a panic so display failures never reach the work.
fn best_effort(draw: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(draw)).is_err() {
        tracing::warn!(target: "tickline::launch", "display sink panicked; render skipped");
    }
}

/// Progress of one long-running operation.
///
/// Cloning yields another handle to the same state, so worker threads spawned
/// inside [`ProgressIndicator::launch`] can report too.
#[derive(Clone)]
pub struct ProgressIndicator {
    shared: Arc<Shared>,
    registry: Arc<ContextRegistry>,
    delay: Duration,
    stop_timeout: Duration,
    render_options: RenderOptions,
    updater: Option<UpdateStrategy>,
}

impl Default for ProgressIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressIndicator {
    /// Indicator on the process-wide display context with default timings.
    pub fn new() -> Self {
        Self::with_registry(ContextRegistry::global())
    }

    pub fn with_registry(registry: Arc<ContextRegistry>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: ProgressState::new(),
                sink: Mutex::new(None),
                render_lock: Mutex::new(()),
            }),
            registry,
            delay: DEFAULT_DELAY,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            render_options: RenderOptions::default(),
            updater: None,
        }
    }

    /// Indicator on the process-wide context with timings from `config`.
    pub fn from_config(config: &ProgressConfig) -> Self {
        Self::new()
            .delay(config.delay())
            .stop_timeout(config.stop_timeout())
            .percent_digits(config.percent_digits)
    }

    /// Time between two ticker renders.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn percent_digits(mut self, digits: usize) -> Self {
        self.render_options.percent_digits = digits;
        self
    }

    /// Replace what the ticker does on each tick.
    pub fn updater<F>(mut self, strategy: F) -> Self
    where
        F: Fn(&Snapshot, &dyn DisplaySink) + Send + Sync + 'static,
    {
        self.updater = Some(Arc::new(strategy));
        self
    }

    pub fn state(&self) -> &ProgressState {
        &self.shared.state
    }

    pub fn messages(&self) -> &MessageStack {
        self.shared.state.messages()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.state.snapshot()
    }

    /// Current status line, rendered with this indicator's options.
    pub fn text(&self) -> String {
        render(&self.snapshot(), &self.render_options)
    }

    /// Whether a display sink is attached (between the first tick and the end of `launch`).
    pub fn is_attached(&self) -> bool {
        self.shared.sink.lock().is_some()
    }

    pub fn total(&self) -> u64 {
        self.shared.state.total()
    }

    pub fn set_total(&self, total: u64) {
        self.shared.state.set_total(total);
    }

    pub fn count(&self) -> u64 {
        self.shared.state.count()
    }

    pub fn step(&self) -> String {
        self.shared.state.step()
    }

    pub fn set_step(&self, step: impl Into<String>) {
        self.shared.state.set_step(step);
    }

    pub fn message(&self) -> String {
        self.shared.state.message()
    }

    pub fn reset(&self) {
        self.shared.state.reset();
    }

    pub fn increment(&self) {
        self.shared.state.increment();
    }

    /// Set the message and count one unit.
    pub fn increment_with(&self, message: impl Into<String>) {
        self.shared.state.increment_with(message);
    }

    /// Run `work` as one labelled unit.
    ///
    /// Renders, shows `message` while `work` runs, then counts the unit, drops
    /// the message and renders again. The cleanup also runs when `work`
    /// panics; a `Result` returned by `work` is passed through untouched.
    pub fn increment_scoped<T, F>(&self, message: impl Into<String>, work: F) -> T
    where
        F: FnOnce() -> T,
    {
        let message = message.into();
        self.update();
        self.shared.state.enter_scope(&message);
        let _scope = ScopeGuard {
            indicator: self,
            message,
        };
        work()
    }

    /// Render the current state to the attached sink; no-op while detached.
    pub fn update(&self) {
        self.shared.update(&self.render_options);
    }

    /// Set the message, then [`update`](Self::update).
    pub fn update_with(&self, message: impl Into<String>) {
        self.shared.state.set_message(message);
        self.update();
    }

    /// Run `work` while a background ticker renders the state every `delay`.
    ///
    /// The ticker is stopped and joined before this returns, whether `work`
    /// returns or panics. `work`'s value is returned as is.
    ///
    /// # Panics
    ///
    /// Panics if the ticker thread cannot be stopped within the stop timeout.
    /// A failing display sink is logged and never panics here.
    pub fn launch<T, F>(&self, work: F) -> T
    where
        F: FnOnce(&ProgressIndicator) -> T,
    {
        let lease = self.registry.acquire();
        let mut ticker = Ticker::new(self.delay).with_stop_timeout(self.stop_timeout);

        let shared = Arc::clone(&self.shared);
        let sink = lease.sink();
        let updater = self.updater.clone();
        let options = self.render_options;
        let started = ticker.start(move |tick| {
            shared.state.set_tick_count(tick.ticks());
            shared.attach(&sink);
            match &updater {
                Some(strategy) => shared.update_with(strategy, sink.as_ref()),
                None => shared.update(&options),
            }
            tick.is_active()
        });
        if let Err(e) = started {
            // Keep the work going; scoped renders still reach the sink.
            tracing::warn!(target: "tickline::launch", "progress ticker unavailable: {e}");
            self.shared.attach(&lease.sink());
        }

        let _teardown = LaunchGuard {
            indicator: self,
            ticker,
            _lease: lease,
            started: Instant::now(),
        };
        work(self)
    }
}

struct ScopeGuard<'a> {
    indicator: &'a ProgressIndicator,
    message: String,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.indicator.shared.state.exit_scope(&self.message);
        self.indicator.update();
    }
}

/// Stops the ticker, then releases the display context (field drop order).
struct LaunchGuard<'a> {
    indicator: &'a ProgressIndicator,
    ticker: Ticker,
    _lease: ContextLease,
    started: Instant,
}

impl Drop for LaunchGuard<'_> {
    fn drop(&mut self) {
        let stopped = self.ticker.stop();
        self.indicator.shared.detach();

        let snapshot = self.indicator.snapshot();
        tracing::debug!(
            target: "tickline::launch",
            progress = %format::percent_explained(snapshot.count, snapshot.total),
            ticks = self.ticker.ticks(),
            elapsed = %format::duration(self.started.elapsed()),
            "progress finished"
        );

        match stopped {
            Ok(()) => {}
            Err(e @ TickerError::StopTimeout { .. }) => {
                tracing::error!(target: "tickline::launch", "progress ticker leaked: {e}");
                if !thread::panicking() {
                    panic!("progress ticker could not be stopped: {e}");
                }
            }
            // The thread is joined; only rendering was lost.
            Err(e) => tracing::error!(target: "tickline::launch", "progress ticker failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn indicator_with_sink() -> (ProgressIndicator, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let registry = Arc::new(ContextRegistry::with_sink(sink.clone()));
        let indicator = ProgressIndicator::with_registry(registry).delay(Duration::from_millis(5));
        (indicator, sink)
    }

    struct PanickingSink;

    impl DisplaySink for PanickingSink {
        fn progress(&self, _text: &str) {
            panic!("display gone");
        }
    }

    fn indicator_with_panicking_sink() -> ProgressIndicator {
        let registry = Arc::new(ContextRegistry::with_sink(Arc::new(PanickingSink)));
        ProgressIndicator::with_registry(registry).delay(Duration::from_millis(2))
    }

    fn wait_attached(indicator: &ProgressIndicator) {
        while !indicator.is_attached() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_panicking_sink_does_not_lose_work_value() {
        let indicator = indicator_with_panicking_sink();
        let value = indicator.launch(|p| {
            wait_attached(p);
            thread::sleep(Duration::from_millis(20));
            p.update_with("still going");
            "done"
        });
        assert_eq!(value, "done");
    }

    #[test]
    fn test_panicking_sink_keeps_scoped_error() {
        let indicator = indicator_with_panicking_sink();
        let result: Result<(), String> = indicator.launch(|p| {
            wait_attached(p);
            p.increment_scoped("upload", || Err("refused".to_string()))
        });
        assert_eq!(result, Err("refused".to_string()));
        assert_eq!(indicator.count(), 1);
        assert!(indicator.messages().is_empty());
    }

    #[test]
    fn test_panicking_sink_during_unwinding_work() {
        let indicator = indicator_with_panicking_sink();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            indicator.launch(|p| {
                wait_attached(p);
                p.increment_scoped("crash", || -> () { panic!("work failed") })
            })
        }));
        assert!(outcome.is_err());
        assert_eq!(indicator.count(), 1);
        assert!(indicator.messages().is_empty());
    }

    #[test]
    fn test_update_is_noop_before_attach() {
        let (indicator, sink) = indicator_with_sink();
        indicator.update_with("hello");
        assert!(!indicator.is_attached());
        assert!(sink.lines().is_empty());
        assert_eq!(indicator.message(), "hello");
    }

    #[test]
    fn test_launch_returns_work_value() {
        let (indicator, _sink) = indicator_with_sink();
        let value = indicator.launch(|p| {
            p.increment();
            42
        });
        assert_eq!(value, 42);
        assert_eq!(indicator.count(), 1);
        assert!(!indicator.is_attached());
    }

    #[test]
    fn test_ticker_renders_while_work_runs() {
        let (indicator, sink) = indicator_with_sink();
        indicator.set_total(2);
        indicator.launch(|p| {
            p.increment_with("first");
            thread::sleep(Duration::from_millis(60));
        });
        let lines = sink.lines();
        assert!(!lines.is_empty());
        assert!(lines.iter().any(|line| line.ends_with("1/2|50% # first")));
        assert_eq!(sink.clears(), 1);
    }

    #[test]
    fn test_increment_scoped_cleans_up_on_error() {
        let (indicator, _sink) = indicator_with_sink();
        let result: Result<(), String> =
            indicator.increment_scoped("failing", || Err("boom".to_string()));
        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(indicator.count(), 1);
        assert!(indicator.messages().is_empty());
    }

    #[test]
    fn test_increment_scoped_cleans_up_on_panic() {
        let (indicator, _sink) = indicator_with_sink();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            indicator.increment_scoped("exploding", || -> () { panic!("kaboom") })
        }));
        assert!(outcome.is_err());
        assert_eq!(indicator.count(), 1);
        assert!(indicator.messages().is_empty());
    }

    #[test]
    fn test_scoped_message_visible_during_work() {
        let (indicator, _sink) = indicator_with_sink();
        indicator.set_step("deploy");
        indicator.increment_scoped("package.zip", || {
            assert_eq!(indicator.text(), "\\ deploy # package.zip");
        });
        assert_eq!(indicator.text(), "\\ deploy");
    }

    #[test]
    fn test_custom_updater_replaces_render() {
        let (indicator, sink) = indicator_with_sink();
        let indicator = indicator.updater(|snapshot, sink| {
            sink.progress(&format!("custom {}", snapshot.count));
        });
        indicator.launch(|p| {
            p.increment();
            thread::sleep(Duration::from_millis(40));
        });
        let lines = sink.lines();
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|line| line.starts_with("custom ")));
    }

    #[test]
    fn test_launch_stops_ticker_when_work_panics() {
        let (indicator, sink) = indicator_with_sink();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            indicator.launch(|_| -> () {
                thread::sleep(Duration::from_millis(20));
                panic!("work failed");
            })
        }));
        assert!(outcome.is_err());
        assert!(!indicator.is_attached());
        let rendered = sink.lines().len();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(sink.lines().len(), rendered);
    }
}
