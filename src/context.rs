//! Ambient display context shared by nested progress calls.
//!
//! A display sink has one owner per registry. The outermost `launch` creates
//! the sink and registers it; nested or concurrent launches find it active and
//! borrow it instead of building a second one. The owner clears the sink when
//! its lease is dropped.

use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

use crate::config::{DisplayMode, ProgressConfig};
use crate::sink::{DisplaySink, NoopSink, TerminalSink, TracingSink};

type SinkFactory = Box<dyn Fn() -> Arc<dyn DisplaySink> + Send + Sync>;

static GLOBAL: OnceLock<Arc<ContextRegistry>> = OnceLock::new();

/// Owner of the active display sink, if any.
pub struct ContextRegistry {
    factory: SinkFactory,
    active: Mutex<Option<Arc<dyn DisplaySink>>>,
}

impl ContextRegistry {
    /// Registry that builds a fresh sink each time an outermost context starts.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn DisplaySink> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            active: Mutex::new(None),
        }
    }

    /// Registry that always hands out the same sink.
    pub fn with_sink(sink: Arc<dyn DisplaySink>) -> Self {
        Self::new(move || Arc::clone(&sink))
    }

    /// Registry whose sink follows `config.display`.
    pub fn from_config(config: &ProgressConfig) -> Self {
        let mode = config.display;
        Self::new(move || sink_for(mode))
    }

    /// Process-wide registry. Uses [`DisplayMode::Auto`] unless one was
    /// installed with [`ContextRegistry::install_global`] before first use.
    pub fn global() -> Arc<ContextRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| {
            Arc::new(Self::from_config(&ProgressConfig::default()))
        }))
    }

    /// Install the process-wide registry. Returns false if one already exists.
    pub fn install_global(registry: ContextRegistry) -> bool {
        GLOBAL.set(Arc::new(registry)).is_ok()
    }

    /// Whether some launch currently owns a display context.
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Join the active context, or create and own one if none is active.
    pub fn acquire(self: &Arc<Self>) -> ContextLease {
        let mut active = self.active.lock();
        let (sink, owner) = match active.as_ref() {
            Some(sink) => (Arc::clone(sink), false),
            None => {
                let sink = (self.factory)();
                *active = Some(Arc::clone(&sink));
                (sink, true)
            }
        };
        tracing::trace!(target: "tickline::context", owner, "display context acquired");
        ContextLease {
            registry: Arc::clone(self),
            sink,
            owner,
        }
    }
}

fn sink_for(mode: DisplayMode) -> Arc<dyn DisplaySink> {
    match mode {
        DisplayMode::Auto => {
            use is_terminal::IsTerminal;
            if std::io::stderr().is_terminal() {
                Arc::new(TerminalSink::with_ansi(true))
            } else {
                Arc::new(TracingSink::new())
            }
        }
        DisplayMode::Terminal => Arc::new(TerminalSink::new()),
        DisplayMode::Log => Arc::new(TracingSink::new()),
        DisplayMode::None => Arc::new(NoopSink),
    }
}

/// Participation in a display context; the owner tears it down on drop.
pub struct ContextLease {
    registry: Arc<ContextRegistry>,
    sink: Arc<dyn DisplaySink>,
    owner: bool,
}

impl ContextLease {
    pub fn sink(&self) -> Arc<dyn DisplaySink> {
        Arc::clone(&self.sink)
    }

    /// True if this lease created the context.
    pub fn is_owner(&self) -> bool {
        self.owner
    }
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        if !self.owner {
            return;
        }
        self.registry.active.lock().take();
        self.sink.clear();
        tracing::trace!(target: "tickline::context", "display context released");
    }
}
