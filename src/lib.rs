//! Progress line for long-running work made of many small steps.
//!
//! A [`ProgressIndicator`] holds counters and labels that the work updates
//! from any thread. While [`ProgressIndicator::launch`] runs the work, a
//! background [`Ticker`] renders the state every few milliseconds to the
//! [`DisplaySink`] of the ambient display context ([`ContextRegistry`]).

pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod indicator;
pub mod logging;
pub mod render;
pub mod sink;
pub mod stack;
pub mod state;
pub mod ticker;

pub use config::{DisplayMode, LoggingConfig, ProgressConfig, Settings};
pub use context::{ContextLease, ContextRegistry};
pub use error::{ConfigError, TickerError};
pub use indicator::{ProgressIndicator, UpdateStrategy};
pub use render::{RenderOptions, Snapshot, render};
pub use sink::{DisplaySink, MemorySink, NoopSink, TerminalSink, TracingSink};
pub use stack::MessageStack;
pub use state::ProgressState;
pub use ticker::{TickContext, Ticker, TickerState};
