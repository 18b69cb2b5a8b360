//! Shared counters and labels of one in-flight operation.
//!
//! All fields sit behind a single mutex so a reader never sees a half-applied
//! mutation. The [`MessageStack`] has its own lock; whenever both are held the
//! state lock is taken first.

use parking_lot::Mutex;

use crate::render::Snapshot;
use crate::stack::MessageStack;

#[derive(Debug, Default)]
struct Fields {
    total: u64,
    count: u64,
    step: String,
    message: String,
    tick_count: u64,
}

/// Mutable progress of one operation, safe to share between threads.
#[derive(Debug, Default)]
pub struct ProgressState {
    fields: Mutex<Fields>,
    messages: MessageStack,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear `message` and zero `count`. `total` and `step` are kept.
    pub fn reset(&self) {
        let mut fields = self.fields.lock();
        fields.message.clear();
        fields.count = 0;
    }

    pub fn increment(&self) {
        self.fields.lock().count += 1;
    }

    /// Set `message` and bump `count` in one critical section.
    pub fn increment_with(&self, message: impl Into<String>) {
        let message = message.into();
        let mut fields = self.fields.lock();
        fields.message = message;
        fields.count += 1;
    }

    pub fn total(&self) -> u64 {
        self.fields.lock().total
    }

    pub fn set_total(&self, total: u64) {
        self.fields.lock().total = total;
    }

    pub fn count(&self) -> u64 {
        self.fields.lock().count
    }

    pub fn set_count(&self, count: u64) {
        self.fields.lock().count = count;
    }

    pub fn step(&self) -> String {
        self.fields.lock().step.clone()
    }

    pub fn set_step(&self, step: impl Into<String>) {
        self.fields.lock().step = step.into();
    }

    pub fn message(&self) -> String {
        self.fields.lock().message.clone()
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.fields.lock().message = message.into();
    }

    pub fn tick_count(&self) -> u64 {
        self.fields.lock().tick_count
    }

    pub(crate) fn set_tick_count(&self, ticks: u64) {
        self.fields.lock().tick_count = ticks;
    }

    pub fn messages(&self) -> &MessageStack {
        &self.messages
    }

    /// Enter a scoped step: its message becomes a stack entry.
    pub(crate) fn enter_scope(&self, message: &str) {
        let _fields = self.fields.lock();
        self.messages.push(message);
    }

    /// Leave a scoped step: count it and drop its message atomically.
    pub(crate) fn exit_scope(&self, message: &str) {
        let mut fields = self.fields.lock();
        fields.count += 1;
        self.messages.remove(message);
    }

    /// Consistent copy of the state and the head of the message stack.
    pub fn snapshot(&self) -> Snapshot {
        let fields = self.fields.lock();
        Snapshot {
            count: fields.count,
            total: fields.total,
            step: fields.step.clone(),
            message: fields.message.clone(),
            active_message: self.messages.head(),
            tick_count: fields.tick_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_reset_keeps_total_and_step() {
        let state = ProgressState::new();
        state.set_total(10);
        state.set_step("uploading");
        state.increment_with("part-1");
        state.reset();
        assert_eq!(state.count(), 0);
        assert_eq!(state.message(), "");
        assert_eq!(state.total(), 10);
        assert_eq!(state.step(), "uploading");
    }

    #[test]
    fn test_increment_with_sets_message() {
        let state = ProgressState::new();
        state.increment_with("one");
        state.increment_with("two");
        assert_eq!(state.count(), 2);
        assert_eq!(state.message(), "two");
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let state = Arc::new(ProgressState::new());
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || state.increment())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(state.count(), 100);
    }

    #[test]
    fn test_snapshot_uses_stack_head() {
        let state = ProgressState::new();
        state.set_message("plain");
        state.enter_scope("outer");
        state.enter_scope("inner");
        let snapshot = state.snapshot();
        assert_eq!(snapshot.visible_message(), "outer");

        state.exit_scope("outer");
        state.exit_scope("inner");
        let snapshot = state.snapshot();
        assert_eq!(snapshot.visible_message(), "plain");
        assert_eq!(snapshot.count, 2);
    }

    #[test]
    fn test_snapshot_never_torn() {
        let state = Arc::new(ProgressState::new());
        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for i in 1..=1000u64 {
                    state.increment_with(i.to_string());
                }
            })
        };
        for _ in 0..1000 {
            let snapshot = state.snapshot();
            if snapshot.count > 0 {
                assert_eq!(snapshot.message, snapshot.count.to_string());
            }
        }
        writer.join().unwrap();
    }
}
