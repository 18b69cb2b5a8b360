//! Thread-safe queue of messages for nested scoped steps.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Active scoped messages in insertion order. Duplicates are allowed.
///
/// The head (oldest entry) is what the status line shows. Removal is by value
/// and drops the first equal entry, which is not necessarily the one the
/// caller pushed when labels repeat.
#[derive(Debug, Default)]
pub struct MessageStack {
    entries: Mutex<VecDeque<String>>,
}

impl MessageStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: impl Into<String>) {
        self.entries.lock().push_back(message.into());
    }

    /// Remove the first entry equal to `message`. Returns whether one was found.
    pub fn remove(&self, message: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|entry| entry == message) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Oldest still-active message.
    pub fn head(&self) -> Option<String> {
        self.entries.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of all entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_head_is_oldest() {
        let stack = MessageStack::new();
        assert_eq!(stack.head(), None);
        stack.push("a");
        stack.push("b");
        assert_eq!(stack.head().as_deref(), Some("a"));
    }

    #[test]
    fn test_remove_oldest_exposes_next() {
        let stack = MessageStack::new();
        stack.push("a");
        stack.push("b");
        assert!(stack.remove("a"));
        assert_eq!(stack.head().as_deref(), Some("b"));
    }

    #[test]
    fn test_remove_newest_keeps_head() {
        let stack = MessageStack::new();
        stack.push("a");
        stack.push("b");
        assert!(stack.remove("b"));
        assert_eq!(stack.head().as_deref(), Some("a"));
    }

    #[test]
    fn test_remove_duplicate_drops_exactly_one() {
        let stack = MessageStack::new();
        stack.push("x");
        stack.push("x");
        assert!(stack.remove("x"));
        assert_eq!(stack.entries(), vec!["x".to_string()]);
    }

    #[test]
    fn test_remove_missing() {
        let stack = MessageStack::new();
        stack.push("a");
        assert!(!stack.remove("z"));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_concurrent_push_remove() {
        let stack = Arc::new(MessageStack::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stack = Arc::clone(&stack);
                thread::spawn(move || {
                    for j in 0..100 {
                        let label = format!("{i}-{j}");
                        stack.push(label.clone());
                        assert!(stack.remove(&label));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(stack.is_empty());
    }
}
