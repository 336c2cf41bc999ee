//! The topic→handler dispatch table.
//!
//! Populated once by the scanner, then shared read-only with the
//! router. The single-writer-then-freeze discipline means reads need
//! no locking after startup.

use std::collections::HashMap;

use crate::handler::HandlerBinding;

/// Mapping from topic name to its single registered handler.
#[derive(Debug, Default)]
pub struct DispatchTable {
    handlers: HashMap<String, HandlerBinding>,
}

impl DispatchTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Insert or overwrite the handler for a topic.
    ///
    /// Returns the displaced binding when the topic was already
    /// registered, so the caller can report the overwrite.
    pub fn register(&mut self, binding: HandlerBinding) -> Option<HandlerBinding> {
        self.handlers.insert(binding.topic.clone(), binding)
    }

    /// Look up the handler registered for a topic.
    #[must_use]
    pub fn resolve(&self, topic: &str) -> Option<&HandlerBinding> {
        self.handlers.get(topic)
    }

    /// All registered topic names, sorted for deterministic
    /// subscription requests.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.handlers.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Number of registered topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn make_binding(topic: &str, method: &'static str) -> HandlerBinding {
        HandlerBinding::new(
            topic,
            "TestComponent",
            method,
            Arc::new(|_, _, _| Box::pin(async { Ok(()) })),
        )
    }

    #[test]
    fn test_register_and_resolve() {
        let mut table = DispatchTable::new();
        assert!(table.register(make_binding("orders", "on_order")).is_none());
        let binding = table.resolve("orders").expect("registered topic");
        assert_eq!(binding.method, "on_order");
        assert!(table.resolve("missing").is_none());
    }

    #[test]
    fn test_register_overwrites_and_returns_displaced() {
        let mut table = DispatchTable::new();
        table.register(make_binding("orders", "first"));
        let displaced = table
            .register(make_binding("orders", "second"))
            .expect("previous binding displaced");
        assert_eq!(displaced.method, "first");

        // Exactly one active binding remains, the later one.
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("orders").unwrap().method, "second");
    }

    #[test]
    fn test_topics_sorted() {
        let mut table = DispatchTable::new();
        table.register(make_binding("b", "mb"));
        table.register(make_binding("a", "ma"));
        table.register(make_binding("c", "mc"));
        assert_eq!(table.topics(), vec!["a", "b", "c"]);
    }
}
