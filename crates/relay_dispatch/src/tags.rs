//! Topic tags — the out-of-band table tying component methods to topics.
//!
//! Stands in for an annotation mechanism: instead of decorating a
//! method at its definition site, the application attaches a tag to
//! `(component type, method name)` before startup. The scanner only
//! ever reads the table.

use std::collections::HashMap;

/// Side table of topic tags keyed by component type and method name.
#[derive(Debug, Clone, Default)]
pub struct TopicTags {
    tags: HashMap<(String, String), String>,
}

impl TopicTags {
    /// Create an empty tag table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a method with a topic. Re-attaching replaces the previous
    /// tag for that method.
    pub fn attach(
        &mut self,
        component: impl Into<String>,
        method: impl Into<String>,
        topic: impl Into<String>,
    ) {
        self.tags
            .insert((component.into(), method.into()), topic.into());
    }

    /// Read the topic tag attached to a method, if any.
    #[must_use]
    pub fn read(&self, component: &str, method: &str) -> Option<&str> {
        self.tags
            .get(&(component.to_string(), method.to_string()))
            .map(String::as_str)
    }

    /// Number of tagged methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the table has no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_and_read() {
        let mut tags = TopicTags::new();
        tags.attach("OrderHandlers", "on_created", "orders.created");
        assert_eq!(
            tags.read("OrderHandlers", "on_created"),
            Some("orders.created")
        );
        assert_eq!(tags.read("OrderHandlers", "untagged"), None);
        assert_eq!(tags.read("Other", "on_created"), None);
    }

    #[test]
    fn test_reattach_replaces() {
        let mut tags = TopicTags::new();
        tags.attach("H", "m", "first");
        tags.attach("H", "m", "second");
        assert_eq!(tags.read("H", "m"), Some("second"));
        assert_eq!(tags.len(), 1);
    }
}
