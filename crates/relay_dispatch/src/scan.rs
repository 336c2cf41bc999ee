//! Metadata scan — discovers tagged handler methods and populates the
//! dispatch table.
//!
//! One-shot and eager: the scan runs once during startup, walking every
//! registered component's method names against the topic-tag table.
//! Components registered after startup are never picked up.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::handler::{HandlerBinding, HandlerComponent};
use crate::table::DispatchTable;
use crate::tags::TopicTags;

/// Walks component instances and registers their tagged methods.
#[derive(Debug)]
pub struct SubscriberScanner<'a> {
    tags: &'a TopicTags,
}

impl<'a> SubscriberScanner<'a> {
    /// Create a scanner reading from the given tag table.
    #[must_use]
    pub fn new(tags: &'a TopicTags) -> Self {
        Self { tags }
    }

    /// Scan every component and register all tagged methods into the
    /// table.
    ///
    /// A tagged method the component cannot bind is skipped with a
    /// diagnostic rather than aborting the scan. When two methods are
    /// tagged with the same topic, the later registration wins and the
    /// overwrite is reported.
    pub fn scan(&self, components: &[Arc<dyn HandlerComponent>], table: &mut DispatchTable) {
        for component in components {
            for method in component.method_names() {
                self.explore_method(component, method, table);
            }
        }
        debug!(topics = table.len(), "scan complete");
    }

    fn explore_method(
        &self,
        component: &Arc<dyn HandlerComponent>,
        method: &'static str,
        table: &mut DispatchTable,
    ) {
        let type_name = component.type_name();
        let Some(topic) = self.tags.read(type_name, method) else {
            return;
        };

        let Some(handler) = component.clone().bind(method) else {
            warn!(
                component = type_name,
                method, topic, "tagged method is not bindable, skipping"
            );
            return;
        };

        let binding = HandlerBinding::new(topic, type_name, method, handler);
        if let Some(displaced) = table.register(binding) {
            let previous = format!("{}::{}", displaced.component, displaced.method);
            let replacement = format!("{type_name}::{method}");
            warn!(
                topic = %displaced.topic,
                previous = %previous,
                replacement = %replacement,
                "duplicate topic registration, last write wins"
            );
        } else {
            debug!(component = type_name, method, topic, "registered handler");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerFn;

    /// Base behaviour shared by several components; its method shows up
    /// in the derived component's method list.
    struct BaseHandlers;

    impl BaseHandlers {
        fn bind_ping(self_: Arc<OrderHandlers>) -> HandlerFn {
            Arc::new(move |_, _, _| {
                let _keepalive = self_.clone();
                Box::pin(async { Ok(()) })
            })
        }
    }

    struct OrderHandlers {
        _base: BaseHandlers,
    }

    impl HandlerComponent for OrderHandlers {
        fn type_name(&self) -> &'static str {
            "OrderHandlers"
        }

        fn method_names(&self) -> Vec<&'static str> {
            // Own methods plus those inherited from the base behaviour.
            vec!["on_created", "on_cancelled", "helper", "base_on_ping"]
        }

        fn bind(self: Arc<Self>, method: &str) -> Option<HandlerFn> {
            match method {
                "on_created" | "on_cancelled" | "helper" => {
                    Some(Arc::new(|_, _, _| Box::pin(async { Ok(()) })))
                }
                "base_on_ping" => Some(BaseHandlers::bind_ping(self)),
                _ => None,
            }
        }
    }

    /// Lists a method it cannot actually bind.
    struct BrokenComponent;

    impl HandlerComponent for BrokenComponent {
        fn type_name(&self) -> &'static str {
            "BrokenComponent"
        }

        fn method_names(&self) -> Vec<&'static str> {
            vec!["phantom"]
        }

        fn bind(self: Arc<Self>, _method: &str) -> Option<HandlerFn> {
            None
        }
    }

    fn make_components() -> Vec<Arc<dyn HandlerComponent>> {
        vec![Arc::new(OrderHandlers {
            _base: BaseHandlers,
        })]
    }

    #[test]
    fn test_scan_registers_tagged_methods_only() {
        let mut tags = TopicTags::new();
        tags.attach("OrderHandlers", "on_created", "orders.created");
        tags.attach("OrderHandlers", "on_cancelled", "orders.cancelled");
        // "helper" is deliberately untagged.

        let mut table = DispatchTable::new();
        SubscriberScanner::new(&tags).scan(&make_components(), &mut table);

        assert_eq!(table.topics(), vec!["orders.cancelled", "orders.created"]);
        assert_eq!(table.resolve("orders.created").unwrap().method, "on_created");
    }

    #[test]
    fn test_scan_sees_inherited_methods() {
        let mut tags = TopicTags::new();
        tags.attach("OrderHandlers", "base_on_ping", "ping");

        let mut table = DispatchTable::new();
        SubscriberScanner::new(&tags).scan(&make_components(), &mut table);

        assert_eq!(table.resolve("ping").unwrap().method, "base_on_ping");
    }

    #[test]
    fn test_unbindable_tagged_method_is_skipped() {
        let mut tags = TopicTags::new();
        tags.attach("BrokenComponent", "phantom", "ghost.topic");

        let components: Vec<Arc<dyn HandlerComponent>> = vec![Arc::new(BrokenComponent)];
        let mut table = DispatchTable::new();
        SubscriberScanner::new(&tags).scan(&components, &mut table);

        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_topic_last_write_wins() {
        let mut tags = TopicTags::new();
        tags.attach("OrderHandlers", "on_created", "orders");
        tags.attach("OrderHandlers", "on_cancelled", "orders");

        let mut table = DispatchTable::new();
        SubscriberScanner::new(&tags).scan(&make_components(), &mut table);

        // Method order is declaration order, so on_cancelled scans last.
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("orders").unwrap().method, "on_cancelled");
    }

    #[test]
    fn test_untagged_component_registers_nothing() {
        let tags = TopicTags::new();
        let mut table = DispatchTable::new();
        SubscriberScanner::new(&tags).scan(&make_components(), &mut table);
        assert!(table.is_empty());
    }
}
