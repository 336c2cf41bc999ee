//! Handler callables and the component trait they are discovered on.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use relay_broker::{Consumer, InboundRecord};

/// A handler method bound to its receiver instance.
///
/// Invoked with the decoded payload (`None` when the record carried no
/// value or the value was not valid JSON), the full inbound record,
/// and the active consumer handle for advanced use such as manual
/// offset control.
pub type HandlerFn = Arc<
    dyn Fn(Option<Value>, InboundRecord, Arc<dyn Consumer>) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// A component whose methods can be discovered by the scanner.
///
/// This is the engine's view of a "live instance" from whatever object
/// registry the host application uses: a way to enumerate method names
/// (including methods provided by embedded or wrapped behaviour) and a
/// way to bind one of them to this instance.
pub trait HandlerComponent: Send + Sync {
    /// The component's type name, used to look up topic tags and in
    /// diagnostics.
    fn type_name(&self) -> &'static str;

    /// Names of every invocable method on this component, own and
    /// inherited alike.
    fn method_names(&self) -> Vec<&'static str>;

    /// Bind the named method to this instance, producing a callable
    /// that can run against the instance's state. Returns `None` for
    /// names that do not correspond to a bindable method.
    fn bind(self: Arc<Self>, method: &str) -> Option<HandlerFn>;
}

/// A registered handler: the bound callable plus where it came from.
///
/// Identity is (topic, bound callable); the component and method names
/// exist for diagnostics. Created once during the scan, never mutated.
#[derive(Clone)]
pub struct HandlerBinding {
    /// The topic this handler serves.
    pub topic: String,
    /// Type name of the owning component.
    pub component: &'static str,
    /// Name of the tagged method.
    pub method: &'static str,
    /// The callable, bound to its receiver instance.
    pub handler: HandlerFn,
}

impl HandlerBinding {
    /// Create a binding for a tagged method.
    #[must_use]
    pub fn new(
        topic: impl Into<String>,
        component: &'static str,
        method: &'static str,
        handler: HandlerFn,
    ) -> Self {
        Self {
            topic: topic.into(),
            component,
            method,
            handler,
        }
    }

    /// Invoke the bound handler.
    pub async fn invoke(
        &self,
        payload: Option<Value>,
        record: InboundRecord,
        consumer: Arc<dyn Consumer>,
    ) -> anyhow::Result<()> {
        (self.handler)(payload, record, consumer).await
    }
}

impl std::fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("topic", &self.topic)
            .field("component", &self.component)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
