//! Prefixed view over an [`EventBus`].

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::bus::{EventBus, Subscription};
use crate::envelope::{EmitOptions, Envelope};
use crate::error::{EventResult, ListenerResult};
use crate::listener::{ListenerKey, ListenerOptions};

/// Facade that qualifies event names as `"{prefix}:{name}"`.
///
/// Shares listeners, queue and replay buffer with the bus it came from.
#[derive(Debug, Clone)]
pub struct Namespace {
    bus: EventBus,
    prefix: String,
}

impl Namespace {
    pub(crate) fn new(bus: EventBus, prefix: String) -> Self {
        Self { bus, prefix }
    }

    /// The namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The fully qualified name of `name` in this namespace.
    #[must_use]
    pub fn qualify(&self, name: &str) -> String {
        format!("{}:{name}", self.prefix)
    }

    /// [`EventBus::on`] under the prefix.
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::on`].
    pub fn on<F>(&self, name: &str, callback: F, opts: ListenerOptions) -> EventResult<Subscription>
    where
        F: Fn(&mut Envelope) -> ListenerResult + Send + Sync + 'static,
    {
        self.bus.on(&self.qualify(name), callback, opts)
    }

    /// [`EventBus::once`] under the prefix.
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::on`].
    pub fn once<F>(
        &self,
        name: &str,
        callback: F,
        opts: ListenerOptions,
    ) -> EventResult<Subscription>
    where
        F: Fn(&mut Envelope) -> ListenerResult + Send + Sync + 'static,
    {
        self.bus.once(&self.qualify(name), callback, opts)
    }

    /// [`EventBus::off`] under the prefix.
    pub fn off(&self, name: &str, key: impl Into<ListenerKey>) -> bool {
        self.bus.off(&self.qualify(name), key)
    }

    /// [`EventBus::emit`] under the prefix.
    pub fn emit(&self, name: &str, data: Value, opts: EmitOptions) -> bool {
        self.bus.emit(&self.qualify(name), data, opts)
    }

    /// [`EventBus::emit_async`] under the prefix.
    pub fn emit_async(
        &self,
        name: &str,
        data: Value,
        opts: EmitOptions,
    ) -> impl Future<Output = bool> + Send + use<> {
        self.bus.emit_async(&self.qualify(name), data, opts)
    }

    /// [`EventBus::wait_for`] under the prefix.
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::wait_for`].
    pub async fn wait_for(&self, name: &str, timeout: Duration) -> EventResult<Envelope> {
        self.bus.wait_for(&self.qualify(name), timeout).await
    }
}
