//! Mock collaborators for the startup coordinator.

use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gmkb_startup::{CollaboratorError, CollaboratorResult, StateHydrator, TemplatePreloader};
use serde_json::Value;
use tracing::debug;

/// How a mock settles once called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MockBehavior {
    /// Succeed immediately.
    #[default]
    Succeed,
    /// Sleep (on the tokio clock), then succeed.
    Delay(Duration),
    /// Fail with the given message.
    Fail(String),
    /// Never settle.
    NeverSettle,
}

impl MockBehavior {
    async fn settle(&self) -> CollaboratorResult<()> {
        match self {
            Self::Succeed => Ok(()),
            Self::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            },
            Self::Fail(message) => Err(CollaboratorError::new(message.clone())),
            Self::NeverSettle => std::future::pending().await,
        }
    }
}

/// Mock [`TemplatePreloader`] recording which templates were requested.
#[derive(Debug, Default)]
pub struct MockPreloader {
    behavior: MockBehavior,
    init_calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl MockPreloader {
    /// A preloader that succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `behavior` for every call.
    #[must_use]
    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Fail every call with `message`.
    #[must_use]
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.with_behavior(MockBehavior::Fail(message.into()))
    }

    /// Number of `init` calls, including those made through the default
    /// `preload_specific`.
    #[must_use]
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Template names passed to `preload_specific`, in call order.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TemplatePreloader for MockPreloader {
    async fn init(&self) -> CollaboratorResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        debug!(behavior = ?self.behavior, "Mock preloader init");
        self.behavior.settle().await
    }

    async fn preload_specific(&self, names: &[String]) -> CollaboratorResult<()> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(names.iter().cloned());
        self.init().await
    }
}

/// Mock [`StateHydrator`] with configurable source data and settling.
#[derive(Debug)]
pub struct MockHydrator {
    behavior: MockBehavior,
    has_source: bool,
    persisted: Option<Value>,
    initialize_calls: AtomicUsize,
    hydrate_calls: AtomicUsize,
    generate_calls: AtomicUsize,
}

impl Default for MockHydrator {
    fn default() -> Self {
        Self {
            behavior: MockBehavior::Succeed,
            has_source: true,
            persisted: None,
            initialize_calls: AtomicUsize::new(0),
            hydrate_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
        }
    }
}

impl MockHydrator {
    /// A hydrator with source data and no persisted state that succeeds
    /// immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `behavior` for every hydration.
    #[must_use]
    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Sleep for `delay` before succeeding.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.with_behavior(MockBehavior::Delay(delay))
    }

    /// Fail with `message`.
    #[must_use]
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.with_behavior(MockBehavior::Fail(message.into()))
    }

    /// Never settle.
    #[must_use]
    pub fn never_settling(self) -> Self {
        self.with_behavior(MockBehavior::NeverSettle)
    }

    /// Report no source data, so the coordinator skips hydration.
    #[must_use]
    pub fn without_source_data(mut self) -> Self {
        self.has_source = false;
        self
    }

    /// Report `state` as previously persisted.
    #[must_use]
    pub fn with_persisted_state(mut self, state: Value) -> Self {
        self.persisted = Some(state);
        self
    }

    /// Number of `initialize_after_systems` calls.
    #[must_use]
    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    /// Number of `hydrate` calls.
    #[must_use]
    pub fn hydrate_calls(&self) -> usize {
        self.hydrate_calls.load(Ordering::SeqCst)
    }

    /// Number of `auto_generate_from_source` calls.
    #[must_use]
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateHydrator for MockHydrator {
    fn has_source_data(&self) -> bool {
        self.has_source
    }

    fn load_persisted_state(&self) -> Option<Value> {
        self.persisted.clone()
    }

    async fn hydrate(&self, _saved: Value) -> CollaboratorResult<()> {
        self.hydrate_calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.settle().await
    }

    async fn auto_generate_from_source(&self) -> CollaboratorResult<()> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.settle().await
    }

    async fn initialize_after_systems(&self) -> CollaboratorResult<()> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        debug!(behavior = ?self.behavior, "Mock hydrator initializing");
        match self.load_persisted_state() {
            Some(saved) => self.hydrate(saved).await,
            None => self.auto_generate_from_source().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_preloader_records_requests() {
        let preloader = MockPreloader::new();
        preloader
            .preload_specific(&["hero".to_string(), "topics".to_string()])
            .await
            .unwrap();
        assert_eq!(preloader.init_calls(), 1);
        assert_eq!(preloader.requested(), ["hero", "topics"]);
    }

    #[tokio::test]
    async fn test_failing_preloader() {
        let preloader = MockPreloader::new().failing("offline");
        let err = preloader.init().await.unwrap_err();
        assert_eq!(err.message(), "offline");
    }

    #[tokio::test]
    async fn test_hydrator_prefers_persisted_state() {
        let hydrator = MockHydrator::new().with_persisted_state(json!({"topics": []}));
        hydrator.initialize_after_systems().await.unwrap();
        assert_eq!(hydrator.initialize_calls(), 1);
        assert_eq!(hydrator.hydrate_calls(), 1);
        assert_eq!(hydrator.generate_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_hydrator_waits_on_tokio_clock() {
        let hydrator = MockHydrator::new().with_delay(Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        hydrator.initialize_after_systems().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(hydrator.generate_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_settling_hydrator() {
        let hydrator = MockHydrator::new().never_settling();
        let result = tokio::time::timeout(
            Duration::from_secs(60),
            hydrator.initialize_after_systems(),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_without_source_data() {
        assert!(!MockHydrator::new().without_source_data().has_source_data());
    }
}
