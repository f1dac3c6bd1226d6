//! Contracts for the external collaborators the coordinator drives.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CollaboratorResult;

/// Templates preloaded by default during `TEMPLATE_PRELOAD`.
pub const DEFAULT_CRITICAL_TEMPLATES: [&str; 4] = ["hero", "topics", "biography", "authority-hook"];

/// Warms the component template cache.
#[async_trait]
pub trait TemplatePreloader: Send + Sync {
    /// Load every template the preloader knows about.
    async fn init(&self) -> CollaboratorResult<()>;

    /// Load only the named templates. Defaults to [`TemplatePreloader::init`].
    async fn preload_specific(&self, names: &[String]) -> CollaboratorResult<()> {
        let _ = names;
        self.init().await
    }
}

/// Populates application state before the first render.
#[async_trait]
pub trait StateHydrator: Send + Sync {
    /// Whether source data is available at all. Hydration is skipped when
    /// this returns `false`.
    fn has_source_data(&self) -> bool {
        true
    }

    /// Previously persisted state, if any.
    fn load_persisted_state(&self) -> Option<Value>;

    /// Merge fresh source data into `saved`.
    async fn hydrate(&self, saved: Value) -> CollaboratorResult<()>;

    /// Build initial state from source data alone.
    async fn auto_generate_from_source(&self) -> CollaboratorResult<()>;

    /// Entry point called by the coordinator.
    ///
    /// The default hydrates persisted state when present and otherwise
    /// auto-generates from source data.
    async fn initialize_after_systems(&self) -> CollaboratorResult<()> {
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
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        saved: Option<Value>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StateHydrator for Recording {
        fn load_persisted_state(&self) -> Option<Value> {
            self.saved.clone()
        }

        async fn hydrate(&self, saved: Value) -> CollaboratorResult<()> {
            self.calls.lock().unwrap().push(format!("hydrate:{saved}"));
            Ok(())
        }

        async fn auto_generate_from_source(&self) -> CollaboratorResult<()> {
            self.calls.lock().unwrap().push("auto".to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl TemplatePreloader for Recording {
        async fn init(&self) -> CollaboratorResult<()> {
            self.calls.lock().unwrap().push("init".to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_initialize_prefers_persisted_state() {
        let hydrator = Recording {
            saved: Some(json!({"components": 2})),
            ..Recording::default()
        };
        hydrator.initialize_after_systems().await.unwrap();
        assert_eq!(
            *hydrator.calls.lock().unwrap(),
            [r#"hydrate:{"components":2}"#]
        );
    }

    #[tokio::test]
    async fn test_default_initialize_falls_back_to_auto_generate() {
        let hydrator = Recording::default();
        assert!(hydrator.has_source_data());
        hydrator.initialize_after_systems().await.unwrap();
        assert_eq!(*hydrator.calls.lock().unwrap(), ["auto"]);
    }

    #[tokio::test]
    async fn test_preload_specific_defaults_to_init() {
        let preloader = Recording::default();
        preloader
            .preload_specific(&["hero".to_string()])
            .await
            .unwrap();
        assert_eq!(*preloader.calls.lock().unwrap(), ["init"]);
    }
}
