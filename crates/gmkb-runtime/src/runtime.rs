//! The assembled startup core: one bus, one coordinator, one boot sequence.

use std::sync::Arc;

use gmkb_config::Config;
use gmkb_events::EventBus;
use gmkb_startup::{
    StartupCoordinator, StartupOptions, StartupOutcome, StateHydrator, SystemRegistry,
    TemplatePreloader,
};
use gmkb_telemetry::BootContext;
use tracing::{Instrument, info, warn};

use crate::config_bridge::{to_coordinator_config, to_event_bus_config, to_startup_options};
use crate::error::{RuntimeError, RuntimeResult};

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    config: Config,
    systems: SystemRegistry,
    preloader: Option<Arc<dyn TemplatePreloader>>,
    hydrator: Option<Arc<dyn StateHydrator>>,
}

impl RuntimeBuilder {
    /// Share an existing system registry.
    #[must_use]
    pub fn with_systems(mut self, systems: SystemRegistry) -> Self {
        self.systems = systems;
        self
    }

    /// Register the template preloader.
    #[must_use]
    pub fn with_preloader(mut self, preloader: Arc<dyn TemplatePreloader>) -> Self {
        self.preloader = Some(preloader);
        self
    }

    /// Register the state hydrator.
    #[must_use]
    pub fn with_hydrator(mut self, hydrator: Arc<dyn StateHydrator>) -> Self {
        self.hydrator = Some(hydrator);
        self
    }

    /// Build the bus and the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RuntimeError::Startup`] if the coordinator cannot
    /// subscribe to the bus.
    pub fn build(self) -> RuntimeResult<Runtime> {
        let bus = EventBus::with_config(to_event_bus_config(&self.config));

        let mut coordinator = StartupCoordinator::builder(bus.clone())
            .with_config(to_coordinator_config(&self.config))
            .with_systems(self.systems);
        if let Some(preloader) = self.preloader {
            coordinator = coordinator.with_preloader(preloader);
        }
        if let Some(hydrator) = self.hydrator {
            coordinator = coordinator.with_hydrator(hydrator);
        }

        Ok(Runtime {
            bus,
            coordinator: coordinator.build()?,
            options: to_startup_options(&self.config),
        })
    }
}

/// Event bus and startup coordinator built from one [`Config`].
#[derive(Debug, Clone)]
pub struct Runtime {
    bus: EventBus,
    coordinator: StartupCoordinator,
    options: StartupOptions,
}

impl Runtime {
    /// Start building a runtime from `config`.
    #[must_use]
    pub fn builder(config: Config) -> RuntimeBuilder {
        RuntimeBuilder {
            config,
            systems: SystemRegistry::new(),
            preloader: None,
            hydrator: None,
        }
    }

    /// Runtime without collaborators.
    ///
    /// # Errors
    ///
    /// See [`RuntimeBuilder::build`].
    pub fn from_config(config: Config) -> RuntimeResult<Self> {
        Self::builder(config).build()
    }

    /// The shared event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The startup coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &StartupCoordinator {
        &self.coordinator
    }

    /// The system registry gating startup.
    #[must_use]
    pub fn systems(&self) -> &SystemRegistry {
        self.coordinator.systems()
    }

    /// Options `boot` runs with.
    #[must_use]
    pub fn options(&self) -> StartupOptions {
        self.options
    }

    /// Mark `name` as initialized.
    pub fn register_system(&self, name: impl Into<String>) -> bool {
        self.systems().register(name)
    }

    /// Mark the bus ready, then coordinate startup.
    ///
    /// Emissions queued before this call are delivered first, so listeners
    /// registered during setup observe them before any phase runs. Calling
    /// `boot` again joins the run in flight, or returns the outcome of the
    /// finished one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RuntimeError::Startup`] when coordination fails and
    /// emergency fallback is disabled.
    pub async fn boot(&self) -> RuntimeResult<StartupOutcome> {
        let context = BootContext::new("runtime");
        let span = context.span();

        async {
            let delivered = self.bus.mark_ready();
            info!(delivered, "Event bus ready");

            let outcome = self.coordinator.coordinate_startup(self.options).await?;
            match &outcome {
                StartupOutcome::Completed { duration_ms } => {
                    info!(duration_ms, "Boot complete");
                },
                StartupOutcome::EmergencyFallback { cause } => {
                    warn!(cause = ?cause, elapsed_ms = context.elapsed_ms(), "Boot fell back");
                },
            }
            Ok::<_, RuntimeError>(outcome)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmkb_events::{EmitOptions, ListenerOptions};
    use gmkb_startup::{CoordinationState, DEFAULT_REQUIRED_SYSTEMS, FallbackCause};
    use gmkb_test::MockHydrator;
    use serde_json::json;
    use std::sync::Mutex;

    fn fast_config() -> Config {
        Config::from_toml_str(
            r#"
            [startup]
            systems_ready_timeout_ms = 200
            watchdog_timeout_ms = 1000
        "#,
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_delivers_queued_events_first() {
        let runtime = Runtime::from_config(fast_config()).unwrap();
        for name in DEFAULT_REQUIRED_SYSTEMS {
            assert!(runtime.register_system(name));
        }

        assert!(runtime.bus().emit("app:configured", json!({"ok": true}), EmitOptions::default()));
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let s = std::sync::Arc::clone(&seen);
        runtime
            .bus()
            .on(
                "app:configured",
                move |env| {
                    s.lock().unwrap().push(env.data.clone());
                    Ok(())
                },
                ListenerOptions::default(),
            )
            .unwrap();
        assert!(seen.lock().unwrap().is_empty());

        let outcome = runtime.boot().await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(runtime.bus().is_ready());
        assert_eq!(runtime.coordinator().state(), CoordinationState::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_falls_back_when_systems_missing() {
        let runtime = Runtime::from_config(fast_config()).unwrap();
        let outcome = runtime.boot().await.unwrap();
        assert!(matches!(
            outcome,
            StartupOutcome::EmergencyFallback {
                cause: FallbackCause::Failed(_)
            }
        ));
        assert!(!runtime.coordinator().is_rendering_blocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_surfaces_error_without_fallback() {
        let mut config = fast_config();
        config.startup.emergency_fallback = false;
        let runtime = Runtime::from_config(config).unwrap();

        let err = runtime.boot().await.unwrap_err();
        assert!(matches!(err, crate::RuntimeError::Startup(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_builder_wires_hydrator() {
        let hydrator = std::sync::Arc::new(MockHydrator::new());
        let runtime = Runtime::builder(fast_config())
            .with_systems(SystemRegistry::with_systems(DEFAULT_REQUIRED_SYSTEMS))
            .with_hydrator(hydrator.clone())
            .build()
            .unwrap();

        runtime.boot().await.unwrap();
        assert_eq!(hydrator.initialize_calls(), 1);
    }
}
