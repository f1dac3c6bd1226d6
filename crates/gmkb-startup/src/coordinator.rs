//! Phased startup coordinator.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use gmkb_events::{EmitOptions, Envelope, EventBus, ListenerOptions, Subscription};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::collaborators::{StateHydrator, TemplatePreloader};
use crate::config::{CoordinatorConfig, StartupOptions};
use crate::deferred::{DeferredHandle, DeferredOperation, QueuedOperation};
use crate::error::{StartupError, StartupResult};
use crate::events::{
    COORDINATION_COMPLETE, COORDINATOR_ID, EMERGENCY_FALLBACK, HYDRATION_COMPLETE,
    HYDRATION_START, RENDERING_BLOCKED, RENDERING_UNBLOCKED, STATE_OPERATION_COMPLETE,
    STATE_OPERATION_START, TEMPLATE_FETCH_COMPLETE, TEMPLATE_FETCH_ERROR, TEMPLATE_FETCH_START,
};
use crate::operations::{OperationKind, OperationToken, OperationTracker, PendingOperations};
use crate::phase::{CoordinationState, PhaseName, PhaseRecord};
use crate::status::{CoordinatorStatus, FallbackCause, StartupOutcome};
use crate::systems::SystemRegistry;

type SharedRun = Shared<BoxFuture<'static, StartupResult<StartupOutcome>>>;

#[derive(Default)]
struct CoordState {
    state: CoordinationState,
    current_phase: Option<PhaseName>,
    phases: Vec<PhaseRecord>,
    data_loading_complete: bool,
    template_preload_complete: bool,
    systems_ready: bool,
    rendering_blocked: bool,
    ops: OperationTracker,
    deferred: VecDeque<QueuedOperation>,
    started_at: Option<Instant>,
    run: Option<SharedRun>,
    run_token: Option<CancellationToken>,
}

struct Inner {
    bus: EventBus,
    config: CoordinatorConfig,
    systems: SystemRegistry,
    preloader: Option<Arc<dyn TemplatePreloader>>,
    hydrator: Option<Arc<dyn StateHydrator>>,
    state: Mutex<CoordState>,
    ops_changed: Notify,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let subscriptions = std::mem::take(
            self.subscriptions
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
    }
}

/// Builder for [`StartupCoordinator`].
pub struct StartupCoordinatorBuilder {
    bus: EventBus,
    config: CoordinatorConfig,
    systems: SystemRegistry,
    preloader: Option<Arc<dyn TemplatePreloader>>,
    hydrator: Option<Arc<dyn StateHydrator>>,
}

impl StartupCoordinatorBuilder {
    /// Use the given configuration.
    #[must_use]
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

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

    /// Build the coordinator and subscribe it to collaborator lifecycle events.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Event`] if a subscription is rejected.
    pub fn build(self) -> StartupResult<StartupCoordinator> {
        let inner = Arc::new(Inner {
            bus: self.bus,
            config: self.config,
            systems: self.systems,
            preloader: self.preloader,
            hydrator: self.hydrator,
            state: Mutex::new(CoordState::default()),
            ops_changed: Notify::new(),
            subscriptions: Mutex::new(Vec::new()),
        });

        let subscriptions = subscribe(&inner)?;
        *inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = subscriptions;

        debug!("Event listeners set up for startup coordination");
        Ok(StartupCoordinator { inner })
    }
}

/// Orchestrates startup phases and gates rendering until data is loaded.
///
/// Cheap to clone; clones drive the same coordinator.
///
/// A run is started with [`StartupCoordinator::coordinate_startup`]. While it
/// is in flight, further calls join the same run. The run is spawned on the
/// ambient tokio runtime so it completes even if every caller stops waiting.
#[derive(Clone)]
pub struct StartupCoordinator {
    inner: Arc<Inner>,
}

impl fmt::Debug for StartupCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("StartupCoordinator")
            .field("state", &state.state)
            .field("current_phase", &state.current_phase)
            .field("rendering_blocked", &state.rendering_blocked)
            .field("deferred", &state.deferred.len())
            .finish_non_exhaustive()
    }
}

impl StartupCoordinator {
    /// Start building a coordinator on `bus`.
    #[must_use]
    pub fn builder(bus: EventBus) -> StartupCoordinatorBuilder {
        StartupCoordinatorBuilder {
            bus,
            config: CoordinatorConfig::default(),
            systems: SystemRegistry::new(),
            preloader: None,
            hydrator: None,
        }
    }

    /// Coordinator with default configuration and no collaborators.
    ///
    /// # Errors
    ///
    /// See [`StartupCoordinatorBuilder::build`].
    pub fn new(bus: EventBus) -> StartupResult<Self> {
        Self::builder(bus).build()
    }

    fn lock(&self) -> MutexGuard<'_, CoordState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The bus this coordinator listens and emits on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// The system registry gating `SYSTEMS_READY`.
    #[must_use]
    pub fn systems(&self) -> &SystemRegistry {
        &self.inner.systems
    }

    /// The coordinator configuration.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Current coordination state.
    #[must_use]
    pub fn state(&self) -> CoordinationState {
        self.lock().state
    }

    /// Run the startup pipeline, or join the run already in flight.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the run when `emergency_fallback` is
    /// disabled, or [`StartupError::Aborted`] if the run was reset.
    pub async fn coordinate_startup(
        &self,
        opts: StartupOptions,
    ) -> StartupResult<StartupOutcome> {
        self.start_or_join(opts).await
    }

    fn start_or_join(&self, opts: StartupOptions) -> SharedRun {
        let mut state = self.lock();
        if state.state != CoordinationState::Idle {
            if let Some(run) = &state.run {
                warn!(current_state = %state.state, "Coordination already in progress");
                return run.clone();
            }
        }

        let token = CancellationToken::new();
        state.state = CoordinationState::Coordinating;
        state.started_at = Some(Instant::now());
        state.phases.clear();
        state.current_phase = None;
        state.run_token = Some(token.clone());

        let handle = tokio::spawn(self.clone().run(opts, token));
        let run = async move {
            handle.await.unwrap_or_else(|err| {
                error!(error = %err, "Startup task ended abnormally");
                Err(StartupError::Aborted)
            })
        }
        .boxed()
        .shared();
        state.run = Some(run.clone());
        drop(state);

        info!(
            enable_hydration = opts.enable_hydration,
            preload_templates = opts.preload_templates,
            max_wait_ms = millis(opts.max_wait_time),
            "Starting startup coordination"
        );
        run
    }

    async fn run(
        self,
        opts: StartupOptions,
        token: CancellationToken,
    ) -> StartupResult<StartupOutcome> {
        let watchdog = tokio::time::sleep(self.inner.config.watchdog_timeout);
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("Startup run aborted by reset");
                Err(StartupError::Aborted)
            }
            () = watchdog => self.handle_watchdog(&token).await,
            result = self.execute_pipeline(&opts) => self.finish(result, &opts, &token).await,
        }
    }

    async fn execute_pipeline(&self, opts: &StartupOptions) -> StartupResult<()> {
        self.run_phase(PhaseName::SystemsReady, self.ensure_systems_ready())
            .await?;

        if opts.preload_templates {
            self.run_phase(PhaseName::TemplatePreload, self.preload_critical_templates())
                .await?;
        }

        self.block_rendering("Data loading phase");
        self.set_state(CoordinationState::DataLoading);

        if opts.enable_hydration {
            self.run_phase(PhaseName::MkcgHydration, self.coordinate_hydration())
                .await?;
        }

        self.run_phase(
            PhaseName::PendingOperations,
            self.wait_for_pending_operations(opts.max_wait_time),
        )
        .await?;

        self.unblock_rendering("Data loading complete");
        self.set_state(CoordinationState::Rendering);
        self.lock().data_loading_complete = true;

        self.run_phase(
            PhaseName::DeferredOperations,
            self.process_deferred_operations(),
        )
        .await?;

        self.run_phase(PhaseName::Validation, async { self.validate_startup() })
            .await
    }

    async fn finish(
        &self,
        result: StartupResult<()>,
        opts: &StartupOptions,
        token: &CancellationToken,
    ) -> StartupResult<StartupOutcome> {
        if token.is_cancelled() {
            return Err(StartupError::Aborted);
        }

        match result {
            Ok(()) => {
                let (duration_ms, phases, deferred) = {
                    let mut state = self.lock();
                    state.state = CoordinationState::Complete;
                    let duration_ms = state.started_at.map_or(0, |t| millis(t.elapsed()));
                    (duration_ms, state.phases.clone(), state.deferred.len())
                };
                info!(
                    duration_ms,
                    phases = phases.len(),
                    deferred_operations = deferred,
                    "Startup coordination completed successfully"
                );
                self.emit(
                    COORDINATION_COMPLETE,
                    json!({ "duration": duration_ms, "phases": phases, "success": true }),
                );
                Ok(StartupOutcome::Completed { duration_ms })
            },
            Err(err) => {
                {
                    let mut state = self.lock();
                    state.state = CoordinationState::Idle;
                    state.current_phase = None;
                }
                error!(error = %err, kind = err.as_label(), "Startup coordination failed");

                if opts.emergency_fallback {
                    warn!("Attempting emergency fallback");
                    self.execute_emergency_fallback().await;
                    return Ok(StartupOutcome::EmergencyFallback {
                        cause: FallbackCause::Failed(err),
                    });
                }
                Err(err)
            },
        }
    }

    async fn handle_watchdog(&self, token: &CancellationToken) -> StartupResult<StartupOutcome> {
        if token.is_cancelled() {
            return Err(StartupError::Aborted);
        }
        error!(
            timeout_ms = millis(self.inner.config.watchdog_timeout),
            "Emergency timeout reached - startup coordination taking too long"
        );

        self.unblock_rendering("Emergency timeout");
        {
            let mut state = self.lock();
            state.state = CoordinationState::Complete;
            state.current_phase = None;
        }
        self.execute_emergency_fallback().await;
        Ok(StartupOutcome::EmergencyFallback {
            cause: FallbackCause::Watchdog,
        })
    }

    async fn run_phase<Fut>(&self, phase: PhaseName, work: Fut) -> StartupResult<()>
    where
        Fut: Future<Output = StartupResult<()>>,
    {
        let started = Instant::now();
        self.lock().current_phase = Some(phase);
        debug!(phase = %phase, "Starting phase");

        let result = work.await;

        let duration_ms = millis(started.elapsed());
        let record = PhaseRecord {
            name: phase,
            duration_ms,
            success: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
            timestamp: Utc::now(),
        };
        {
            let mut state = self.lock();
            state.phases.push(record);
            state.current_phase = None;
        }

        match &result {
            Ok(()) => debug!(phase = %phase, duration_ms, "Phase completed"),
            Err(e) => error!(phase = %phase, duration_ms, error = %e, "Phase failed"),
        }
        result
    }

    async fn ensure_systems_ready(&self) -> StartupResult<()> {
        let config = &self.inner.config;
        let started = Instant::now();
        loop {
            let missing = self.inner.systems.missing(&config.required_systems);
            if missing.is_empty() {
                self.lock().systems_ready = true;
                info!("All core systems ready");
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= config.systems_ready_timeout {
                warn!(missing = ?missing, "Required systems not ready");
                return Err(StartupError::SystemsNotReady {
                    missing,
                    waited_ms: millis(waited),
                });
            }

            trace!(missing = ?missing, "Waiting for systems");
            let remaining = config.systems_ready_timeout.saturating_sub(waited);
            tokio::time::sleep(config.systems_poll_interval.min(remaining)).await;
        }
    }

    async fn preload_critical_templates(&self) -> StartupResult<()> {
        match &self.inner.preloader {
            None => info!("Template preloader not available, skipping preload"),
            Some(preloader) => {
                let templates = &self.inner.config.critical_templates;
                info!(templates = ?templates, "Preloading critical templates");
                match preloader.preload_specific(templates).await {
                    Ok(()) => info!("Critical templates preloaded successfully"),
                    Err(e) => warn!(error = %e, "Template preload failed, continuing without preload"),
                }
            },
        }
        self.lock().template_preload_complete = true;
        Ok(())
    }

    async fn coordinate_hydration(&self) -> StartupResult<()> {
        let Some(hydrator) = &self.inner.hydrator else {
            info!("State hydrator not available, skipping hydration");
            return Ok(());
        };
        if !hydrator.has_source_data() {
            info!("No source data available, skipping hydration");
            return Ok(());
        }

        info!("Starting coordinated hydration");
        self.emit(HYDRATION_START, json!({ "coordinator": COORDINATOR_ID }));

        match hydrator.initialize_after_systems().await {
            Ok(()) => {
                self.emit(HYDRATION_COMPLETE, json!({ "coordinator": COORDINATOR_ID }));
                info!("Hydration completed successfully");
                Ok(())
            },
            Err(e) => {
                error!(error = %e, "Hydration failed");
                self.emit(
                    HYDRATION_COMPLETE,
                    json!({ "coordinator": COORDINATOR_ID, "error": e.message() }),
                );
                Err(StartupError::Collaborator {
                    phase: PhaseName::MkcgHydration,
                    source: e,
                })
            },
        }
    }

    async fn wait_for_pending_operations(&self, max_wait: Duration) -> StartupResult<()> {
        let poll = self.inner.config.pending_poll_interval;
        let started = Instant::now();
        loop {
            let changed = self.inner.ops_changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            let pending = self.pending_operations();
            if pending.is_idle() {
                info!("All pending operations completed");
                return Ok(());
            }

            let remaining = max_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                warn!(
                    template_ops = pending.template,
                    state_ops = pending.state,
                    max_wait_ms = millis(max_wait),
                    "Timeout waiting for pending operations"
                );
                return Ok(());
            }

            trace!(
                template_ops = pending.template,
                state_ops = pending.state,
                "Waiting for pending operations"
            );
            let _ = tokio::time::timeout(remaining.min(poll), changed).await;
        }
    }

    async fn process_deferred_operations(&self) -> StartupResult<()> {
        let queued = std::mem::take(&mut self.lock().deferred);
        if queued.is_empty() {
            debug!("No deferred operations to process");
            return Ok(());
        }

        info!(count = queued.len(), "Processing deferred operations");
        for QueuedOperation { operation, settle } in queued {
            let kind = operation.kind().to_string();
            let result = operation.start().await;
            match &result {
                Ok(()) => debug!(kind = %kind, "Deferred operation completed"),
                Err(e) => warn!(kind = %kind, error = %e, "Deferred operation failed"),
            }
            let _ = settle.send(result);
        }
        info!("All deferred operations processed");
        Ok(())
    }

    fn validate_startup(&self) -> StartupResult<()> {
        let checks = {
            let state = self.lock();
            let pending = state.ops.pending();
            [
                ("systemsReady", state.systems_ready),
                ("dataLoadingComplete", state.data_loading_complete),
                ("renderingUnblocked", !state.rendering_blocked),
                ("noActiveOperations", pending.active == 0),
                ("noPendingOperations", pending.is_idle()),
            ]
        };

        let failed_checks: Vec<String> = checks
            .iter()
            .filter(|(_, passed)| !passed)
            .map(|(name, _)| (*name).to_string())
            .collect();

        if failed_checks.is_empty() {
            debug!("Startup validation passed");
            return Ok(());
        }
        warn!(failed_checks = ?failed_checks, "Startup validation failed");
        Err(StartupError::StartupValidationFailed { failed_checks })
    }

    /// Block rendering and announce it on `rendering:blocked`.
    pub fn block_rendering(&self, reason: &str) {
        self.lock().rendering_blocked = true;
        info!(reason, "Rendering blocked");
        self.emit(
            RENDERING_BLOCKED,
            json!({ "reason": reason, "coordinator": true }),
        );
    }

    /// Unblock rendering and announce it on `rendering:unblocked`.
    pub fn unblock_rendering(&self, reason: &str) {
        self.lock().rendering_blocked = false;
        info!(reason, "Rendering unblocked");
        self.emit(
            RENDERING_UNBLOCKED,
            json!({ "reason": reason, "coordinator": true }),
        );
    }

    /// Whether rendering is currently blocked.
    #[must_use]
    pub fn is_rendering_blocked(&self) -> bool {
        self.lock().rendering_blocked
    }

    /// Record an outstanding template fetch.
    pub fn register_template_operation(
        &self,
        component_type: &str,
        operation_id: impl Into<String>,
    ) -> OperationToken {
        self.register(OperationKind::Template, component_type, operation_id.into())
    }

    /// Record completion of a template fetch. Returns `false` (and logs) if
    /// `operation_id` has no outstanding registration.
    pub fn complete_template_operation(&self, operation_id: &str) -> bool {
        self.complete(OperationKind::Template, operation_id)
    }

    /// Record an outstanding state operation.
    pub fn register_state_operation(
        &self,
        operation: &str,
        operation_id: impl Into<String>,
    ) -> OperationToken {
        self.register(OperationKind::State, operation, operation_id.into())
    }

    /// Record completion of a state operation. Returns `false` (and logs) if
    /// `operation_id` has no outstanding registration.
    pub fn complete_state_operation(&self, operation_id: &str) -> bool {
        self.complete(OperationKind::State, operation_id)
    }

    /// Complete the operation `token` was issued for.
    #[allow(clippy::needless_pass_by_value)]
    pub fn complete_operation(&self, token: OperationToken) -> bool {
        self.complete(token.kind(), token.id())
    }

    /// Outstanding operation counts.
    #[must_use]
    pub fn pending_operations(&self) -> PendingOperations {
        self.lock().ops.pending()
    }

    fn register(&self, kind: OperationKind, label: &str, operation_id: String) -> OperationToken {
        let pending = {
            let mut state = self.lock();
            state.ops.register(kind, &operation_id);
            state.ops.pending()
        };
        self.inner.ops_changed.notify_waiters();
        debug!(
            kind = %kind,
            label,
            operation_id = %operation_id,
            pending_template = pending.template,
            pending_state = pending.state,
            "Operation registered"
        );
        OperationToken::new(kind, operation_id)
    }

    fn complete(&self, kind: OperationKind, operation_id: &str) -> bool {
        let (completed, pending) = {
            let mut state = self.lock();
            let completed = state.ops.complete(kind, operation_id);
            (completed, state.ops.pending())
        };
        if completed {
            self.inner.ops_changed.notify_waiters();
            debug!(
                kind = %kind,
                operation_id,
                pending_template = pending.template,
                pending_state = pending.state,
                "Operation completed"
            );
        } else {
            warn!(kind = %kind, operation_id, "Completion for unknown operation ignored");
        }
        completed
    }

    /// Spawn `operation` now if rendering is unblocked, otherwise queue it
    /// until the deferred phase (or, if critical, the emergency path).
    ///
    /// Must be called from within a tokio runtime.
    pub fn defer_operation(&self, operation: DeferredOperation) -> DeferredHandle {
        let mut state = self.lock();
        if !state.rendering_blocked {
            drop(state);
            trace!(kind = operation.kind(), "Rendering not blocked, executing immediately");
            return DeferredHandle::spawn(operation);
        }

        let kind = operation.kind().to_string();
        let critical = operation.is_critical();
        let (queued, handle) = QueuedOperation::new(operation);
        state.deferred.push_back(queued);
        let total = state.deferred.len();
        drop(state);

        debug!(kind = %kind, critical, total_deferred = total, "Operation deferred");
        handle
    }

    /// Force the application into a renderable state.
    ///
    /// Clears blocking, marks data loading complete, zeroes operation
    /// accounting, runs only critical deferred operations and discards the
    /// rest, then emits `startup:emergency-fallback`.
    pub async fn execute_emergency_fallback(&self) {
        warn!("Executing emergency fallback initialization");
        let queued = {
            let mut state = self.lock();
            state.rendering_blocked = false;
            state.data_loading_complete = true;
            state.ops.clear();
            std::mem::take(&mut state.deferred)
        };
        self.inner.ops_changed.notify_waiters();

        let mut executed: usize = 0;
        let mut discarded: usize = 0;
        for QueuedOperation { operation, settle } in queued {
            if !operation.is_critical() {
                debug!(kind = operation.kind(), "Discarding deferred operation");
                discarded = discarded.saturating_add(1);
                continue;
            }
            let kind = operation.kind().to_string();
            let result = operation.start().await;
            if let Err(e) = &result {
                warn!(kind = %kind, error = %e, "Critical deferred operation failed");
            }
            let _ = settle.send(result);
            executed = executed.saturating_add(1);
        }

        self.emit(
            EMERGENCY_FALLBACK,
            json!({
                "coordinator": COORDINATOR_ID,
                "timestamp": Utc::now().timestamp_millis(),
            }),
        );
        info!(executed, discarded, "Emergency fallback completed");
    }

    /// Snapshot of the coordinator state.
    #[must_use]
    pub fn status(&self) -> CoordinatorStatus {
        let state = self.lock();
        CoordinatorStatus {
            state: state.state,
            current_phase: state.current_phase,
            data_loading_complete: state.data_loading_complete,
            template_preload_complete: state.template_preload_complete,
            systems_ready: state.systems_ready,
            rendering_blocked: state.rendering_blocked,
            pending_operations: state.ops.pending(),
            deferred_operations: state.deferred.len(),
            phases: state.phases.clone(),
            duration_ms: state.started_at.map_or(0, |t| millis(t.elapsed())),
        }
    }

    /// Return to a freshly constructed `Idle` state.
    ///
    /// Aborts a run in flight and discards queued deferred operations.
    pub fn reset(&self) {
        let (token, queued) = {
            let mut state = self.lock();
            let token = state.run_token.take();
            let queued = std::mem::take(&mut state.deferred);
            *state = CoordState::default();
            (token, queued)
        };
        if let Some(token) = token {
            token.cancel();
        }
        drop(queued);
        self.inner.ops_changed.notify_waiters();
        info!("Startup coordinator reset");
    }

    fn set_state(&self, next: CoordinationState) {
        let previous = std::mem::replace(&mut self.lock().state, next);
        debug!(from = %previous, to = %next, "Coordination state changed");
    }

    fn emit(&self, name: &str, data: Value) {
        self.inner.bus.emit(name, data, EmitOptions::default());
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TemplateFetchPayload {
    component_type: Option<String>,
    operation_id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StateOperationPayload {
    operation: Option<String>,
    operation_id: Option<Value>,
}

fn parse_payload<T: DeserializeOwned + Default>(env: &Envelope) -> T {
    serde_json::from_value(env.data.clone()).unwrap_or_else(|e| {
        warn!(event = %env.event_type, error = %e, "Malformed operation payload");
        T::default()
    })
}

fn operation_id(raw: Option<Value>) -> Option<String> {
    match raw? {
        Value::String(id) if !id.is_empty() => Some(id),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn listen<F>(inner: &Arc<Inner>, name: &str, handler: F) -> StartupResult<Subscription>
where
    F: Fn(&StartupCoordinator, &Envelope) + Send + Sync + 'static,
{
    let weak: Weak<Inner> = Arc::downgrade(inner);
    let subscription = inner.bus.on(
        name,
        move |env| {
            if let Some(inner) = weak.upgrade() {
                handler(&StartupCoordinator { inner }, env);
            }
            Ok(())
        },
        ListenerOptions::default().context(COORDINATOR_ID),
    )?;
    Ok(subscription)
}

fn subscribe(inner: &Arc<Inner>) -> StartupResult<Vec<Subscription>> {
    let complete_template = |coord: &StartupCoordinator, env: &Envelope| {
        let payload: TemplateFetchPayload = parse_payload(env);
        match operation_id(payload.operation_id) {
            Some(id) => {
                coord.complete_template_operation(&id);
            },
            None => warn!(event = %env.event_type, "Operation event without operationId ignored"),
        }
    };

    Ok(vec![
        listen(inner, TEMPLATE_FETCH_START, |coord, env| {
            let payload: TemplateFetchPayload = parse_payload(env);
            match operation_id(payload.operation_id) {
                Some(id) => {
                    let component = payload.component_type.as_deref().unwrap_or("unknown");
                    let _ = coord.register_template_operation(component, id);
                },
                None => warn!(event = %env.event_type, "Operation event without operationId ignored"),
            }
        })?,
        listen(inner, TEMPLATE_FETCH_COMPLETE, complete_template)?,
        listen(inner, TEMPLATE_FETCH_ERROR, complete_template)?,
        listen(inner, STATE_OPERATION_START, |coord, env| {
            let payload: StateOperationPayload = parse_payload(env);
            match operation_id(payload.operation_id) {
                Some(id) => {
                    let operation = payload.operation.as_deref().unwrap_or("unknown");
                    let _ = coord.register_state_operation(operation, id);
                },
                None => warn!(event = %env.event_type, "Operation event without operationId ignored"),
            }
        })?,
        listen(inner, STATE_OPERATION_COMPLETE, |coord, env| {
            let payload: StateOperationPayload = parse_payload(env);
            match operation_id(payload.operation_id) {
                Some(id) => {
                    coord.complete_state_operation(&id);
                },
                None => warn!(event = %env.event_type, "Operation event without operationId ignored"),
            }
        })?,
        listen(inner, HYDRATION_START, |coord, _env| {
            coord.block_rendering("MKCG hydration in progress");
        })?,
        listen(inner, HYDRATION_COMPLETE, |coord, _env| {
            coord.unblock_rendering("MKCG hydration complete");
        })?,
    ])
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
