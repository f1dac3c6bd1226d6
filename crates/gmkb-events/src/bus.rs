//! Priority event bus with a pre-ready queue and a replay buffer.

use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace, warn};

use crate::buffers::{ReplayBuffer, StartupQueue};
use crate::envelope::{EmitOptions, Envelope};
use crate::error::{EventError, EventResult, ListenerResult};
use crate::listener::{Callback, Listener, ListenerKey, ListenerOptions};
use crate::namespace::Namespace;
use crate::stats::{BusStats, HistoryEntry, StatsTracker};

/// Default time a replay entry stays deliverable.
pub const DEFAULT_REPLAY_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default maximum age of a queued emission when the queue is drained.
pub const DEFAULT_QUEUE_MAX_AGE: Duration = Duration::from_millis(10_000);
/// Default number of history entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
/// Default timeout for [`EventBus::wait_for_default`].
pub const DEFAULT_WAIT_FOR_TIMEOUT: Duration = Duration::from_millis(5000);

/// Event bus tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBusConfig {
    /// How long an emission without listeners stays replayable.
    pub replay_timeout: Duration,
    /// Queued emissions older than this are discarded at drain time.
    pub queue_max_age: Duration,
    /// Bounded emission history size. Zero disables history.
    pub history_limit: usize,
    /// Timeout used by [`EventBus::wait_for_default`].
    pub wait_for_timeout: Duration,
    /// Construct the bus already ready (no startup queue).
    pub start_ready: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            replay_timeout: DEFAULT_REPLAY_TIMEOUT,
            queue_max_age: DEFAULT_QUEUE_MAX_AGE,
            history_limit: DEFAULT_HISTORY_LIMIT,
            wait_for_timeout: DEFAULT_WAIT_FOR_TIMEOUT,
            start_ready: false,
        }
    }
}

#[derive(Debug)]
struct BusState {
    listeners: HashMap<String, Vec<Arc<Listener>>>,
    ready: bool,
    queue: StartupQueue,
    replay: ReplayBuffer,
    stats: StatsTracker,
}

impl BusState {
    fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }

    fn remove_listener(&mut self, name: &str, target: &Arc<Listener>) -> bool {
        let Some(list) = self.listeners.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| !Arc::ptr_eq(l, target));
        let removed = list.len() != before;
        if list.is_empty() {
            self.listeners.remove(name);
        }
        removed
    }
}

/// Result of routing an emission under the lock.
enum Routed {
    /// Queued or buffered; carries the value `emit` reports.
    Settled(bool),
    /// Listener snapshot to dispatch to outside the lock.
    Dispatch {
        listeners: Vec<Arc<Listener>>,
        data: Value,
    },
}

#[derive(Debug)]
struct Inner {
    state: Mutex<BusState>,
    config: EventBusConfig,
}

/// Publish/subscribe bus shared by every component of the page builder.
///
/// `EventBus` is a cheap handle; clones share listeners, queues, buffers and
/// statistics. Until [`EventBus::mark_ready`] is called, queueable emissions
/// are held in a startup queue. Emissions that find no listener are buffered
/// and replayed to the first listener that registers within
/// [`EventBusConfig::replay_timeout`].
///
/// Listener callbacks run synchronously on the emitting thread. The internal
/// lock is released before any callback runs, so callbacks may freely call
/// back into the bus.
///
/// **WARNING:** storing an `EventBus` clone inside one of its own listener
/// callbacks creates an `Arc` cycle. Capture a [`WeakEventBus`] instead.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus with default configuration. The bus starts not ready.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a bus with the given configuration.
    #[must_use]
    pub fn with_config(config: EventBusConfig) -> Self {
        let state = BusState {
            listeners: HashMap::new(),
            ready: config.start_ready,
            queue: StartupQueue::default(),
            replay: ReplayBuffer::default(),
            stats: StatsTracker::new(config.history_limit),
        };
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                config,
            }),
        }
    }

    /// The configuration this bus was built with.
    #[must_use]
    pub fn config(&self) -> &EventBusConfig {
        &self.inner.config
    }

    /// Downgrade to a handle that does not keep the bus alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener.
    ///
    /// If emissions for `name` were buffered for replay and `opts.replay` is
    /// set, every live entry is delivered to this listener (and only this
    /// listener) before `on` returns, and the buffer is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidArgument`] if `name` is empty or contains
    /// whitespace or control characters, or if an explicit id is empty.
    pub fn on<F>(&self, name: &str, callback: F, opts: ListenerOptions) -> EventResult<Subscription>
    where
        F: Fn(&mut Envelope) -> ListenerResult + Send + Sync + 'static,
    {
        self.on_callback(name, Arc::new(callback), opts)
    }

    /// Register a shared callback. Keep a clone of `callback` to remove it
    /// later with [`ListenerKey::Callback`].
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::on`].
    pub fn on_callback(
        &self,
        name: &str,
        callback: Callback,
        opts: ListenerOptions,
    ) -> EventResult<Subscription> {
        validate_event_name(name)?;
        if opts.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(EventError::InvalidArgument(
                "listener id must not be empty".to_string(),
            ));
        }

        let wants_replay = opts.replay;
        let listener = Arc::new(Listener::new(callback, opts));

        let (pending, count) = {
            let mut state = self.lock();
            let list = state.listeners.entry(name.to_string()).or_default();
            // Stable: insert after every listener of equal or higher priority.
            let pos = list.partition_point(|l| l.priority <= listener.priority);
            list.insert(pos, Arc::clone(&listener));
            let count = list.len();
            let pending = if wants_replay {
                state.replay.take(name, self.inner.config.replay_timeout)
            } else {
                Vec::new()
            };
            (pending, count)
        };

        debug!(
            event = name,
            listener_id = %listener.id,
            priority = ?listener.priority,
            once = listener.once,
            context = listener.context.as_deref(),
            listener_count = count,
            "Listener registered"
        );

        if !pending.is_empty() {
            self.replay_to(name, &listener, pending);
        }

        Ok(Subscription {
            bus: self.downgrade(),
            event: name.to_string(),
            id: listener.id.clone(),
            listener: Arc::downgrade(&listener),
        })
    }

    /// Register a one-shot listener.
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
        self.on(name, callback, opts.once())
    }

    fn replay_to(&self, name: &str, listener: &Arc<Listener>, pending: Vec<Value>) {
        info!(
            event = name,
            listener_id = %listener.id,
            replayed = pending.len(),
            "Replaying buffered events"
        );
        for data in pending {
            if !listener.claim() {
                break;
            }
            let mut env = Envelope::replay(name, data);
            invoke(name, listener, &mut env);
            if listener.once {
                self.lock().remove_listener(name, listener);
                break;
            }
        }
    }

    /// Remove listeners of `name` matching `key`. Returns whether any were removed.
    pub fn off(&self, name: &str, key: impl Into<ListenerKey>) -> bool {
        let key = key.into();
        let mut state = self.lock();
        let Some(list) = state.listeners.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| !l.matches(&key));
        let removed = before.saturating_sub(list.len());
        if list.is_empty() {
            state.listeners.remove(name);
        }
        drop(state);

        if removed > 0 {
            debug!(event = name, removed, "Listener removed");
        }
        removed > 0
    }

    /// Remove every listener of `name`, or of every event when `None`.
    ///
    /// Returns `true` when listeners for `name` existed, and always `true`
    /// for the global form.
    pub fn remove_all_listeners(&self, name: Option<&str>) -> bool {
        let mut state = self.lock();
        match name {
            Some(name) => state.listeners.remove(name).is_some(),
            None => {
                state.listeners.clear();
                true
            },
        }
    }

    /// Emit `name` with `data`.
    ///
    /// Routing:
    /// 1. bus not ready and `opts.queueable`: queued, returns `true`;
    /// 2. no listener: buffered for replay if `opts.replayable`, returns `false`;
    /// 3. otherwise dispatched in priority order, returns `false` iff a
    ///    listener called [`Envelope::prevent_default`].
    ///
    /// Listener errors and panics are logged and never reach the caller.
    pub fn emit(&self, name: &str, data: Value, opts: EmitOptions) -> bool {
        self.lock().stats.record(name, &data);
        self.route(name, data, opts)
    }

    /// Emit with listener invocation postponed by one scheduler yield.
    ///
    /// Stats, queuing, replay buffering and the listener snapshot are all
    /// taken at call time, so listeners registered after this call returns
    /// are not invoked. The returned future yields once, then dispatches to
    /// the snapshot and resolves to the same value [`emit`](Self::emit)
    /// would have returned.
    pub fn emit_async(
        &self,
        name: &str,
        data: Value,
        opts: EmitOptions,
    ) -> impl Future<Output = bool> + Send + use<> {
        self.lock().stats.record(name, &data);
        let routed = self.plan(name, data, opts);
        let bus = self.clone();
        let name = name.to_string();
        async move {
            tokio::task::yield_now().await;
            match routed {
                Routed::Settled(result) => result,
                Routed::Dispatch { listeners, data } => bus.dispatch(&name, &listeners, data, opts),
            }
        }
    }

    fn route(&self, name: &str, data: Value, opts: EmitOptions) -> bool {
        match self.plan(name, data, opts) {
            Routed::Settled(result) => result,
            Routed::Dispatch { listeners, data } => self.dispatch(name, &listeners, data, opts),
        }
    }

    /// Queue or buffer the emission, or snapshot the listeners it goes to.
    fn plan(&self, name: &str, data: Value, opts: EmitOptions) -> Routed {
        let mut state = self.lock();
        if !state.ready && opts.queueable {
            state.queue.push(name, data, opts);
            trace!(event = name, queue_size = state.queue.len(), "Event queued");
            return Routed::Settled(true);
        }
        let listeners = state
            .listeners
            .get(name)
            .filter(|list| !list.is_empty())
            .cloned();
        match listeners {
            Some(listeners) => Routed::Dispatch { listeners, data },
            None => {
                if opts.replayable {
                    let ttl = self.inner.config.replay_timeout;
                    state.replay.push(name, data, ttl);
                }
                debug!(
                    event = name,
                    replayable = opts.replayable,
                    "No listeners for event"
                );
                Routed::Settled(false)
            },
        }
    }

    fn dispatch(
        &self,
        name: &str,
        snapshot: &[Arc<Listener>],
        data: Value,
        opts: EmitOptions,
    ) -> bool {
        let mut env = Envelope::new(name, data, opts.cancelable);
        let mut fired_once = Vec::new();
        let mut executed: usize = 0;

        for listener in snapshot {
            if !listener.claim() {
                continue;
            }
            if listener.once {
                fired_once.push(Arc::clone(listener));
            }
            invoke(name, listener, &mut env);
            executed = executed.saturating_add(1);
            if env.propagation_stopped() {
                trace!(event = name, listener_id = %listener.id, "Propagation stopped");
                break;
            }
        }

        if !fired_once.is_empty() {
            let mut state = self.lock();
            for listener in &fired_once {
                state.remove_listener(name, listener);
            }
        }

        trace!(
            event = name,
            executed,
            default_prevented = env.default_prevented(),
            "Event dispatched"
        );
        !env.default_prevented()
    }

    /// Drain the startup queue, re-emitting every entry younger than
    /// [`EventBusConfig::queue_max_age`] with queuing disabled.
    ///
    /// Returns the number of emissions re-emitted.
    pub fn process_queue(&self) -> usize {
        let drained = self.lock().queue.drain();
        if drained.is_empty() {
            return 0;
        }
        let total = drained.len();
        let max_age = self.inner.config.queue_max_age;
        let mut delivered: usize = 0;

        for entry in drained {
            let age = entry.age();
            if age > max_age {
                warn!(
                    event = %entry.name,
                    age_ms = age.as_millis(),
                    "Discarding stale queued event"
                );
                continue;
            }
            self.route(&entry.name, entry.data, entry.options.not_queueable());
            delivered = delivered.saturating_add(1);
        }

        info!(total, delivered, "Processed startup queue");
        delivered
    }

    /// Signal that the host is ready. Drains the startup queue once.
    ///
    /// Returns the number of queued emissions delivered. Calling it again is
    /// a no-op returning zero.
    pub fn mark_ready(&self) -> usize {
        {
            let mut state = self.lock();
            if state.ready {
                return 0;
            }
            state.ready = true;
        }
        info!("Event bus ready");
        self.process_queue()
    }

    /// Whether [`EventBus::mark_ready`] has been called.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    /// Wait for the next emission of `name`.
    ///
    /// A buffered replay entry satisfies the wait immediately.
    ///
    /// # Errors
    ///
    /// [`EventError::Timeout`] if `name` is not emitted within `timeout`
    /// (the temporary listener is removed), or [`EventError::InvalidArgument`]
    /// for a malformed name.
    pub async fn wait_for(&self, name: &str, timeout: Duration) -> EventResult<Envelope> {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let subscription = self.on(
            name,
            move |env| {
                if let Some(tx) = tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
                    let _ = tx.send(env.clone());
                }
                Ok(())
            },
            ListenerOptions::default().once().context("wait_for"),
        )?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(env)) => Ok(env),
            Ok(Err(_)) => {
                debug!(event = name, "Waiter removed before the event fired");
                Err(timeout_error(name, timeout))
            },
            Err(_) => {
                subscription.unsubscribe();
                debug!(event = name, timeout_ms = timeout.as_millis(), "wait_for timed out");
                Err(timeout_error(name, timeout))
            },
        }
    }

    /// [`EventBus::wait_for`] with [`EventBusConfig::wait_for_timeout`].
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::wait_for`].
    pub async fn wait_for_default(&self, name: &str) -> EventResult<Envelope> {
        self.wait_for(name, self.inner.config.wait_for_timeout).await
    }

    /// A facade that prefixes every event name with `"{prefix}:"`.
    #[must_use]
    pub fn namespace(&self, prefix: impl Into<String>) -> Namespace {
        Namespace::new(self.clone(), prefix.into())
    }

    /// Number of listeners registered for `name`.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.lock().listener_count(name)
    }

    /// Number of emissions waiting in the startup queue.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of buffered replay entries for `name`, expired ones included
    /// until they are pruned.
    #[must_use]
    pub fn replay_len(&self, name: &str) -> usize {
        self.lock().replay.len(name)
    }

    /// Drop expired replay entries. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let removed = self.lock().replay.prune(self.inner.config.replay_timeout);
        if removed > 0 {
            trace!(removed, "Pruned expired replay entries");
        }
        removed
    }

    /// Snapshot of emission statistics.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        let state = self.lock();
        BusStats {
            ready: state.ready,
            total_events: state.stats.distinct_events(),
            total_listeners: state.listeners.values().map(Vec::len).sum(),
            queue_size: state.queue.len(),
            replay_size: state.replay.total(),
            events: state.stats.event_stats(|name| state.listener_count(name)),
        }
    }

    /// The bounded emission history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock().stats.history()
    }

    /// Clear listeners, queue, replay buffers, statistics and history.
    ///
    /// The ready flag is left as is.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.listeners.clear();
            state.queue.clear();
            state.replay.clear();
            state.stats.clear();
        }
        info!("Event bus reset");
    }
}

/// Non-owning handle to an [`EventBus`].
#[derive(Debug, Clone, Default)]
pub struct WeakEventBus {
    inner: Weak<Inner>,
}

impl WeakEventBus {
    /// Upgrade to a strong handle if the bus is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<EventBus> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }
}

/// Handle returned by [`EventBus::on`]. Dropping it does not unsubscribe.
#[derive(Debug, Clone)]
pub struct Subscription {
    bus: WeakEventBus,
    event: String,
    id: String,
    listener: Weak<Listener>,
}

impl Subscription {
    /// The listener id (explicit or generated).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The event the listener is registered for.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove exactly this listener. Returns whether it was still registered.
    pub fn unsubscribe(&self) -> bool {
        let (Some(bus), Some(listener)) = (self.bus.upgrade(), self.listener.upgrade()) else {
            return false;
        };
        let removed = bus.lock().remove_listener(&self.event, &listener);
        if removed {
            debug!(event = %self.event, listener_id = %self.id, "Unsubscribed");
        }
        removed
    }
}

fn invoke(name: &str, listener: &Listener, env: &mut Envelope) {
    let callback = &listener.callback;
    match panic::catch_unwind(AssertUnwindSafe(|| callback(env))) {
        Ok(Ok(())) => {},
        Ok(Err(e)) => warn!(
            event = name,
            listener_id = %listener.id,
            context = listener.context.as_deref(),
            error = %e,
            "Listener returned an error"
        ),
        Err(_) => error!(
            event = name,
            listener_id = %listener.id,
            context = listener.context.as_deref(),
            "Listener panicked"
        ),
    }
}

fn validate_event_name(name: &str) -> EventResult<()> {
    if name.is_empty() {
        return Err(EventError::InvalidArgument(
            "event name must not be empty".to_string(),
        ));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(EventError::InvalidArgument(format!(
            "event name contains whitespace or control characters: {name:?}"
        )));
    }
    Ok(())
}

fn timeout_error(name: &str, timeout: Duration) -> EventError {
    EventError::Timeout {
        event: name.to_string(),
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}
