// Listener registration and dispatch
//
// Listeners are declared up front in a ListenerRegistry: each ListenerSpec
// names what it reads (topics, or explicit topic partitions), the consumer
// group it reads under, which record metadata it wants, an optional filter,
// and the handler to call. ListenerContainer::start opens one consumer per
// spec and runs one tokio task per listener:
//
//   broker consumer ──> DeliveryStream ──> filter ──> handler
//
// Returning from the handler acknowledges the delivery (offsets are
// auto-committed by the client). Handlers run at-least-once per delivery.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::broker::{ConsumerRequest, DeliveryStream, MessageBroker, Subscription};
use super::error::{DemoError, Result};
use super::messages::{HeaderRequirement, ReceivedMessage, RecordHeaders};

/// Application callback invoked once per accepted delivery
pub type Handler = Arc<dyn Fn(&ReceivedMessage, &RecordHeaders) + Send + Sync>;

/// Predicate deciding which deliveries never reach the handler
#[derive(Clone)]
pub struct RecordFilter {
    description: String,
    discard: Arc<dyn Fn(&ReceivedMessage) -> bool + Send + Sync>,
}

impl RecordFilter {
    /// Filter discarding every message for which `discard` returns true
    pub fn new<F>(description: impl Into<String>, discard: F) -> Self
    where
        F: Fn(&ReceivedMessage) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            discard: Arc::new(discard),
        }
    }

    /// Filter discarding payloads that contain `needle`
    pub fn discard_containing(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        let description = format!("discard payloads containing '{}'", needle);
        Self::new(description, move |message| message.payload.contains(&needle))
    }

    pub fn discards(&self, message: &ReceivedMessage) -> bool {
        (self.discard)(message)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for RecordFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordFilter").field(&self.description).finish()
    }
}

/// Declaration of one listener
#[derive(Clone)]
pub struct ListenerSpec {
    name: String,
    subscription: Subscription,
    group_id: Option<String>,
    headers: HeaderRequirement,
    filter: Option<RecordFilter>,
    handler: Handler,
}

impl ListenerSpec {
    pub fn new(name: impl Into<String>, subscription: Subscription, handler: Handler) -> Self {
        Self {
            name: name.into(),
            subscription,
            group_id: None,
            headers: HeaderRequirement::None,
            filter: None,
            handler,
        }
    }

    /// Group-managed listener on one or more topics
    pub fn topics(name: impl Into<String>, topics: &[&str], handler: Handler) -> Self {
        let topics = topics.iter().map(|t| t.to_string()).collect();
        Self::new(name, Subscription::Topics(topics), handler)
    }

    /// Listener bound to explicit partitions of a topic
    pub fn partitions(
        name: impl Into<String>,
        topic: &str,
        partitions: &[i32],
        handler: Handler,
    ) -> Self {
        Self::new(
            name,
            Subscription::Partitions {
                topic: topic.to_string(),
                partitions: partitions.to_vec(),
            },
            handler,
        )
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_headers(mut self, headers: HeaderRequirement) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// The group this listener consumes under
    ///
    /// The broker needs a group id even for listeners that declare none, so
    /// those get one derived from the listener name.
    pub fn effective_group_id(&self) -> String {
        self.group_id
            .clone()
            .unwrap_or_else(|| format!("{}-group", self.name))
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DemoError::InvalidArgument(
                "listener name must not be empty".to_string(),
            ));
        }
        let empty = match &self.subscription {
            Subscription::Topics(topics) => {
                topics.is_empty() || topics.iter().any(|t| t.trim().is_empty())
            }
            Subscription::Partitions { topic, partitions } => {
                topic.trim().is_empty() || partitions.is_empty()
            }
        };
        if empty {
            return Err(DemoError::InvalidArgument(format!(
                "listener '{}' has an empty subscription",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ListenerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSpec")
            .field("name", &self.name)
            .field("subscription", &self.subscription)
            .field("group_id", &self.group_id)
            .field("headers", &self.headers)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Declarative table of listeners, resolved when the container starts
#[derive(Debug, Default, Clone)]
pub struct ListenerRegistry {
    specs: Vec<ListenerSpec>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener; names must be unique
    pub fn register(&mut self, spec: ListenerSpec) -> Result<()> {
        spec.validate()?;
        if self.specs.iter().any(|s| s.name == spec.name) {
            return Err(DemoError::InvalidArgument(format!(
                "listener '{}' is already registered",
                spec.name
            )));
        }
        self.specs.push(spec);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListenerSpec> {
        self.specs.iter()
    }
}

/// Per-listener delivery counters
#[derive(Debug, Default)]
pub struct ListenerStats {
    delivered: AtomicU64,
    filtered: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of ListenerStats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub delivered: u64,
    pub filtered: u64,
    pub errors: u64,
}

impl ListenerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// What happened to one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Filtered,
    Failed,
}

/// Run one delivery through a listener's filter and handler
pub fn dispatch(
    spec: &ListenerSpec,
    delivery: Result<ReceivedMessage>,
    stats: &ListenerStats,
) -> DispatchOutcome {
    let message = match delivery {
        Ok(message) => message,
        Err(e) => {
            warn!("Listener '{}' consumer error: {}", spec.name, e);
            stats.errors.fetch_add(1, Ordering::Relaxed);
            return DispatchOutcome::Failed;
        }
    };

    if let Some(filter) = &spec.filter {
        if filter.discards(&message) {
            debug!(
                "Listener '{}' filtered {}[{}]@{} ({})",
                spec.name,
                message.topic,
                message.partition,
                message.offset,
                filter.description()
            );
            stats.filtered.fetch_add(1, Ordering::Relaxed);
            return DispatchOutcome::Filtered;
        }
    }

    let headers = RecordHeaders::extract(&message, spec.headers);
    debug!(
        "Listener '{}' received {}[{}]@{}",
        spec.name, message.topic, message.partition, message.offset
    );
    (spec.handler)(&message, &headers);
    stats.delivered.fetch_add(1, Ordering::Relaxed);
    DispatchOutcome::Handled
}

async fn run_listener(
    spec: ListenerSpec,
    mut stream: DeliveryStream,
    stats: Arc<ListenerStats>,
    shutdown: CancellationToken,
) {
    loop {
        // Deliveries already queued are dispatched before shutdown is seen
        tokio::select! {
            biased;
            next = stream.recv() => match next {
                Some(delivery) => {
                    dispatch(&spec, delivery, &stats);
                }
                None => {
                    info!("Listener '{}' stream closed by broker", spec.name);
                    break;
                }
            },
            _ = shutdown.cancelled() => {
                debug!("Listener '{}' received shutdown signal", spec.name);
                break;
            }
        }
    }
}

/// Running listeners, one task each
pub struct ListenerContainer {
    shutdown: CancellationToken,
    tasks: Vec<(String, JoinHandle<()>)>,
    stats: Vec<(String, Arc<ListenerStats>)>,
}

impl ListenerContainer {
    /// Open a consumer for every registered listener and start dispatching
    ///
    /// Consumers are subscribed before this returns. If any consumer fails
    /// to open, the listeners already started are stopped and the error is
    /// returned.
    pub async fn start(broker: Arc<dyn MessageBroker>, registry: ListenerRegistry) -> Result<Self> {
        let mut container = Self {
            shutdown: CancellationToken::new(),
            tasks: Vec::with_capacity(registry.len()),
            stats: Vec::with_capacity(registry.len()),
        };

        for spec in registry.specs {
            let request = ConsumerRequest {
                listener: spec.name.clone(),
                group_id: spec.effective_group_id(),
                subscription: spec.subscription.clone(),
            };

            let stream = match broker.open_consumer(request).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to start listener '{}': {}", spec.name, e);
                    let _ = container.stop().await;
                    return Err(e);
                }
            };

            let stats = Arc::new(ListenerStats::default());
            let name = spec.name.clone();
            info!(
                "Started listener '{}' (group '{}')",
                name,
                spec.effective_group_id()
            );
            let handle = tokio::spawn(run_listener(
                spec,
                stream,
                stats.clone(),
                container.shutdown.child_token(),
            ));
            container.tasks.push((name.clone(), handle));
            container.stats.push((name, stats));
        }

        Ok(container)
    }

    /// Current counters of a listener
    pub fn stats(&self, listener: &str) -> Option<StatsSnapshot> {
        self.stats
            .iter()
            .find(|(name, _)| name == listener)
            .map(|(_, stats)| stats.snapshot())
    }

    pub fn listener_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Signal every listener to stop and wait for the tasks to finish
    ///
    /// Returns the final counters of every listener.
    pub async fn stop(self) -> Vec<(String, StatsSnapshot)> {
        self.shutdown.cancel();
        let (names, handles): (Vec<String>, Vec<JoinHandle<()>>) = self.tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;
        for (name, result) in names.iter().zip(results) {
            if let Err(e) = result {
                warn!("Listener '{}' ended abnormally: {}", name, e);
            }
        }
        info!("Stopped {} listener(s)", names.len());

        self.stats
            .into_iter()
            .map(|(name, stats)| (name, stats.snapshot()))
            .collect()
    }
}

impl fmt::Debug for ListenerContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerContainer")
            .field("listeners", &self.listener_names())
            .field("cancelled", &self.shutdown.is_cancelled())
            .finish()
    }
}
