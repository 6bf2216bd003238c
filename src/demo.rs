//! Demo orchestration
//!
//! `DemoRunner` provisions the demo topics, registers five listeners, and
//! then runs three publish stages. Each stage publishes its messages and
//! waits on a `DeliveryLatch` that the listeners count down:
//!
//! | stage       | publishes                                   | latch |
//! |-------------|---------------------------------------------|-------|
//! | basic       | "Hello, World!" to the message topic        | 3     |
//! | partitioned | one message to every partition              | 2     |
//! | filtered    | "Hello Test!" and "Hello World!"            | 1     |
//!
//! A stage whose latch does not reach zero in time is recorded as timed out
//! and the run moves on, unless `demo.fail_fast` is set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::{BrokerMode, Config};
use crate::kafka::broker::{MessageBroker, Subscription};
use crate::kafka::client::KafkaBroker;
use crate::kafka::constants::{
    BASIC_PAYLOAD, FILTERED_PAYLOADS, PARTITIONED_PAYLOAD, SHUTDOWN_FLUSH_TIMEOUT_MS,
};
use crate::kafka::error::Result;
use crate::kafka::latch::DeliveryLatch;
use crate::kafka::listener::{
    ListenerContainer, ListenerRegistry, ListenerSpec, RecordFilter, StatsSnapshot,
};
use crate::kafka::memory::InMemoryBroker;
use crate::kafka::messages::{HeaderRequirement, ReceivedMessage, RecordHeaders};
use crate::kafka::producer::{MessageProducer, TopicNames};

/// Listener names used by the demo
pub const LISTENER_GROUP_FOO: &str = "group-foo";
pub const LISTENER_GROUP_BAR: &str = "group-bar";
pub const LISTENER_WITH_HEADERS: &str = "with-headers";
pub const LISTENER_PARTITIONS: &str = "partitions";
pub const LISTENER_FILTERED: &str = "filtered";

/// Build the broker selected by `broker.mode`
pub fn connect_broker(config: Arc<Config>) -> Result<Arc<dyn MessageBroker>> {
    match config.broker_mode {
        BrokerMode::Kafka => Ok(Arc::new(KafkaBroker::new(config)?)),
        BrokerMode::Memory => {
            info!("Using the in-process simulated broker");
            Ok(Arc::new(InMemoryBroker::new()))
        }
    }
}

/// The three latches the stages wait on
#[derive(Debug, Clone)]
pub struct DemoLatches {
    pub basic: Arc<DeliveryLatch>,
    pub partition: Arc<DeliveryLatch>,
    pub filter: Arc<DeliveryLatch>,
}

impl DemoLatches {
    /// Latches sized for the listeners `demo_listeners` registers
    pub fn for_config(config: &Config) -> Self {
        Self {
            basic: Arc::new(DeliveryLatch::new("basic", 3)),
            partition: Arc::new(DeliveryLatch::new(
                "partition",
                config.listened_partitions.len(),
            )),
            filter: Arc::new(DeliveryLatch::new("filter", 1)),
        }
    }
}

/// Register the demo listeners, wired to count down `latches`
pub fn demo_listeners(config: &Config, latches: &DemoLatches) -> Result<ListenerRegistry> {
    let mut registry = ListenerRegistry::new();

    for (name, group) in [
        (LISTENER_GROUP_FOO, &config.group_foo),
        (LISTENER_GROUP_BAR, &config.group_bar),
    ] {
        let latch = latches.basic.clone();
        let group_name = group.clone();
        registry.register(
            ListenerSpec::topics(
                name,
                &[config.message_topic.as_str()],
                Arc::new(move |message: &ReceivedMessage, _: &RecordHeaders| {
                    info!("Received Message in group '{}': {}", group_name, message.payload);
                    latch.count_down();
                }),
            )
            .with_group_id(group.as_str()),
        )?;
    }

    let latch = latches.basic.clone();
    registry.register(
        ListenerSpec::topics(
            LISTENER_WITH_HEADERS,
            &[config.message_topic.as_str()],
            Arc::new(move |message: &ReceivedMessage, headers: &RecordHeaders| {
                info!(
                    "Received Message: {} from partition: {}",
                    message.payload,
                    headers.received_partition.unwrap_or(message.partition)
                );
                latch.count_down();
            }),
        )
        .with_group_id(config.group_headers.as_str())
        .with_headers(HeaderRequirement::Partition),
    )?;

    let latch = latches.partition.clone();
    registry.register(
        ListenerSpec::new(
            LISTENER_PARTITIONS,
            Subscription::Partitions {
                topic: config.partitioned_topic.clone(),
                partitions: config.listened_partitions.clone(),
            },
            Arc::new(move |message: &ReceivedMessage, headers: &RecordHeaders| {
                info!(
                    "Received Message: {} from partition: {}",
                    message.payload,
                    headers.received_partition.unwrap_or(message.partition)
                );
                latch.count_down();
            }),
        )
        .with_group_id(config.group_partitions.as_str())
        .with_headers(HeaderRequirement::Partition),
    )?;

    let latch = latches.filter.clone();
    registry.register(
        ListenerSpec::topics(
            LISTENER_FILTERED,
            &[config.filtered_topic.as_str()],
            Arc::new(move |message: &ReceivedMessage, _: &RecordHeaders| {
                info!("Received Message in filtered listener: {}", message.payload);
                latch.count_down();
            }),
        )
        .with_group_id(config.group_filter.as_str())
        .with_filter(RecordFilter::discard_containing(
            config.filter_discard_contains.as_str(),
        )),
    )?;

    Ok(registry)
}

/// How a stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Completed { elapsed: Duration },
    TimedOut { remaining: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub name: String,
    pub expected: usize,
    pub publish_failures: usize,
    pub outcome: StageOutcome,
}

impl StageReport {
    pub fn completed(&self) -> bool {
        matches!(self.outcome, StageOutcome::Completed { .. })
    }
}

/// Result of a full run
#[derive(Debug, Clone, Default)]
pub struct DemoReport {
    pub stages: Vec<StageReport>,
    pub listeners: Vec<(String, StatsSnapshot)>,
}

impl DemoReport {
    pub fn all_completed(&self) -> bool {
        self.stages.iter().all(StageReport::completed)
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn listener(&self, name: &str) -> Option<StatsSnapshot> {
        self.listeners
            .iter()
            .find(|(listener, _)| listener == name)
            .map(|(_, stats)| *stats)
    }

    pub fn log_summary(&self) {
        for stage in &self.stages {
            match stage.outcome {
                StageOutcome::Completed { elapsed } => info!(
                    "Stage '{}' completed: {} deliveries in {:?}",
                    stage.name, stage.expected, elapsed
                ),
                StageOutcome::TimedOut { remaining } => warn!(
                    "Stage '{}' timed out: {} of {} deliveries missing",
                    stage.name, remaining, stage.expected
                ),
            }
        }
        for (name, stats) in &self.listeners {
            info!(
                "Listener '{}': delivered={} filtered={} errors={}",
                name, stats.delivered, stats.filtered, stats.errors
            );
        }
    }
}

/// Runs the demo stages against a broker
pub struct DemoRunner {
    config: Arc<Config>,
    broker: Arc<dyn MessageBroker>,
}

impl DemoRunner {
    pub fn new(config: Arc<Config>, broker: Arc<dyn MessageBroker>) -> Self {
        Self { config, broker }
    }

    /// Run every stage, then stop the listeners and flush the producer
    ///
    /// Returns `LatchTimeout` only when `demo.fail_fast` is set; otherwise a
    /// timed out stage shows up in the report. An invalid config is rejected
    /// before anything touches the broker.
    pub async fn run(&self) -> Result<DemoReport> {
        self.config.validate()?;

        info!(
            "Starting demo against {} broker ({})",
            self.broker.name(),
            self.config.bootstrap_servers
        );

        if let Err(e) = self.broker.ensure_topics(&self.config.topics()).await {
            warn!("Topic provisioning failed, continuing with existing topics: {}", e);
        }

        let latches = DemoLatches::for_config(&self.config);
        let registry = demo_listeners(&self.config, &latches)?;
        let container = ListenerContainer::start(self.broker.clone(), registry).await?;

        let producer = MessageProducer::new(
            self.broker.clone(),
            TopicNames::from_config(&self.config),
        );

        let result = self.run_stages(&producer, &latches).await;

        let listeners = container.stop().await;

        if let Err(e) = producer.flush(Duration::from_millis(SHUTDOWN_FLUSH_TIMEOUT_MS)) {
            warn!("Producer flush failed: {}", e);
        }

        let mut report = result?;
        report.listeners = listeners;
        report.log_summary();
        Ok(report)
    }

    async fn run_stages(
        &self,
        producer: &MessageProducer,
        latches: &DemoLatches,
    ) -> Result<DemoReport> {
        let mut report = DemoReport::default();

        let started = Instant::now();
        let failures = usize::from(producer.send_message(BASIC_PAYLOAD).await.is_err());
        report
            .stages
            .push(self.await_stage("basic", started, &latches.basic, failures).await?);

        let started = Instant::now();
        let mut failures = 0;
        for partition in 0..self.config.partitioned_topic_partitions {
            if producer
                .send_message_to_partition(PARTITIONED_PAYLOAD, partition)
                .await
                .is_err()
            {
                failures += 1;
            }
        }
        report
            .stages
            .push(self.await_stage("partitioned", started, &latches.partition, failures).await?);

        let started = Instant::now();
        let mut failures = 0;
        for payload in FILTERED_PAYLOADS {
            if producer.send_message_to_filtered(payload).await.is_err() {
                failures += 1;
            }
        }
        report
            .stages
            .push(self.await_stage("filtered", started, &latches.filter, failures).await?);

        Ok(report)
    }

    async fn await_stage(
        &self,
        name: &str,
        started: Instant,
        latch: &DeliveryLatch,
        publish_failures: usize,
    ) -> Result<StageReport> {
        let timeout = Duration::from_millis(self.config.latch_timeout_ms);

        let outcome = match latch.wait(timeout).await {
            Ok(()) => StageOutcome::Completed {
                elapsed: started.elapsed(),
            },
            Err(e) if e.is_timeout() && !self.config.fail_fast => {
                warn!("Stage '{}': {}", name, e);
                StageOutcome::TimedOut {
                    remaining: latch.count(),
                }
            }
            Err(e) => return Err(e),
        };

        Ok(StageReport {
            name: name.to_string(),
            expected: latch.initial(),
            publish_failures,
            outcome,
        })
    }
}

impl std::fmt::Debug for DemoRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoRunner")
            .field("broker", &self.broker.name())
            .field("config", &self.config)
            .finish()
    }
}
