//! Test environment setup and teardown
//!
//! Provides TestContext for test isolation with automatic cleanup via RAII.

use std::sync::Arc;
use std::time::Duration;

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, Producer};
use rdkafka::types::RDKafkaErrorCode;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::common::{get_bootstrap_servers, TestResult};

/// Test context providing isolation and automatic cleanup
///
/// Each test should create its own TestContext which:
/// - Generates unique topic/group names to prevent collisions
/// - Tracks created topics for cleanup
/// - Deletes them on drop
pub struct TestContext {
    /// Unique identifier for this test run
    pub test_id: String,
    admin: Arc<AdminClient<DefaultClientContext>>,
    topics_created: Arc<Mutex<Vec<String>>>,
}

fn create_admin_client() -> Result<AdminClient<DefaultClientContext>, Box<dyn std::error::Error>> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", get_bootstrap_servers())
        .set("broker.address.family", "v4")
        .create()?;
    Ok(admin)
}

impl TestContext {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            test_id: Uuid::new_v4().to_string()[..8].to_string(),
            admin: Arc::new(create_admin_client()?),
            topics_created: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Generate a unique topic name for this test (not created yet)
    pub fn unique_topic(&self, base: &str) -> String {
        let uuid_str = Uuid::new_v4().to_string();
        format!("{}-{}-{}", base, self.test_id, &uuid_str[..8])
    }

    /// Generate a unique consumer group ID for this test
    pub fn unique_group(&self, base: &str) -> String {
        let uuid_str = Uuid::new_v4().to_string();
        format!("{}-{}-{}", base, self.test_id, &uuid_str[..8])
    }

    /// Create a uniquely named topic and track it for cleanup
    pub async fn create_topic(
        &self,
        base: &str,
        partitions: i32,
    ) -> Result<String, Box<dyn std::error::Error>> {
        let name = self.unique_topic(base);
        let new_topic = NewTopic::new(&name, partitions, TopicReplication::Fixed(1));
        let opts = AdminOptions::new().operation_timeout(Some(Duration::from_secs(5)));

        for result in self.admin.create_topics(&[new_topic], &opts).await? {
            match result {
                Ok(_) | Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => {}
                Err((topic, code)) => {
                    return Err(format!("Failed to create topic '{}': {}", topic, code).into())
                }
            }
        }

        self.topics_created.lock().await.push(name.clone());
        Ok(name)
    }

    /// Manually trigger cleanup (also attempted on drop)
    pub async fn cleanup(&self) -> TestResult {
        let topics: Vec<String> = self.topics_created.lock().await.drain(..).collect();
        delete_topics(&self.admin, &topics).await;
        Ok(())
    }
}

async fn delete_topics(admin: &AdminClient<DefaultClientContext>, topics: &[String]) {
    if topics.is_empty() {
        return;
    }
    let names: Vec<&str> = topics.iter().map(String::as_str).collect();
    let _ = admin.delete_topics(&names, &AdminOptions::new()).await;
}

impl Drop for TestContext {
    fn drop(&mut self) {
        // Best-effort: skipped if the runtime is shutting down
        let topics = self.topics_created.clone();
        let admin = self.admin.clone();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let topics: Vec<String> = topics.lock().await.drain(..).collect();
                delete_topics(&admin, &topics).await;
            });
        }
    }
}

/// Verify that the broker is ready to accept connections
pub async fn verify_server_ready() -> TestResult {
    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", get_bootstrap_servers())
        .set("message.timeout.ms", "5000")
        .create()?;

    let timeout = Duration::from_secs(5);
    producer.client().fetch_metadata(None, timeout)?;

    Ok(())
}
