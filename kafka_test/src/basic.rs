//! Basic publish tests
//!
//! One message on a single-partition topic reaches every consumer group.

use kafka_demo::kafka::{
    HeaderRequirement, ListenerContainer, ListenerRegistry, ListenerSpec, MessageProducer,
    TopicNames,
};

use crate::assertions::assert_equal;
use crate::common::{create_broker, kafka_config, TestResult, QUIET_PERIOD, TEST_TIMEOUT};
use crate::fixtures::Collector;
use crate::setup::TestContext;

/// Publish once, expect one delivery per group (three groups)
pub async fn test_basic_fanout() -> TestResult {
    println!("=== Test: Basic Publish Fan-out ===\n");

    let ctx = TestContext::new().await?;
    let topic = ctx.create_topic("basic", 1).await?;

    let mut config = kafka_config();
    config.message_topic = topic.clone();
    let broker = create_broker(&config)?;

    let foo = Collector::new("foo", 1);
    let bar = Collector::new("bar", 1);
    let headers = Collector::new("headers", 1);

    let mut registry = ListenerRegistry::new();
    registry.register(
        ListenerSpec::topics("foo", &[topic.as_str()], foo.handler())
            .with_group_id(ctx.unique_group("foo")),
    )?;
    registry.register(
        ListenerSpec::topics("bar", &[topic.as_str()], bar.handler())
            .with_group_id(ctx.unique_group("bar")),
    )?;
    registry.register(
        ListenerSpec::topics("headers", &[topic.as_str()], headers.handler())
            .with_group_id(ctx.unique_group("headers"))
            .with_headers(HeaderRequirement::Partition),
    )?;
    let container = ListenerContainer::start(broker.clone(), registry).await?;
    println!("   Started 3 listeners on '{}'", topic);

    let producer = MessageProducer::new(broker, TopicNames::from_config(&config));
    let sent = producer.send_message("Hello, World!").await?;
    println!("   Sent to partition {} at offset {}", sent.partition, sent.offset);

    foo.wait(TEST_TIMEOUT).await?;
    bar.wait(TEST_TIMEOUT).await?;
    headers.wait(TEST_TIMEOUT).await?;
    tokio::time::sleep(QUIET_PERIOD).await;
    let stats = container.stop().await;

    for (name, snapshot) in &stats {
        assert_equal(
            &format!("Listener '{}' delivery count", name),
            1,
            snapshot.delivered,
        )?;
    }
    assert_equal(
        "Partition header",
        Some(0),
        headers.collected()[0].header_partition,
    )?;

    ctx.cleanup().await?;
    println!("\n   Test PASSED\n");
    Ok(())
}
