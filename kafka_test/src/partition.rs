//! Partition-targeted publish tests

use kafka_demo::kafka::{
    HeaderRequirement, ListenerContainer, ListenerRegistry, ListenerSpec, MessageProducer,
    TopicNames,
};

use crate::assertions::assert_equal;
use crate::common::{create_broker, kafka_config, TestResult, QUIET_PERIOD, TEST_TIMEOUT};
use crate::fixtures::Collector;
use crate::setup::TestContext;

/// One message per partition 0-4; the listener bound to {0, 3} gets two
pub async fn test_partition_binding() -> TestResult {
    println!("=== Test: Partition Binding ===\n");

    let ctx = TestContext::new().await?;
    let topic = ctx.create_topic("partitioned", 5).await?;

    let mut config = kafka_config();
    config.partitioned_topic = topic.clone();
    let broker = create_broker(&config)?;

    let bound = Collector::new("partition", 2);
    let mut registry = ListenerRegistry::new();
    registry.register(
        ListenerSpec::partitions("partitions", &topic, &[0, 3], bound.handler())
            .with_group_id(ctx.unique_group("partitions"))
            .with_headers(HeaderRequirement::Partition),
    )?;
    let container = ListenerContainer::start(broker.clone(), registry).await?;

    let producer = MessageProducer::new(broker, TopicNames::from_config(&config));
    for partition in 0..5 {
        let sent = producer
            .send_message_to_partition("Hello To Partitioned Topic!", partition)
            .await?;
        assert_equal("Target partition", partition, sent.partition)?;
    }

    bound.wait(TEST_TIMEOUT).await?;
    tokio::time::sleep(QUIET_PERIOD).await;
    container.stop().await;

    let mut partitions: Vec<i32> = bound.collected().iter().map(|c| c.partition).collect();
    partitions.sort_unstable();
    assert_equal("Delivered partitions", vec![0, 3], partitions)?;

    let mut headers: Vec<Option<i32>> = bound
        .collected()
        .iter()
        .map(|c| c.header_partition)
        .collect();
    headers.sort_unstable();
    assert_equal("Partition headers", vec![Some(0), Some(3)], headers)?;

    ctx.cleanup().await?;
    println!("\n   Test PASSED\n");
    Ok(())
}

/// Publishing beyond the partition count fails without a delivery
pub async fn test_invalid_partition_rejected() -> TestResult {
    println!("=== Test: Invalid Partition ===\n");

    let ctx = TestContext::new().await?;
    let topic = ctx.create_topic("partitioned", 5).await?;

    let mut config = kafka_config();
    config.partitioned_topic = topic;
    config.message_timeout_ms = 3_000;
    let broker = create_broker(&config)?;

    let producer = MessageProducer::new(broker, TopicNames::from_config(&config));
    match producer.send_message_to_partition("nowhere", 7).await {
        Ok(sent) => {
            return Err(format!("publish to partition 7 succeeded at offset {}", sent.offset).into())
        }
        Err(e) => println!("   Expected failure: {}", e),
    }

    ctx.cleanup().await?;
    println!("\n   Test PASSED\n");
    Ok(())
}
