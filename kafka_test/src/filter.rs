//! Filtered listener tests

use kafka_demo::kafka::{
    ListenerContainer, ListenerRegistry, ListenerSpec, MessageProducer, RecordFilter, TopicNames,
};

use crate::assertions::assert_equal;
use crate::common::{create_broker, kafka_config, TestResult, QUIET_PERIOD, TEST_TIMEOUT};
use crate::fixtures::Collector;
use crate::setup::TestContext;

/// Of "Hello Test!" and "Hello World!", only the first reaches the handler
pub async fn test_filter_discards_world() -> TestResult {
    println!("=== Test: Filtered Listener ===\n");

    let ctx = TestContext::new().await?;
    let topic = ctx.create_topic("filtered", 1).await?;

    let mut config = kafka_config();
    config.filtered_topic = topic.clone();
    let broker = create_broker(&config)?;

    let filtered = Collector::new("filter", 1);
    let mut registry = ListenerRegistry::new();
    registry.register(
        ListenerSpec::topics("filtered", &[topic.as_str()], filtered.handler())
            .with_group_id(ctx.unique_group("filter"))
            .with_filter(RecordFilter::discard_containing("World")),
    )?;
    let container = ListenerContainer::start(broker.clone(), registry).await?;

    let producer = MessageProducer::new(broker, TopicNames::from_config(&config));
    producer.send_message_to_filtered("Hello Test!").await?;
    producer.send_message_to_filtered("Hello World!").await?;

    filtered.wait(TEST_TIMEOUT).await?;
    tokio::time::sleep(QUIET_PERIOD).await;
    let stats = container.stop().await;

    assert_equal(
        "Handled payloads",
        vec!["Hello Test!".to_string()],
        filtered.payloads(),
    )?;
    assert_equal("Filtered count", 1, stats[0].1.filtered)?;

    ctx.cleanup().await?;
    println!("\n   Test PASSED\n");
    Ok(())
}
