//! Full demo run against the live broker

use std::sync::Arc;

use kafka_demo::DemoRunner;

use crate::assertions::{assert_all_stages_completed, assert_equal};
use crate::common::{create_broker, kafka_config, TestResult};
use crate::setup::TestContext;

/// All three stages complete on freshly created topics and groups
pub async fn test_demo_run() -> TestResult {
    println!("=== Test: Demo Run ===\n");

    let ctx = TestContext::new().await?;

    let mut config = kafka_config();
    config.message_topic = ctx.create_topic("topic1", 1).await?;
    config.partitioned_topic = ctx.create_topic("partitioned", 5).await?;
    config.filtered_topic = ctx.create_topic("filtered", 1).await?;
    config.group_foo = ctx.unique_group("foo");
    config.group_bar = ctx.unique_group("bar");
    config.group_headers = ctx.unique_group("headers");
    config.group_partitions = ctx.unique_group("partitions");
    config.group_filter = ctx.unique_group("filter");
    let broker = create_broker(&config)?;

    let report = DemoRunner::new(Arc::new(config), broker).run().await?;

    assert_all_stages_completed(&report)?;
    assert_equal(
        "Partition listener deliveries",
        Some(2),
        report
            .listener(kafka_demo::demo::LISTENER_PARTITIONS)
            .map(|s| s.delivered),
    )?;

    ctx.cleanup().await?;
    println!("\n   Test PASSED\n");
    Ok(())
}
