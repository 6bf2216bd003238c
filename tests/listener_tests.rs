// Listener container tests against the simulated broker
//
// Group fan-out, manual partition assignment, filtering, header extraction
// and shutdown.

mod helpers;

#[cfg(test)]
mod listener_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kafka_demo::kafka::{
        HeaderRequirement, ListenerContainer, ListenerRegistry, ListenerSpec, MessageBroker,
        MessageProducer, OutboundMessage, RecordFilter, TopicNames,
    };

    use crate::helpers::{demo_broker, memory_config, wait_until, Recorder};

    const SETTLE: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_every_group_receives_the_message_once() {
        let config = memory_config();
        let broker = demo_broker(&config);

        let foo = Recorder::default();
        let bar = Recorder::default();
        let headers = Recorder::default();
        let mut registry = ListenerRegistry::new();
        registry
            .register(ListenerSpec::topics("foo", &["topic1"], foo.handler()).with_group_id("foo"))
            .unwrap();
        registry
            .register(ListenerSpec::topics("bar", &["topic1"], bar.handler()).with_group_id("bar"))
            .unwrap();
        registry
            .register(
                ListenerSpec::topics("headers", &["topic1"], headers.handler())
                    .with_headers(HeaderRequirement::Partition),
            )
            .unwrap();

        let container = ListenerContainer::start(broker.clone(), registry).await.unwrap();
        let producer = MessageProducer::new(broker.clone(), TopicNames::from_config(&config));
        producer.send_message("Hello, World!").await.unwrap();

        assert!(wait_until(|| foo.len() + bar.len() + headers.len() == 3, SETTLE).await);
        container.stop().await;

        assert_eq!(foo.payloads(), vec!["Hello, World!".to_string()]);
        assert_eq!(bar.payloads(), vec!["Hello, World!".to_string()]);
        assert_eq!(headers.headers()[0].received_partition, Some(0));
    }

    #[tokio::test]
    async fn test_same_group_listeners_split_partitions() {
        let config = memory_config();
        let broker = demo_broker(&config);

        let first = Recorder::default();
        let second = Recorder::default();
        let mut registry = ListenerRegistry::new();
        registry
            .register(
                ListenerSpec::topics("first", &["partitioned"], first.handler()).with_group_id("g"),
            )
            .unwrap();
        registry
            .register(
                ListenerSpec::topics("second", &["partitioned"], second.handler())
                    .with_group_id("g"),
            )
            .unwrap();

        let container = ListenerContainer::start(broker.clone(), registry).await.unwrap();
        for partition in 0..5 {
            broker
                .publish(&OutboundMessage::new("partitioned", "m").with_partition(partition))
                .await
                .unwrap();
        }

        assert!(wait_until(|| first.len() + second.len() == 5, SETTLE).await);
        let stats = container.stop().await;

        assert_eq!(first.partitions(), vec![0, 2, 4]);
        assert_eq!(second.partitions(), vec![1, 3]);
        let delivered: u64 = stats.iter().map(|(_, s)| s.delivered).sum();
        assert_eq!(delivered, 5);
    }

    #[tokio::test]
    async fn test_partition_listener_only_sees_bound_partitions() {
        let config = memory_config();
        let broker = demo_broker(&config);

        let bound = Recorder::default();
        let mut registry = ListenerRegistry::new();
        registry
            .register(
                ListenerSpec::partitions("partitions", "partitioned", &[0, 3], bound.handler())
                    .with_headers(HeaderRequirement::Partition),
            )
            .unwrap();

        let container = ListenerContainer::start(broker.clone(), registry).await.unwrap();
        let producer = MessageProducer::new(broker.clone(), TopicNames::from_config(&config));
        for partition in 0..5 {
            producer
                .send_message_to_partition("Hello To Partitioned Topic!", partition)
                .await
                .unwrap();
        }

        assert!(wait_until(|| bound.len() == 2, SETTLE).await);
        let stats = container.stop().await;

        assert_eq!(bound.partitions(), vec![0, 3]);
        let received: Vec<Option<i32>> =
            bound.headers().iter().map(|h| h.received_partition).collect();
        assert_eq!(received, vec![Some(0), Some(3)]);
        assert_eq!(stats[0].1.delivered, 2);
    }

    #[tokio::test]
    async fn test_filter_discards_before_handler() {
        let config = memory_config();
        let broker = demo_broker(&config);

        let filtered = Recorder::default();
        let mut registry = ListenerRegistry::new();
        registry
            .register(
                ListenerSpec::topics("filtered", &["filtered"], filtered.handler())
                    .with_group_id("filter")
                    .with_filter(RecordFilter::discard_containing("World")),
            )
            .unwrap();

        let container = ListenerContainer::start(broker.clone(), registry).await.unwrap();
        let producer = MessageProducer::new(broker.clone(), TopicNames::from_config(&config));
        producer.send_message_to_filtered("Hello Test!").await.unwrap();
        producer.send_message_to_filtered("Hello World!").await.unwrap();

        let stats = container.stop().await;
        assert_eq!(filtered.payloads(), vec!["Hello Test!".to_string()]);
        assert_eq!(stats[0].1.delivered, 1);
        assert_eq!(stats[0].1.filtered, 1);
    }

    #[tokio::test]
    async fn test_custom_filter_predicate() {
        let config = memory_config();
        let broker = demo_broker(&config);

        let recorder = Recorder::default();
        let mut registry = ListenerRegistry::new();
        registry
            .register(
                ListenerSpec::topics("short-only", &["filtered"], recorder.handler()).with_filter(
                    RecordFilter::new("discard long payloads", |m| m.payload.len() > 5),
                ),
            )
            .unwrap();

        let container = ListenerContainer::start(broker.clone(), registry).await.unwrap();
        for payload in ["tiny", "much too long", "ok"] {
            broker
                .publish(&OutboundMessage::new("filtered", payload))
                .await
                .unwrap();
        }
        container.stop().await;

        assert_eq!(recorder.payloads(), vec!["tiny".to_string(), "ok".to_string()]);
    }

    #[tokio::test]
    async fn test_messages_published_after_stop_are_not_delivered() {
        let config = memory_config();
        let broker = demo_broker(&config);

        let recorder = Recorder::default();
        let mut registry = ListenerRegistry::new();
        registry
            .register(ListenerSpec::topics("a", &["topic1"], recorder.handler()))
            .unwrap();

        let container = ListenerContainer::start(broker.clone(), registry).await.unwrap();
        container.stop().await;

        broker
            .publish(&OutboundMessage::new("topic1", "late"))
            .await
            .unwrap();
        assert_eq!(recorder.len(), 0);
        assert_eq!(broker.consumer_count("topic1"), 0);
    }

    #[tokio::test]
    async fn test_start_fails_when_broker_unreachable() {
        let config = memory_config();
        let broker = demo_broker(&config);
        broker.set_reachable(false);

        let recorder = Recorder::default();
        let mut registry = ListenerRegistry::new();
        registry
            .register(ListenerSpec::topics("a", &["topic1"], recorder.handler()))
            .unwrap();

        let broker: Arc<dyn MessageBroker> = broker;
        assert!(ListenerContainer::start(broker, registry).await.is_err());
    }
}
