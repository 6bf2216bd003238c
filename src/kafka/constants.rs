//! Demo constants
//!
//! This module centralizes the defaults used when a property is absent from
//! the property file and the environment, plus the fixed payloads the demo
//! publishes.

// ===== Broker Connection =====

/// Default Kafka bootstrap servers
pub const DEFAULT_BOOTSTRAP_SERVERS: &str = "localhost:9092";

/// Default client identifier reported to the broker
pub const DEFAULT_CLIENT_ID: &str = "kafka-demo";

/// Default security protocol (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL)
pub const DEFAULT_SECURITY_PROTOCOL: &str = "PLAINTEXT";

/// Default SASL mechanism, only used with SASL_* protocols
pub const DEFAULT_SASL_MECHANISM: &str = "PLAIN";

// ===== Producer / Consumer Tuning =====

/// Local delivery timeout for a produced message (milliseconds)
pub const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 5_000;

/// Where a new consumer group starts reading
pub const DEFAULT_AUTO_OFFSET_RESET: &str = "earliest";

/// Consumer group session timeout (milliseconds)
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 10_000;

/// Timeout for admin operations (topic provisioning, metadata)
pub const ADMIN_OPERATION_TIMEOUT_MS: u64 = 5_000;

/// Replication factor for topics provisioned by the demo
pub const DEFAULT_REPLICATION_FACTOR: i32 = 1;

// ===== Topics =====

/// Topic receiving the basic "Hello, World!" message
pub const DEFAULT_MESSAGE_TOPIC: &str = "topic1";

/// Topic with several partitions, only some of which are consumed
pub const DEFAULT_PARTITIONED_TOPIC: &str = "partitioned";

/// Partition count of the partitioned topic
pub const DEFAULT_PARTITIONED_TOPIC_PARTITIONS: i32 = 5;

/// Topic consumed through a filtering listener
pub const DEFAULT_FILTERED_TOPIC: &str = "filtered";

/// Messages on the filtered topic containing this text are discarded
pub const DEFAULT_FILTER_DISCARD_CONTAINS: &str = "World";

// ===== Consumer Groups =====

/// Group of the first listener on the message topic
pub const DEFAULT_GROUP_FOO: &str = "foo";

/// Group of the second listener on the message topic
pub const DEFAULT_GROUP_BAR: &str = "bar";

/// Group of the header-reading listener on the message topic
pub const DEFAULT_GROUP_HEADERS: &str = "headers";

/// Group of the partition-bound listener
pub const DEFAULT_GROUP_PARTITIONS: &str = "partitions";

/// Group of the filtering listener
pub const DEFAULT_GROUP_FILTER: &str = "filter";

/// Partitions of the partitioned topic the partition listener is bound to
pub const DEFAULT_LISTENED_PARTITIONS: [i32; 2] = [0, 3];

// ===== Orchestration =====

/// How long each demo stage waits for its deliveries (milliseconds)
pub const DEFAULT_LATCH_TIMEOUT_MS: u64 = 10_000;

/// Upper bound accepted for the latch timeout (milliseconds)
pub const MAX_LATCH_TIMEOUT_MS: u64 = 600_000;

/// Producer flush timeout on shutdown (milliseconds)
pub const SHUTDOWN_FLUSH_TIMEOUT_MS: u64 = 5_000;

// ===== Payloads =====

/// Payload of the basic publish stage
pub const BASIC_PAYLOAD: &str = "Hello, World!";

/// Payload published to every partition of the partitioned topic
pub const PARTITIONED_PAYLOAD: &str = "Hello To Partitioned Topic!";

/// Payloads published to the filtered topic, in order
pub const FILTERED_PAYLOADS: [&str; 2] = ["Hello Test!", "Hello World!"];

// ===== Configuration Sources =====

/// Environment variable holding the property file path
pub const CONFIG_PATH_ENV: &str = "KAFKA_DEMO_CONFIG";

/// Property file read when `KAFKA_DEMO_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "application.properties";

/// Prefix of environment variables overriding individual properties
pub const ENV_OVERRIDE_PREFIX: &str = "KAFKA_DEMO_";
