// Configuration module for kafka_demo
//
// Settings come from a `key=value` property file (application.properties by
// default, or the path in KAFKA_DEMO_CONFIG), then from environment variables
// named KAFKA_DEMO_<KEY> with dots and dashes replaced by underscores, e.g.
// KAFKA_DEMO_BOOTSTRAP_SERVERS overrides `bootstrap.servers`.
//
// Missing keys fall back to the defaults in kafka::constants. Malformed
// values are startup errors.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use configparser::ini::Ini;
use tracing::{debug, warn};

use crate::kafka::constants::*;
use crate::kafka::error::{DemoError, Result};
use crate::kafka::messages::TopicSpec;

/// Which broker implementation the demo talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrokerMode {
    /// Real Kafka cluster via librdkafka
    #[default]
    Kafka,
    /// In-process simulated broker
    Memory,
}

impl BrokerMode {
    /// Parse from a property value
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "kafka" => Some(BrokerMode::Kafka),
            "memory" => Some(BrokerMode::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerMode::Kafka => "kafka",
            BrokerMode::Memory => "memory",
        }
    }
}

/// Every property key the demo understands
pub const KNOWN_KEYS: &[&str] = &[
    "bootstrap.servers",
    "client.id",
    "broker.mode",
    "security.protocol",
    "sasl.mechanism",
    "sasl.username",
    "sasl.password",
    "message.timeout.ms",
    "auto.offset.reset",
    "session.timeout.ms",
    "message.topic.name",
    "partitioned.topic.name",
    "partitioned.topic.partitions",
    "partitioned.listener.partitions",
    "filtered.topic.name",
    "filter.discard.contains",
    "group.foo",
    "group.bar",
    "group.headers",
    "group.partitions",
    "group.filter",
    "demo.latch_timeout_ms",
    "demo.fail_fast",
];

const SECURITY_PROTOCOLS: &[&str] = &["PLAINTEXT", "SSL", "SASL_PLAINTEXT", "SASL_SSL"];

/// Configuration struct holding all demo settings
#[derive(Clone)]
pub struct Config {
    // ===== Broker Connection =====
    pub bootstrap_servers: String,
    pub client_id: String,
    pub broker_mode: BrokerMode,
    /// PLAINTEXT, SSL, SASL_PLAINTEXT or SASL_SSL
    pub security_protocol: String,
    /// PLAIN, SCRAM-SHA-256, SCRAM-SHA-512
    pub sasl_mechanism: String,
    pub sasl_username: String,
    pub sasl_password: String,

    // ===== Client Tuning =====
    /// Local delivery timeout for produced messages
    pub message_timeout_ms: u64,
    /// Only `earliest`: group assignment finishes after the listener starts,
    /// and a `latest` consumer would skip anything published before that
    pub auto_offset_reset: String,
    pub session_timeout_ms: u64,

    // ===== Topics =====
    pub message_topic: String,
    pub partitioned_topic: String,
    pub partitioned_topic_partitions: i32,
    /// Partitions of the partitioned topic the partition listener is bound to
    pub listened_partitions: Vec<i32>,
    pub filtered_topic: String,
    /// Filtered-topic messages containing this text never reach the handler
    pub filter_discard_contains: String,

    // ===== Consumer Groups =====
    pub group_foo: String,
    pub group_bar: String,
    pub group_headers: String,
    pub group_partitions: String,
    pub group_filter: String,

    // ===== Orchestration =====
    /// Bound on each stage's wait for deliveries
    pub latch_timeout_ms: u64,
    /// Abort the run on the first timed-out stage instead of moving on
    pub fail_fast: bool,
}

/// Custom Debug implementation that redacts sensitive credentials
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bootstrap_servers", &self.bootstrap_servers)
            .field("client_id", &self.client_id)
            .field("broker_mode", &self.broker_mode)
            .field("security_protocol", &self.security_protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("sasl_username", &self.sasl_username)
            // REDACT the password to keep it out of logs
            .field(
                "sasl_password",
                &if self.sasl_password.is_empty() {
                    ""
                } else {
                    "[REDACTED]"
                },
            )
            .field("message_timeout_ms", &self.message_timeout_ms)
            .field("auto_offset_reset", &self.auto_offset_reset)
            .field("session_timeout_ms", &self.session_timeout_ms)
            .field("message_topic", &self.message_topic)
            .field("partitioned_topic", &self.partitioned_topic)
            .field(
                "partitioned_topic_partitions",
                &self.partitioned_topic_partitions,
            )
            .field("listened_partitions", &self.listened_partitions)
            .field("filtered_topic", &self.filtered_topic)
            .field("filter_discard_contains", &self.filter_discard_contains)
            .field("group_foo", &self.group_foo)
            .field("group_bar", &self.group_bar)
            .field("group_headers", &self.group_headers)
            .field("group_partitions", &self.group_partitions)
            .field("group_filter", &self.group_filter)
            .field("latch_timeout_ms", &self.latch_timeout_ms)
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bootstrap_servers: DEFAULT_BOOTSTRAP_SERVERS.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            broker_mode: BrokerMode::default(),
            security_protocol: DEFAULT_SECURITY_PROTOCOL.to_string(),
            sasl_mechanism: DEFAULT_SASL_MECHANISM.to_string(),
            sasl_username: String::new(),
            sasl_password: String::new(),
            message_timeout_ms: DEFAULT_MESSAGE_TIMEOUT_MS,
            auto_offset_reset: DEFAULT_AUTO_OFFSET_RESET.to_string(),
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            message_topic: DEFAULT_MESSAGE_TOPIC.to_string(),
            partitioned_topic: DEFAULT_PARTITIONED_TOPIC.to_string(),
            partitioned_topic_partitions: DEFAULT_PARTITIONED_TOPIC_PARTITIONS,
            listened_partitions: DEFAULT_LISTENED_PARTITIONS.to_vec(),
            filtered_topic: DEFAULT_FILTERED_TOPIC.to_string(),
            filter_discard_contains: DEFAULT_FILTER_DISCARD_CONTAINS.to_string(),
            group_foo: DEFAULT_GROUP_FOO.to_string(),
            group_bar: DEFAULT_GROUP_BAR.to_string(),
            group_headers: DEFAULT_GROUP_HEADERS.to_string(),
            group_partitions: DEFAULT_GROUP_PARTITIONS.to_string(),
            group_filter: DEFAULT_GROUP_FILTER.to_string(),
            latch_timeout_ms: DEFAULT_LATCH_TIMEOUT_MS,
            fail_fast: false,
        }
    }
}

impl Config {
    /// Load configuration from the property file and the process environment
    ///
    /// A missing file is only an error when its path was set explicitly
    /// through KAFKA_DEMO_CONFIG.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let path = explicit
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut properties = if Path::new(&path).exists() {
            debug!("Reading properties from {}", path);
            read_properties(&std::fs::read_to_string(&path)?)?
        } else if explicit.is_some() {
            return Err(DemoError::Config(format!(
                "property file '{}' (from {}) does not exist",
                path, CONFIG_PATH_ENV
            )));
        } else {
            debug!("No {} found, using defaults", path);
            HashMap::new()
        };

        apply_env_overrides(&mut properties, std::env::vars());
        Self::from_properties(&properties)
    }

    /// Parse property file text without consulting the environment
    pub fn from_properties_str(text: &str) -> Result<Self> {
        Self::from_properties(&read_properties(text)?)
    }

    /// Build a config from resolved properties, validating every value
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        for key in properties.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                warn!("Ignoring unknown property '{}'", key);
            }
        }

        let defaults = Config::default();
        let props = Properties(properties);

        let broker_mode = match properties.get("broker.mode") {
            Some(value) => BrokerMode::parse(value).ok_or_else(|| {
                DemoError::Config(format!(
                    "broker.mode must be 'kafka' or 'memory', got '{}'",
                    value
                ))
            })?,
            None => defaults.broker_mode,
        };

        let listened_partitions = match properties.get("partitioned.listener.partitions") {
            Some(value) => parse_partition_list(value)?,
            None => defaults.listened_partitions,
        };

        let config = Config {
            bootstrap_servers: props.string("bootstrap.servers", defaults.bootstrap_servers),
            client_id: props.string("client.id", defaults.client_id),
            broker_mode,
            security_protocol: props
                .string("security.protocol", defaults.security_protocol)
                .to_uppercase(),
            sasl_mechanism: props.string("sasl.mechanism", defaults.sasl_mechanism),
            sasl_username: props.string("sasl.username", defaults.sasl_username),
            sasl_password: props.string("sasl.password", defaults.sasl_password),
            message_timeout_ms: props.parsed("message.timeout.ms", defaults.message_timeout_ms)?,
            auto_offset_reset: props
                .string("auto.offset.reset", defaults.auto_offset_reset)
                .to_lowercase(),
            session_timeout_ms: props.parsed("session.timeout.ms", defaults.session_timeout_ms)?,
            message_topic: props.string("message.topic.name", defaults.message_topic),
            partitioned_topic: props.string("partitioned.topic.name", defaults.partitioned_topic),
            partitioned_topic_partitions: props.parsed(
                "partitioned.topic.partitions",
                defaults.partitioned_topic_partitions,
            )?,
            listened_partitions,
            filtered_topic: props.string("filtered.topic.name", defaults.filtered_topic),
            filter_discard_contains: props
                .string("filter.discard.contains", defaults.filter_discard_contains),
            group_foo: props.string("group.foo", defaults.group_foo),
            group_bar: props.string("group.bar", defaults.group_bar),
            group_headers: props.string("group.headers", defaults.group_headers),
            group_partitions: props.string("group.partitions", defaults.group_partitions),
            group_filter: props.string("group.filter", defaults.group_filter),
            latch_timeout_ms: props.parsed("demo.latch_timeout_ms", defaults.latch_timeout_ms)?,
            fail_fast: props.parsed("demo.fail_fast", defaults.fail_fast)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("bootstrap.servers", &self.bootstrap_servers),
            ("client.id", &self.client_id),
            ("message.topic.name", &self.message_topic),
            ("partitioned.topic.name", &self.partitioned_topic),
            ("filtered.topic.name", &self.filtered_topic),
            ("group.foo", &self.group_foo),
            ("group.bar", &self.group_bar),
            ("group.headers", &self.group_headers),
            ("group.partitions", &self.group_partitions),
            ("group.filter", &self.group_filter),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(DemoError::Config(format!("{} must not be empty", key)));
            }
        }

        if !SECURITY_PROTOCOLS.contains(&self.security_protocol.as_str()) {
            return Err(DemoError::Config(format!(
                "security.protocol must be one of {:?}, got '{}'",
                SECURITY_PROTOCOLS, self.security_protocol
            )));
        }

        if self.auto_offset_reset != "earliest" {
            return Err(DemoError::Config(format!(
                "auto.offset.reset must be 'earliest', got '{}'",
                self.auto_offset_reset
            )));
        }

        if self.partitioned_topic_partitions <= 0 {
            return Err(DemoError::Config(format!(
                "partitioned.topic.partitions must be positive, got {}",
                self.partitioned_topic_partitions
            )));
        }

        let mut seen = HashSet::new();
        for &partition in &self.listened_partitions {
            if partition < 0 || partition >= self.partitioned_topic_partitions {
                return Err(DemoError::Config(format!(
                    "partitioned.listener.partitions: partition {} is outside topic '{}' ({} partitions)",
                    partition, self.partitioned_topic, self.partitioned_topic_partitions
                )));
            }
            if !seen.insert(partition) {
                return Err(DemoError::Config(format!(
                    "partitioned.listener.partitions: partition {} listed more than once",
                    partition
                )));
            }
        }

        if self.latch_timeout_ms == 0 || self.latch_timeout_ms > MAX_LATCH_TIMEOUT_MS {
            return Err(DemoError::Config(format!(
                "demo.latch_timeout_ms must be between 1 and {}, got {}",
                MAX_LATCH_TIMEOUT_MS, self.latch_timeout_ms
            )));
        }

        Ok(())
    }

    /// Topics the demo publishes to, with the partition counts it expects
    pub fn topics(&self) -> Vec<TopicSpec> {
        vec![
            TopicSpec::new(&self.message_topic, 1),
            TopicSpec::new(&self.partitioned_topic, self.partitioned_topic_partitions),
            TopicSpec::new(&self.filtered_topic, 1),
        ]
    }

    /// Whether SASL credentials should be sent
    pub fn uses_sasl(&self) -> bool {
        self.security_protocol.starts_with("SASL")
    }

    /// Whether the connection is TLS-wrapped
    pub fn uses_ssl(&self) -> bool {
        self.security_protocol.ends_with("SSL")
    }
}

/// Typed access to resolved properties
struct Properties<'a>(&'a HashMap<String, String>);

impl Properties<'_> {
    fn string(&self, key: &str, default: String) -> String {
        match self.0.get(key) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => default,
        }
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.0.get(key) {
            Some(value) if !value.trim().is_empty() => value.trim().parse().map_err(|e| {
                DemoError::Config(format!("invalid value '{}' for {}: {}", value, key, e))
            }),
            _ => Ok(default),
        }
    }
}

/// Parse `key=value` property text into a flat map
///
/// Keys outside any section are taken as-is; keys under `[section]` become
/// `section.key`. Inline `#`/`;` are kept as part of the value.
pub fn read_properties(text: &str) -> Result<HashMap<String, String>> {
    let mut ini = Ini::new();
    ini.set_inline_comment_symbols(Some(&Vec::new()));
    let sections = ini.read(text.to_string()).map_err(DemoError::Config)?;

    let mut properties = HashMap::new();
    for (section, entries) in sections {
        for (key, value) in entries {
            let Some(value) = value else { continue };
            let name = if section == "default" {
                key
            } else {
                format!("{}.{}", section, key)
            };
            properties.insert(name, value);
        }
    }
    Ok(properties)
}

/// Environment variable that overrides a property key
pub fn env_var_name(key: &str) -> String {
    format!(
        "{}{}",
        ENV_OVERRIDE_PREFIX,
        key.replace(['.', '-'], "_").to_uppercase()
    )
}

/// Overlay KAFKA_DEMO_* variables onto the property map
pub fn apply_env_overrides<I>(properties: &mut HashMap<String, String>, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: HashMap<String, String> = vars
        .into_iter()
        .filter(|(name, _)| name.starts_with(ENV_OVERRIDE_PREFIX))
        .collect();

    for key in KNOWN_KEYS {
        if let Some(value) = vars.get(&env_var_name(key)) {
            debug!("Property '{}' overridden from environment", key);
            properties.insert(key.to_string(), value.clone());
        }
    }
}

fn parse_partition_list(value: &str) -> Result<Vec<i32>> {
    let partitions = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>().map_err(|e| {
                DemoError::Config(format!("invalid partition '{}' in list '{}': {}", s, value, e))
            })
        })
        .collect::<Result<Vec<i32>>>()?;

    if partitions.is_empty() {
        return Err(DemoError::Config(
            "partitioned.listener.partitions must name at least one partition".to_string(),
        ));
    }
    if let Some(negative) = partitions.iter().find(|p| **p < 0) {
        return Err(DemoError::Config(format!(
            "partition ids must be non-negative, got {}",
            negative
        )));
    }
    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.message_topic, "topic1");
        assert_eq!(config.partitioned_topic_partitions, 5);
        assert_eq!(config.listened_partitions, vec![0, 3]);
        assert_eq!(config.broker_mode, BrokerMode::Kafka);
    }

    #[test]
    fn test_properties_file_overrides_defaults() {
        let text = "\
# demo settings
bootstrap.servers=kafka1:9092,kafka2:9092
broker.mode=memory
message.topic.name=greetings
partitioned.topic.partitions=8
partitioned.listener.partitions=1, 6
demo.latch_timeout_ms=2500
demo.fail_fast=true
";
        let config = Config::from_properties_str(text).unwrap();
        assert_eq!(config.bootstrap_servers, "kafka1:9092,kafka2:9092");
        assert_eq!(config.broker_mode, BrokerMode::Memory);
        assert_eq!(config.message_topic, "greetings");
        assert_eq!(config.partitioned_topic_partitions, 8);
        assert_eq!(config.listened_partitions, vec![1, 6]);
        assert_eq!(config.latch_timeout_ms, 2500);
        assert!(config.fail_fast);
        // Untouched keys keep their defaults
        assert_eq!(config.filtered_topic, "filtered");
    }

    #[test]
    fn test_section_keys_are_flattened() {
        let text = "[demo]\nlatch_timeout_ms=1234\n";
        let config = Config::from_properties_str(text).unwrap();
        assert_eq!(config.latch_timeout_ms, 1234);
    }

    #[test]
    fn test_hash_inside_value_is_kept() {
        let props = read_properties("filter.discard.contains=#urgent\n").unwrap();
        assert_eq!(props.get("filter.discard.contains").unwrap(), "#urgent");
    }

    #[test]
    fn test_env_overrides_win() {
        let mut props = read_properties("bootstrap.servers=file:9092\n").unwrap();
        apply_env_overrides(
            &mut props,
            vec![
                (
                    "KAFKA_DEMO_BOOTSTRAP_SERVERS".to_string(),
                    "env:9092".to_string(),
                ),
                ("KAFKA_DEMO_GROUP_FOO".to_string(), "test".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
        );
        let config = Config::from_properties(&props).unwrap();
        assert_eq!(config.bootstrap_servers, "env:9092");
        assert_eq!(config.group_foo, "test");
    }

    #[test]
    fn test_env_var_name_mapping() {
        assert_eq!(
            env_var_name("demo.latch_timeout_ms"),
            "KAFKA_DEMO_DEMO_LATCH_TIMEOUT_MS"
        );
        assert_eq!(
            env_var_name("partitioned.topic.name"),
            "KAFKA_DEMO_PARTITIONED_TOPIC_NAME"
        );
    }

    #[test]
    fn test_malformed_values_are_config_errors() {
        for text in [
            "broker.mode=zookeeper\n",
            "message.timeout.ms=soon\n",
            "partitioned.topic.partitions=0\n",
            "partitioned.listener.partitions=0,-3\n",
            "demo.latch_timeout_ms=0\n",
            "demo.fail_fast=maybe\n",
            "security.protocol=carrier_pigeon\n",
            "auto.offset.reset=middle\n",
            "auto.offset.reset=latest\n",
            "partitioned.listener.partitions=0,7\n",
            "partitioned.topic.partitions=3\n",
            "partitioned.listener.partitions=0,3,3\n",
        ] {
            let result = Config::from_properties_str(text);
            assert!(
                matches!(result, Err(DemoError::Config(_))),
                "expected config error for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_listened_partitions_checked_against_topic() {
        let config = Config::from_properties_str(
            "partitioned.topic.partitions=8\npartitioned.listener.partitions=7\n",
        )
        .unwrap();
        assert_eq!(config.listened_partitions, vec![7]);

        let err = Config {
            listened_partitions: vec![0, 5],
            ..Config::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("partition 5 is outside topic 'partitioned'"));

        let err = Config {
            listened_partitions: vec![3, 0, 3],
            ..Config::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("partition 3 listed more than once"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config {
            sasl_password: "hunter2".to_string(),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_topic_specs() {
        let topics = Config::default().topics();
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[1].name, "partitioned");
        assert_eq!(topics[1].partitions, 5);
    }

    #[test]
    fn test_security_protocol_helpers() {
        let config = Config {
            security_protocol: "SASL_SSL".to_string(),
            ..Config::default()
        };
        assert!(config.uses_sasl());
        assert!(config.uses_ssl());
        assert!(!Config::default().uses_sasl());
    }
}
