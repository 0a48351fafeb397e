//! Engine configuration.
//!
//! Holds everything the engine needs to reach the broker UI: the base URL,
//! the cluster name (derived from region and environment unless overridden),
//! the guest login, and optional audit-export settings. Built with the
//! `with_*` builder pattern.
//!
//! Topic names differ per region, so callers resolve logical names through a
//! [`TopicRegistry`] loaded at configuration time; a miss is a typed
//! [`EngineError::TopicNotFound`], never a runtime property probe.

use crate::error::{EngineError, EngineResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Deployment region of the broker cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Apac,
    Emea,
    Latam,
    Na,
}

impl Region {
    /// Uppercase region label, as used in export file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Apac => "APAC",
            Region::Emea => "EMEA",
            Region::Latam => "LATAM",
            Region::Na => "NA",
        }
    }

    /// Short code used in cluster names.
    ///
    /// EMEA clusters are hosted under `eu`, and LATAM shares the `na`
    /// clusters.
    pub fn cluster_code(&self) -> &'static str {
        match self {
            Region::Apac => "apac",
            Region::Emea => "eu",
            Region::Latam => "na",
            Region::Na => "na",
        }
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "APAC" => Ok(Region::Apac),
            "EMEA" => Ok(Region::Emea),
            "LATAM" => Ok(Region::Latam),
            "NA" => Ok(Region::Na),
            other => Err(format!("unknown region: {}", other)),
        }
    }
}

/// Broker environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerEnv {
    Qa,
    Uat,
}

impl BrokerEnv {
    /// Uppercase label, as used in export file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerEnv::Qa => "QA",
            BrokerEnv::Uat => "UAT",
        }
    }

    /// Lowercase code used in cluster names.
    pub fn code(&self) -> &'static str {
        match self {
            BrokerEnv::Qa => "qa",
            BrokerEnv::Uat => "uat",
        }
    }
}

impl FromStr for BrokerEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "QA" => Ok(BrokerEnv::Qa),
            "UAT" => Ok(BrokerEnv::Uat),
            other => Err(format!("unknown broker environment: {}", other)),
        }
    }
}

/// Configuration for the search/poll engine.
///
/// # Example
///
/// ```ignore
/// use topictail::config::{BrokerEnv, EngineConfig, Region};
///
/// let config = EngineConfig::new("https://broker.example.com/kafka-ui", Region::Emea, BrokerEnv::Qa)
///     .with_login("kafkaguest", "guest")
///     .with_export_dir("./exports")
///     .with_run_label("smoke-run");
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the broker management UI, without trailing slash.
    pub base_url: String,
    /// Cluster name as it appears in the API path.
    pub cluster: String,
    /// Region the cluster serves.
    pub region: Region,
    /// Broker environment.
    pub env: BrokerEnv,
    /// Guest username for the login form.
    pub username: String,
    /// Guest password for the login form.
    pub password: String,
    /// Directory for audit JSON exports; exports are disabled when unset.
    pub export_dir: Option<PathBuf>,
    /// Label prefixed to export file names.
    pub run_label: String,
    /// Timeout applied to each individual transport call.
    pub request_timeout: Duration,
}

impl EngineConfig {
    /// Create a configuration with the conventional cluster name
    /// `shared-kafka-{region}-{env}` and guest defaults.
    pub fn new(base_url: impl Into<String>, region: Region, env: BrokerEnv) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let cluster = format!("shared-kafka-{}-{}", region.cluster_code(), env.code());
        Self {
            base_url,
            cluster,
            region,
            env,
            username: "kafkaguest".to_string(),
            password: "guest".to_string(),
            export_dir: None,
            run_label: "topictail".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Override the cluster name.
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = cluster.into();
        self
    }

    /// Set the guest login.
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Enable audit exports into the given directory.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    /// Set the label prefixed to export file names.
    pub fn with_run_label(mut self, label: impl Into<String>) -> Self {
        self.run_label = label.into();
        self
    }

    /// Set the per-request transport timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// URL of the login endpoint.
    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url)
    }

    /// URL of the authorization-check endpoint.
    pub fn authorization_url(&self) -> String {
        format!("{}/api/authorization", self.base_url)
    }

    /// URL of the topic listing endpoint.
    pub fn topics_url(&self) -> String {
        format!("{}/api/clusters/{}/topics", self.base_url, self.cluster)
    }

    /// URL of a topic's message search endpoint.
    pub fn messages_url(&self, topic: &str) -> String {
        format!(
            "{}/api/clusters/{}/topics/{}/messages",
            self.base_url, self.cluster, topic
        )
    }
}

/// Typed mapping from (region, logical name) to concrete topic names.
///
/// Loaded once at configuration time; lookups fail with a typed error instead
/// of probing dynamic tables at call sites.
#[derive(Debug, Clone, Default)]
pub struct TopicRegistry {
    entries: HashMap<(Region, String), String>,
}

impl TopicRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic for a region under a logical name.
    pub fn insert(
        &mut self,
        region: Region,
        logical: impl Into<String>,
        topic: impl Into<String>,
    ) {
        self.entries.insert((region, logical.into()), topic.into());
    }

    /// Resolve a logical name for a region.
    pub fn resolve(&self, region: Region, logical: &str) -> EngineResult<&str> {
        self.entries
            .get(&(region, logical.to_string()))
            .map(String::as_str)
            .ok_or_else(|| EngineError::TopicNotFound {
                topic: format!("{}/{}", region.as_str(), logical),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_cluster_codes() {
        assert_eq!(Region::Apac.cluster_code(), "apac");
        assert_eq!(Region::Emea.cluster_code(), "eu");
        assert_eq!(Region::Latam.cluster_code(), "na");
        assert_eq!(Region::Na.cluster_code(), "na");
    }

    #[test]
    fn test_region_from_str() {
        assert_eq!("emea".parse::<Region>().unwrap(), Region::Emea);
        assert_eq!("LATAM".parse::<Region>().unwrap(), Region::Latam);
        assert!("MARS".parse::<Region>().is_err());
    }

    #[test]
    fn test_broker_env_from_str() {
        assert_eq!("qa".parse::<BrokerEnv>().unwrap(), BrokerEnv::Qa);
        assert_eq!("UAT".parse::<BrokerEnv>().unwrap(), BrokerEnv::Uat);
        assert!("PROD".parse::<BrokerEnv>().is_err());
    }

    #[test]
    fn test_default_cluster_name() {
        let config = EngineConfig::new("https://broker.local/kafka-ui/", Region::Emea, BrokerEnv::Qa);
        assert_eq!(config.base_url, "https://broker.local/kafka-ui");
        assert_eq!(config.cluster, "shared-kafka-eu-qa");
    }

    #[test]
    fn test_endpoint_urls() {
        let config = EngineConfig::new("https://broker.local", Region::Na, BrokerEnv::Uat)
            .with_cluster("shared-kafka-na-uat");
        assert_eq!(config.login_url(), "https://broker.local/login");
        assert_eq!(
            config.authorization_url(),
            "https://broker.local/api/authorization"
        );
        assert_eq!(
            config.topics_url(),
            "https://broker.local/api/clusters/shared-kafka-na-uat/topics"
        );
        assert_eq!(
            config.messages_url("orchestration"),
            "https://broker.local/api/clusters/shared-kafka-na-uat/topics/orchestration/messages"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::new("http://b", Region::Apac, BrokerEnv::Qa)
            .with_login("user", "pass")
            .with_export_dir("/tmp/exports")
            .with_run_label("nightly");
        assert_eq!(config.username, "user");
        assert_eq!(config.password, "pass");
        assert_eq!(config.export_dir, Some(PathBuf::from("/tmp/exports")));
        assert_eq!(config.run_label, "nightly");
    }

    #[test]
    fn test_topic_registry_resolve() {
        let mut registry = TopicRegistry::new();
        registry.insert(Region::Emea, "orchestration", "docai_orchestration_qa");

        assert_eq!(
            registry.resolve(Region::Emea, "orchestration").unwrap(),
            "docai_orchestration_qa"
        );
        let err = registry.resolve(Region::Na, "orchestration").unwrap_err();
        assert!(matches!(err, EngineError::TopicNotFound { .. }));
        assert!(err.to_string().contains("NA/orchestration"));
    }
}
