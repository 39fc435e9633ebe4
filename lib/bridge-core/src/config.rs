//! Controller configuration
//!
//! Loaded once at startup from an optional YAML file; every field has a
//! default matching the fixed values the bridge has always used. Validation
//! failures are fatal at startup and never surface per object.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryConfig;

/// What the handler does on update and delete notifications
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lifecycle {
    /// Provision on creation only; updates and deletes are ignored
    #[default]
    OneShot,
    /// Also provision on routed transitions and tear down on unrouted ones
    Teardown,
}

/// How a failure to create the routing rule (the last step) is treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingRulePolicy {
    /// Fail the object like any other step
    #[default]
    Strict,
    /// Log and report the chain as provisioned without the rule
    BestEffort,
}

/// Retry settings for transient store failures
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// Address of the worker node that node-port traffic is sent to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_address: Option<IpAddr>,

    /// Kubeconfig used to build the API client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace to watch for source Services (all namespaces if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_namespace: Option<String>,

    /// Namespace the chain objects are created in
    pub namespace: String,

    /// Annotation that opts a Service into routing
    pub route_annotation: String,

    /// Gateway the routing rule is bound to
    pub gateway: String,

    /// Host pattern of the routing rule
    pub route_host: String,

    /// Port of the bridge Service; also the destination port name
    pub bridge_port: u16,

    /// Inbound gateway port the routing rule matches
    pub match_port: u32,

    pub lifecycle: Lifecycle,

    pub routing_rule_policy: RoutingRulePolicy,

    /// Deadline for each individual store call
    pub call_timeout_ms: u64,

    pub retry: RetrySettings,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_address: None,
            kubeconfig: None,
            watch_namespace: None,
            namespace: "default".to_string(),
            route_annotation: "route".to_string(),
            gateway: "cfcr-gateway".to_string(),
            route_host: "*".to_string(),
            bridge_port: 6789,
            match_port: 8000,
            lifecycle: Lifecycle::default(),
            routing_rule_policy: RoutingRulePolicy::default(),
            call_timeout_ms: 10_000,
            retry: RetrySettings::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse a YAML document; missing keys take their defaults
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a YAML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Check the settings the handler depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_address.is_none() {
            return Err(ConfigError::Invalid("workerAddress is required".to_string()));
        }
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("namespace must not be empty".to_string()));
        }
        if self.watch_namespace.as_deref().is_some_and(|ns| ns.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "watchNamespace must not be empty; omit it to watch all namespaces".to_string(),
            ));
        }
        if self.route_annotation.trim().is_empty() {
            return Err(ConfigError::Invalid("routeAnnotation must not be empty".to_string()));
        }
        if self.gateway.trim().is_empty() {
            return Err(ConfigError::Invalid("gateway must not be empty".to_string()));
        }
        if self.route_host.trim().is_empty() {
            return Err(ConfigError::Invalid("routeHost must not be empty".to_string()));
        }
        if self.bridge_port == 0 {
            return Err(ConfigError::Invalid("bridgePort must be non-zero".to_string()));
        }
        if self.match_port == 0 || self.match_port > u32::from(u16::MAX) {
            return Err(ConfigError::Invalid(format!(
                "matchPort {} is not a valid port",
                self.match_port
            )));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid("callTimeoutMs must be non-zero".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.maxAttempts must be at least 1".to_string()));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.backoffMultiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
