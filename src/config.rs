//! Operator configuration
//!
//! Defaults match an OpenShift ingress deployment. Values may be overridden by a
//! YAML file named in `OPERATOR_CONFIG` and then by individual environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Environment variable naming an optional YAML config file
pub const CONFIG_PATH_ENV: &str = "OPERATOR_CONFIG";

/// Operator configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Whether the Gateway API controller is enabled
    #[serde(rename = "gatewayAPIControllerEnabled")]
    pub gateway_api_controller_enabled: bool,

    /// Name of the GatewayClass whose presence triggers the installation
    pub gateway_class_name: String,

    /// Namespace for operand resources (the control plane)
    pub operand_namespace: String,

    /// Namespace the service mesh operator subscription is created in
    pub operator_namespace: String,

    /// Name of the shared ClusterOperator status object
    pub cluster_operator_name: String,

    /// Name of the managed control plane
    pub control_plane_name: String,

    /// Control plane version
    pub control_plane_version: String,

    /// Subscription settings for the service mesh operator
    pub subscription: SubscriptionConfig,

    /// Port for the metrics and health server
    pub metrics_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_api_controller_enabled: false,
            gateway_class_name: "openshift-default".to_string(),
            operand_namespace: "openshift-ingress".to_string(),
            operator_namespace: "openshift-operators".to_string(),
            cluster_operator_name: "ingress".to_string(),
            control_plane_name: "openshift-gateway".to_string(),
            control_plane_version: "v2.5".to_string(),
            subscription: SubscriptionConfig::default(),
            metrics_port: 8080,
        }
    }
}

/// OLM subscription settings
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionConfig {
    /// Package name, also used as the subscription name
    pub package: String,
    pub channel: String,
    /// Catalog source name
    pub source: String,
    pub source_namespace: String,
    #[serde(rename = "startingCSV")]
    pub starting_csv: String,
    pub install_plan_approval: String,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            package: "servicemeshoperator".to_string(),
            channel: "stable".to_string(),
            source: "redhat-operators".to_string(),
            source_namespace: "openshift-marketplace".to_string(),
            starting_csv: "servicemeshoperator.v2.5.0".to_string(),
            install_plan_approval: "Automatic".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `OPERATOR_CONFIG` (if set) and the environment
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a YAML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded operator config file");
        serde_yaml::from_str(&raw).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply environment overrides using `lookup` to resolve variable names
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("GATEWAY_API_CONTROLLER_ENABLED") {
            self.gateway_api_controller_enabled = parse_bool(&value).ok_or_else(|| {
                Error::ConfigError(format!(
                    "GATEWAY_API_CONTROLLER_ENABLED must be true or false, got {:?}",
                    value
                ))
            })?;
        }
        if let Some(value) = lookup("GATEWAY_CLASS_NAME") {
            self.gateway_class_name = value;
        }
        if let Some(value) = lookup("OPERAND_NAMESPACE") {
            self.operand_namespace = value;
        }
        if let Some(value) = lookup("METRICS_PORT") {
            self.metrics_port = value.parse().map_err(|_| {
                Error::ConfigError(format!("METRICS_PORT must be a port number, got {:?}", value))
            })?;
        }
        Ok(())
    }

    /// Reject configurations that would produce unnamed objects
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("gatewayClassName", &self.gateway_class_name),
            ("operandNamespace", &self.operand_namespace),
            ("operatorNamespace", &self.operator_namespace),
            ("clusterOperatorName", &self.cluster_operator_name),
            ("controlPlaneName", &self.control_plane_name),
            ("subscription.package", &self.subscription.package),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::ConfigError(format!("{} cannot be empty", field)));
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
