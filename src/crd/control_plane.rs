//! Maistra ServiceMeshControlPlane

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ServiceMeshControlPlane specification
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "maistra.io",
    version = "v2",
    kind = "ServiceMeshControlPlane",
    plural = "servicemeshcontrolplanes",
    shortname = "smcp",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneSpec {
    /// Control plane version (e.g. v2.5)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// ClusterWide or MultiTenant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons: Option<AddonsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateways: Option<GatewaysConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<TypedConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracing: Option<TypedConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,

    /// Free-form tech preview values passed through to the mesh operator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_preview: Option<serde_json::Value>,
}

/// Enabled flag shared by addons and gateways
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Enablement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Enablement {
    pub fn disabled() -> Self {
        Self {
            enabled: Some(false),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct AddonsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grafana: Option<Enablement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kiali: Option<Enablement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<Enablement>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewaysConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egress: Option<Enablement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Enablement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openshift_route: Option<Enablement>,
}

/// A config block selected by `type` (policy, tracing)
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct TypedConfig {
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_network_policy: Option<bool>,
}
