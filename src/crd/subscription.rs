//! Operator Lifecycle Manager Subscription

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Subscription to an operator package from a catalog source
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "Subscription",
    plural = "subscriptions",
    shortname = "sub",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    /// Catalog source name
    pub source: String,

    /// Namespace of the catalog source
    pub source_namespace: String,

    /// Package name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// First ClusterServiceVersion to install
    #[serde(rename = "startingCSV", skip_serializing_if = "Option::is_none")]
    pub starting_csv: Option<String>,

    /// Automatic or Manual
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_plan_approval: Option<String>,
}
