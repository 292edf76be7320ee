//! GatewayClass, the marker resource

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the standard Gateway API resources
pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

/// API group of the experimental Gateway API resources
pub const GATEWAY_API_EXPERIMENTAL_GROUP: &str = "gateway.networking.x-k8s.io";

/// Controller name carried by GatewayClasses this cluster serves
pub const GATEWAY_CONTROLLER_NAME: &str = "openshift.io/gateway-controller";

/// GatewayClass specification
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1",
    kind = "GatewayClass",
    plural = "gatewayclasses",
    shortname = "gc"
)]
#[serde(rename_all = "camelCase")]
pub struct GatewayClassSpec {
    /// Controller responsible for Gateways of this class
    pub controller_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
