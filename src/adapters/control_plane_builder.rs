//! ServiceMeshControlPlane running Istio in Gateway API controller mode

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::json;

use super::build_labels;
use super::owner::{build_owner_reference, MarkerRef};
use crate::config::Config;
use crate::crd::{
    AddonsConfig, ControlPlaneSpec, Enablement, GatewaysConfig, SecurityConfig,
    ServiceMeshControlPlane, TypedConfig, GATEWAY_CONTROLLER_NAME,
};

/// Build the control plane in the operand namespace
pub fn build_control_plane(config: &Config, marker: &MarkerRef) -> ServiceMeshControlPlane {
    ServiceMeshControlPlane {
        metadata: ObjectMeta {
            name: Some(config.control_plane_name.clone()),
            namespace: Some(config.operand_namespace.clone()),
            labels: Some(build_labels()),
            owner_references: Some(vec![build_owner_reference(marker)]),
            ..Default::default()
        },
        spec: build_control_plane_spec(config),
    }
}

fn build_control_plane_spec(config: &Config) -> ControlPlaneSpec {
    ControlPlaneSpec {
        version: Some(config.control_plane_version.clone()),
        mode: Some("ClusterWide".to_string()),
        profiles: vec!["default".to_string()],
        // Only istiod is wanted; everything else the mesh would bring is off
        addons: Some(AddonsConfig {
            grafana: Some(Enablement::disabled()),
            kiali: Some(Enablement::disabled()),
            prometheus: Some(Enablement::disabled()),
        }),
        gateways: Some(GatewaysConfig {
            egress: Some(Enablement::disabled()),
            ingress: Some(Enablement::disabled()),
            openshift_route: Some(Enablement::disabled()),
        }),
        policy: Some(TypedConfig {
            type_: "Istiod".to_string(),
        }),
        tracing: Some(TypedConfig {
            type_: "None".to_string(),
        }),
        security: Some(SecurityConfig {
            manage_network_policy: Some(false),
        }),
        tech_preview: Some(json!({
            "gatewayAPI": {
                "enabled": true,
                "controllerMode": true,
                "controllerName": GATEWAY_CONTROLLER_NAME,
            }
        })),
    }
}
