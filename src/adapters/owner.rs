//! Owner references from dependents back to the marker GatewayClass

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

use crate::crd::GatewayClass;

/// Identity of the marker GatewayClass a pass was triggered for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerRef {
    pub name: String,
    pub uid: String,
}

impl MarkerRef {
    pub fn from_gateway_class(gateway_class: &GatewayClass) -> Self {
        Self {
            name: gateway_class.metadata.name.clone().unwrap_or_default(),
            uid: gateway_class.metadata.uid.clone().unwrap_or_default(),
        }
    }
}

/// Build the owner reference dependents carry
///
/// Used only so the garbage collector removes dependents with the marker; the
/// reconcilers never treat it as ownership of the marker itself.
pub fn build_owner_reference(marker: &MarkerRef) -> OwnerReference {
    OwnerReference {
        api_version: GatewayClass::api_version(&()).to_string(),
        kind: GatewayClass::kind(&()).to_string(),
        name: marker.name.clone(),
        uid: marker.uid.clone(),
        controller: None,
        block_owner_deletion: None,
    }
}

/// Whether `refs` already holds `wanted`; an empty uid on either side matches any uid
pub fn has_owner_reference(refs: &[OwnerReference], wanted: &OwnerReference) -> bool {
    refs.iter().any(|r| {
        r.api_version == wanted.api_version
            && r.kind == wanted.kind
            && r.name == wanted.name
            && (r.uid.is_empty() || wanted.uid.is_empty() || r.uid == wanted.uid)
    })
}

/// Whether `refs` point at a GatewayClass named `marker_name`, regardless of uid
pub fn is_owned_by_marker(refs: &[OwnerReference], marker_name: &str) -> bool {
    let group = GatewayClass::group(&());
    refs.iter().any(|r| {
        r.kind == GatewayClass::kind(&())
            && r.name == marker_name
            && r.api_version.split('/').next() == Some(&*group)
    })
}
