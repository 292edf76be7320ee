//! Builders for the objects the operator creates

pub mod control_plane_builder;
pub mod owner;
pub mod subscription_builder;

use std::collections::BTreeMap;

/// Labels stamped on every object the operator creates
pub fn build_labels() -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        "gateway-api-operator".to_string(),
    );
    labels.insert(
        "app.kubernetes.io/part-of".to_string(),
        "gateway-api".to_string(),
    );
    labels
}
