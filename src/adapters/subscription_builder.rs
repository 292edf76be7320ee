//! OLM Subscription for the service mesh operator

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::build_labels;
use super::owner::{build_owner_reference, MarkerRef};
use crate::config::Config;
use crate::crd::{Subscription, SubscriptionSpec};

/// Build the Subscription that installs the service mesh operator
pub fn build_subscription(config: &Config, marker: &MarkerRef) -> Subscription {
    let sub = &config.subscription;

    Subscription {
        metadata: ObjectMeta {
            name: Some(sub.package.clone()),
            namespace: Some(config.operator_namespace.clone()),
            labels: Some(build_labels()),
            owner_references: Some(vec![build_owner_reference(marker)]),
            ..Default::default()
        },
        spec: SubscriptionSpec {
            source: sub.source.clone(),
            source_namespace: sub.source_namespace.clone(),
            name: sub.package.clone(),
            channel: non_empty(&sub.channel),
            starting_csv: non_empty(&sub.starting_csv),
            install_plan_approval: non_empty(&sub.install_plan_approval),
        },
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
