//! Tests for the in-memory object repository

mod common;

use std::collections::BTreeMap;

use common::{cluster_operator, labels};
use futures::StreamExt;
use gateway_api_operator::crd::{ClusterOperator, ClusterOperatorStatus, Subscription, SubscriptionSpec};
use gateway_api_operator::repository::{Change, MemoryRepository, ObjectRepository, Operation};
use kube::ResourceExt;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn subscription(name: &str, channel: &str) -> Subscription {
    let mut sub = Subscription::new(
        name,
        SubscriptionSpec {
            name: name.to_string(),
            source: "redhat-operators".to_string(),
            source_namespace: "openshift-marketplace".to_string(),
            channel: Some(channel.to_string()),
            ..Default::default()
        },
    );
    sub.metadata.namespace = Some("openshift-operators".to_string());
    sub
}

#[tokio::test]
async fn create_assigns_identity_and_rejects_duplicates() {
    let repo = MemoryRepository::new();

    let created = assert_ok!(repo.create(&subscription("mesh", "stable")).await);
    assert!(created.uid().is_some());
    assert_eq!(created.resource_version().as_deref(), Some("1"));

    let err = assert_err!(repo.create(&subscription("mesh", "stable")).await);
    assert!(err.is_already_exists());
    assert_eq!(repo.writes().len(), 1);
}

#[tokio::test]
async fn stale_update_conflicts() {
    let repo = MemoryRepository::new();
    let first = repo.insert(subscription("mesh", "stable"));

    let mut newer = first.clone();
    newer.spec.channel = Some("candidate".to_string());
    assert_ok!(repo.update(&newer).await);

    let mut stale = first;
    stale.spec.channel = Some("fast".to_string());
    let err = assert_err!(repo.update(&stale).await);

    assert!(err.is_conflict());
    assert_eq!(
        repo.peek("mesh").unwrap().spec.channel.as_deref(),
        Some("candidate")
    );
}

#[tokio::test]
async fn update_of_missing_object_is_not_found() {
    let repo: MemoryRepository<Subscription> = MemoryRepository::new();

    let err = assert_err!(repo.update(&subscription("mesh", "stable")).await);

    assert!(err.is_not_found());
}

#[tokio::test]
async fn update_keeps_stored_status() {
    let repo = MemoryRepository::new();
    let stored = repo.insert(cluster_operator(
        "ingress",
        Some(ClusterOperatorStatus {
            extension: Some(json!({ "unmanagedGatewayAPICRDNames": "a" })),
            ..Default::default()
        }),
    ));

    let mut relabelled: ClusterOperator = stored.clone();
    relabelled
        .labels_mut()
        .insert("team".to_string(), "network-edge".to_string());
    relabelled.status = None;
    let updated = assert_ok!(repo.update(&relabelled).await);

    assert_eq!(updated.labels().get("team").map(String::as_str), Some("network-edge"));
    assert_eq!(updated.status, stored.status);
}

#[tokio::test]
async fn update_status_keeps_stored_metadata() {
    let repo = MemoryRepository::new();
    let stored = repo.insert(cluster_operator("ingress", None));

    let mut changed = stored.clone();
    changed
        .labels_mut()
        .insert("ignored".to_string(), "true".to_string());
    changed.status = Some(ClusterOperatorStatus {
        extension: Some(json!({ "unmanagedGatewayAPICRDNames": "b" })),
        ..Default::default()
    });
    let updated = assert_ok!(repo.update_status(&changed).await);

    assert!(updated.labels().get("ignored").is_none());
    assert_eq!(updated.status, changed.status);
    assert_eq!(repo.writes()[0].operation, Operation::UpdateStatus);
}

#[tokio::test]
async fn delete_of_missing_object_is_not_found() {
    let repo = MemoryRepository::with_objects([subscription("mesh", "stable")]);

    assert_ok!(repo.delete("mesh").await);
    let err = assert_err!(repo.delete("mesh").await);

    assert!(err.is_not_found());
    assert!(repo.objects().is_empty());
}

#[tokio::test]
async fn list_filters_by_labels() {
    let mut labelled = subscription("mesh", "stable");
    labelled
        .labels_mut()
        .insert("app.kubernetes.io/managed-by".to_string(), "gateway-api-operator".to_string());
    let repo = MemoryRepository::with_objects([labelled, subscription("other", "stable")]);

    let everything = assert_ok!(repo.list(&labels()).await);
    assert_eq!(everything.len(), 2);

    let selector = BTreeMap::from([(
        "app.kubernetes.io/managed-by".to_string(),
        "gateway-api-operator".to_string(),
    )]);
    let managed = assert_ok!(repo.list(&selector).await);
    assert_eq!(managed.len(), 1);
    assert_eq!(managed[0].name_any(), "mesh");
}

#[tokio::test]
async fn injected_failures_apply_until_cleared() {
    let repo = MemoryRepository::with_objects([subscription("mesh", "stable")]);
    repo.fail_on(Operation::Get);

    assert_err!(repo.get("mesh").await);

    repo.clear_failures();
    let found = assert_ok!(repo.get("mesh").await);
    assert!(found.is_some());
}

#[tokio::test]
async fn watch_reports_applied_and_deleted() {
    let repo = MemoryRepository::new();
    let mut changes = repo.watch();

    assert_ok!(repo.create(&subscription("mesh", "stable")).await);
    assert_ok!(repo.delete("mesh").await);

    let applied = changes.next().await.unwrap().unwrap();
    assert!(matches!(applied, Change::Applied(_)));
    assert_eq!(applied.object().name_any(), "mesh");

    let deleted = changes.next().await.unwrap().unwrap();
    assert!(matches!(deleted, Change::Deleted(_)));
}
