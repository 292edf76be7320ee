//! Desired-state calculation
//!
//! Maps the observed [`Signal`] to the set of dependent objects that should
//! exist. The result depends on nothing but the signal and the config.

use crate::adapters::control_plane_builder::build_control_plane;
use crate::adapters::owner::MarkerRef;
use crate::adapters::subscription_builder::build_subscription;
use crate::config::Config;
use crate::crd::{ServiceMeshControlPlane, Subscription};

/// What a pass observed; re-read on every pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Feature enabled and the marker exists
    Active(MarkerRef),
    /// Feature disabled or marker absent
    Inactive,
}

impl Signal {
    pub fn is_active(&self) -> bool {
        matches!(self, Signal::Active(_))
    }
}

/// Kinds of dependent object the operator manages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Subscription,
    ControlPlane,
}

/// A dependent object that should exist
#[derive(Clone, Debug, PartialEq)]
pub enum DesiredObject {
    Subscription(Subscription),
    ControlPlane(ServiceMeshControlPlane),
}

impl DesiredObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            DesiredObject::Subscription(_) => ObjectKind::Subscription,
            DesiredObject::ControlPlane(_) => ObjectKind::ControlPlane,
        }
    }
}

/// Identity of an object the operator may have created
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedObject {
    pub kind: ObjectKind,
    pub namespace: String,
    pub name: String,
}

/// Ordered set of dependents for `signal`; empty when inactive
pub fn compute_desired(signal: &Signal, config: &Config) -> Vec<DesiredObject> {
    match signal {
        Signal::Inactive => Vec::new(),
        Signal::Active(marker) => vec![
            DesiredObject::Subscription(build_subscription(config, marker)),
            DesiredObject::ControlPlane(build_control_plane(config, marker)),
        ],
    }
}

/// Every object [`compute_desired`] can ever produce, by identity
pub fn managed_objects(config: &Config) -> Vec<ManagedObject> {
    vec![
        ManagedObject {
            kind: ObjectKind::Subscription,
            namespace: config.operator_namespace.clone(),
            name: config.subscription.package.clone(),
        },
        ManagedObject {
            kind: ObjectKind::ControlPlane,
            namespace: config.operand_namespace.clone(),
            name: config.control_plane_name.clone(),
        },
    ]
}
