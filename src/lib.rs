//! Gateway API Operator
//!
//! Installs the service mesh control plane that implements Gateway API on a
//! cluster once the default GatewayClass appears, and reports unmanaged
//! Gateway API CRDs on the shared ingress ClusterOperator.

pub mod adapters;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod reconcilers;
pub mod repository;

pub use error::{Error, Result};
