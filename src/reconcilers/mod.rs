//! Reconciliation logic

pub mod desired;
pub mod gatewayapi;
pub mod gatewayclass;
pub mod status;
