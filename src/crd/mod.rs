//! Resource definitions consumed and produced by the operator
//!
//! None of these CRDs are owned by this operator; the types describe the
//! subset of each API the reconcilers read or write.

mod cluster_operator;
mod control_plane;
mod gateway_class;
mod status_extension;
mod subscription;

pub use cluster_operator::*;
pub use control_plane::*;
pub use gateway_class::*;
pub use status_extension::*;
pub use subscription::*;
