//! Mesh routing API types for the mesh-bridge controller
//!
//! This library defines the Istio resources the bridge provisions:
//! - VirtualService: Layer 7 routing rule binding a gateway port to a mesh destination
//!
//! Each routing-rule spec has two equivalent encodings: the JSON form sent to
//! the API server and the compact protobuf form in [`wire`].

pub mod v1alpha3;
pub mod wire;
pub mod error;

pub use v1alpha3::{VirtualService, VirtualServiceSpec};
pub use error::{ApiError, Result};
