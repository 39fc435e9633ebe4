//! Mesh bridge reconciliation core
//!
//! This library provides:
//! - The routing predicate and derived-name scheme for source Services
//! - Builders for the provisioned chain (Endpoints, bridge Service, VirtualService)
//! - The `ResourceStore` seam over the Kubernetes API
//! - The `Handler` trait and the route-bridge handler
//! - A dispatcher that isolates per-object failures
//! - Classification of watch events into lifecycle notifications

pub mod chain;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod naming;
pub mod retry;
pub mod source;
pub mod store;
pub mod watch;

pub use chain::{ChainPlan, Step};
pub use config::{BridgeConfig, Lifecycle, RoutingRulePolicy};
pub use dispatch::Dispatcher;
pub use error::{ConfigError, HandlerError, Result, StoreError};
pub use event::{LifecycleEvent, ObservedObject};
pub use handler::{ChainReport, Handler, Outcome, RouteBridgeHandler, StepStatus};
pub use naming::derived_name;
pub use store::{KubeStore, ResourceStore};
pub use watch::EventClassifier;
