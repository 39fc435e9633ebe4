//! Typed envelopes for lifecycle notifications

use bridge_api::VirtualService;
use k8s_openapi::api::core::v1::{Endpoints, Service};

/// An object delivered by the event source
#[derive(Clone, Debug, PartialEq)]
pub enum ObservedObject {
    Service(Box<Service>),
    Endpoints(Box<Endpoints>),
    VirtualService(Box<VirtualService>),
}

impl ObservedObject {
    pub fn kind(&self) -> &'static str {
        match self {
            ObservedObject::Service(_) => "Service",
            ObservedObject::Endpoints(_) => "Endpoints",
            ObservedObject::VirtualService(_) => "VirtualService",
        }
    }

    pub fn name(&self) -> &str {
        let meta = match self {
            ObservedObject::Service(o) => &o.metadata,
            ObservedObject::Endpoints(o) => &o.metadata,
            ObservedObject::VirtualService(o) => &o.metadata,
        };
        meta.name.as_deref().unwrap_or("")
    }

    pub fn as_service(&self) -> Option<&Service> {
        match self {
            ObservedObject::Service(svc) => Some(&**svc),
            _ => None,
        }
    }
}

impl From<Service> for ObservedObject {
    fn from(svc: Service) -> Self {
        ObservedObject::Service(Box::new(svc))
    }
}

impl From<Endpoints> for ObservedObject {
    fn from(ep: Endpoints) -> Self {
        ObservedObject::Endpoints(Box::new(ep))
    }
}

impl From<VirtualService> for ObservedObject {
    fn from(vs: VirtualService) -> Self {
        ObservedObject::VirtualService(Box::new(vs))
    }
}

/// A lifecycle notification for one object generation
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleEvent {
    Created(ObservedObject),
    Updated {
        old: ObservedObject,
        new: ObservedObject,
    },
    Deleted(ObservedObject),
}

impl LifecycleEvent {
    /// The most recent generation of the object the event is about
    pub fn object(&self) -> &ObservedObject {
        match self {
            LifecycleEvent::Created(obj) | LifecycleEvent::Deleted(obj) => obj,
            LifecycleEvent::Updated { new, .. } => new,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            LifecycleEvent::Created(_) => "created",
            LifecycleEvent::Updated { .. } => "updated",
            LifecycleEvent::Deleted(_) => "deleted",
        }
    }
}
