//! Read-only view over a source Service

use std::fmt;

use k8s_openapi::api::core::v1::{Service, ServicePort};

/// Exposure kind of a Service (`spec.type`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExposureKind {
    ClusterIp,
    NodePort,
    LoadBalancer,
    ExternalName,
    Other(String),
}

impl ExposureKind {
    /// Parse `spec.type`; the API server defaults an absent type to ClusterIP
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("ClusterIP") => ExposureKind::ClusterIp,
            Some("NodePort") => ExposureKind::NodePort,
            Some("LoadBalancer") => ExposureKind::LoadBalancer,
            Some("ExternalName") => ExposureKind::ExternalName,
            Some(other) => ExposureKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExposureKind::ClusterIp => "ClusterIP",
            ExposureKind::NodePort => "NodePort",
            ExposureKind::LoadBalancer => "LoadBalancer",
            ExposureKind::ExternalName => "ExternalName",
            ExposureKind::Other(s) => s,
        }
    }
}

impl fmt::Display for ExposureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accessors for the parts of a Service the bridge reads
pub struct SourceService<'a> {
    svc: &'a Service,
}

impl<'a> SourceService<'a> {
    pub fn new(svc: &'a Service) -> Self {
        Self { svc }
    }

    pub fn name(&self) -> &'a str {
        self.svc.metadata.name.as_deref().unwrap_or("")
    }

    pub fn namespace(&self) -> &'a str {
        self.svc.metadata.namespace.as_deref().unwrap_or("default")
    }

    pub fn uid(&self) -> Option<&'a str> {
        self.svc.metadata.uid.as_deref()
    }

    /// `namespace/name`, for logs and errors
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace(), self.name())
    }

    pub fn annotation(&self, key: &str) -> Option<&'a str> {
        self.svc
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    pub fn kind(&self) -> ExposureKind {
        ExposureKind::parse(self.svc.spec.as_ref().and_then(|s| s.type_.as_deref()))
    }

    pub fn ports(&self) -> &'a [ServicePort] {
        self.svc
            .spec
            .as_ref()
            .and_then(|s| s.ports.as_deref())
            .unwrap_or(&[])
    }

    /// Node port of the first declared port
    pub fn first_node_port(&self) -> Option<i32> {
        self.ports().first().and_then(|p| p.node_port)
    }

    /// Routing predicate: the annotation is exactly `"true"` and the Service
    /// is node-exposed. Absent or any other value is false.
    pub fn is_routed(&self, annotation_key: &str) -> bool {
        self.annotation(annotation_key) == Some("true") && self.kind() == ExposureKind::NodePort
    }
}
