//! The chain of objects provisioned for a routed Service
//!
//! Every object in a chain carries the same derived name:
//! - Endpoints pointing at the worker address and the source's node port
//! - A ClusterIP bridge Service fronting those Endpoints
//! - A VirtualService routing the gateway port to the source Service

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use bridge_api::v1alpha3::{
    Destination, DestinationWeight, HttpRoute, MatchRequest, PortSelector,
};
use bridge_api::{VirtualService, VirtualServiceSpec};
use k8s_openapi::api::core::v1::{
    EndpointAddress, EndpointPort, EndpointSubset, Endpoints, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::config::BridgeConfig;
use crate::error::HandlerError;
use crate::naming::derived_name;
use crate::source::SourceService;

/// Label set on every provisioned object
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "mesh-bridge";

/// One object in the chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Endpoints,
    BridgeService,
    RoutingRule,
}

impl Step {
    /// Creation order. Teardown runs in reverse.
    pub const PROVISION_ORDER: [Step; 3] = [Step::Endpoints, Step::BridgeService, Step::RoutingRule];
    pub const TEARDOWN_ORDER: [Step; 3] = [Step::RoutingRule, Step::BridgeService, Step::Endpoints];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Endpoints => f.write_str("endpoints"),
            Step::BridgeService => f.write_str("bridge service"),
            Step::RoutingRule => f.write_str("routing rule"),
        }
    }
}

/// Fully built chain for one source Service
#[derive(Clone, Debug, PartialEq)]
pub struct ChainPlan {
    pub name: String,
    pub namespace: String,
    pub endpoints: Endpoints,
    pub service: Service,
    pub routing_rule: VirtualService,
}

impl ChainPlan {
    /// Build the chain for a routed source Service.
    ///
    /// Fails with `InvalidObject` when the source has no uid or its first
    /// port has no node port.
    pub fn for_source(
        source: &SourceService<'_>,
        worker: IpAddr,
        config: &BridgeConfig,
    ) -> Result<Self, HandlerError> {
        let uid = source.uid().ok_or_else(|| HandlerError::InvalidObject {
            object: source.key(),
            reason: "metadata.uid is not set".to_string(),
        })?;
        let node_port = source.first_node_port().ok_or_else(|| HandlerError::InvalidObject {
            object: source.key(),
            reason: "first port has no nodePort".to_string(),
        })?;

        let name = derived_name(uid);
        let namespace = config.namespace.clone();

        Ok(Self {
            endpoints: endpoints(&name, &namespace, worker, node_port),
            service: bridge_service(&name, &namespace, config.bridge_port),
            routing_rule: routing_rule(
                &name,
                &namespace,
                &config.gateway,
                &config.route_host,
                config.match_port,
                source.name(),
                &config.bridge_port.to_string(),
            ),
            name,
            namespace,
        })
    }
}

fn metadata(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(BTreeMap::from([(
            MANAGED_BY_LABEL.to_string(),
            MANAGED_BY_VALUE.to_string(),
        )])),
        ..Default::default()
    }
}

/// Endpoints with a single subset: the worker address on the node port, TCP
pub fn endpoints(name: &str, namespace: &str, worker: IpAddr, node_port: i32) -> Endpoints {
    Endpoints {
        metadata: metadata(name, namespace),
        subsets: Some(vec![EndpointSubset {
            addresses: Some(vec![EndpointAddress {
                ip: worker.to_string(),
                ..Default::default()
            }]),
            ports: Some(vec![EndpointPort {
                port: node_port,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }]),
    }
}

/// ClusterIP Service with one TCP port and no selector, so it is backed by
/// the Endpoints of the same name
pub fn bridge_service(name: &str, namespace: &str, port: u16) -> Service {
    Service {
        metadata: metadata(name, namespace),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            ports: Some(vec![ServicePort {
                port: i32::from(port),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// VirtualService sending gateway traffic on `match_port` to
/// `destination_host`, port selected by name
pub fn routing_rule(
    name: &str,
    namespace: &str,
    gateway: &str,
    host: &str,
    match_port: u32,
    destination_host: &str,
    destination_port: &str,
) -> VirtualService {
    let mut rule = VirtualService::new(
        name,
        VirtualServiceSpec {
            gateways: vec![gateway.to_string()],
            hosts: vec![host.to_string()],
            http: vec![HttpRoute {
                r#match: vec![MatchRequest { port: match_port }],
                route: vec![DestinationWeight {
                    destination: Destination {
                        host: destination_host.to_string(),
                        port: PortSelector::Name(destination_port.to_string()),
                    },
                }],
            }],
        },
    );
    rule.metadata = metadata(name, namespace);
    rule
}
