//! Compact binary encoding of the VirtualService spec
//!
//! Protobuf messages with the field numbers of Istio's
//! `networking.istio.io/v1alpha3` schema. Only the named-port variant of the
//! port selector is defined, so a decoded destination without a port name is
//! rejected rather than silently defaulted.

use prost::Message;

use crate::v1alpha3::{
    Destination as SpecDestination, DestinationWeight as SpecDestinationWeight,
    HttpRoute as SpecHttpRoute, MatchRequest as SpecMatchRequest,
    PortSelector as SpecPortSelector, VirtualServiceSpec as Spec,
};
use crate::{ApiError, Result};

#[derive(Clone, PartialEq, Message)]
pub struct VirtualServiceSpec {
    #[prost(string, repeated, tag = "1")]
    pub hosts: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub gateways: Vec<String>,
    #[prost(message, repeated, tag = "3")]
    pub http: Vec<HttpRoute>,
}

#[derive(Clone, PartialEq, Message)]
pub struct HttpRoute {
    #[prost(message, repeated, tag = "1")]
    pub r#match: Vec<MatchRequest>,
    #[prost(message, repeated, tag = "2")]
    pub route: Vec<DestinationWeight>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MatchRequest {
    #[prost(uint32, tag = "6")]
    pub port: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct DestinationWeight {
    #[prost(message, optional, tag = "1")]
    pub destination: Option<Destination>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Destination {
    #[prost(string, tag = "1")]
    pub host: String,
    #[prost(message, optional, tag = "3")]
    pub port: Option<PortSelector>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PortSelector {
    #[prost(oneof = "port_selector::Port", tags = "2")]
    pub port: Option<port_selector::Port>,
}

pub mod port_selector {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Port {
        #[prost(string, tag = "2")]
        Name(String),
    }
}

impl From<&Spec> for VirtualServiceSpec {
    fn from(spec: &Spec) -> Self {
        Self {
            hosts: spec.hosts.clone(),
            gateways: spec.gateways.clone(),
            http: spec.http.iter().map(HttpRoute::from).collect(),
        }
    }
}

impl From<&SpecHttpRoute> for HttpRoute {
    fn from(route: &SpecHttpRoute) -> Self {
        Self {
            r#match: route
                .r#match
                .iter()
                .map(|m| MatchRequest { port: m.port })
                .collect(),
            route: route
                .route
                .iter()
                .map(|dw| DestinationWeight {
                    destination: Some(Destination::from(&dw.destination)),
                })
                .collect(),
        }
    }
}

impl From<&SpecDestination> for Destination {
    fn from(dest: &SpecDestination) -> Self {
        let port = match &dest.port {
            SpecPortSelector::Name(name) => port_selector::Port::Name(name.clone()),
        };
        Self {
            host: dest.host.clone(),
            port: Some(PortSelector { port: Some(port) }),
        }
    }
}

impl TryFrom<VirtualServiceSpec> for Spec {
    type Error = ApiError;

    fn try_from(msg: VirtualServiceSpec) -> Result<Self> {
        let http = msg
            .http
            .into_iter()
            .map(SpecHttpRoute::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            gateways: msg.gateways,
            hosts: msg.hosts,
            http,
        })
    }
}

impl TryFrom<HttpRoute> for SpecHttpRoute {
    type Error = ApiError;

    fn try_from(msg: HttpRoute) -> Result<Self> {
        let route = msg
            .route
            .into_iter()
            .map(|dw| {
                let dest = dw
                    .destination
                    .ok_or(ApiError::MissingField("route.destination"))?;
                Ok(SpecDestinationWeight {
                    destination: SpecDestination::try_from(dest)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            r#match: msg
                .r#match
                .into_iter()
                .map(|m| SpecMatchRequest { port: m.port })
                .collect(),
            route,
        })
    }
}

impl TryFrom<Destination> for SpecDestination {
    type Error = ApiError;

    fn try_from(msg: Destination) -> Result<Self> {
        let port = match msg.port.and_then(|selector| selector.port) {
            Some(port_selector::Port::Name(name)) => SpecPortSelector::Name(name),
            None => return Err(ApiError::MissingField("destination.port.name")),
        };
        Ok(Self {
            host: msg.host,
            port,
        })
    }
}

/// Encode a spec into its binary form
pub fn encode_spec(spec: &Spec) -> Vec<u8> {
    VirtualServiceSpec::from(spec).encode_to_vec()
}

/// Decode a spec from its binary form
pub fn decode_spec(bytes: &[u8]) -> Result<Spec> {
    let msg = VirtualServiceSpec::decode(bytes)?;
    Spec::try_from(msg)
}
