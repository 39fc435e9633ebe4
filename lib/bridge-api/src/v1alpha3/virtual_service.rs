use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Result;

/// VirtualService declares how traffic entering a mesh gateway is
/// forwarded to a destination inside the mesh
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.istio.io",
    version = "v1alpha3",
    kind = "VirtualService",
    plural = "virtualservices",
    namespaced,
    derive = "Default",
    derive = "PartialEq",
)]
pub struct VirtualServiceSpec {
    /// Gateways this rule is bound to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gateways: Vec<String>,

    /// Hosts the rule applies to ("*" matches all)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    /// HTTP match/route pairs, evaluated in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http: Vec<HttpRoute>,
}

/// A single HTTP match/route pair
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HttpRoute {
    /// Match conditions; the route applies when any of them matches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub r#match: Vec<MatchRequest>,

    /// Destinations that matching traffic is forwarded to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<DestinationWeight>,
}

/// Request match conditions
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchRequest {
    /// Inbound gateway port
    #[serde(default)]
    pub port: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DestinationWeight {
    pub destination: Destination,
}

/// Destination service inside the mesh
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Destination {
    /// Service host name
    pub host: String,

    /// Port on the destination service
    pub port: PortSelector,
}

/// Port selector for a destination. Only selection by port name is defined.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PortSelector {
    Name(String),
}

impl VirtualServiceSpec {
    /// Encode this spec in its JSON text form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a spec from its JSON text form
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
