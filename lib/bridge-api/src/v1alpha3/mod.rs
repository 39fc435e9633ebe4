/// API version v1alpha3 of the Istio networking group

pub mod virtual_service;

pub use virtual_service::{
    Destination, DestinationWeight, HttpRoute, MatchRequest, PortSelector, VirtualService,
    VirtualServiceSpec,
};
