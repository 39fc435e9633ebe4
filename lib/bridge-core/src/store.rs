//! Resource store over the Kubernetes API

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bridge_api::VirtualService;
use k8s_openapi::api::core::v1::{Endpoints, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::error::StoreError;

/// Typed create/delete operations the bridge issues against the cluster.
///
/// Implementations map API failures onto `StoreError` so callers can treat
/// `AlreadyExists`/`NotFound` as idempotent outcomes and retry `Transport`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_endpoints(&self, namespace: &str, endpoints: &Endpoints) -> Result<(), StoreError>;

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<(), StoreError>;

    async fn create_virtual_service(
        &self,
        namespace: &str,
        rule: &VirtualService,
    ) -> Result<(), StoreError>;

    async fn delete_endpoints(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    async fn delete_virtual_service(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}

/// Run one API call under `timeout`; a timeout is reported as a transport error
async fn with_deadline<T, F>(timeout: Duration, what: &str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, kube::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::Transport(format!(
            "{what} timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

/// `ResourceStore` backed by a `kube::Client`.
///
/// The client is owned by the caller; each call is bounded by `call_timeout`
/// and a timeout is reported as a transport error.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    call_timeout: Duration,
}

impl KubeStore {
    pub fn new(client: Client, call_timeout: Duration) -> Self {
        Self {
            client,
            call_timeout,
        }
    }

    async fn create<K>(&self, namespace: &str, obj: &K) -> Result<(), StoreError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
        K: Clone + Debug + Serialize + DeserializeOwned,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let name = obj.meta().name.clone().unwrap_or_default();
        let what = format!("create {} {namespace}/{name}", K::kind(&()));

        with_deadline(self.call_timeout, &what, api.create(&PostParams::default(), obj))
            .await?;
        debug!(kind = %K::kind(&()), %namespace, %name, "Created object");
        Ok(())
    }

    async fn delete<K>(&self, namespace: &str, name: &str) -> Result<(), StoreError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
        K: Clone + Debug + DeserializeOwned,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let what = format!("delete {} {namespace}/{name}", K::kind(&()));

        with_deadline(self.call_timeout, &what, api.delete(name, &DeleteParams::default()))
            .await?;
        debug!(kind = %K::kind(&()), %namespace, %name, "Deleted object");
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let info = with_deadline(
            self.call_timeout,
            "apiserver version",
            self.client.apiserver_version(),
        )
        .await?;
        debug!(version = %info.git_version, "Connected to API server");
        Ok(())
    }

    async fn create_endpoints(&self, namespace: &str, endpoints: &Endpoints) -> Result<(), StoreError> {
        self.create(namespace, endpoints).await
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<(), StoreError> {
        self.create(namespace, service).await
    }

    async fn create_virtual_service(
        &self,
        namespace: &str,
        rule: &VirtualService,
    ) -> Result<(), StoreError> {
        self.create(namespace, rule).await
    }

    async fn delete_endpoints(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.delete::<Endpoints>(namespace, name).await
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.delete::<Service>(namespace, name).await
    }

    async fn delete_virtual_service(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.delete::<VirtualService>(namespace, name).await
    }
}
