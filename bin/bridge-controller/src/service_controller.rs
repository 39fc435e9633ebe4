//! Service watch feeding the route bridge handler

use bridge_core::dispatch::DispatchStats;
use bridge_core::{Dispatcher, EventClassifier, Handler};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use kube_runtime::{watcher, WatchStreamExt};
use tracing::{debug, error, info};

pub struct ServiceBridgeController<H> {
    client: Client,
    dispatcher: Dispatcher<H>,
    watch_namespace: Option<String>,
}

impl<H: Handler> ServiceBridgeController<H> {
    pub fn new(client: Client, handler: H, watch_namespace: Option<String>) -> Self {
        Self {
            client,
            dispatcher: Dispatcher::new(handler),
            watch_namespace,
        }
    }

    /// Initialize the handler before any event is delivered
    pub async fn start(&self) -> anyhow::Result<()> {
        self.dispatcher.start().await?;
        Ok(())
    }

    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Watch Services and deliver lifecycle events one at a time.
    ///
    /// Each event is fully handled before the next is read from the stream.
    pub async fn run(&self) -> anyhow::Result<()> {
        let services: Api<Service> = match &self.watch_namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        info!(
            namespace = self.watch_namespace.as_deref().unwrap_or("<all>"),
            "Starting Service watch"
        );

        let mut classifier = EventClassifier::new();
        let mut stream = watcher(services, watcher::Config::default())
            .default_backoff()
            .boxed();

        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    for lifecycle_event in classifier.classify(event) {
                        // Failures are logged by the dispatcher; keep going
                        let _ = self.dispatcher.dispatch(&lifecycle_event).await;
                    }
                    debug!(tracked = classifier.tracked(), "Watch event processed");
                }
                Err(e) => error!("Error in Service watch stream: {}", e),
            }
        }

        info!("Service watch stream ended");
        Ok(())
    }
}
