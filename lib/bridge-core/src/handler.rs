//! Lifecycle handlers and the route-bridge handler
//!
//! The route-bridge handler reacts to a Service being created: when the
//! Service is annotated `route: "true"` and is of type NodePort it creates,
//! in order, the Endpoints, bridge Service and VirtualService of its chain.
//! The sequence is not transactional. A failed step stops the sequence and
//! leaves earlier objects in place; re-delivering the event resumes it,
//! because objects that already exist count as provisioned.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use tracing::{debug, info, warn};

pub use crate::chain::Step;
use crate::chain::ChainPlan;
use crate::config::{BridgeConfig, Lifecycle, RoutingRulePolicy};
use crate::error::{ConfigError, HandlerError, Result, StoreError};
use crate::event::ObservedObject;
use crate::naming::derived_name;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::source::SourceService;
use crate::store::ResourceStore;

/// Lifecycle callbacks invoked by the event source.
///
/// `init` is called exactly once before any event is delivered.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn init(&self) -> Result<()>;

    async fn object_created(&self, obj: &ObservedObject) -> Result<Outcome>;

    async fn object_deleted(&self, obj: &ObservedObject) -> Result<Outcome>;

    async fn object_updated(&self, old: &ObservedObject, new: &ObservedObject) -> Result<Outcome>;
}

/// What handling an event did
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The object does not qualify for routing
    Skipped,
    /// The event kind is not acted on
    Ignored,
    Provisioned(ChainReport),
    TornDown(ChainReport),
}

/// Result of one step against the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepStatus {
    Created,
    /// Already present; counted as provisioned
    Existing,
    Deleted,
    /// Already gone; counted as torn down
    Absent,
    /// Failed under the best-effort routing-rule policy
    Failed(String),
}

/// Per-step record of a provisioning or teardown pass
#[derive(Clone, Debug, PartialEq)]
pub struct ChainReport {
    pub name: String,
    pub namespace: String,
    pub steps: Vec<(Step, StepStatus)>,
}

impl ChainReport {
    fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            steps: Vec::with_capacity(3),
        }
    }

    pub fn status(&self, step: Step) -> Option<&StepStatus> {
        self.steps.iter().find(|(s, _)| *s == step).map(|(_, status)| status)
    }

    /// True when no step failed
    pub fn is_complete(&self) -> bool {
        !self
            .steps
            .iter()
            .any(|(_, status)| matches!(status, StepStatus::Failed(_)))
    }
}

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

/// Handler that bridges routed NodePort Services into the mesh
pub struct RouteBridgeHandler<S> {
    store: S,
    config: BridgeConfig,
    worker: IpAddr,
    retry: RetryConfig,
    state: AtomicU8,
}

impl<S: ResourceStore> RouteBridgeHandler<S> {
    /// Create a handler bound to `config.worker_address`
    pub fn new(store: S, config: BridgeConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let worker = config
            .worker_address
            .ok_or_else(|| ConfigError::Invalid("workerAddress is required".to_string()))?;

        Ok(Self {
            store,
            retry: config.retry_config(),
            config,
            worker,
            state: AtomicU8::new(UNINITIALIZED),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state.load(Ordering::Acquire) == READY {
            Ok(())
        } else {
            Err(HandlerError::NotInitialized)
        }
    }

    fn expect_service(obj: &ObservedObject) -> Result<&Service> {
        obj.as_service().ok_or(HandlerError::TypeMismatch {
            expected: "Service",
            found: obj.kind(),
        })
    }

    fn is_routed(&self, source: &SourceService<'_>) -> bool {
        source.is_routed(&self.config.route_annotation)
    }

    async fn provision(&self, source: &SourceService<'_>) -> Result<Outcome> {
        let plan = ChainPlan::for_source(source, self.worker, &self.config)?;
        let mut report = ChainReport::new(&plan.name, &plan.namespace);

        for step in Step::PROVISION_ORDER {
            match self.create_step(&plan, step).await {
                Ok(status) => {
                    debug!(chain = %plan.name, %step, ?status, "Provisioning step done");
                    report.steps.push((step, status));
                }
                Err(e)
                    if step == Step::RoutingRule
                        && self.config.routing_rule_policy == RoutingRulePolicy::BestEffort =>
                {
                    warn!(
                        service = %source.key(),
                        chain = %plan.name,
                        error = %e,
                        "Routing rule not created; continuing under best-effort policy"
                    );
                    report.steps.push((step, StepStatus::Failed(e.to_string())));
                }
                Err(e) => {
                    return Err(HandlerError::Provision {
                        object: source.key(),
                        chain: plan.name.clone(),
                        step,
                        source: e,
                    });
                }
            }
        }

        info!(
            service = %source.key(),
            chain = %plan.name,
            namespace = %plan.namespace,
            worker = %self.worker,
            "Provisioned mesh bridge"
        );
        Ok(Outcome::Provisioned(report))
    }

    async fn create_step(&self, plan: &ChainPlan, step: Step) -> std::result::Result<StepStatus, StoreError> {
        let store = &self.store;
        let operation = format!("create {step} {}/{}", plan.namespace, plan.name);

        let result = retry_with_backoff(&self.retry, &operation, StoreError::is_retryable, move || async move {
            match step {
                Step::Endpoints => store.create_endpoints(&plan.namespace, &plan.endpoints).await,
                Step::BridgeService => store.create_service(&plan.namespace, &plan.service).await,
                Step::RoutingRule => {
                    store
                        .create_virtual_service(&plan.namespace, &plan.routing_rule)
                        .await
                }
            }
        })
        .await;

        match result {
            Ok(()) => Ok(StepStatus::Created),
            Err(StoreError::AlreadyExists(_)) => Ok(StepStatus::Existing),
            Err(e) => Err(e),
        }
    }

    async fn teardown(&self, source: &SourceService<'_>) -> Result<Outcome> {
        let uid = source.uid().ok_or_else(|| HandlerError::InvalidObject {
            object: source.key(),
            reason: "metadata.uid is not set".to_string(),
        })?;
        let name = derived_name(uid);
        let namespace = self.config.namespace.as_str();
        let mut report = ChainReport::new(&name, namespace);

        for step in Step::TEARDOWN_ORDER {
            let status = self
                .delete_step(namespace, &name, step)
                .await
                .map_err(|e| HandlerError::Teardown {
                    object: source.key(),
                    chain: name.clone(),
                    step,
                    source: e,
                })?;
            debug!(chain = %name, %step, ?status, "Teardown step done");
            report.steps.push((step, status));
        }

        info!(service = %source.key(), chain = %name, %namespace, "Tore down mesh bridge");
        Ok(Outcome::TornDown(report))
    }

    async fn delete_step(
        &self,
        namespace: &str,
        name: &str,
        step: Step,
    ) -> std::result::Result<StepStatus, StoreError> {
        let store = &self.store;
        let operation = format!("delete {step} {namespace}/{name}");

        let result = retry_with_backoff(&self.retry, &operation, StoreError::is_retryable, move || async move {
            match step {
                Step::Endpoints => store.delete_endpoints(namespace, name).await,
                Step::BridgeService => store.delete_service(namespace, name).await,
                Step::RoutingRule => store.delete_virtual_service(namespace, name).await,
            }
        })
        .await;

        match result {
            Ok(()) => Ok(StepStatus::Deleted),
            Err(StoreError::NotFound(_)) => Ok(StepStatus::Absent),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<S: ResourceStore> Handler for RouteBridgeHandler<S> {
    async fn init(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(UNINITIALIZED, INITIALIZING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(HandlerError::AlreadyInitialized);
        }

        info!(
            worker = %self.worker,
            namespace = %self.config.namespace,
            gateway = %self.config.gateway,
            lifecycle = ?self.config.lifecycle,
            "Initializing route bridge handler"
        );

        let store = &self.store;
        match retry_with_backoff(&self.retry, "store ping", StoreError::is_retryable, || store.ping()).await {
            Ok(()) => {
                self.state.store(READY, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                self.state.store(UNINITIALIZED, Ordering::Release);
                Err(HandlerError::Connectivity(e))
            }
        }
    }

    async fn object_created(&self, obj: &ObservedObject) -> Result<Outcome> {
        self.ensure_ready()?;
        let svc = Self::expect_service(obj)?;
        let source = SourceService::new(svc);

        debug!(
            service = %source.key(),
            kind = %source.kind(),
            annotations = ?svc.metadata.annotations,
            ports = source.ports().len(),
            "Service created"
        );

        if !self.is_routed(&source) {
            debug!(service = %source.key(), "Service not flagged for routing; skipping");
            return Ok(Outcome::Skipped);
        }

        self.provision(&source).await
    }

    async fn object_deleted(&self, obj: &ObservedObject) -> Result<Outcome> {
        self.ensure_ready()?;
        let svc = Self::expect_service(obj)?;
        let source = SourceService::new(svc);

        if self.config.lifecycle == Lifecycle::OneShot || !self.is_routed(&source) {
            debug!(service = %source.key(), "Service deleted; nothing to do");
            return Ok(Outcome::Ignored);
        }

        self.teardown(&source).await
    }

    async fn object_updated(&self, old: &ObservedObject, new: &ObservedObject) -> Result<Outcome> {
        self.ensure_ready()?;
        let old_svc = Self::expect_service(old)?;
        let new_svc = Self::expect_service(new)?;

        if self.config.lifecycle == Lifecycle::OneShot {
            debug!(service = %SourceService::new(new_svc).key(), "Service updated; nothing to do");
            return Ok(Outcome::Ignored);
        }

        let before = SourceService::new(old_svc);
        let after = SourceService::new(new_svc);
        match (self.is_routed(&before), self.is_routed(&after)) {
            (false, true) => self.provision(&after).await,
            (true, false) => self.teardown(&before).await,
            _ => Ok(Outcome::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrySettings;
    use crate::source::tests::service;
    use crate::store::MockResourceStore;
    use bridge_api::v1alpha3::PortSelector;
    use k8s_openapi::api::core::v1::Endpoints;
    use mockall::Sequence;

    fn config() -> BridgeConfig {
        BridgeConfig {
            worker_address: Some("10.0.0.5".parse().unwrap()),
            retry: RetrySettings {
                max_attempts: 3,
                initial_delay_ms: 1,
                max_delay_ms: 2,
                backoff_multiplier: 2.0,
            },
            ..Default::default()
        }
    }

    async fn ready(mut store: MockResourceStore, config: BridgeConfig) -> RouteBridgeHandler<MockResourceStore> {
        store.expect_ping().times(1).returning(|| Ok(()));
        let handler = RouteBridgeHandler::new(store, config).unwrap();
        handler.init().await.unwrap();
        handler
    }

    fn routed(uid: &str) -> ObservedObject {
        service("web", uid, Some("true"), "NodePort", &[31080]).into()
    }

    fn expect_full_chain(store: &mut MockResourceStore) {
        store.expect_create_endpoints().times(1).returning(|_, _| Ok(()));
        store.expect_create_service().times(1).returning(|_, _| Ok(()));
        store.expect_create_virtual_service().times(1).returning(|_, _| Ok(()));
    }

    // =========================================================================
    // Predicate
    // =========================================================================

    #[tokio::test]
    async fn test_unrouted_services_make_no_store_calls() {
        let handler = ready(MockResourceStore::new(), config()).await;

        let cases = [
            service("web", "1", None, "NodePort", &[31080]),
            service("web", "1", Some("false"), "NodePort", &[31080]),
            service("web", "1", Some("True"), "NodePort", &[31080]),
            service("web", "1", Some("true"), "ClusterIP", &[31080]),
            service("web", "1", Some("true"), "LoadBalancer", &[31080]),
            service("web", "1", Some("true"), "ExternalName", &[]),
        ];
        for svc in cases {
            let outcome = handler.object_created(&svc.into()).await.unwrap();
            assert_eq!(outcome, Outcome::Skipped);
        }
    }

    // =========================================================================
    // Provisioning sequence
    // =========================================================================

    #[tokio::test]
    async fn test_provisions_chain_in_order() {
        let mut store = MockResourceStore::new();
        let mut seq = Sequence::new();

        store
            .expect_create_endpoints()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|ns, ep: &Endpoints| {
                let subset = &ep.subsets.as_ref().unwrap()[0];
                let port = &subset.ports.as_ref().unwrap()[0];
                ns == "default"
                    && ep.metadata.name.as_deref() == Some("a1234")
                    && subset.addresses.as_ref().unwrap()[0].ip == "10.0.0.5"
                    && port.port == 31080
                    && port.protocol.as_deref() == Some("TCP")
            })
            .returning(|_, _| Ok(()));
        store
            .expect_create_service()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|ns, svc: &Service| {
                let spec = svc.spec.as_ref().unwrap();
                ns == "default"
                    && svc.metadata.name.as_deref() == Some("a1234")
                    && spec.type_.as_deref() == Some("ClusterIP")
                    && spec.ports.as_ref().unwrap()[0].port == 6789
            })
            .returning(|_, _| Ok(()));
        store
            .expect_create_virtual_service()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|ns, rule| {
                let route = &rule.spec.http[0];
                ns == "default"
                    && rule.metadata.name.as_deref() == Some("a1234")
                    && rule.spec.gateways == ["cfcr-gateway"]
                    && rule.spec.hosts == ["*"]
                    && route.r#match[0].port == 8000
                    && route.route[0].destination.host == "web"
                    && route.route[0].destination.port == PortSelector::Name("6789".to_string())
            })
            .returning(|_, _| Ok(()));

        let handler = ready(store, config()).await;
        let outcome = handler.object_created(&routed("1234")).await.unwrap();

        let Outcome::Provisioned(report) = outcome else {
            panic!("expected Provisioned, got {outcome:?}");
        };
        assert_eq!(report.name, "a1234");
        assert_eq!(
            report.steps,
            vec![
                (Step::Endpoints, StepStatus::Created),
                (Step::BridgeService, StepStatus::Created),
                (Step::RoutingRule, StepStatus::Created),
            ]
        );
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_existing_chain_is_idempotent() {
        let mut store = MockResourceStore::new();
        store
            .expect_create_endpoints()
            .times(1)
            .returning(|_, _| Err(StoreError::AlreadyExists("a1234".into())));
        store
            .expect_create_service()
            .times(1)
            .returning(|_, _| Err(StoreError::AlreadyExists("a1234".into())));
        store
            .expect_create_virtual_service()
            .times(1)
            .returning(|_, _| Err(StoreError::AlreadyExists("a1234".into())));

        let handler = ready(store, config()).await;
        let outcome = handler.object_created(&routed("1234")).await.unwrap();

        let Outcome::Provisioned(report) = outcome else {
            panic!("expected Provisioned");
        };
        assert!(report.steps.iter().all(|(_, s)| *s == StepStatus::Existing));
    }

    #[tokio::test]
    async fn test_transport_error_is_retried() {
        let mut store = MockResourceStore::new();
        let mut seq = Sequence::new();
        store
            .expect_create_endpoints()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(StoreError::Transport("connection reset".into())));
        store
            .expect_create_endpoints()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        store.expect_create_service().times(1).returning(|_, _| Ok(()));
        store.expect_create_virtual_service().times(1).returning(|_, _| Ok(()));

        let handler = ready(store, config()).await;
        let outcome = handler.object_created(&routed("1234")).await.unwrap();
        assert!(matches!(outcome, Outcome::Provisioned(_)));
    }

    #[tokio::test]
    async fn test_exhausted_retries_stop_the_sequence() {
        let mut store = MockResourceStore::new();
        store
            .expect_create_endpoints()
            .times(3)
            .returning(|_, _| Err(StoreError::Transport("unreachable".into())));
        store.expect_create_service().never();
        store.expect_create_virtual_service().never();

        let handler = ready(store, config()).await;
        let err = handler.object_created(&routed("1234")).await.unwrap_err();

        match err {
            HandlerError::Provision { object, chain, step, source } => {
                assert_eq!(object, "apps/web");
                assert_eq!(chain, "a1234");
                assert_eq!(step, Step::Endpoints);
                assert_eq!(source, StoreError::Transport("unreachable".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let mut store = MockResourceStore::new();
        store.expect_create_endpoints().times(1).returning(|_, _| Ok(()));
        store
            .expect_create_service()
            .times(1)
            .returning(|_, _| Err(StoreError::Conflict("a1234".into())));
        store.expect_create_virtual_service().never();

        let handler = ready(store, config()).await;
        let err = handler.object_created(&routed("1234")).await.unwrap_err();
        assert!(matches!(err, HandlerError::Provision { step: Step::BridgeService, .. }));
    }

    #[tokio::test]
    async fn test_routing_rule_failure_is_checked_when_strict() {
        let mut store = MockResourceStore::new();
        store.expect_create_endpoints().times(1).returning(|_, _| Ok(()));
        store.expect_create_service().times(1).returning(|_, _| Ok(()));
        store
            .expect_create_virtual_service()
            .times(1)
            .returning(|_, _| Err(StoreError::Rejected { code: 422, message: "unknown field".into() }));

        let handler = ready(store, config()).await;
        let err = handler.object_created(&routed("1234")).await.unwrap_err();
        assert!(matches!(err, HandlerError::Provision { step: Step::RoutingRule, .. }));
    }

    #[tokio::test]
    async fn test_routing_rule_failure_tolerated_when_best_effort() {
        let mut store = MockResourceStore::new();
        store.expect_create_endpoints().times(1).returning(|_, _| Ok(()));
        store.expect_create_service().times(1).returning(|_, _| Ok(()));
        store
            .expect_create_virtual_service()
            .times(1)
            .returning(|_, _| Err(StoreError::Rejected { code: 422, message: "invalid".into() }));

        let cfg = BridgeConfig {
            routing_rule_policy: RoutingRulePolicy::BestEffort,
            ..config()
        };
        let handler = ready(store, cfg).await;
        let outcome = handler.object_created(&routed("1234")).await.unwrap();

        let Outcome::Provisioned(report) = outcome else {
            panic!("expected Provisioned");
        };
        assert!(!report.is_complete());
        assert!(matches!(report.status(Step::RoutingRule), Some(StepStatus::Failed(_))));
        assert_eq!(report.status(Step::Endpoints), Some(&StepStatus::Created));
    }

    #[tokio::test]
    async fn test_best_effort_does_not_cover_earlier_steps() {
        let mut store = MockResourceStore::new();
        store
            .expect_create_endpoints()
            .times(1)
            .returning(|_, _| Err(StoreError::Rejected { code: 422, message: "invalid".into() }));

        let cfg = BridgeConfig {
            routing_rule_policy: RoutingRulePolicy::BestEffort,
            ..config()
        };
        let handler = ready(store, cfg).await;
        assert!(handler.object_created(&routed("1234")).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_node_port_makes_no_calls() {
        let handler = ready(MockResourceStore::new(), config()).await;
        let svc = service("web", "1234", Some("true"), "NodePort", &[]);

        let err = handler.object_created(&svc.into()).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidObject { .. }));
    }

    // =========================================================================
    // Envelope and init
    // =========================================================================

    #[tokio::test]
    async fn test_wrong_kind_is_type_mismatch() {
        let handler = ready(MockResourceStore::new(), config()).await;
        let obj = ObservedObject::from(Endpoints::default());

        let err = handler.object_created(&obj).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::TypeMismatch { expected: "Service", found: "Endpoints" }
        ));
    }

    #[tokio::test]
    async fn test_wrong_kind_on_update_and_delete_is_type_mismatch() {
        for cfg in [config(), teardown_config()] {
            let lifecycle = cfg.lifecycle;
            let handler = ready(MockResourceStore::new(), cfg).await;
            let endpoints = ObservedObject::from(Endpoints::default());

            let results = [
                handler.object_deleted(&endpoints).await,
                handler.object_updated(&endpoints, &routed("1")).await,
                handler.object_updated(&routed("1"), &endpoints).await,
            ];
            for result in results {
                assert!(
                    matches!(
                        result,
                        Err(HandlerError::TypeMismatch { expected: "Service", found: "Endpoints" })
                    ),
                    "{lifecycle:?}: {result:?}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_events_before_init_are_rejected() {
        let handler = RouteBridgeHandler::new(MockResourceStore::new(), config()).unwrap();
        let err = handler.object_created(&routed("1")).await.unwrap_err();
        assert!(matches!(err, HandlerError::NotInitialized));
    }

    #[tokio::test]
    async fn test_init_runs_once() {
        let handler = ready(MockResourceStore::new(), config()).await;
        assert!(matches!(handler.init().await, Err(HandlerError::AlreadyInitialized)));
    }

    #[tokio::test]
    async fn test_init_reports_unreachable_store() {
        let mut store = MockResourceStore::new();
        store
            .expect_ping()
            .times(3)
            .returning(|| Err(StoreError::Transport("refused".into())));
        let handler = RouteBridgeHandler::new(store, config()).unwrap();

        let err = handler.init().await.unwrap_err();
        assert!(matches!(err, HandlerError::Connectivity(StoreError::Transport(_))));
        assert!(matches!(
            handler.object_created(&routed("1")).await,
            Err(HandlerError::NotInitialized)
        ));
    }

    #[test]
    fn test_new_requires_worker_address() {
        let cfg = BridgeConfig {
            worker_address: None,
            ..config()
        };
        assert!(RouteBridgeHandler::new(MockResourceStore::new(), cfg).is_err());
    }

    // =========================================================================
    // Update and delete
    // =========================================================================

    #[tokio::test]
    async fn test_one_shot_ignores_updates_and_deletes() {
        let handler = ready(MockResourceStore::new(), config()).await;
        let unrouted: ObservedObject = service("web", "1234", None, "NodePort", &[31080]).into();

        assert_eq!(handler.object_deleted(&routed("1234")).await.unwrap(), Outcome::Ignored);
        assert_eq!(
            handler.object_updated(&unrouted, &routed("1234")).await.unwrap(),
            Outcome::Ignored
        );
        assert_eq!(
            handler.object_updated(&routed("1234"), &unrouted).await.unwrap(),
            Outcome::Ignored
        );
    }

    fn teardown_config() -> BridgeConfig {
        BridgeConfig {
            lifecycle: Lifecycle::Teardown,
            ..config()
        }
    }

    #[tokio::test]
    async fn test_teardown_deletes_in_reverse_order() {
        let mut store = MockResourceStore::new();
        let mut seq = Sequence::new();
        store
            .expect_delete_virtual_service()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|ns, name| ns == "default" && name == "a1234")
            .returning(|_, _| Ok(()));
        store
            .expect_delete_service()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, name| name == "a1234")
            .returning(|_, _| Ok(()));
        store
            .expect_delete_endpoints()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, name| name == "a1234")
            .returning(|_, _| Err(StoreError::NotFound("a1234".into())));

        let handler = ready(store, teardown_config()).await;
        let outcome = handler.object_deleted(&routed("1234")).await.unwrap();

        let Outcome::TornDown(report) = outcome else {
            panic!("expected TornDown");
        };
        assert_eq!(
            report.steps,
            vec![
                (Step::RoutingRule, StepStatus::Deleted),
                (Step::BridgeService, StepStatus::Deleted),
                (Step::Endpoints, StepStatus::Absent),
            ]
        );
    }

    #[tokio::test]
    async fn test_teardown_ignores_unrouted_deletes() {
        let handler = ready(MockResourceStore::new(), teardown_config()).await;
        let svc: ObservedObject = service("web", "1234", None, "NodePort", &[31080]).into();
        assert_eq!(handler.object_deleted(&svc).await.unwrap(), Outcome::Ignored);
    }

    #[tokio::test]
    async fn test_update_into_routed_state_provisions() {
        let mut store = MockResourceStore::new();
        expect_full_chain(&mut store);

        let handler = ready(store, teardown_config()).await;
        let before: ObservedObject = service("web", "1234", None, "NodePort", &[31080]).into();

        let outcome = handler.object_updated(&before, &routed("1234")).await.unwrap();
        assert!(matches!(outcome, Outcome::Provisioned(_)));
    }

    #[tokio::test]
    async fn test_update_out_of_routed_state_tears_down() {
        let mut store = MockResourceStore::new();
        store.expect_delete_virtual_service().times(1).returning(|_, _| Ok(()));
        store.expect_delete_service().times(1).returning(|_, _| Ok(()));
        store.expect_delete_endpoints().times(1).returning(|_, _| Ok(()));

        let handler = ready(store, teardown_config()).await;
        let after: ObservedObject = service("web", "1234", Some("true"), "ClusterIP", &[]).into();

        let outcome = handler.object_updated(&routed("1234"), &after).await.unwrap();
        assert!(matches!(outcome, Outcome::TornDown(_)));
    }

    #[tokio::test]
    async fn test_update_within_routed_state_is_ignored() {
        let handler = ready(MockResourceStore::new(), teardown_config()).await;
        let outcome = handler.object_updated(&routed("1234"), &routed("1234")).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored);
    }

    #[tokio::test]
    async fn test_teardown_failure_is_reported() {
        let mut store = MockResourceStore::new();
        store
            .expect_delete_virtual_service()
            .times(1)
            .returning(|_, _| Err(StoreError::Rejected { code: 400, message: "bad request".into() }));
        store.expect_delete_service().never();
        store.expect_delete_endpoints().never();

        let handler = ready(store, teardown_config()).await;
        let err = handler.object_deleted(&routed("1234")).await.unwrap_err();
        assert!(matches!(err, HandlerError::Teardown { step: Step::RoutingRule, .. }));
    }
}
