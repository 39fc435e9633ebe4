//! Supervisory boundary between the event source and a handler
//!
//! Every lifecycle event is routed to the matching handler callback. A
//! failure is logged with the object it concerns and counted; it never
//! stops delivery of the next event.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, info, warn};

use crate::error::{HandlerError, Result};
use crate::event::LifecycleEvent;
use crate::handler::{Handler, Outcome};

/// Counters of dispatched events
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub failed: u64,
}

pub struct Dispatcher<H> {
    handler: H,
    dispatched: AtomicU64,
    failed: AtomicU64,
}

impl<H: Handler> Dispatcher<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            dispatched: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Initialize the handler. Failure here is fatal to the caller.
    pub async fn start(&self) -> Result<()> {
        self.handler.init().await?;
        info!("Handler initialized");
        Ok(())
    }

    /// Deliver one event. The result is returned for inspection only;
    /// failures have already been logged.
    pub async fn dispatch(&self, event: &LifecycleEvent) -> Result<Outcome> {
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        let result = match event {
            LifecycleEvent::Created(obj) => self.handler.object_created(obj).await,
            LifecycleEvent::Updated { old, new } => self.handler.object_updated(old, new).await,
            LifecycleEvent::Deleted(obj) => self.handler.object_deleted(obj).await,
        };

        let obj = event.object();
        match &result {
            Ok(outcome) => {
                debug!(kind = obj.kind(), name = obj.name(), action = event.action(), ?outcome, "Event handled");
            }
            Err(e @ (HandlerError::TypeMismatch { .. } | HandlerError::InvalidObject { .. })) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(kind = obj.kind(), name = obj.name(), action = event.action(), error = %e, "Event rejected");
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(kind = obj.kind(), name = obj.name(), action = event.action(), error = %e, "Event handling failed");
            }
        }

        result
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
