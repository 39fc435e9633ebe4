//! Turning watch events into lifecycle notifications
//!
//! A watch stream only reports "this object now looks like X". The
//! classifier remembers the last generation seen per uid so it can tell a
//! first sighting (created) from a later one (updated), and so a re-list
//! after a dropped watch can report objects that vanished in the meantime.

use std::collections::{HashMap, HashSet};

use k8s_openapi::api::core::v1::Service;
use kube_runtime::watcher::Event;
use tracing::debug;

use crate::event::LifecycleEvent;

#[derive(Default)]
pub struct EventClassifier {
    known: HashMap<String, Service>,
    relist: Option<HashSet<String>>,
}

fn object_key(svc: &Service) -> String {
    match svc.metadata.uid.as_deref() {
        Some(uid) => uid.to_string(),
        None => format!(
            "{}/{}",
            svc.metadata.namespace.as_deref().unwrap_or_default(),
            svc.metadata.name.as_deref().unwrap_or_default()
        ),
    }
}

impl EventClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently tracked
    pub fn tracked(&self) -> usize {
        self.known.len()
    }

    /// Classify one watch event. A single event can yield zero or more
    /// notifications (a finished re-list reports every vanished object).
    pub fn classify(&mut self, event: Event<Service>) -> Vec<LifecycleEvent> {
        match event {
            Event::Apply(svc) => self.apply(svc).into_iter().collect(),
            Event::Delete(svc) => {
                let key = object_key(&svc);
                self.known.remove(&key);
                if let Some(seen) = self.relist.as_mut() {
                    seen.remove(&key);
                }
                vec![LifecycleEvent::Deleted(svc.into())]
            }
            Event::Init => {
                debug!(tracked = self.known.len(), "Watch re-list started");
                self.relist = Some(HashSet::new());
                Vec::new()
            }
            Event::InitApply(svc) => {
                if let Some(seen) = self.relist.as_mut() {
                    seen.insert(object_key(&svc));
                }
                self.apply(svc).into_iter().collect()
            }
            Event::InitDone => {
                let Some(seen) = self.relist.take() else {
                    return Vec::new();
                };
                let vanished: Vec<String> = self
                    .known
                    .keys()
                    .filter(|key| !seen.contains(*key))
                    .cloned()
                    .collect();

                debug!(vanished = vanished.len(), "Watch re-list finished");
                vanished
                    .into_iter()
                    .filter_map(|key| self.known.remove(&key))
                    .map(|svc| LifecycleEvent::Deleted(svc.into()))
                    .collect()
            }
        }
    }

    fn apply(&mut self, svc: Service) -> Option<LifecycleEvent> {
        let key = object_key(&svc);
        match self.known.insert(key, svc.clone()) {
            None => Some(LifecycleEvent::Created(svc.into())),
            Some(old)
                if old.metadata.resource_version.is_some()
                    && old.metadata.resource_version == svc.metadata.resource_version =>
            {
                None
            }
            Some(old) => Some(LifecycleEvent::Updated {
                old: old.into(),
                new: svc.into(),
            }),
        }
    }
}
