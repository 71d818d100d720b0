//! Keyed event dispatcher
//!
//! A fixed set of tokio workers, each owning a bounded queue. Events are
//! routed by hashing their node key, so events about one node are handled
//! in arrival order while unrelated nodes proceed in parallel. Handlers are
//! blocking (they talk to the datastore synchronously) and run on the
//! blocking pool; a worker awaits its handler before taking the next event.

use crate::discovery::LldpChange;
use crate::error::{Result, TopologyError};
use crate::service::{NetworkModelService, ServiceEvent};
use config::DiscoveryConfig;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Notification delivered by the listener layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyEvent {
    DeviceConnected { node_id: String },
    DeviceRemoved { node_id: String },
    LldpChanged { node_id: String, change: LldpChange },
    ServiceCreated(ServiceEvent),
    ServiceDeleted(ServiceEvent),
}

impl TopologyEvent {
    /// Ordering key. Service events use the lower of their two end nodes so
    /// both directions of a service share a worker.
    pub fn node_key(&self) -> &str {
        match self {
            Self::DeviceConnected { node_id }
            | Self::DeviceRemoved { node_id }
            | Self::LldpChanged { node_id, .. } => node_id.as_str(),
            Self::ServiceCreated(service) | Self::ServiceDeleted(service) => {
                let endpoints = service.endpoints();
                endpoints.node_a.as_str().min(endpoints.node_z.as_str())
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeviceConnected { .. } => "device-connected",
            Self::DeviceRemoved { .. } => "device-removed",
            Self::LldpChanged { .. } => "lldp-changed",
            Self::ServiceCreated(_) => "service-created",
            Self::ServiceDeleted(_) => "service-deleted",
        }
    }
}

pub trait EventHandler: Send + Sync + 'static {
    fn handle(&self, event: TopologyEvent) -> Result<()>;
}

impl EventHandler for NetworkModelService {
    fn handle(&self, event: TopologyEvent) -> Result<()> {
        let kind = event.kind();
        let applied = match event {
            TopologyEvent::DeviceConnected { node_id } => self.on_device_connected(&node_id)?,
            TopologyEvent::DeviceRemoved { node_id } => self.on_device_removed(&node_id)?,
            TopologyEvent::LldpChanged { node_id, change } => self.on_lldp_change(&node_id, &change),
            TopologyEvent::ServiceCreated(service) => self.on_service_created(&service)?,
            TopologyEvent::ServiceDeleted(service) => self.on_service_deleted(&service)?,
        };
        if !applied {
            debug!(kind, "event left the topology unchanged");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct DispatcherMetrics {
    dispatched: AtomicU64,
    handled: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DispatcherStats {
    pub dispatched: u64,
    pub handled: u64,
    pub failed: u64,
}

pub struct EventDispatcher {
    senders: Vec<mpsc::Sender<TopologyEvent>>,
    workers: Vec<JoinHandle<()>>,
    metrics: Arc<DispatcherMetrics>,
}

impl EventDispatcher {
    /// Spawn the workers. Must be called from within a tokio runtime.
    pub fn start<H: EventHandler>(handler: Arc<H>, config: &DiscoveryConfig) -> Self {
        let worker_count = config.worker_count.max(1);
        let queue_depth = config.queue_depth.max(1);
        let metrics = Arc::new(DispatcherMetrics::default());

        let mut senders = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let (sender, receiver) = mpsc::channel(queue_depth);
            senders.push(sender);
            workers.push(tokio::spawn(run_worker(
                worker,
                receiver,
                Arc::clone(&handler),
                Arc::clone(&metrics),
            )));
        }

        info!(workers = worker_count, queue_depth, "event dispatcher started");
        Self {
            senders,
            workers,
            metrics,
        }
    }

    fn worker_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.senders.len() as u64) as usize
    }

    /// Queue an event, waiting for room in the worker's queue
    pub async fn dispatch(&self, event: TopologyEvent) -> Result<()> {
        let worker = self.worker_for(event.node_key());
        self.senders[worker]
            .send(event)
            .await
            .map_err(|_| TopologyError::Dispatcher {
                message: format!("worker {worker} stopped"),
            })?;
        self.metrics.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Queue an event without waiting; a full queue is an error
    pub fn try_dispatch(&self, event: TopologyEvent) -> Result<()> {
        let worker = self.worker_for(event.node_key());
        self.senders[worker].try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(event) => TopologyError::Dispatcher {
                message: format!("worker {worker} queue full, dropped {}", event.kind()),
            },
            mpsc::error::TrySendError::Closed(_) => TopologyError::Dispatcher {
                message: format!("worker {worker} stopped"),
            },
        })?;
        self.metrics.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            dispatched: self.metrics.dispatched.load(Ordering::Relaxed),
            handled: self.metrics.handled.load(Ordering::Relaxed),
            failed: self.metrics.failed.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting events, let the workers drain their queues and join them
    pub async fn shutdown(self) -> Result<DispatcherStats> {
        let EventDispatcher {
            senders,
            workers,
            metrics,
        } = self;
        drop(senders);

        for (worker, handle) in workers.into_iter().enumerate() {
            handle.await.map_err(|err| TopologyError::Dispatcher {
                message: format!("worker {worker} failed: {err}"),
            })?;
        }

        let stats = DispatcherStats {
            dispatched: metrics.dispatched.load(Ordering::Relaxed),
            handled: metrics.handled.load(Ordering::Relaxed),
            failed: metrics.failed.load(Ordering::Relaxed),
        };
        info!(?stats, "event dispatcher stopped");
        Ok(stats)
    }
}

async fn run_worker<H: EventHandler>(
    worker: usize,
    mut receiver: mpsc::Receiver<TopologyEvent>,
    handler: Arc<H>,
    metrics: Arc<DispatcherMetrics>,
) {
    debug!(worker, "event worker started");
    while let Some(event) = receiver.recv().await {
        let kind = event.kind();
        let key = event.node_key().to_string();
        let handler = Arc::clone(&handler);
        match tokio::task::spawn_blocking(move || handler.handle(event)).await {
            Ok(Ok(())) => {
                metrics.handled.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(err)) => {
                metrics.failed.fetch_add(1, Ordering::Relaxed);
                if err.is_transient() {
                    warn!(worker, kind, node = %key, error = %err, "event failed, retry on next notification");
                } else {
                    error!(worker, kind, node = %key, error = %err, "event failed");
                }
            }
            Err(join_err) => {
                metrics.failed.fetch_add(1, Ordering::Relaxed);
                error!(worker, kind, node = %key, error = %join_err, "event handler panicked");
            }
        }
    }
    debug!(worker, "event worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::OtnEndpoints;

    #[test]
    fn test_service_events_keyed_on_lower_end() {
        let forward = TopologyEvent::ServiceCreated(ServiceEvent::Otu4(OtnEndpoints::new(
            "SPDRZ",
            "XPDR1-NETWORK1",
            "SPDRA",
            "XPDR1-NETWORK1",
        )));
        assert_eq!(forward.node_key(), "SPDRA");
        assert_eq!(forward.kind(), "service-created");
    }
}
