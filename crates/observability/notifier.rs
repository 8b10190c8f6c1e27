use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, warn};

const QUEUE_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub(crate) struct AlertEvent {
    pub(crate) level: Level,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
    pub(crate) target: String,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) spans: Vec<String>,
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    async fn send(&self, event: &AlertEvent) -> Result<()>;
    fn sink_name(&self) -> &'static str;
}

/// Hands alerts to a background task so logging never waits on the network.
#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    tx: mpsc::Sender<AlertEvent>,
}

impl AlertDispatcher {
    pub(crate) fn spawn(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertEvent>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for sink in &sinks {
                    if let Err(error) = sink.send(&event).await {
                        warn!(
                            sink = sink.sink_name(),
                            error = %error,
                            "observability: alert sink failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }

    pub(crate) fn dispatch(&self, event: AlertEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("observability: alert queue full; dropping alert");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("observability: alert queue closed; dropping alert");
            }
        }
    }
}
