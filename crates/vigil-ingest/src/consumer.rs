//! The ingest driver: partition-parallel message handling with bounded
//! retry and explicit offset commit.
//!
//! Handlers run sequentially within a partition (strict intra-partition
//! ordering) and in parallel across partitions. An offset is committed
//! after a message is durably processed *or* terminally dropped; the only
//! path that leaves an offset uncommitted is shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vigil_core::VigilError;
use vigil_core::repository::{AccessLogStore, LedgerStore, SearchProjection};
use vigil_service::AuditService;

use crate::bus::{BusConsumer, BusMessage, PartitionStream};
use crate::normalize::normalize;

/// Ledger-append attempts per message; backoff is `attempt × 1 s`.
const MAX_ATTEMPTS: u32 = 3;

/// Drives claimed partitions through the audit service.
pub struct IngestDriver<L, S, A, C> {
    service: Arc<AuditService<L, S, A>>,
    consumer: Arc<C>,
    shutdown: CancellationToken,
}

impl<L, S, A, C> IngestDriver<L, S, A, C>
where
    L: LedgerStore + 'static,
    S: SearchProjection + Clone + Send + Sync + 'static,
    A: AccessLogStore + 'static,
    C: BusConsumer + 'static,
{
    pub fn new(service: Arc<AuditService<L, S, A>>, consumer: Arc<C>) -> Self {
        Self {
            service,
            consumer,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that cancels the driver and every in-flight handler,
    /// including retry sleeps.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Claim partitions and run one handler task per partition until the
    /// streams close or the driver is cancelled.
    pub async fn run(&self) -> vigil_core::VigilResult<()> {
        let streams = self.consumer.claim().await?;
        info!(partitions = streams.len(), "ingest driver claimed partitions");

        let mut handlers = JoinSet::new();
        for stream in streams {
            let service = self.service.clone();
            let consumer = self.consumer.clone();
            let shutdown = self.shutdown.clone();
            handlers.spawn(handle_partition(stream, service, consumer, shutdown));
        }

        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    error!("partition handler panicked");
                }
            }
        }

        info!("ingest driver stopped");
        Ok(())
    }
}

async fn handle_partition<L, S, A, C>(
    mut stream: PartitionStream,
    service: Arc<AuditService<L, S, A>>,
    consumer: Arc<C>,
    shutdown: CancellationToken,
) where
    L: LedgerStore + 'static,
    S: SearchProjection + Clone + Send + Sync + 'static,
    A: AccessLogStore + 'static,
    C: BusConsumer + 'static,
{
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = stream.recv() => match next {
                Some(message) => message,
                None => break,
            },
        };

        // Commit after success or terminal drop; a shutdown mid-message
        // leaves the offset uncommitted for redelivery.
        if !process_message(&message, &service, &shutdown).await {
            break;
        }

        if let Err(e) = consumer
            .commit(&message.topic, message.partition, message.offset)
            .await
        {
            error!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "failed to commit offset"
            );
        }
    }
}

/// Returns whether the message reached a terminal state (and its offset
/// should be committed).
async fn process_message<L, S, A>(
    message: &BusMessage,
    service: &AuditService<L, S, A>,
    shutdown: &CancellationToken,
) -> bool
where
    L: LedgerStore + 'static,
    S: SearchProjection + Clone + Send + Sync + 'static,
    A: AccessLogStore + 'static,
{
    let raw = match serde_json::from_slice::<serde_json::Value>(&message.payload) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => {
            warn!(
                topic = %message.topic,
                offset = message.offset,
                code = "MESSAGE_DECODE",
                "bus message is not a JSON object; dropping"
            );
            return true;
        }
        Err(e) => {
            warn!(
                topic = %message.topic,
                offset = message.offset,
                code = "MESSAGE_DECODE",
                error = %e,
                "failed to decode bus message; dropping"
            );
            return true;
        }
    };

    let event = normalize(&raw, &message.topic);

    for attempt in 1..=MAX_ATTEMPTS {
        match service.process_and_store(event.clone()).await {
            Ok(_) => return true,
            // At-least-once delivery: the primary key already holds this
            // event, so a redelivery is a success.
            Err(VigilError::AlreadyExists { .. }) => {
                debug!(
                    event_id = %event.event_id,
                    topic = %message.topic,
                    "duplicate delivery; ledger already holds event"
                );
                return true;
            }
            Err(e) => {
                error!(
                    topic = %message.topic,
                    event_id = %event.event_id,
                    attempt,
                    error = %e,
                    "failed to process audit event"
                );
                if attempt < MAX_ATTEMPTS {
                    let backoff = Duration::from_secs(u64::from(attempt));
                    tokio::select! {
                        _ = shutdown.cancelled() => return false,
                        _ = sleep(backoff) => {}
                    }
                }
            }
        }
    }

    // TODO: route exhausted messages to a dead-letter topic instead of
    // committing past them.
    error!(
        event_id = %event.event_id,
        topic = %message.topic,
        offset = message.offset,
        "dropping event after retries"
    );
    true
}
