//! Message-bus consumer contract and the in-process channel bus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use vigil_core::{VigilError, VigilResult};

/// One message as claimed from the bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub payload: Vec<u8>,
}

/// Ordered stream of messages for a single claimed partition.
///
/// Ordering inside a partition is the bus's delivery order; there is no
/// ordering across partitions.
pub struct PartitionStream {
    pub topic: String,
    pub partition: u32,
    rx: mpsc::UnboundedReceiver<BusMessage>,
}

impl PartitionStream {
    /// Next message, or `None` when the partition is closed.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}

/// Consumer-group view of the bus: claim partition streams once, then
/// commit offsets explicitly after each message is processed or
/// terminally dropped.
pub trait BusConsumer: Send + Sync {
    fn claim(&self) -> impl Future<Output = VigilResult<Vec<PartitionStream>>> + Send;

    fn commit(
        &self,
        topic: &str,
        partition: u32,
        offset: u64,
    ) -> impl Future<Output = VigilResult<()>> + Send;
}

struct Partition {
    tx: mpsc::UnboundedSender<BusMessage>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<BusMessage>>>,
    next_offset: AtomicU64,
}

struct Topic {
    partitions: Vec<Partition>,
    round_robin: AtomicUsize,
}

/// In-process bus with a fixed topic/partition layout and a single
/// consumer group.
///
/// Messages buffer unboundedly from bus creation, so a claim always
/// starts from the earliest offset. Committed offsets are bookkept per
/// partition and exposed for inspection.
pub struct ChannelBus {
    topics: HashMap<String, Topic>,
    committed: Mutex<HashMap<(String, u32), u64>>,
}

impl ChannelBus {
    pub fn new(topics: &[String], partitions_per_topic: u32) -> Self {
        let topics = topics
            .iter()
            .map(|name| {
                let partitions = (0..partitions_per_topic)
                    .map(|_| {
                        let (tx, rx) = mpsc::unbounded_channel();
                        Partition {
                            tx,
                            rx: Mutex::new(Some(rx)),
                            next_offset: AtomicU64::new(0),
                        }
                    })
                    .collect();
                (
                    name.clone(),
                    Topic {
                        partitions,
                        round_robin: AtomicUsize::new(0),
                    },
                )
            })
            .collect();

        Self {
            topics,
            committed: Mutex::new(HashMap::new()),
        }
    }

    /// Publish a payload to a topic; partitions are assigned round-robin.
    /// Returns the (partition, offset) the message landed on.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> VigilResult<(u32, u64)> {
        let entry = self
            .topics
            .get(topic)
            .ok_or_else(|| VigilError::Validation {
                message: format!("unknown topic: {topic}"),
            })?;

        let index = entry.round_robin.fetch_add(1, Ordering::Relaxed) % entry.partitions.len();
        let partition = &entry.partitions[index];
        let offset = partition.next_offset.fetch_add(1, Ordering::Relaxed);

        let message = BusMessage {
            topic: topic.to_owned(),
            partition: index as u32,
            offset,
            payload,
        };
        partition
            .tx
            .send(message)
            .map_err(|_| VigilError::Internal("bus partition closed".into()))?;

        Ok((index as u32, offset))
    }

    /// Last committed offset for a partition, if any.
    pub fn committed_offset(&self, topic: &str, partition: u32) -> Option<u64> {
        self.committed
            .lock()
            .get(&(topic.to_owned(), partition))
            .copied()
    }
}

impl BusConsumer for ChannelBus {
    async fn claim(&self) -> VigilResult<Vec<PartitionStream>> {
        let mut streams = Vec::new();
        for (name, topic) in &self.topics {
            for (index, partition) in topic.partitions.iter().enumerate() {
                let rx = partition.rx.lock().take().ok_or_else(|| {
                    VigilError::Internal(format!(
                        "partition {name}/{index} already claimed by this group"
                    ))
                })?;
                streams.push(PartitionStream {
                    topic: name.clone(),
                    partition: index as u32,
                    rx,
                });
            }
        }
        Ok(streams)
    }

    async fn commit(&self, topic: &str, partition: u32, offset: u64) -> VigilResult<()> {
        self.committed
            .lock()
            .insert((topic.to_owned(), partition), offset);
        Ok(())
    }
}
