//! Deadline-miss events: bounded ring, consumer, and wire format.
//!
//! The producer side is the `stopping` hot path, so pushes are wait-free and
//! overflow drops the newest event rather than blocking. The consumer is an
//! external collaborator that drains records in batches.
//!
//! # Wire format
//!
//! A serialized record is exactly [`EVENT_WIRE_SIZE`] bytes: `workload_id`,
//! `miss_ns`, `timestamp`, each little-endian `u64`, in declaration order.
//! Consumers tolerate oversized records for forward compatibility (the known
//! prefix is read, the suffix discarded); undersized records are rejected.

use crate::types::{Time, WorkloadId};
use crossbeam_queue::ArrayQueue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default ring capacity in records (24-byte records, 768 KiB).
pub const EVENT_RING_CAPACITY: usize = 32_768;

/// Serialized size of one [`DeadlineEvent`] record.
pub const EVENT_WIRE_SIZE: usize = 24;

/// Sleep between empty drain attempts while a poll timeout remains.
const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// A deadline-miss observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineEvent {
    /// The workload whose task stopped late.
    pub workload_id: WorkloadId,
    /// Nanoseconds past the deadline at stop time.
    pub miss_ns: u64,
    /// The stop-time "now" that detected the miss.
    pub timestamp: Time,
}

/// Wire-format decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The buffer is shorter than the known record size.
    #[error("event record truncated: {len} of 24 bytes")]
    Truncated {
        /// Observed buffer length.
        len: usize,
    },
}

fn read_u64_le(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

impl DeadlineEvent {
    /// Encodes the record as [`EVENT_WIRE_SIZE`] little-endian bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; EVENT_WIRE_SIZE] {
        let mut buf = [0u8; EVENT_WIRE_SIZE];
        buf[0..8].copy_from_slice(&self.workload_id.as_u64().to_le_bytes());
        buf[8..16].copy_from_slice(&self.miss_ns.to_le_bytes());
        buf[16..24].copy_from_slice(&self.timestamp.as_nanos().to_le_bytes());
        buf
    }

    /// Decodes a record from `buf`.
    ///
    /// Oversized buffers are accepted and the suffix ignored; undersized
    /// buffers are rejected.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < EVENT_WIRE_SIZE {
            return Err(CodecError::Truncated { len: buf.len() });
        }
        Ok(Self {
            workload_id: WorkloadId::new(read_u64_le(buf, 0)),
            miss_ns: read_u64_le(buf, 8),
            timestamp: Time::from_nanos(read_u64_le(buf, 16)),
        })
    }
}

/// The bounded multi-producer, single-consumer miss-event ring.
#[derive(Debug)]
pub struct EventRing {
    queue: Arc<ArrayQueue<DeadlineEvent>>,
}

impl EventRing {
    /// Creates a ring with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(EVENT_RING_CAPACITY)
    }

    /// Creates a ring holding up to `capacity` records (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
        }
    }

    /// Offers an event to the ring. Wait-free.
    ///
    /// Returns false when the ring is full; the newest event is the one
    /// dropped.
    pub(crate) fn offer(&self, event: DeadlineEvent) -> bool {
        self.queue.push(event).is_ok()
    }

    /// Creates the consumer handle for this ring.
    #[must_use]
    pub fn consumer(&self) -> EventConsumer {
        EventConsumer {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no events are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for EventRing {
    fn default() -> Self {
        Self::new()
    }
}

/// The single consumer of deadline-miss events.
#[derive(Debug)]
pub struct EventConsumer {
    queue: Arc<ArrayQueue<DeadlineEvent>>,
}

impl EventConsumer {
    /// Drains up to `max_events`, waiting up to `timeout` for the first.
    ///
    /// Returns as soon as one drain pass yields anything, or empty when the
    /// timeout elapses with no events.
    #[must_use]
    pub fn poll(&self, max_events: usize, timeout: Duration) -> Vec<DeadlineEvent> {
        let start = Instant::now();
        let mut drained = Vec::new();
        if max_events == 0 {
            return drained;
        }
        loop {
            while drained.len() < max_events {
                match self.queue.pop() {
                    Some(event) => drained.push(event),
                    None => break,
                }
            }
            if !drained.is_empty() || start.elapsed() >= timeout {
                return drained;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(wid: u64, miss_ns: u64, at: u64) -> DeadlineEvent {
        DeadlineEvent {
            workload_id: WorkloadId::new(wid),
            miss_ns,
            timestamp: Time::from_nanos(at),
        }
    }

    #[test]
    fn encode_is_little_endian_in_declaration_order() {
        let bytes = event(0x0102, 0x0304, 0x0506).encode();
        assert_eq!(&bytes[0..8], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..16], &[0x04, 0x03, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[16..24], &[0x06, 0x05, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn decode_roundtrip() {
        let original = event(12_345, 14_800_000, 1_025_000_000);
        let decoded = DeadlineEvent::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn serde_roundtrip() {
        let original = event(12_345, 14_800_000, 1_025_000_000);
        let json = serde_json::to_string(&original).unwrap();
        let parsed: DeadlineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn oversized_records_are_tolerated() {
        let mut oversized = event(7, 8, 9).encode().to_vec();
        oversized.extend_from_slice(&[0xFF; 16]);

        let decoded = DeadlineEvent::decode(&oversized).unwrap();
        assert_eq!(decoded, event(7, 8, 9));
    }

    #[test]
    fn undersized_records_are_rejected() {
        let short = [0u8; EVENT_WIRE_SIZE - 1];
        assert_eq!(
            DeadlineEvent::decode(&short),
            Err(CodecError::Truncated { len: 23 })
        );
        assert_eq!(
            DeadlineEvent::decode(&[]),
            Err(CodecError::Truncated { len: 0 })
        );
    }

    #[test]
    fn overflow_drops_the_newest() {
        let ring = EventRing::with_capacity(2);
        assert!(ring.offer(event(1, 0, 0)));
        assert!(ring.offer(event(2, 0, 0)));
        assert!(!ring.offer(event(3, 0, 0)));

        let consumer = ring.consumer();
        let drained = consumer.poll(16, Duration::ZERO);
        let wids: Vec<u64> = drained.iter().map(|e| e.workload_id.as_u64()).collect();
        assert_eq!(wids, vec![1, 2]);
    }

    #[test]
    fn poll_respects_max_events() {
        let ring = EventRing::with_capacity(8);
        for raw in 0..5 {
            assert!(ring.offer(event(raw, 0, 0)));
        }

        let consumer = ring.consumer();
        assert_eq!(consumer.poll(3, Duration::ZERO).len(), 3);
        assert_eq!(consumer.poll(16, Duration::ZERO).len(), 2);
    }

    #[test]
    fn empty_poll_returns_after_timeout() {
        let ring = EventRing::new();
        let consumer = ring.consumer();

        let start = Instant::now();
        let drained = consumer.poll(16, Duration::from_millis(5));
        assert!(drained.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn producers_on_many_threads() {
        let ring = Arc::new(EventRing::with_capacity(4_096));
        let consumer = ring.consumer();
        let producers: u64 = 4;
        let per_producer: u64 = 500;

        let handles: Vec<_> = (0..producers)
            .map(|producer| {
                let ring = Arc::clone(&ring);
                std::thread::spawn(move || {
                    for sequence in 0..per_producer {
                        assert!(ring.offer(event(producer, sequence, 0)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("producer panicked");
        }

        let mut total = 0;
        loop {
            let batch = consumer.poll(128, Duration::ZERO);
            if batch.is_empty() {
                break;
            }
            total += batch.len();
        }
        assert_eq!(total, (producers * per_producer) as usize);
    }
}
