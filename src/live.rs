//! Live attendance fan-out, one broadcast channel per (brigade,
//! callout) pair.
//!
//! Every delta published for a callout gets the next value of that
//! callout's sequence counter, assigned under the registry write lock
//! so observers can detect gaps. Channel entries outlive subscriber
//! churn, since the sequence must keep counting for reconnecting
//! clients, and are dropped only when the callout locks.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaOp {
    Added,
    Moved,
    Removed,
}

/// One attendance change, as pushed to connected observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceDelta {
    pub callout_id: String,
    pub member_id: String,
    pub truck_id: Option<String>,
    pub position_id: Option<String>,
    pub status: String,
    pub op: DeltaOp,
    /// Assigned by [`LiveChannels::publish`]; monotonic per callout.
    pub sequence: u64,
}

#[derive(Debug, Clone)]
pub enum LiveEvent {
    Delta(AttendanceDelta),
    Locked { callout_id: String },
}

struct ChannelState {
    tx: broadcast::Sender<LiveEvent>,
    sequence: u64,
}

/// A live subscription plus the sequence watermark at subscribe time.
/// Deltas with a sequence at or below the watermark are already part
/// of the snapshot the subscriber is about to read.
pub struct LiveSub {
    pub rx: broadcast::Receiver<LiveEvent>,
    pub sequence: u64,
}

pub struct LiveChannels {
    channels: RwLock<HashMap<(String, String), ChannelState>>,
    capacity: usize,
}

impl LiveChannels {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Take a receiver for a callout's channel, creating the channel if
    /// this is the first interest in it. Must be called before reading
    /// the attendance snapshot: the returned watermark is what makes
    /// snapshot plus filtered deltas gap-free.
    pub async fn subscribe(&self, brigade_id: &str, callout_id: &str) -> LiveSub {
        let mut channels = self.channels.write().await;
        let state = channels
            .entry((brigade_id.to_string(), callout_id.to_string()))
            .or_insert_with(|| ChannelState {
                tx: broadcast::channel(self.capacity).0,
                sequence: 0,
            });
        LiveSub {
            rx: state.tx.subscribe(),
            sequence: state.sequence,
        }
    }

    /// Assign the next sequence to the delta and broadcast it. Returns
    /// the assigned sequence. A send with no subscribers is not an
    /// error; the delta simply ages out.
    pub async fn publish(
        &self,
        brigade_id: &str,
        callout_id: &str,
        mut delta: AttendanceDelta,
    ) -> u64 {
        let mut channels = self.channels.write().await;
        let state = channels
            .entry((brigade_id.to_string(), callout_id.to_string()))
            .or_insert_with(|| ChannelState {
                tx: broadcast::channel(self.capacity).0,
                sequence: 0,
            });
        state.sequence += 1;
        delta.sequence = state.sequence;
        let sequence = state.sequence;
        let _ = state.tx.send(LiveEvent::Delta(delta));
        sequence
    }

    /// Broadcast the terminal event for a locked callout and drop the
    /// channel. Subscribers end their streams on receipt.
    pub async fn publish_locked(&self, brigade_id: &str, callout_id: &str) {
        let mut channels = self.channels.write().await;
        if let Some(state) =
            channels.remove(&(brigade_id.to_string(), callout_id.to_string()))
        {
            let _ = state.tx.send(LiveEvent::Locked {
                callout_id: callout_id.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn delta(member: &str) -> AttendanceDelta {
        AttendanceDelta {
            callout_id: "c1".to_string(),
            member_id: member.to_string(),
            truck_id: None,
            position_id: None,
            status: "responding".to_string(),
            op: DeltaOp::Added,
            sequence: 0,
        }
    }

    #[tokio::test]
    async fn sequences_are_monotonic_and_gap_free() {
        let channels = LiveChannels::new(16);
        let mut sub = channels.subscribe("b1", "c1").await;
        assert_eq!(sub.sequence, 0);

        for member in ["m1", "m2", "m3"] {
            channels.publish("b1", "c1", delta(member)).await;
        }
        for expected in 1..=3 {
            match sub.rx.recv().await.unwrap() {
                LiveEvent::Delta(d) => assert_eq!(d.sequence, expected),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn late_subscriber_watermark_covers_prior_deltas() {
        let channels = LiveChannels::new(16);
        channels.publish("b1", "c1", delta("m1")).await;
        channels.publish("b1", "c1", delta("m2")).await;

        let mut sub = channels.subscribe("b1", "c1").await;
        assert_eq!(sub.sequence, 2);

        let seq = channels.publish("b1", "c1", delta("m3")).await;
        assert_eq!(seq, 3);
        match sub.rx.recv().await.unwrap() {
            LiveEvent::Delta(d) => {
                assert_eq!(d.sequence, 3);
                assert!(d.sequence > sub.sequence);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sequence_survives_subscriber_churn() {
        let channels = LiveChannels::new(16);
        let sub = channels.subscribe("b1", "c1").await;
        drop(sub);
        channels.publish("b1", "c1", delta("m1")).await;

        let sub = channels.subscribe("b1", "c1").await;
        assert_eq!(sub.sequence, 1);
        let seq = channels.publish("b1", "c1", delta("m2")).await;
        assert_eq!(seq, 2);
    }

    #[tokio::test]
    async fn callouts_do_not_share_channels() {
        let channels = LiveChannels::new(16);
        let mut other = channels.subscribe("b1", "c2").await;
        channels.publish("b1", "c1", delta("m1")).await;
        assert!(matches!(other.rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn locking_broadcasts_terminal_event_and_drops_channel() {
        let channels = LiveChannels::new(16);
        let mut sub = channels.subscribe("b1", "c1").await;
        channels.publish("b1", "c1", delta("m1")).await;
        channels.publish_locked("b1", "c1").await;

        let _ = sub.rx.recv().await.unwrap();
        match sub.rx.recv().await.unwrap() {
            LiveEvent::Locked { callout_id } => assert_eq!(callout_id, "c1"),
            other => panic!("unexpected event: {other:?}"),
        }

        // channel entry is gone; a new subscription starts fresh
        let fresh = channels.subscribe("b1", "c1").await;
        assert_eq!(fresh.sequence, 0);
    }
}
