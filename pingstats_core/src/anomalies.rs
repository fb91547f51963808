// Per-reply events worth listing in a report: slow replies, gaps in the
// sequence and replies that arrived out of order.

use crate::probe::ProbeReply;
use serde::Serialize;

/// icmp_seq is a 16 bit field, ping prints it modulo 65536.
const SEQ_MODULUS: u64 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStep {
    Next,
    /// `n` sequence numbers are missing between the two replies.
    Gap(u64),
    /// The counter wrapped past 65535, `n` numbers are missing across the wrap.
    Wrapped(u64),
    /// Duplicate or reordered reply.
    Backwards,
}

impl SequenceStep {
    pub fn missing(&self) -> u64 {
        match self {
            SequenceStep::Gap(n) | SequenceStep::Wrapped(n) => *n,
            SequenceStep::Next | SequenceStep::Backwards => 0,
        }
    }
}

pub fn classify_sequence(previous: u32, seq: u32) -> SequenceStep {
    let (previous, seq) = (previous as u64, seq as u64);
    if seq == previous + 1 {
        SequenceStep::Next
    } else if seq > previous {
        SequenceStep::Gap(seq - previous - 1)
    } else if previous - seq > SEQ_MODULUS / 2 && previous < SEQ_MODULUS {
        match SEQ_MODULUS - previous - 1 + seq {
            0 => SequenceStep::Next,
            n => SequenceStep::Wrapped(n),
        }
    } else {
        SequenceStep::Backwards
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnomalyType {
    HighLatency {
        reply: ProbeReply,
    },
    SkippedRequests {
        start: ProbeReply,
        end: ProbeReply,
        skipped: u64,
    },
    OutOfOrder {
        previous: ProbeReply,
        reply: ProbeReply,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyEvent {
    pub anomaly_type: AnomalyType,
    pub description: String,
}

impl AnomalyEvent {
    pub fn high_latency(reply: &ProbeReply, threshold_ms: f64) -> Self {
        AnomalyEvent {
            description: format!(
                "seq={} RTT {:.3} ms above {} ms",
                reply.seq, reply.rtt_ms, threshold_ms
            ),
            anomaly_type: AnomalyType::HighLatency { reply: reply.clone() },
        }
    }

    pub fn skipped_requests(start: &ProbeReply, end: &ProbeReply, skipped: u64) -> Self {
        AnomalyEvent {
            description: format!(
                "{} request(s) missing between seq={} and seq={}",
                skipped, start.seq, end.seq
            ),
            anomaly_type: AnomalyType::SkippedRequests {
                start: start.clone(),
                end: end.clone(),
                skipped,
            },
        }
    }

    pub fn out_of_order(previous: &ProbeReply, reply: &ProbeReply) -> Self {
        AnomalyEvent {
            description: format!("seq={} arrived after seq={}", reply.seq, previous.seq),
            anomaly_type: AnomalyType::OutOfOrder {
                previous: previous.clone(),
                reply: reply.clone(),
            },
        }
    }
}

/// Streaming detector fed one reply at a time, in log order.
///
/// The sequence cursor only moves forward: a reply that arrives late is
/// reported as out of order but doesn't open a gap for the replies after it.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    threshold_ms: f64,
    last_in_order: Option<ProbeReply>,
}

impl AnomalyDetector {
    pub fn new(threshold_ms: f64) -> Self {
        AnomalyDetector {
            threshold_ms,
            last_in_order: None,
        }
    }

    pub fn observe(&mut self, reply: &ProbeReply) -> Vec<AnomalyEvent> {
        let mut events = Vec::new();
        if reply.rtt_ms > self.threshold_ms {
            events.push(AnomalyEvent::high_latency(reply, self.threshold_ms));
        }

        let step = self
            .last_in_order
            .as_ref()
            .map_or(SequenceStep::Next, |prev| classify_sequence(prev.seq, reply.seq));
        match step {
            SequenceStep::Next => {}
            SequenceStep::Gap(_) | SequenceStep::Wrapped(_) => {
                if let Some(prev) = &self.last_in_order {
                    events.push(AnomalyEvent::skipped_requests(prev, reply, step.missing()));
                }
            }
            SequenceStep::Backwards => {
                if let Some(prev) = &self.last_in_order {
                    events.push(AnomalyEvent::out_of_order(prev, reply));
                }
                return events;
            }
        }

        self.last_in_order = Some(reply.clone());
        events
    }
}

/// Scans replies in log order. The first reply never opens a gap.
pub fn detect_anomalies(replies: &[ProbeReply], threshold_ms: f64) -> Vec<AnomalyEvent> {
    let mut detector = AnomalyDetector::new(threshold_ms);
    replies.iter().flat_map(|reply| detector.observe(reply)).collect()
}
