// Logic for calculating metrics (loss, latency, jitter) over parsed replies
use crate::anomalies::{AnomalyDetector, AnomalyEvent, AnomalyType};
use crate::config::AnalysisConfig;
use crate::probe::ProbeReply;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LatencyMetrics {
    pub replies: u64,
    pub total_rtt_ms: f64,
    pub sum_sq_rtt_ms: f64,
    pub min_rtt_ms: Option<f64>,
    pub max_rtt_ms: Option<f64>,

    // Sum of absolute differences between successive RTTs
    pub jitter_sum_ms: f64,
    pub jitter_count: u64,

    /// Expected sequence numbers without a reply line.
    pub lost: u64,
    pub out_of_order_count: u64,

    pub anomalies: Vec<AnomalyEvent>,

    #[serde(skip)]
    rtt_samples: Vec<f64>,
    #[serde(skip)]
    last_rtt_ms: Option<f64>,
    #[serde(skip)]
    detector: AnomalyDetector,
}

impl Default for LatencyMetrics {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl LatencyMetrics {
    pub fn new(config: &AnalysisConfig) -> Self {
        LatencyMetrics {
            replies: 0,
            total_rtt_ms: 0.0,
            sum_sq_rtt_ms: 0.0,
            min_rtt_ms: None,
            max_rtt_ms: None,
            jitter_sum_ms: 0.0,
            jitter_count: 0,
            lost: 0,
            out_of_order_count: 0,
            anomalies: Vec::new(),
            rtt_samples: Vec::new(),
            last_rtt_ms: None,
            detector: AnomalyDetector::new(config.threshold_ms),
        }
    }

    pub fn from_replies<'a>(
        config: &AnalysisConfig,
        replies: impl IntoIterator<Item = &'a ProbeReply>,
    ) -> Self {
        let mut metrics = Self::new(config);
        for reply in replies {
            metrics.record_reply(reply);
        }
        metrics
    }

    pub fn record_reply(&mut self, reply: &ProbeReply) {
        let rtt = reply.rtt_ms;
        self.replies += 1;
        self.total_rtt_ms += rtt;
        self.sum_sq_rtt_ms += rtt * rtt;
        self.rtt_samples.push(rtt);

        self.min_rtt_ms = Some(self.min_rtt_ms.map_or(rtt, |min| min.min(rtt)));
        self.max_rtt_ms = Some(self.max_rtt_ms.map_or(rtt, |max| max.max(rtt)));

        if let Some(last_rtt) = self.last_rtt_ms {
            self.record_jitter_value((rtt - last_rtt).abs());
        }
        self.last_rtt_ms = Some(rtt);

        for event in self.detector.observe(reply) {
            match &event.anomaly_type {
                AnomalyType::SkippedRequests { skipped, .. } => self.lost += skipped,
                AnomalyType::OutOfOrder { .. } => {
                    tracing::warn!(seq = reply.seq, "{}", event.description);
                    self.out_of_order_count += 1;
                }
                AnomalyType::HighLatency { .. } => {}
            }
            self.anomalies.push(event);
        }
    }

    pub fn record_jitter_value(&mut self, jitter_sample_ms: f64) {
        self.jitter_sum_ms += jitter_sample_ms;
        self.jitter_count += 1;
    }

    pub fn average_rtt_ms(&self) -> Option<f64> {
        if self.replies == 0 {
            None
        } else {
            Some(self.total_rtt_ms / self.replies as f64)
        }
    }

    pub fn median_rtt_ms(&self) -> Option<f64> {
        median(&self.rtt_samples)
    }

    /// Population standard deviation.
    pub fn stddev_rtt_ms(&self) -> Option<f64> {
        let mean = self.average_rtt_ms()?;
        let variance = self.sum_sq_rtt_ms / self.replies as f64 - mean * mean;
        // float error can push a zero variance slightly negative
        Some(variance.max(0.0).sqrt())
    }

    pub fn average_jitter_ms(&self) -> Option<f64> {
        if self.jitter_count == 0 {
            None
        } else {
            Some(self.jitter_sum_ms / self.jitter_count as f64)
        }
    }

    pub fn packet_loss_percentage(&self) -> f64 {
        let expected = self.replies + self.lost;
        if expected == 0 {
            0.0
        } else {
            (self.lost as f64 / expected as f64) * 100.0
        }
    }

    pub fn high_latency_replies(&self) -> impl Iterator<Item = &ProbeReply> {
        self.anomalies.iter().filter_map(|event| match &event.anomaly_type {
            AnomalyType::HighLatency { reply } => Some(reply),
            _ => None,
        })
    }

    /// `(start, end, skipped)` for every gap, in log order.
    pub fn skipped_chunks(&self) -> impl Iterator<Item = (&ProbeReply, &ProbeReply, u64)> {
        self.anomalies.iter().filter_map(|event| match &event.anomaly_type {
            AnomalyType::SkippedRequests { start, end, skipped } => Some((start, end, *skipped)),
            _ => None,
        })
    }
}

/// Middle value, or the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
