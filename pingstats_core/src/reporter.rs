// Data aggregation and rendering of analysis reports

use crate::config::{AnalysisConfig, ReportFormat};
use crate::error::Result;
use crate::metrics::{median, LatencyMetrics};
use crate::parser::{ParsedLog, PingTrailer};
use crate::probe::ProbeReply;
use askama::Template;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdStats {
    pub count: u64,
    pub percent: f64,
    pub average_ms: Option<f64>,
    pub median_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkipStats {
    pub chunks: u64,
    pub average: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedChunk {
    pub start: ProbeReply,
    pub end: ProbeReply,
    pub skipped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub source: String,
    pub title: Option<String>,
    pub generated_at: String,
    pub threshold_ms: f64,

    pub total_records: u64,
    pub min_rtt_ms: f64,
    pub average_rtt_ms: f64,
    pub median_rtt_ms: f64,
    pub max_rtt_ms: f64,
    pub stddev_rtt_ms: f64,
    pub jitter_ms: Option<f64>,

    pub lost_requests: u64,
    pub packet_loss_percent: f64,
    pub out_of_order: u64,
    pub ping_reported: Option<PingTrailer>,

    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,

    pub above_threshold: ThresholdStats,
    pub skipped: SkipStats,
    pub high_latency: Vec<ProbeReply>,
    pub skipped_chunks: Vec<SkippedChunk>,

    // (seq, rtt) for the HTML chart
    #[serde(skip)]
    rtt_series: Vec<(u32, f64)>,
    #[serde(skip)]
    utc_timestamps: bool,
}

/// Builds the summary for a parsed log. `None` when the log holds no reply records.
pub fn generate_summary(
    source: impl Into<String>,
    log: &ParsedLog,
    config: &AnalysisConfig,
) -> Option<AnalysisSummary> {
    let metrics = LatencyMetrics::from_replies(config, &log.replies);
    let total_records = metrics.replies;

    let high_latency: Vec<ProbeReply> = metrics.high_latency_replies().cloned().collect();
    let high_rtts: Vec<f64> = high_latency.iter().map(|r| r.rtt_ms).collect();
    let above_threshold = ThresholdStats {
        count: high_latency.len() as u64,
        percent: if total_records == 0 {
            0.0
        } else {
            high_latency.len() as f64 * 100.0 / total_records as f64
        },
        average_ms: mean(&high_rtts),
        median_ms: median(&high_rtts),
    };

    let skipped_chunks: Vec<SkippedChunk> = metrics
        .skipped_chunks()
        .map(|(start, end, skipped)| SkippedChunk {
            start: start.clone(),
            end: end.clone(),
            skipped,
        })
        .collect();
    let skip_counts: Vec<f64> = skipped_chunks.iter().map(|c| c.skipped as f64).collect();
    let skipped = SkipStats {
        chunks: skipped_chunks.len() as u64,
        average: mean(&skip_counts),
        median: median(&skip_counts),
        max: skipped_chunks.iter().map(|c| c.skipped).max(),
    };

    let summary = AnalysisSummary {
        source: source.into(),
        title: log.title.clone(),
        generated_at: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
        threshold_ms: config.threshold_ms,
        total_records,
        min_rtt_ms: metrics.min_rtt_ms?,
        average_rtt_ms: metrics.average_rtt_ms()?,
        median_rtt_ms: metrics.median_rtt_ms()?,
        max_rtt_ms: metrics.max_rtt_ms?,
        stddev_rtt_ms: metrics.stddev_rtt_ms()?,
        jitter_ms: metrics.average_jitter_ms(),
        lost_requests: metrics.lost,
        packet_loss_percent: metrics.packet_loss_percentage(),
        out_of_order: metrics.out_of_order_count,
        ping_reported: log.trailer,
        first_timestamp: log.replies.iter().find_map(|r| r.timestamp),
        last_timestamp: log.replies.iter().rev().find_map(|r| r.timestamp),
        above_threshold,
        skipped,
        high_latency,
        skipped_chunks,
        rtt_series: log.replies.iter().map(|r| (r.seq, r.rtt_ms)).collect(),
        utc_timestamps: config.utc_timestamps,
    };

    tracing::debug!(
        records = summary.total_records,
        average_ms = summary.average_rtt_ms,
        lost = summary.lost_requests,
        above_threshold = summary.above_threshold.count,
        "generated summary"
    );
    Some(summary)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// `x.xxx` with three decimals, the precision every average is reported with.
fn ms(value: f64) -> String {
    format!("{value:.3}")
}

pub fn format_timestamp(timestamp: &DateTime<Utc>, utc: bool) -> String {
    if utc {
        timestamp.format(TIMESTAMP_FORMAT).to_string()
    } else {
        timestamp.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
    }
}

impl AnalysisSummary {
    fn timestamp(&self, reply: &ProbeReply) -> Option<String> {
        reply
            .timestamp
            .as_ref()
            .map(|ts| format_timestamp(ts, self.utc_timestamps))
    }

    fn reply_line(&self, reply: &ProbeReply) -> String {
        format!("ping {}: seq={} time={}", reply.peer(), reply.seq, reply.rtt_ms)
    }

    fn listing_line(&self, reply: &ProbeReply) -> String {
        match self.timestamp(reply) {
            Some(ts) => format!("{ts}: {}", self.reply_line(reply)),
            None => self.reply_line(reply),
        }
    }

    fn chunk_edge(&self, label: &str, reply: &ProbeReply) -> String {
        match self.timestamp(reply) {
            Some(ts) => format!("{label} at {ts}: {}", self.reply_line(reply)),
            None => format!("{label}: {}", self.reply_line(reply)),
        }
    }

    /// Label / value pairs shared by the text and HTML reports.
    fn overview_rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("Total records".to_string(), self.total_records.to_string()),
            ("Average ping".to_string(), ms(self.average_rtt_ms)),
            ("Median ping".to_string(), ms(self.median_rtt_ms)),
            ("Maximum ping".to_string(), ms(self.max_rtt_ms)),
            ("Minimum ping".to_string(), ms(self.min_rtt_ms)),
            ("Standard deviation".to_string(), ms(self.stddev_rtt_ms)),
            // a single reply has no consecutive pair to measure
            ("Jitter".to_string(), self.jitter_ms.map_or_else(|| "n/a".to_string(), ms)),
        ];
        rows.push((
            "Lost requests".to_string(),
            format!("{} ({:.2}%)", self.lost_requests, self.packet_loss_percent),
        ));
        if self.out_of_order > 0 {
            rows.push(("Out of order replies".to_string(), self.out_of_order.to_string()));
        }
        if let Some(trailer) = self.ping_reported {
            rows.push((
                "Reported by ping".to_string(),
                format!("{} transmitted, {} received", trailer.transmitted, trailer.received),
            ));
        }
        rows
    }

    fn threshold_rows(&self) -> Vec<(String, String)> {
        let t = self.threshold_ms;
        let stats = &self.above_threshold;
        let mut rows = vec![(format!("Total times above {t} ms"), stats.count.to_string())];
        if stats.count > 0 {
            rows.push((
                format!("Percentage of requests above {t} ms"),
                format!("{:.2}", stats.percent),
            ));
            if let Some(average) = stats.average_ms {
                rows.push((format!("Average ping above {t} ms"), ms(average)));
            }
            if let Some(median) = stats.median_ms {
                rows.push((format!("Median ping above {t} ms"), ms(median)));
            }
        }
        rows
    }

    fn skip_rows(&self) -> Vec<(String, String)> {
        let stats = &self.skipped;
        let mut rows = vec![("Skipped requests chunks count".to_string(), stats.chunks.to_string())];
        if let (Some(average), Some(median), Some(max)) = (stats.average, stats.median, stats.max) {
            rows.push(("Average skipped requests in one chunk".to_string(), ms(average)));
            rows.push(("Median skipped requests in one chunk".to_string(), median.to_string()));
            rows.push(("Maximum skipped requests in one chunk".to_string(), max.to_string()));
        }
        rows
    }
}

pub fn render_text(summary: &AnalysisSummary) -> String {
    let mut out: Vec<String> = Vec::new();
    if let Some(title) = &summary.title {
        out.push(title.clone());
        out.push(String::new());
    }

    for rows in [summary.overview_rows(), summary.threshold_rows(), summary.skip_rows()] {
        out.extend(rows.into_iter().map(|(label, value)| format!("{label}: {value}")));
        out.push(String::new());
    }

    if !summary.high_latency.is_empty() {
        out.push(format!("__Times above {} ms:__", summary.threshold_ms));
        out.push(String::new());
        out.extend(summary.high_latency.iter().map(|r| summary.listing_line(r)));
        out.push(String::new());
    }

    if !summary.skipped_chunks.is_empty() {
        out.push("__Skipped requests:__".to_string());
        out.push(String::new());
        for chunk in &summary.skipped_chunks {
            out.push(summary.chunk_edge("Chunk begin", &chunk.start));
            out.push(format!("Skipped: {}", chunk.skipped));
            out.push(summary.chunk_edge("Chunk end", &chunk.end));
            out.push(String::new());
        }
    }

    out.join("\n")
}

pub fn render_json(summary: &AnalysisSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

struct Row {
    label: String,
    value: String,
}

fn rows(pairs: Vec<(String, String)>) -> Vec<Row> {
    pairs
        .into_iter()
        .map(|(label, value)| Row { label, value })
        .collect()
}

struct ChunkRow {
    begin: String,
    skipped: u64,
    end: String,
}

#[derive(Template)]
#[template(path = "report.html")]
struct HtmlReport<'a> {
    summary: &'a AnalysisSummary,
    title: String,
    overview: Vec<Row>,
    threshold: Vec<Row>,
    skips: Vec<Row>,
    high_latency: Vec<String>,
    chunks: Vec<ChunkRow>,
    rtt_chart_data_json: String,
}

pub fn render_html(summary: &AnalysisSummary) -> Result<String> {
    // Chart.js wants [{seq, rtt}, ...]
    let chart_points: Vec<_> = summary
        .rtt_series
        .iter()
        .map(|(seq, rtt)| serde_json::json!({ "seq": seq, "rtt": rtt }))
        .collect();

    let report = HtmlReport {
        summary,
        title: summary.title.clone().unwrap_or_default(),
        overview: rows(summary.overview_rows()),
        threshold: rows(summary.threshold_rows()),
        skips: rows(summary.skip_rows()),
        high_latency: summary
            .high_latency
            .iter()
            .map(|r| summary.listing_line(r))
            .collect(),
        chunks: summary
            .skipped_chunks
            .iter()
            .map(|c| ChunkRow {
                begin: summary.chunk_edge("Chunk begin", &c.start),
                skipped: c.skipped,
                end: summary.chunk_edge("Chunk end", &c.end),
            })
            .collect(),
        rtt_chart_data_json: serde_json::to_string(&chart_points)?,
    };
    Ok(report.render()?)
}

pub fn render(summary: &AnalysisSummary, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(summary)),
        ReportFormat::Json => render_json(summary),
        ReportFormat::Html => render_html(summary),
    }
}

/// `<dir>/<stem>_analyzed.<ext>` next to the input log.
pub fn default_output_path(input: &Path, format: ReportFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ping".to_string());
    let file_name = format!("{stem}_analyzed.{}", format.extension());
    match input.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
