use pingstats_core::parser::{read_log, PingTrailer};
use pingstats_core::reporter::{default_output_path, render, render_text};
use pingstats_core::{analyze_file, AnalysisConfig, AnalysisError, ReportFormat};

use std::io::Write;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

// Helper to build a config for tests, overriding only what a test cares about.
fn config_with_threshold(threshold_ms: f64) -> AnalysisConfig {
    AnalysisConfig {
        threshold_ms,
        utc_timestamps: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_linux_log_summary() {
    let summary = analyze_file(fixture("linux.log"), &config_with_threshold(20.0))
        .await
        .unwrap()
        .expect("log has replies");

    assert_eq!(
        summary.title.as_deref(),
        Some("Statistics of PING example.com (93.184.216.34) 56(84) bytes of data.")
    );
    assert_eq!(summary.total_records, 7);
    assert_eq!(summary.min_rtt_ms, 11.2);
    assert_eq!(summary.max_rtt_ms, 60.0);
    assert_eq!(summary.median_rtt_ms, 12.1);
    assert!((summary.average_rtt_ms - 24.0).abs() < 1e-9);

    assert_eq!(summary.lost_requests, 3);
    assert!((summary.packet_loss_percent - 30.0).abs() < 1e-9);
    assert_eq!(summary.skipped.chunks, 2);
    assert_eq!(summary.skipped.max, Some(2));
    assert_eq!(summary.ping_reported, Some(PingTrailer { transmitted: 10, received: 7 }));

    assert_eq!(summary.above_threshold.count, 2);
    let high: Vec<u32> = summary.high_latency.iter().map(|r| r.seq).collect();
    assert_eq!(high, vec![3, 10]);
    assert_eq!(summary.high_latency[0].peer(), "93.184.216.34");
}

#[tokio::test]
async fn test_linux_log_text_report() {
    let summary = analyze_file(fixture("linux.log"), &config_with_threshold(20.0))
        .await
        .unwrap()
        .unwrap();
    let text = render_text(&summary);

    assert!(text.contains("Total records: 7\n"));
    assert!(text.contains("Lost requests: 3 (30.00%)\n"));
    assert!(text.contains("Reported by ping: 10 transmitted, 7 received\n"));
    assert!(text.contains("Percentage of requests above 20 ms: 28.57\n"));
    assert!(text.contains("__Times above 20 ms:__\n\nping 93.184.216.34: seq=3 time=48.9\n"));
    assert!(text.contains(
        "Chunk begin: ping 93.184.216.34: seq=3 time=48.9\nSkipped: 2\nChunk end: ping 93.184.216.34: seq=6 time=11.9\n"
    ));
}

#[tokio::test]
async fn test_timestamped_log() {
    let summary = analyze_file(fixture("timestamps.log"), &config_with_threshold(1.0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.total_records, 4);
    assert_eq!(summary.lost_requests, 2);

    let text = render_text(&summary);
    assert!(text.contains("2023-11-14 22:13:22.100000: ping 192.168.1.1: seq=3 time=3.05\n"));
    assert!(text.contains("Chunk begin at 2023-11-14 22:13:22.100000: ping 192.168.1.1: seq=3 time=3.05\n"));
    assert!(text.contains("Chunk end at 2023-11-14 22:13:25.100000: ping 192.168.1.1: seq=6 time=0.401\n"));
}

#[tokio::test]
async fn test_macos_log() {
    let summary = analyze_file(fixture("macos.log"), &config_with_threshold(100.0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.lost_requests, 1);
    assert_eq!(summary.above_threshold.count, 0);
    assert_eq!(summary.ping_reported, Some(PingTrailer { transmitted: 4, received: 3 }));
}

#[tokio::test]
async fn test_log_without_replies() {
    let summary = analyze_file(fixture("no_replies.log"), &AnalysisConfig::default())
        .await
        .unwrap();
    assert!(summary.is_none());
}

#[tokio::test]
async fn test_corrupted_log_needs_skip_title() {
    let err = analyze_file(fixture("corrupted.log"), &AnalysisConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::MissingTitle));

    let config = AnalysisConfig { skip_title: true, ..Default::default() };
    let summary = analyze_file(fixture("corrupted.log"), &config).await.unwrap().unwrap();
    assert!(summary.title.is_none());
    assert_eq!(summary.total_records, 2);
    assert!(!render_text(&summary).starts_with("Statistics of"));
}

#[tokio::test]
async fn test_invalid_threshold_is_rejected() {
    let config = AnalysisConfig { threshold_ms: -5.0, ..Default::default() };
    let err = analyze_file(fixture("linux.log"), &config).await.unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidThreshold(_)));
}

#[tokio::test]
async fn test_read_log_from_temp_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "PING ::1(::1) 56 data bytes").unwrap();
    for seq in 1..=100u32 {
        if seq % 10 == 0 {
            continue;
        }
        writeln!(file, "64 bytes from ::1: icmp_seq={seq} ttl=64 time=0.0{} ms", seq % 9).unwrap();
    }
    file.flush().unwrap();

    let log = read_log(file.path(), &AnalysisConfig::default()).await.unwrap();
    assert_eq!(log.replies.len(), 90);
    assert_eq!(log.title.as_deref(), Some("Statistics of PING ::1(::1) 56 data bytes"));

    let summary = analyze_file(file.path(), &AnalysisConfig::default())
        .await
        .unwrap()
        .unwrap();
    // seq 100 is the tail of the run, only 10..=90 open gaps
    assert_eq!(summary.lost_requests, 9);
    assert_eq!(summary.skipped.chunks, 9);
    assert_eq!(summary.above_threshold.count, 0);
}

#[tokio::test]
async fn test_log_with_invalid_utf8_line() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "PING 10.0.0.1 (10.0.0.1) 56(84) bytes of data.").unwrap();
    writeln!(file, "64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=0.4 ms").unwrap();
    file.write_all(b"garbage \xff\xfe line\n").unwrap();
    writeln!(file, "64 bytes from 10.0.0.1: icmp_seq=2 ttl=64 time=0.5 ms").unwrap();
    file.flush().unwrap();

    let summary = analyze_file(file.path(), &AnalysisConfig::default())
        .await
        .unwrap()
        .expect("both replies survive the bad line");
    assert_eq!(summary.total_records, 2);
    assert_eq!(summary.lost_requests, 0);
}

#[tokio::test]
async fn test_every_format_renders() {
    let config = config_with_threshold(20.0);
    let summary = analyze_file(fixture("linux.log"), &config).await.unwrap().unwrap();

    for format in [ReportFormat::Text, ReportFormat::Json, ReportFormat::Html] {
        let report = render(&summary, format).unwrap();
        assert!(!report.is_empty(), "{format} report is empty");
    }

    let json: serde_json::Value =
        serde_json::from_str(&render(&summary, ReportFormat::Json).unwrap()).unwrap();
    assert_eq!(json["ping_reported"]["transmitted"], 10);
    assert_eq!(json["skipped"]["chunks"], 2);
}

#[test]
fn test_default_output_path_next_to_log() {
    let path = default_output_path(&fixture("linux.log"), ReportFormat::Html);
    assert_eq!(path, fixture("linux_analyzed.html"));
}
