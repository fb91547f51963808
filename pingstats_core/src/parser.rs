// Line ingestion: finds the PING title, collects reply lines and the
// closing statistics line printed by ping itself.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::probe::ProbeReply;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

lazy_static! {
    // PING example.com (93.184.216.34) 56(84) bytes of data.
    // PING example.com (93.184.216.34): 56 data bytes
    // PING google.com(fra24s06-in-x0e.1e100.net (2a00:1450:4001:82b::200e)) 56 data bytes
    static ref TITLE_LINE: Regex =
        Regex::new(r"^PING (?P<target>.+?)\s?\((?P<address>[\dA-Fa-f.:]+)\)\)?:? \d+")
            .expect("title pattern is valid");

    // 5 packets transmitted, 4 received, 20% packet loss, time 4005ms
    static ref TRAILER_LINE: Regex =
        Regex::new(r"^(?P<transmitted>\d+) packets transmitted, (?P<received>\d+) (?:packets )?received")
            .expect("trailer pattern is valid");
}

/// Counts ping reported about its own run, when the log ends with its summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PingTrailer {
    pub transmitted: u64,
    pub received: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    /// `Statistics of <PING title line>`, unless the title was skipped.
    pub title: Option<String>,
    pub replies: Vec<ProbeReply>,
    pub trailer: Option<PingTrailer>,
    pub lines_seen: u64,
    pub lines_skipped: u64,
}

#[derive(Debug)]
pub struct LogParser {
    awaiting_title: bool,
    log: ParsedLog,
}

impl LogParser {
    pub fn new(config: &AnalysisConfig) -> Self {
        LogParser {
            awaiting_title: !config.skip_title,
            log: ParsedLog::default(),
        }
    }

    pub fn push_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        self.log.lines_seen += 1;

        if self.awaiting_title {
            if TITLE_LINE.is_match(line) {
                tracing::debug!(line = self.log.lines_seen, "found PING title");
                self.log.title = Some(format!("Statistics of {line}"));
                self.awaiting_title = false;
            } else {
                self.log.lines_skipped += 1;
            }
            return;
        }

        if let Some(reply) = ProbeReply::parse(line) {
            self.log.replies.push(reply);
        } else if let Some(trailer) = parse_trailer(line) {
            self.log.trailer = Some(trailer);
        } else {
            tracing::trace!(line = self.log.lines_seen, text = line, "not a reply line");
            self.log.lines_skipped += 1;
        }
    }

    pub fn finish(self) -> Result<ParsedLog> {
        if self.awaiting_title {
            return Err(AnalysisError::MissingTitle);
        }
        tracing::debug!(
            lines = self.log.lines_seen,
            replies = self.log.replies.len(),
            skipped = self.log.lines_skipped,
            "finished parsing ping log"
        );
        Ok(self.log)
    }
}

fn parse_trailer(line: &str) -> Option<PingTrailer> {
    let caps = TRAILER_LINE.captures(line.trim())?;
    Some(PingTrailer {
        transmitted: caps["transmitted"].parse().ok()?,
        received: caps["received"].parse().ok()?,
    })
}

pub fn parse_str(text: &str, config: &AnalysisConfig) -> Result<ParsedLog> {
    let mut parser = LogParser::new(config);
    for line in text.lines() {
        parser.push_line(line);
    }
    parser.finish()
}

pub async fn read_log(path: impl AsRef<Path>, config: &AnalysisConfig) -> Result<ParsedLog> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .map_err(|e| AnalysisError::io(path, e))?;
    parse_reader(BufReader::new(file), path, config).await
}

pub async fn read_stdin(config: &AnalysisConfig) -> Result<ParsedLog> {
    parse_reader(BufReader::new(tokio::io::stdin()), Path::new("<stdin>"), config).await
}

// Lines are decoded lossily: a stray non-UTF-8 byte only costs its own line.
async fn parse_reader<R>(mut reader: R, source: &Path, config: &AnalysisConfig) -> Result<ParsedLog>
where
    R: AsyncBufRead + Unpin,
{
    let mut parser = LogParser::new(config);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| AnalysisError::io(source, e))?;
        if read == 0 {
            break;
        }
        parser.push_line(&String::from_utf8_lossy(&buf));
    }
    parser.finish()
}
