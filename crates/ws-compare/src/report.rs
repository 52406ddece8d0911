//! Verification reporting — aggregates scan results, parse failures and
//! scene diffs into a final pass/fail verdict.

use serde::{Deserialize, Serialize};

use crate::diff::SceneMismatch;
use crate::scan::ErrorLine;

/// Scan summary for one process log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSummary {
    /// Log file label (e.g. "server.log").
    pub log: String,
    pub error_lines: Vec<ErrorLine>,
    pub dump_count: usize,
    /// Exit code of the process that wrote this log, when known.
    /// None when the run phase was skipped or the process was signaled.
    pub exit_code: Option<i32>,
}

/// Comparison outcome for one (synchronization point, peer) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairEntry {
    /// 1-based dump index, i.e. the synchronization point.
    pub sync_point: usize,
    /// Peer log label the authority was compared against.
    pub peer: String,
    pub mismatches: Vec<SceneMismatch>,
}

/// A dump whose text violated the grammar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseFailure {
    pub log: String,
    pub sync_point: usize,
    pub message: String,
}

/// A peer that reached a different number of synchronization points
/// than the authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpCountMismatch {
    pub peer: String,
    pub expected: usize,
    pub found: usize,
}

/// Aggregate result of one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Descriptive label for this run (e.g. "worldsync systemtest").
    pub label: String,
    pub logs: Vec<LogSummary>,
    pub pairs: Vec<PairEntry>,
    pub parse_failures: Vec<ParseFailure>,
    pub dump_count_mismatches: Vec<DumpCountMismatch>,
}

impl VerificationReport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            logs: Vec::new(),
            pairs: Vec::new(),
            parse_failures: Vec::new(),
            dump_count_mismatches: Vec::new(),
        }
    }

    pub fn record_log(&mut self, summary: LogSummary) {
        self.logs.push(summary);
    }

    pub fn record_pair(&mut self, sync_point: usize, peer: impl Into<String>, mismatches: Vec<SceneMismatch>) {
        self.pairs.push(PairEntry {
            sync_point,
            peer: peer.into(),
            mismatches,
        });
    }

    pub fn record_parse_failure(
        &mut self,
        log: impl Into<String>,
        sync_point: usize,
        message: impl Into<String>,
    ) {
        self.parse_failures.push(ParseFailure {
            log: log.into(),
            sync_point,
            message: message.into(),
        });
    }

    pub fn record_dump_count_mismatch(&mut self, peer: impl Into<String>, expected: usize, found: usize) {
        self.dump_count_mismatches.push(DumpCountMismatch {
            peer: peer.into(),
            expected,
            found,
        });
    }

    /// Number of flagged error lines across all logs.
    pub fn flagged_errors(&self) -> usize {
        self.logs.iter().map(|l| l.error_lines.len()).sum()
    }

    /// Number of compared dump pairs that diverged.
    pub fn mismatched_pairs(&self) -> usize {
        self.pairs.iter().filter(|p| !p.mismatches.is_empty()).count()
    }

    /// Final tally: flagged errors + malformed dumps + mismatched pairs
    /// + peers with a diverging dump count.
    pub fn error_total(&self) -> usize {
        self.flagged_errors()
            + self.parse_failures.len()
            + self.mismatched_pairs()
            + self.dump_count_mismatches.len()
    }

    pub fn passed(&self) -> bool {
        self.error_total() == 0
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n============================================================");
        println!("Verification Report: {}", self.label);
        println!(
            "Result: {}",
            if self.passed() { "PASS" } else { "FAIL" }
        );

        for log in &self.logs {
            println!(
                "Found {} errors in {} ({} scene dumps{})",
                log.error_lines.len(),
                log.log,
                log.dump_count,
                match log.exit_code {
                    Some(0) | None => String::new(),
                    Some(code) => format!(", exit code {code}"),
                }
            );
            for line in &log.error_lines {
                println!("    Error found in line {}: {}", line.number, line.text);
            }
        }

        for failure in &self.parse_failures {
            println!(
                "Malformed scene dump {} in {}: {}",
                failure.sync_point, failure.log, failure.message
            );
        }

        for count in &self.dump_count_mismatches {
            println!(
                "Dump count mismatch: {} has {} scene dumps, authority has {}",
                count.peer, count.found, count.expected
            );
        }

        let diverged: Vec<&PairEntry> =
            self.pairs.iter().filter(|p| !p.mismatches.is_empty()).collect();
        let show = diverged.len().min(10);
        for entry in &diverged[..show] {
            println!(
                "\n##### Scene dump {} vs {} diverged ({} mismatches):",
                entry.sync_point,
                entry.peer,
                entry.mismatches.len()
            );
            for m in &entry.mismatches {
                println!("{m}\n");
            }
        }
        if diverged.len() > show {
            println!("... and {} more diverged dump pairs", diverged.len() - show);
        }

        println!("\nTest finished with {} errors", self.error_total());
        println!("============================================================\n");
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}
