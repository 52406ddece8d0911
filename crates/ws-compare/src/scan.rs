//! Log scanning: flagged error lines and embedded scene dump blocks.

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal prefix that flags a log line as an error record.
pub const ERROR_MARKER: &str = "ERROR";
/// Literal marker opening a scene dump block.
pub const DUMP_BEGIN: &str = "Scene dump begin: ";
/// Literal marker closing a scene dump block.
pub const DUMP_END: &str = "Scene dump end;";

/// One error-flagged line, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLine {
    pub number: usize,
    pub text: String,
}

/// Everything extracted from one process log.
///
/// `dumps` holds the raw payload between the begin/end markers, in the
/// order the process emitted them. Both collections may be empty.
#[derive(Debug, Clone, Default)]
pub struct LogScan {
    pub dumps: Vec<String>,
    pub errors: Vec<ErrorLine>,
}

impl LogScan {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid dump pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("failed to read log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Scanner for process logs.
///
/// Stateless across calls; the struct only caches the compiled dump
/// pattern so one scanner can be reused over every log of a run.
pub struct LogScanner {
    dump_re: Regex,
}

impl LogScanner {
    pub fn new() -> Result<Self, ScanError> {
        // (?s) lets the payload span lines; the lazy quantifier pairs
        // each begin marker with the nearest following end marker so a
        // dump can never swallow the next begin/end pair.
        let pattern = format!(
            "(?s){}(.*?){}",
            regex::escape(DUMP_BEGIN),
            regex::escape(DUMP_END)
        );
        Ok(Self {
            dump_re: Regex::new(&pattern)?,
        })
    }

    /// Scan raw log text. Pure over its input.
    pub fn scan_text(&self, text: &str) -> LogScan {
        let mut scan = LogScan::default();

        for (index, line) in text.lines().enumerate() {
            if line.starts_with(ERROR_MARKER) {
                scan.errors.push(ErrorLine {
                    number: index + 1,
                    text: line.to_string(),
                });
            }
        }

        for caps in self.dump_re.captures_iter(text) {
            if let Some(payload) = caps.get(1) {
                scan.dumps.push(payload.as_str().to_string());
            }
        }

        scan
    }

    /// Read a log file and scan it.
    pub fn scan_log(&self, path: &Path) -> Result<LogScan, ScanError> {
        let text = fs::read_to_string(path).map_err(|source| ScanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(self.scan_text(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> LogScanner {
        LogScanner::new().unwrap()
    }

    #[test]
    fn test_error_lines_with_one_based_numbers() {
        let scan = scanner().scan_text("INFO x\nERROR y\nERROR z\nINFO w\n");
        assert_eq!(scan.error_count(), 2);
        assert_eq!(scan.errors[0].number, 2);
        assert_eq!(scan.errors[0].text, "ERROR y");
        assert_eq!(scan.errors[1].number, 3);
        assert_eq!(scan.errors[1].text, "ERROR z");
    }

    #[test]
    fn test_error_marker_must_start_the_line() {
        let scan = scanner().scan_text("saw an ERROR earlier\nERRORS: none\n");
        // "ERRORS:" still begins with the marker; mid-line mentions do not.
        assert_eq!(scan.error_count(), 1);
        assert_eq!(scan.errors[0].number, 2);
    }

    #[test]
    fn test_empty_log_yields_empty_collections() {
        let scan = scanner().scan_text("");
        assert!(scan.dumps.is_empty());
        assert!(scan.errors.is_empty());
    }

    #[test]
    fn test_multiline_dump_extraction() {
        let scan = scanner().scan_text(
            "INFO boot\nScene dump begin: \n--GameObject:\nName: A\nChildren: 0\nScene dump end;\nINFO done\n",
        );
        assert_eq!(scan.dumps.len(), 1);
        assert_eq!(scan.dumps[0], "\n--GameObject:\nName: A\nChildren: 0\n");
    }

    #[test]
    fn test_back_to_back_dumps_are_not_merged() {
        let scan = scanner().scan_text(
            "Scene dump begin: first\nScene dump end;\nnoise\nScene dump begin: second\nScene dump end;\n",
        );
        assert_eq!(scan.dumps.len(), 2);
        assert_eq!(scan.dumps[0], "first\n");
        assert_eq!(scan.dumps[1], "second\n");
        assert!(!scan.dumps[0].contains("second"));
    }

    #[test]
    fn test_dumps_kept_in_emission_order() {
        let scan = scanner().scan_text(
            "Scene dump begin: a\nScene dump end;\nScene dump begin: b\nScene dump end;\nScene dump begin: c\nScene dump end;\n",
        );
        let order: Vec<&str> = scan.dumps.iter().map(|d| d.trim()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_unterminated_dump_is_dropped() {
        let scan = scanner().scan_text("Scene dump begin: half\nno end marker here\n");
        assert!(scan.dumps.is_empty());
    }
}
