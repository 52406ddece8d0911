//! World sync consistency checker.
//!
//! Launches the authoritative server and its peer clients with stdout
//! redirected to per-process logs, waits for all of them to exit, then
//! scans the logs and verifies that every peer's scene dumps match the
//! server's at each synchronization point.

use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use clap::Parser;

use ws_compare::diff::{MatchStrategy, diff_forests_with};
use ws_compare::report::{LogSummary, VerificationReport};
use ws_compare::scan::{LogScan, LogScanner};
use ws_compare::scene::parse_dump;

/// Consistency test harness for the world sync server and its clients.
#[derive(Parser, Debug)]
#[command(name = "worldcheck")]
#[command(author, version, about = "Verify that peers agree with the authoritative scene", long_about = None)]
struct Args {
    /// Launch the server and client processes
    #[arg(long)]
    run: bool,

    /// Scan the logs and compare scene dumps
    #[arg(long)]
    test: bool,

    /// Authoritative server executable (launched with no arguments)
    #[arg(long, default_value = "./server")]
    server: PathBuf,

    /// Peer client executable (launched once per client, no arguments)
    #[arg(long, default_value = "./client")]
    client: PathBuf,

    /// Directory holding the per-process logs
    #[arg(long, default_value = "logs")]
    logs: PathBuf,

    /// Number of peer clients
    #[arg(long, default_value_t = 2)]
    clients: usize,

    /// Pair scene objects by UUID instead of by position in the dump
    #[arg(long)]
    match_by_uuid: bool,

    /// Also write the report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

/// Log file names, authority first.
fn log_names(clients: usize) -> Vec<String> {
    let mut names = vec!["server.log".to_string()];
    for i in 1..=clients {
        names.push(format!("client{i}.log"));
    }
    names
}

fn process_label(index: usize) -> String {
    if index == 0 {
        "Server".to_string()
    } else {
        format!("Client {index}")
    }
}

/// Launch the server and clients, redirect their stdout to the log
/// files, and block until every process exits.
///
/// Returns the exit codes in log order; a non-zero code is reported
/// later but never aborts the test phase.
fn run_phase(args: &Args) -> Result<Vec<Option<i32>>> {
    println!(">Executing run\n");

    fs::create_dir_all(&args.logs)
        .with_context(|| format!("creating log directory {}", args.logs.display()))?;

    let mut children: Vec<(String, Child)> = Vec::new();
    for (index, name) in log_names(args.clients).iter().enumerate() {
        let exe = if index == 0 { &args.server } else { &args.client };
        let log_path = args.logs.join(name);
        let log = File::create(&log_path)
            .with_context(|| format!("creating {}", log_path.display()))?;

        println!("  Starting {}", process_label(index));
        let child = Command::new(exe)
            .stdout(Stdio::from(log))
            .spawn()
            .with_context(|| format!("launching {}", exe.display()))?;
        children.push((name.clone(), child));
    }

    let mut exit_codes = Vec::new();
    for (name, mut child) in children {
        let status = child
            .wait()
            .with_context(|| format!("waiting for the process behind {name}"))?;
        exit_codes.push(status.code());
    }
    println!("  Test run completed");

    Ok(exit_codes)
}

/// Scan every log, then pair authority dump *i* with dump *i* of each
/// peer and diff the reconstructed forests.
fn test_phase(args: &Args, exit_codes: &[Option<i32>]) -> Result<VerificationReport> {
    println!(">Executing test\n");

    let mut report = VerificationReport::new("worldsync systemtest");
    let scanner = LogScanner::new()?;
    let names = log_names(args.clients);

    let mut scans: Vec<LogScan> = Vec::new();
    for (index, name) in names.iter().enumerate() {
        let path = args.logs.join(name);
        let scan = scanner
            .scan_log(&path)
            .with_context(|| format!("scanning {}", path.display()))?;
        report.record_log(LogSummary {
            log: name.clone(),
            error_lines: scan.errors.clone(),
            dump_count: scan.dumps.len(),
            exit_code: exit_codes.get(index).copied().flatten(),
        });
        scans.push(scan);
    }

    let (authority, peers) = scans.split_first().context("no logs scanned")?;
    let authority_name = &names[0];
    let strategy = if args.match_by_uuid {
        MatchStrategy::ByUuid
    } else {
        MatchStrategy::Positional
    };

    println!("Comparing {} scene dumps", authority.dumps.len());

    for (i, dump_text) in authority.dumps.iter().enumerate() {
        let sync_point = i + 1;
        let expected = match parse_dump(dump_text) {
            Ok(forest) => forest,
            Err(err) => {
                // Without the authority's forest there is nothing to
                // compare against at this synchronization point.
                report.record_parse_failure(authority_name.clone(), sync_point, err.to_string());
                continue;
            }
        };

        for (peer_index, peer) in peers.iter().enumerate() {
            let peer_name = &names[peer_index + 1];
            // A missing dump is surfaced as a dump count mismatch below.
            let Some(peer_text) = peer.dumps.get(i) else {
                continue;
            };
            match parse_dump(peer_text) {
                Ok(actual) => {
                    let mismatches = diff_forests_with(&expected, &actual, strategy);
                    report.record_pair(sync_point, peer_name.clone(), mismatches);
                }
                Err(err) => {
                    report.record_parse_failure(peer_name.clone(), sync_point, err.to_string());
                }
            }
        }
    }

    for (peer_index, peer) in peers.iter().enumerate() {
        if peer.dumps.len() != authority.dumps.len() {
            report.record_dump_count_mismatch(
                names[peer_index + 1].clone(),
                authority.dumps.len(),
                peer.dumps.len(),
            );
        }
    }

    Ok(report)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let exit_codes = if args.run {
        run_phase(&args)?
    } else {
        println!(">Skipping run");
        Vec::new()
    };

    if !args.test {
        println!(">Skipping test");
        return Ok(());
    }

    let report = test_phase(&args, &exit_codes)?;
    report.print_summary();

    if let Some(path) = &args.json {
        fs::write(path, report.to_json())
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}
