//! End-to-end verification properties: scan -> parse -> diff over
//! synthetic process logs, and round-trip guarantees for the dump
//! grammar.

use ws_compare::diff::{MatchStrategy, MismatchKind, diff_forests, diff_forests_with};
use ws_compare::scan::LogScanner;
use ws_compare::scene::{SceneNode, parse_dump, write_dump};

fn node(name: &str, uuid: &str, children: Vec<SceneNode>) -> SceneNode {
    SceneNode {
        name: name.to_string(),
        position: format!("({name}.x, {name}.y, {name}.z)"),
        rotation: "(0.0, 0.0, 0.0, 1.0)".to_string(),
        uuid: uuid.to_string(),
        children,
    }
}

/// A forest holding one chain of the requested depth plus a second
/// root, so both nesting and sibling order are exercised.
fn forest_of_depth(depth: usize) -> Vec<SceneNode> {
    let mut chain = node("leaf", "u-leaf", vec![]);
    for level in (0..depth).rev() {
        chain = node(&format!("n{level}"), &format!("u{level}"), vec![chain]);
    }
    vec![chain, node("extra", "u-extra", vec![])]
}

fn wrap_in_log(dumps: &[String]) -> String {
    let mut log = String::from("INFO process started\n");
    for dump in dumps {
        log.push_str("INFO reached sync point\n");
        log.push_str("Scene dump begin: \n");
        log.push_str(dump);
        log.push_str("Scene dump end;\n");
    }
    log.push_str("INFO process exiting\n");
    log
}

#[test]
fn round_trip_reconstruction_at_various_depths() {
    for depth in [0, 1, 3, 5] {
        let forest = forest_of_depth(depth);
        let parsed = parse_dump(&write_dump(&forest)).unwrap();
        assert_eq!(parsed, forest, "round trip failed at depth {depth}");
    }
}

#[test]
fn comparison_is_idempotent_on_identical_forests() {
    let forest = forest_of_depth(5);
    let copy = forest.clone();
    assert!(diff_forests(&forest, &copy).is_empty());
    assert!(diff_forests_with(&forest, &copy, MatchStrategy::ByUuid).is_empty());
}

#[test]
fn single_uuid_divergence_reports_exactly_that_node() {
    let expected = forest_of_depth(3);
    let mut actual = forest_of_depth(3);
    actual[0].children[0].uuid = "tampered".to_string();

    let mismatches = diff_forests(&expected, &actual);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].kind, MismatchKind::Node);
    assert_eq!(mismatches[0].path, "object[0].child[0]");
}

#[test]
fn scan_parse_compare_pipeline_over_matching_logs() {
    let scanner = LogScanner::new().unwrap();
    let dumps: Vec<String> = (0..3).map(|_| write_dump(&forest_of_depth(2))).collect();

    let authority = scanner.scan_text(&wrap_in_log(&dumps));
    let peer = scanner.scan_text(&wrap_in_log(&dumps));
    assert_eq!(authority.dumps.len(), 3);
    assert_eq!(authority.error_count(), 0);

    for (a, p) in authority.dumps.iter().zip(peer.dumps.iter()) {
        let expected = parse_dump(a).unwrap();
        let actual = parse_dump(p).unwrap();
        assert!(diff_forests(&expected, &actual).is_empty());
    }
}

#[test]
fn scan_parse_compare_pipeline_detects_peer_drift() {
    let scanner = LogScanner::new().unwrap();
    let good = write_dump(&forest_of_depth(2));

    let mut drifted_forest = forest_of_depth(2);
    drifted_forest[1].position = "(9.0, 9.0, 9.0)".to_string();
    let drifted = write_dump(&drifted_forest);

    let authority = scanner.scan_text(&wrap_in_log(&[good.clone(), good.clone()]));
    let peer = scanner.scan_text(&wrap_in_log(&[good, drifted]));

    let first = diff_forests(
        &parse_dump(&authority.dumps[0]).unwrap(),
        &parse_dump(&peer.dumps[0]).unwrap(),
    );
    assert!(first.is_empty());

    let second = diff_forests(
        &parse_dump(&authority.dumps[1]).unwrap(),
        &parse_dump(&peer.dumps[1]).unwrap(),
    );
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].path, "object[1]");
}

#[test]
fn error_lines_survive_alongside_dumps() {
    let scanner = LogScanner::new().unwrap();
    let dump = write_dump(&forest_of_depth(1));
    let log = format!(
        "ERROR lost packet\n{}ERROR desync suspected\n",
        wrap_in_log(&[dump])
    );

    let scan = scanner.scan_text(&log);
    assert_eq!(scan.dumps.len(), 1);
    assert_eq!(scan.error_count(), 2);
    assert_eq!(scan.errors[0].number, 1);
    assert!(parse_dump(&scan.dumps[0]).is_ok());
}

#[test]
fn two_node_dump_parses_and_diffs_as_expected() {
    let text = "--GameObject:\nName: A\nPosition: 0,0,0\nRotation: 0,0,0\nUUID: u1\nChildren: 1\n    --GameObject:\n    Name: B\n    Position: 1,1,1\n    Rotation: 0,0,0\n    UUID: u2\n    Children: 0\n";
    let forest = parse_dump(text).unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].name, "A");
    assert_eq!(forest[0].children[0].name, "B");

    assert!(diff_forests(&forest, &forest).is_empty());

    let mut variant = forest.clone();
    variant[0].children[0].uuid = "u3".to_string();
    let mismatches = diff_forests(&forest, &variant);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].path, "object[0].child[0]");
    assert!(mismatches[0].expected.contains("Name: B"));
}
