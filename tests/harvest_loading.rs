//! End-to-end harvest loading through the public library API.

use std::fs;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use harvest_index::index::MemoryIndex;
use harvest_index::loader::{load_harvest_from_memory, ParseStatus};

/// A small corpus: three expressions, eight subterms total.
const CORPUS: &str = concat!(
    r#"<harvest>"#,
    r#"<expr url="http://example.org/p1#eq1"><apply><plus/><ci>x</ci><ci>y</ci></apply></expr>"#,
    r#"<expr url="http://example.org/p1#eq2"><ci>x</ci></expr>"#,
    r#"<expr url="http://example.org/p2#eq1"><apply><sin/><ci>t</ci></apply></expr>"#,
    r#"</harvest>"#
);

#[test]
fn loads_a_corpus_file_from_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("corpus.harvest");
    fs::write(&path, CORPUS).unwrap();

    let buffer = fs::read(&path).unwrap();
    let index = MemoryIndex::new();
    let outcome = load_harvest_from_memory(&buffer, &index);

    assert_eq!(outcome.status, ParseStatus::Ok);
    assert_eq!(outcome.expressions_completed, 3);
    assert_eq!(outcome.subterms_indexed, 8);
    assert_eq!(outcome.warnings, 0);
    assert!(!outcome.error_detected);
    assert_eq!(index.subterm_count(), 8);
}

#[test]
fn identical_subterms_from_different_expressions_share_content() {
    let index = MemoryIndex::new();
    load_harvest_from_memory(CORPUS.as_bytes(), &index);

    // <ci>x</ci> occurs in eq1 (as a subterm) and eq2 (as a whole
    // expression); the content entry carries both postings.
    let postings = index.postings_for("<ci>x</ci>");
    assert_eq!(postings.len(), 2);
    assert_eq!(postings[0].locator, "http://example.org/p1#eq1");
    assert_eq!(postings[0].path, "2");
    assert_eq!(postings[1].locator, "http://example.org/p1#eq2");
    assert_eq!(postings[1].path, "");

    // 8 postings, but x appears twice, so 7 distinct contents.
    assert_eq!(index.distinct_subterms(), 7);
}

#[test]
fn broken_expression_is_isolated_from_its_siblings() {
    let doc = concat!(
        r#"<harvest>"#,
        r#"<expr url="u1"><a><b/></a></expr>"#,
        r#"<expr url="u2"><x>&nope;</x></expr>"#,
        r#"<expr url="u3"><c/></expr>"#,
        r#"</harvest>"#
    );
    let index = MemoryIndex::new();
    let outcome = load_harvest_from_memory(doc.as_bytes(), &index);

    assert_eq!(outcome.status, ParseStatus::Ok);
    assert!(outcome.error_detected);
    // u1 (2 subterms) and u3 (1 subterm); nothing from u2.
    assert_eq!(outcome.subterms_indexed, 3);
    assert_eq!(index.postings_for("<b/>")[0].locator, "u1");
    assert_eq!(index.postings_for("<c/>")[0].locator, "u3");
    assert!(index.postings_for("<x>&nope;</x>").is_empty());
}

#[test]
fn deep_expressions_do_not_overflow() {
    // A 2000-deep chain exercises the explicit traversal stacks.
    let depth = 2000;
    let mut doc = String::from(r#"<harvest><expr url="deep">"#);
    for _ in 0..depth {
        doc.push_str("<n>");
    }
    for _ in 0..depth {
        doc.push_str("</n>");
    }
    doc.push_str("</expr></harvest>");

    let index = MemoryIndex::new();
    let outcome = load_harvest_from_memory(doc.as_bytes(), &index);
    assert_eq!(outcome.status, ParseStatus::Ok);
    assert_eq!(outcome.subterms_indexed, depth as u64);
}

#[test]
fn concurrent_documents_on_separate_threads() {
    let index = Arc::new(MemoryIndex::new());
    let mut handles = Vec::new();
    for i in 0..4 {
        let index = Arc::clone(&index);
        handles.push(thread::spawn(move || {
            let doc = format!(
                r#"<harvest><expr url="u{i}"><apply><f{i}/><ci>v</ci></apply></expr></harvest>"#
            );
            let outcome = load_harvest_from_memory(doc.as_bytes(), &*index);
            assert_eq!(outcome.status, ParseStatus::Ok);
            assert_eq!(outcome.subterms_indexed, 3);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(index.subterm_count(), 12);
}

#[test]
fn envelope_tolerance_round_trip() {
    let doc = concat!(
        r#"<?xml version="1.0"?>"#,
        r#"<harvest version="2">"#,
        r#"<generator tool="crawler"><run id="7"/></generator>"#,
        r#"<expr url="u1" origin="cache"><a/></expr>"#,
        r#"<expr><b/></expr>"#,
        r#"</harvest>"#
    );
    let index = MemoryIndex::new();
    let outcome = load_harvest_from_memory(doc.as_bytes(), &index);

    assert_eq!(outcome.status, ParseStatus::Ok);
    assert!(!outcome.error_detected);
    // harvest-root attribute + unknown <generator> + unknown expr attribute.
    assert_eq!(outcome.warnings, 3);
    assert_eq!(outcome.subterms_indexed, 2);
    // The unknown attribute blanked u1's locator, and the attribute-less
    // second expression inherits that blank value.
    assert_eq!(index.postings_for("<a/>")[0].locator, "");
    assert_eq!(index.postings_for("<b/>")[0].locator, "");
}
