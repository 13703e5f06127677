//! Document driver: runs one in-memory harvest document through the event
//! source and the harvest state machine.
//!
//! [`load_harvest_from_memory`] owns the full lifecycle for a single parse:
//! it takes the event-source serialization lock, creates a reader over the
//! caller's buffer, feeds every event to a fresh [`HarvestSession`], and
//! returns the source's completion status together with the session's
//! counters and collected diagnostics. Nothing here returns early through an
//! error type; every failure becomes a counter, a state reset, or the
//! status field.

use std::sync::Mutex;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::diag::Diagnostic;
use crate::harvest::HarvestSession;
use crate::index::IndexHandle;

/// The event-source library is treated as non-reentrant: reader creation
/// through end of parse runs under this lock, one document at a time.
/// Index insertions are not serialized by it.
static EVENT_SOURCE_LOCK: Mutex<()> = Mutex::new(());

/// Completion code of the underlying event source, independent of the
/// document-level error flag: a byte stream that reaches its end cleanly is
/// `Ok` even when recoverable errors were logged along the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Ok,
    Failed,
}

/// Everything observable from one parse call.
#[derive(Debug, Serialize)]
pub struct LoadOutcome {
    pub status: ParseStatus,
    /// Subterms the index accepted across the whole document, not the
    /// number of expressions encountered.
    pub subterms_indexed: u64,
    pub expressions_completed: u64,
    pub warnings: u64,
    pub error_detected: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse one harvest document held entirely in `buffer` and index every
/// subterm of every well-formed expression into `index`.
///
/// The buffer is read in one shot; the session lives exactly as long as
/// this call. Safe to invoke concurrently from multiple threads on
/// different documents.
pub fn load_harvest_from_memory(buffer: &[u8], index: &dyn IndexHandle) -> LoadOutcome {
    let _guard = EVENT_SOURCE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let mut reader = Reader::from_reader(buffer);
    let mut session = HarvestSession::new(index);
    let mut buf = Vec::new();
    let mut status = ParseStatus::Ok;

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let (name, attrs) = start_payload(&mut session, &e);
                session.on_start_element(&name, &attrs);
            }
            Ok(Event::Empty(e)) => {
                let (name, attrs) = start_payload(&mut session, &e);
                session.on_start_element(&name, &attrs);
                session.on_end_element(&name);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                session.on_end_element(&name);
            }
            Ok(Event::Text(t)) => match t.unescape() {
                Ok(text) => session.on_characters(&text),
                Err(err) => session.on_parse_error(&format!(
                    "bad character data at byte {}: {err}",
                    reader.buffer_position()
                )),
            },
            Ok(Event::CData(c)) => {
                session.on_characters(&String::from_utf8_lossy(c.as_ref()));
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, doctype.
            Ok(_) => {}
            Err(err) => {
                session.on_parse_error(&format!(
                    "parse error at byte {}: {err}",
                    reader.buffer_position()
                ));
                if reader.buffer_position() == position {
                    // Reader cannot advance past the damage; stop here
                    // rather than spin on the same byte.
                    status = ParseStatus::Failed;
                    break;
                }
            }
        }
        buf.clear();
    }

    LoadOutcome {
        status,
        subterms_indexed: session.subterms_indexed,
        expressions_completed: session.expressions_completed,
        warnings: session.warnings,
        error_detected: session.error_detected,
        diagnostics: session.take_diagnostics(),
    }
}

/// Pull the element name and owned attribute pairs out of a start event.
/// Attribute-level decoding problems are warnings, never fatal.
fn start_payload(session: &mut HarvestSession, e: &BytesStart) -> (String, Vec<(String, String)>) {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        match attr {
            Ok(a) => {
                let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
                match a.unescape_value() {
                    Ok(value) => attrs.push((key, value.into_owned())),
                    Err(err) => {
                        session.on_warning(&format!("bad value for attribute \"{key}\": {err}"))
                    }
                }
            }
            Err(err) => session.on_warning(&format!("malformed attribute in <{name}>: {err}")),
        }
    }
    (name, attrs)
}
