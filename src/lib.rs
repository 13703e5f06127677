//! # Harvest Index
//!
//! A streaming ingestion pipeline for harvest documents: flat XML
//! containers of independently addressed mathematical expressions. Each
//! expression is parsed into a token tree as its events arrive (the
//! document is never materialized as a DOM) and, at the expression's
//! closing boundary, every subterm of that tree is inserted into a
//! content-addressed search index.
//!
//! ## Data flow
//!
//! ```text
//! raw bytes ─▶ event source ─▶ state machine ─▶ token tree
//!                                                   │ (expression close)
//!                                                   ▼
//!            counters ◀─ index insertions ◀─ subterm walker
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`token`] | Arena-owned token tree for one expression |
//! | [`harvest`] | Envelope state machine over parser events |
//! | [`walker`] | Depth-first subterm decomposition and insertion |
//! | [`loader`] | One-shot document driver |
//! | [`index`] | Index interface and in-memory backend |
//! | [`diag`] | Structured warnings and errors |

pub mod diag;
pub mod harvest;
pub mod index;
pub mod loader;
pub mod token;
pub mod walker;
