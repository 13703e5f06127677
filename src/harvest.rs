//! Harvest state machine.
//!
//! Consumes element-open / element-close / character-data / error events
//! from the underlying event source and recognizes the harvest envelope:
//! a `<harvest>` root containing `<expr url="...">` expressions. Inside an
//! expression every element becomes a token in an incrementally built
//! [`TokenTree`]; when the expression's root element closes, the tree is
//! handed to the subterm walker and released.
//!
//! Unrecognized envelope elements are skipped with a depth counter instead
//! of aborting, and a parse error discards only the expression in progress.
//! The session owns all per-document state and is driven by plain method
//! calls, so every transition is unit-testable without a real reader.

use crate::diag::Diagnostic;
use crate::index::IndexHandle;
use crate::token::{TokenId, TokenTree};
use crate::walker;

/// Recognized name of the harvest envelope's root element.
pub const HARVEST_ELEMENT: &str = "harvest";
/// Recognized name of the expression element.
pub const EXPR_ELEMENT: &str = "expr";
/// The one attribute recognized on an expression element.
pub const EXPR_LOCATOR_ATTR: &str = "url";
/// Locator used when an expression carries an unrecognized attribute.
pub const EXPR_LOCATOR_DEFAULT: &str = "";

/// State restored when an unknown subtree finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Default,
    InHarvest,
}

impl From<Resume> for ParserState {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::Default => ParserState::Default,
            Resume::InHarvest => ParserState::InHarvest,
        }
    }
}

/// Where the parse currently sits relative to the harvest envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Outside the harvest envelope.
    Default,
    /// Inside `<harvest>`, between expressions.
    InHarvest,
    /// Inside one `<expr>`, building a token tree. The state lingers here
    /// with no cursor after the expression's root closes; the enclosing
    /// `expr`-level close returns it to [`ParserState::InHarvest`].
    InExpression,
    /// Inside an unrecognized subtree, tracked only by nesting depth.
    Unknown { depth: u32, resume: Resume },
}

/// Per-document parse state: created fresh for each parse call, never
/// reused. Counters and diagnostics stay readable after the parse ends.
pub struct HarvestSession<'a> {
    index: &'a dyn IndexHandle,
    state: ParserState,
    tree: Option<TokenTree>,
    /// Innermost token currently being filled.
    cursor: Option<TokenId>,
    locator: String,
    /// Subterms the index accepted, summed over all expressions.
    pub subterms_indexed: u64,
    /// Expression trees that reached their closing boundary intact.
    pub expressions_completed: u64,
    pub warnings: u64,
    pub error_detected: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> HarvestSession<'a> {
    pub fn new(index: &'a dyn IndexHandle) -> Self {
        HarvestSession {
            index,
            state: ParserState::Default,
            tree: None,
            cursor: None,
            locator: String::new(),
            subterms_indexed: 0,
            expressions_completed: 0,
            warnings: 0,
            error_detected: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Element-open event.
    pub fn on_start_element(&mut self, name: &str, attrs: &[(String, String)]) {
        match self.state {
            ParserState::Default => {
                if name == HARVEST_ELEMENT {
                    self.state = ParserState::InHarvest;
                    for (key, _) in attrs {
                        self.warn(format!(
                            "unsupported attribute \"{key}\" on <{HARVEST_ELEMENT}>"
                        ));
                    }
                } else {
                    self.warn(format!("unexpected element <{name}> outside harvest"));
                    self.state = ParserState::Unknown {
                        depth: 1,
                        resume: Resume::Default,
                    };
                }
            }
            ParserState::InHarvest => {
                if name == EXPR_ELEMENT {
                    self.state = ParserState::InExpression;
                    for (key, value) in attrs {
                        if key == EXPR_LOCATOR_ATTR {
                            self.locator = value.clone();
                        } else {
                            self.warn(format!(
                                "unexpected attribute \"{key}\" on <{EXPR_ELEMENT}>"
                            ));
                            self.locator = EXPR_LOCATOR_DEFAULT.to_string();
                        }
                    }
                } else {
                    self.warn(format!("unexpected element <{name}> in harvest"));
                    self.state = ParserState::Unknown {
                        depth: 1,
                        resume: Resume::InHarvest,
                    };
                }
            }
            ParserState::InExpression => match (self.tree.as_mut(), self.cursor) {
                (Some(tree), Some(cursor)) => {
                    self.cursor = Some(tree.append_child(cursor, name, attrs));
                }
                _ => {
                    let tree = TokenTree::with_root(name, attrs);
                    self.cursor = Some(tree.root());
                    self.tree = Some(tree);
                }
            },
            ParserState::Unknown { depth, resume } => {
                self.state = ParserState::Unknown {
                    depth: depth + 1,
                    resume,
                };
            }
        }
    }

    /// Element-close event.
    pub fn on_end_element(&mut self, name: &str) {
        match self.state {
            ParserState::Default => {
                // Unbalanced input; never fatal.
                self.diagnostics.push(Diagnostic::warning(format!(
                    "unexpected end of element </{name}> outside harvest"
                )));
            }
            ParserState::InHarvest => {
                self.state = ParserState::Default;
            }
            ParserState::InExpression => {
                if let Some(cursor) = self.cursor {
                    if let Some(tree) = self.tree.take() {
                        if tree.is_root(cursor) {
                            // Expression boundary: index every subterm, then
                            // release the whole tree.
                            self.subterms_indexed +=
                                walker::index_subterms(&tree, &self.locator, self.index);
                            self.expressions_completed += 1;
                            self.cursor = None;
                        } else {
                            self.cursor = tree.parent(cursor);
                            self.tree = Some(tree);
                        }
                    }
                } else {
                    self.state = ParserState::InHarvest;
                }
            }
            ParserState::Unknown { depth, resume } => {
                if depth <= 1 {
                    self.state = resume.into();
                } else {
                    self.state = ParserState::Unknown {
                        depth: depth - 1,
                        resume,
                    };
                }
            }
        }
    }

    /// Character-data event. Fragments for one element arrive in order and
    /// are concatenated verbatim; outside an expression (or with no open
    /// token) they are ignored.
    pub fn on_characters(&mut self, text: &str) {
        if matches!(self.state, ParserState::InExpression) {
            if let (Some(tree), Some(cursor)) = (self.tree.as_mut(), self.cursor) {
                tree.append_text(cursor, text);
            }
        }
    }

    /// Recoverable malformed-markup notification from the event source.
    ///
    /// Discards the expression in progress and resynchronizes: the close
    /// events still pending for the aborted expression (its open tokens plus
    /// the `expr` element itself) are absorbed as an unknown subtree, so
    /// sibling expressions after the damage parse normally.
    pub fn on_parse_error(&mut self, message: &str) {
        self.error_detected = true;
        self.diagnostics.push(Diagnostic::error(message));
        if matches!(self.state, ParserState::InExpression) {
            let mut open = 1u32; // the expr element
            let mut current = self.cursor;
            while let Some(id) = current {
                open += 1;
                current = self.tree.as_ref().and_then(|t| t.parent(id));
            }
            self.state = ParserState::Unknown {
                depth: open,
                resume: Resume::InHarvest,
            };
        }
        self.tree = None;
        self.cursor = None;
    }

    /// Warning notification from the event source. Counted, never discards
    /// state.
    pub fn on_warning(&mut self, message: &str) {
        self.warnings += 1;
        self.diagnostics.push(Diagnostic::warning(message));
    }

    /// Unrecoverable-per-the-event-source notification. Logged only;
    /// ordinary parse errors already handle realistic malformed input.
    pub fn on_fatal_error(&mut self, message: &str) {
        self.diagnostics.push(Diagnostic::fatal(message));
    }

    fn warn(&mut self, message: String) {
        self.warnings += 1;
        self.diagnostics.push(Diagnostic::warning(message));
    }
}
