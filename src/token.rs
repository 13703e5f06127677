//! Arena-owned token tree for one harvest expression.
//!
//! A [`TokenTree`] holds every node of a single expression in a flat arena;
//! nodes reference each other by [`TokenId`]. Children are exclusively owned
//! by the tree, and the parent link is a plain optional index, so the whole
//! structure is cycle-free and dropping the tree releases every node.
//!
//! Trees are built incrementally during parsing (append a child, ascend to
//! the parent) and consumed read-only by the indexing walker.

use quick_xml::escape::escape;

/// Handle to one node in a [`TokenTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(usize);

/// One markup element inside an expression.
#[derive(Debug, Clone)]
struct Token {
    tag: String,
    /// Ordered attribute list; setting an existing name overwrites in place.
    attributes: Vec<(String, String)>,
    /// Character data, concatenated in arrival order.
    text: String,
    children: Vec<TokenId>,
    parent: Option<TokenId>,
}

/// The token tree of one expression. Node 0 is always the root.
#[derive(Debug, Clone)]
pub struct TokenTree {
    nodes: Vec<Token>,
}

impl TokenTree {
    /// Create a tree containing only its root node.
    pub fn with_root(tag: &str, attrs: &[(String, String)]) -> Self {
        let mut tree = TokenTree {
            nodes: vec![Token {
                tag: tag.to_string(),
                attributes: Vec::new(),
                text: String::new(),
                children: Vec::new(),
                parent: None,
            }],
        };
        for (name, value) in attrs {
            tree.set_attribute(TokenId(0), name, value);
        }
        tree
    }

    /// The expression's entry point.
    pub fn root(&self) -> TokenId {
        TokenId(0)
    }

    pub fn is_root(&self, id: TokenId) -> bool {
        self.nodes[id.0].parent.is_none()
    }

    /// Number of nodes in the tree (== number of subterms).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a new child under `parent` and return its id.
    pub fn append_child(
        &mut self,
        parent: TokenId,
        tag: &str,
        attrs: &[(String, String)],
    ) -> TokenId {
        let id = TokenId(self.nodes.len());
        self.nodes.push(Token {
            tag: tag.to_string(),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        for (name, value) in attrs {
            self.set_attribute(id, name, value);
        }
        id
    }

    /// Set an attribute; a duplicate name overwrites the earlier value while
    /// keeping its original position.
    pub fn set_attribute(&mut self, id: TokenId, name: &str, value: &str) {
        let attrs = &mut self.nodes[id.0].attributes;
        if let Some(slot) = attrs.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value.to_string();
        } else {
            attrs.push((name.to_string(), value.to_string()));
        }
    }

    /// Append one character-data fragment to the node's text buffer.
    pub fn append_text(&mut self, id: TokenId, fragment: &str) {
        self.nodes[id.0].text.push_str(fragment);
    }

    pub fn tag(&self, id: TokenId) -> &str {
        &self.nodes[id.0].tag
    }

    pub fn text(&self, id: TokenId) -> &str {
        &self.nodes[id.0].text
    }

    pub fn attribute(&self, id: TokenId, name: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn parent(&self, id: TokenId) -> Option<TokenId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: TokenId) -> &[TokenId] {
        &self.nodes[id.0].children
    }

    /// Positional path from the root to `id`: 1-based child positions joined
    /// with `/`. The root's path is the empty string.
    ///
    /// Derived on demand at indexing time; nothing maintains it during
    /// construction.
    pub fn path(&self, id: TokenId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            let position = self.nodes[parent.0]
                .children
                .iter()
                .position(|&c| c == current)
                .map(|i| i + 1)
                .unwrap_or(0);
            segments.push(position.to_string());
            current = parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Re-serialize the subtree rooted at `id` as markup.
    ///
    /// This is the content form handed to the index: tag, attributes in
    /// order, the node's accumulated text, then each child subtree. Uses an
    /// explicit stack so arbitrarily deep expressions cannot exhaust the
    /// call stack.
    pub fn subtree_markup(&self, id: TokenId) -> String {
        enum Visit {
            Open(TokenId),
            Close(TokenId),
        }

        let mut out = String::new();
        let mut stack = vec![Visit::Open(id)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Open(n) => {
                    let node = &self.nodes[n.0];
                    out.push('<');
                    out.push_str(&node.tag);
                    for (name, value) in &node.attributes {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        out.push_str(&escape(value.as_str()));
                        out.push('"');
                    }
                    if node.text.is_empty() && node.children.is_empty() {
                        out.push_str("/>");
                    } else {
                        out.push('>');
                        out.push_str(&escape(node.text.as_str()));
                        stack.push(Visit::Close(n));
                        for &child in node.children.iter().rev() {
                            stack.push(Visit::Open(child));
                        }
                    }
                }
                Visit::Close(n) => {
                    out.push_str("</");
                    out.push_str(&self.nodes[n.0].tag);
                    out.push('>');
                }
            }
        }
        out
    }
}
