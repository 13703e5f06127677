//! Subterm indexing walker.
//!
//! When an expression closes, every node of its token tree becomes one index
//! insertion: the node's subtree is the content, the expression's locator
//! and the node's positional path form the posting. Traversal is depth-first
//! pre-order, left-to-right, over an explicit stack so deep expressions use
//! heap proportional to their width rather than recursion depth.

use crate::index::IndexHandle;
use crate::token::TokenTree;

/// Visit every subterm of `tree` in document order and insert each into the
/// index. Returns the number of insertions the index accepted.
///
/// Each insertion runs on its own freshly acquired connection, released
/// before the next subterm. A refused insertion (or a connection that cannot
/// be acquired) is skipped and not counted; the traversal always completes.
pub fn index_subterms(tree: &TokenTree, locator: &str, index: &dyn IndexHandle) -> u64 {
    let mut indexed = 0u64;
    let mut stack = vec![tree.root()];

    while let Some(node) = stack.pop() {
        if let Ok(mut conn) = index.connect() {
            if conn.insert(tree, node, locator, &tree.path(node)) {
                indexed += 1;
            }
        }
        // Children pushed in reverse so pops come out left-to-right.
        for &child in tree.children(node).iter().rev() {
            stack.push(child);
        }
    }

    indexed
}
