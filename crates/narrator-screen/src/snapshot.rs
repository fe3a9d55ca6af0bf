//! Accessibility tree linearization.
//!
//! Walks the tree in document pre-order and joins every visible node's label
//! into one string, each label followed by [`LABEL_SEPARATOR`]. Invisible
//! nodes contribute nothing themselves but their children are still visited,
//! since a clipped container can hold visible descendants.

use narrator_core::config::TraversalConfig;
use narrator_core::types::{AccessibilityNode, ScreenSnapshot};

/// Appended after every label so the result reads as spoken sentences.
pub const LABEL_SEPARATOR: &str = ". ";

/// Result of one tree walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub snapshot: ScreenSnapshot,
    /// Nodes visited, including invisible and unlabelled ones.
    pub visited: usize,
    /// Labels appended to the snapshot.
    pub labels: usize,
    /// True when a depth or node limit cut the walk short.
    pub truncated: bool,
}

/// Reads the visible text of an accessibility tree.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    max_depth: usize,
    max_nodes: usize,
}

impl Default for SnapshotReader {
    fn default() -> Self {
        Self::from_config(&TraversalConfig::default())
    }
}

impl SnapshotReader {
    pub fn new(max_depth: usize, max_nodes: usize) -> Self {
        Self {
            max_depth,
            max_nodes,
        }
    }

    pub fn from_config(config: &TraversalConfig) -> Self {
        Self::new(config.max_depth, config.max_nodes)
    }

    /// Linearize the tree under `root`. An absent root yields an empty snapshot.
    pub fn extract(&self, root: Option<&AccessibilityNode>) -> ScreenSnapshot {
        self.extract_with_stats(root).snapshot
    }

    /// Like [`extract`](Self::extract), also reporting how the walk went.
    pub fn extract_with_stats(&self, root: Option<&AccessibilityNode>) -> Extraction {
        let mut out = String::new();
        let mut visited = 0usize;
        let mut labels = 0usize;
        let mut truncated = false;

        // Explicit stack so hostile trees cannot overflow the call stack.
        let mut stack: Vec<(&AccessibilityNode, usize)> = root.map(|r| (r, 0)).into_iter().collect();

        while let Some((node, depth)) = stack.pop() {
            if visited == self.max_nodes {
                truncated = true;
                break;
            }
            visited += 1;

            if node.visible_to_user {
                if let Some(label) = node.label() {
                    out.push_str(label);
                    out.push_str(LABEL_SEPARATOR);
                    labels += 1;
                }
            }

            if node.children.is_empty() {
                continue;
            }
            if depth >= self.max_depth {
                truncated = true;
                continue;
            }
            // Reversed so the leftmost child is popped first.
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }

        if truncated {
            tracing::warn!(
                visited,
                max_depth = self.max_depth,
                max_nodes = self.max_nodes,
                "Accessibility tree walk truncated"
            );
        } else {
            tracing::trace!(visited, labels, "Accessibility tree walked");
        }

        Extraction {
            snapshot: ScreenSnapshot::new(out),
            visited,
            labels,
            truncated,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
