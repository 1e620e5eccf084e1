//! Huffman tree construction and serialization.
//!
//! The tree lives in a flat arena: every node is stored in `nodes` and
//! refers to its children by index. Parents own their children, the tree
//! owns the arena, and nothing is mutated after construction.
//!
//! Construction repeatedly merges the two lightest nodes from a
//! [`MinHeap`]. Equal weights pop in insertion order (leaves in ascending
//! symbol order, then merged nodes in creation order) and the first node
//! popped becomes the left child.
use serde::{Deserialize, Serialize};

use crate::frequency::FrequencyTable;
use crate::pqueue::MinHeap;
use crate::{PzError, PzResult};

/// A node in the Huffman tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanNode {
    /// Byte value, present on leaves only.
    pub symbol: Option<u8>,
    /// Weight of this node (sum of the subtree's leaf counts).
    pub frequency: u64,
    /// Left child index.
    pub left: Option<usize>,
    /// Right child index.
    pub right: Option<usize>,
}

impl HuffmanNode {
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Nested, serializable form of a tree: `{symbol?, frequency, left?, right?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<u8>,
    pub frequency: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<TreeRepr>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<TreeRepr>>,
}

/// A Huffman tree over byte symbols.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<HuffmanNode>,
    root: usize,
}

impl HuffmanTree {
    /// Build a tree from a frequency table.
    ///
    /// Returns `None` for an empty table. A table with one symbol yields a
    /// single leaf as the root.
    pub fn build(freq: &FrequencyTable) -> Option<Self> {
        let mut nodes: Vec<HuffmanNode> = Vec::with_capacity(2 * freq.distinct());
        let mut heap: MinHeap<usize> = MinHeap::with_capacity(freq.distinct());

        for (symbol, count) in freq.iter() {
            heap.push(count, nodes.len());
            nodes.push(HuffmanNode {
                symbol: Some(symbol),
                frequency: count,
                left: None,
                right: None,
            });
        }

        loop {
            let (weight, first) = heap.pop()?;
            let Some((other_weight, second)) = heap.pop() else {
                return Some(HuffmanTree { nodes, root: first });
            };
            let merged = nodes.len();
            nodes.push(HuffmanNode {
                symbol: None,
                frequency: weight + other_weight,
                left: Some(first),
                right: Some(second),
            });
            heap.push(weight + other_weight, merged);
        }
    }

    /// Convenience: count frequencies in `input` and build.
    pub fn from_data(input: &[u8]) -> Option<Self> {
        Self::build(&FrequencyTable::from_bytes(input))
    }

    pub fn root(&self) -> &HuffmanNode {
        &self.nodes[self.root]
    }

    pub fn node(&self, index: usize) -> &HuffmanNode {
        &self.nodes[index]
    }

    pub(crate) fn root_index(&self) -> usize {
        self.root
    }

    /// Number of leaves (distinct symbols).
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            let node = &self.nodes[idx];
            max = max.max(d);
            stack.extend(node.left.map(|c| (c, d + 1)));
            stack.extend(node.right.map(|c| (c, d + 1)));
        }
        max
    }

    /// Sum over leaves of frequency times code length: the encoded size in
    /// bits. A single-leaf tree still spends one bit per symbol.
    pub fn weighted_path_length(&self) -> u64 {
        let root = self.root();
        if root.is_leaf() {
            return root.frequency;
        }
        let mut total = 0;
        let mut stack = vec![(self.root, 0u64)];
        while let Some((idx, d)) = stack.pop() {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                total += node.frequency * d;
            }
            stack.extend(node.left.map(|c| (c, d + 1)));
            stack.extend(node.right.map(|c| (c, d + 1)));
        }
        total
    }

    /// Serialize into the nested representation.
    pub fn to_repr(&self) -> TreeRepr {
        self.repr_at(self.root)
    }

    fn repr_at(&self, idx: usize) -> TreeRepr {
        let node = &self.nodes[idx];
        TreeRepr {
            symbol: node.symbol,
            frequency: node.frequency,
            left: node.left.map(|c| Box::new(self.repr_at(c))),
            right: node.right.map(|c| Box::new(self.repr_at(c))),
        }
    }

    /// Rebuild a tree from its nested representation.
    ///
    /// Rejects nodes with a single child, leaves without a symbol, internal
    /// nodes with a symbol, and internal weights that are not the sum of
    /// their children.
    pub fn from_repr(repr: &TreeRepr) -> PzResult<Self> {
        let mut nodes = Vec::new();
        let root = Self::push_repr(repr, &mut nodes)?;
        Ok(HuffmanTree { nodes, root })
    }

    fn push_repr(repr: &TreeRepr, nodes: &mut Vec<HuffmanNode>) -> PzResult<usize> {
        let (left, right) = match (&repr.left, &repr.right) {
            (None, None) => {
                if repr.symbol.is_none() {
                    return Err(PzError::InvalidInput("leaf without a symbol".into()));
                }
                (None, None)
            }
            (Some(l), Some(r)) => {
                if repr.symbol.is_some() {
                    return Err(PzError::InvalidInput(
                        "internal node carries a symbol".into(),
                    ));
                }
                if l.frequency.checked_add(r.frequency) != Some(repr.frequency) {
                    return Err(PzError::InvalidInput(format!(
                        "internal weight {} is not {} + {}",
                        repr.frequency, l.frequency, r.frequency
                    )));
                }
                (
                    Some(Self::push_repr(l, nodes)?),
                    Some(Self::push_repr(r, nodes)?),
                )
            }
            _ => {
                return Err(PzError::InvalidInput(
                    "internal node with a single child".into(),
                ))
            }
        };
        nodes.push(HuffmanNode {
            symbol: repr.symbol,
            frequency: repr.frequency,
            left,
            right,
        });
        Ok(nodes.len() - 1)
    }
}

/// Structural equality: same shape, symbols and weights, regardless of
/// where nodes sit in the arena.
impl PartialEq for HuffmanTree {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self.root, other.root)];
        while let Some((a, b)) = stack.pop() {
            let (na, nb) = (&self.nodes[a], &other.nodes[b]);
            if na.symbol != nb.symbol || na.frequency != nb.frequency {
                return false;
            }
            match (na.left, na.right, nb.left, nb.right) {
                (None, None, None, None) => {}
                (Some(la), Some(ra), Some(lb), Some(rb)) => {
                    stack.push((la, lb));
                    stack.push((ra, rb));
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for HuffmanTree {}
