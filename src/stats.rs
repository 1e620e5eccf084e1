//! Compression statistics for display.
//!
//! Computed from the pre-compression bytes; nothing here is needed to
//! decompress. Large inputs skip the Huffman analysis and report empty
//! code tables.

use serde::{Deserialize, Serialize};

use crate::bitpack::to_bit_string;
use crate::codebook::CodeBook;
use crate::frequency::FrequencyTable;
use crate::huffman::{HuffmanTree, TreeRepr};

/// Inputs above this many bytes skip tree and codebook construction.
pub const DEFAULT_STATS_THRESHOLD: usize = 1_000_000;

/// One row of the code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub symbol: u8,
    pub frequency: u64,
    pub code: String,
    pub bit_length: usize,
}

/// Statistics record handed to the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Shannon entropy of the input bytes, bits per symbol.
    pub entropy: f64,
    /// Compressed payload bits per image pixel.
    pub bits_per_pixel: f64,
    pub original_size: usize,
    pub compressed_size: usize,
    /// Average Huffman code length weighted by frequency.
    pub huffman_bits_per_symbol: f64,
    pub huffman_codes: Vec<CodeEntry>,
    pub tree: Option<TreeRepr>,
}

impl Stats {
    /// Size-only statistics with empty entropy and code tables.
    pub fn sizes_only(original_size: usize, compressed_size: usize, pixel_count: u64) -> Self {
        Stats {
            bits_per_pixel: bits_per_pixel(compressed_size, pixel_count),
            original_size,
            compressed_size,
            ..Default::default()
        }
    }

    /// Full statistics over `input`, or [`Stats::sizes_only`] when
    /// `input` is longer than `threshold`.
    pub fn collect(
        input: &[u8],
        compressed_size: usize,
        pixel_count: u64,
        threshold: usize,
    ) -> Self {
        let mut stats = Self::sizes_only(input.len(), compressed_size, pixel_count);
        if input.len() > threshold {
            log::debug!(
                "skipping huffman statistics: {} bytes over threshold {threshold}",
                input.len()
            );
            return stats;
        }

        let freq = FrequencyTable::from_bytes(input);
        let tree = HuffmanTree::build(&freq);
        let book = CodeBook::generate(tree.as_ref());

        stats.entropy = freq.entropy();
        stats.huffman_codes = book
            .iter()
            .map(|(symbol, code)| CodeEntry {
                symbol,
                frequency: freq.get(symbol),
                code: to_bit_string(code),
                bit_length: code.len(),
            })
            .collect();
        if let Some(tree) = &tree {
            stats.huffman_bits_per_symbol =
                tree.weighted_path_length() as f64 / freq.total() as f64;
        }
        stats.tree = tree.map(|t| t.to_repr());
        stats
    }

    /// Compressed size as a fraction of the original.
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        self.compressed_size as f64 / self.original_size as f64
    }
}

fn bits_per_pixel(compressed_size: usize, pixel_count: u64) -> f64 {
    if pixel_count == 0 {
        return 0.0;
    }
    (compressed_size as f64 * 8.0) / pixel_count as f64
}
