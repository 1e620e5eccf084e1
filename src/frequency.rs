//! Byte frequency counting.
//!
//! A [`FrequencyTable`] records how often each byte value occurs in a
//! buffer. It is built once and never mutated afterwards; the Huffman
//! tree and the statistics report both read from it.

/// Occurrence counts for every byte value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; 256],
    total: u64,
    distinct: usize,
}

impl FrequencyTable {
    /// Count byte occurrences in `input`. An empty buffer yields an empty table.
    pub fn from_bytes(input: &[u8]) -> Self {
        let mut counts = [0u64; 256];
        for &b in input {
            counts[b as usize] += 1;
        }
        Self::from_counts(counts)
    }

    /// Build a table from explicit per-byte counts.
    pub fn from_counts(counts: [u64; 256]) -> Self {
        let total = counts.iter().sum();
        let distinct = counts.iter().filter(|&&c| c > 0).count();
        Self {
            counts,
            total,
            distinct,
        }
    }

    /// Count for a single byte value.
    pub fn get(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    /// Total number of bytes counted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct byte values with a nonzero count.
    pub fn distinct(&self) -> usize {
        self.distinct
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Iterate over `(byte, count)` for bytes that actually occur, in
    /// ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(b, &c)| (b as u8, c))
    }

    /// Shannon entropy in bits per symbol. Zero for empty or
    /// single-symbol tables.
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let total = self.total as f64;
        self.iter()
            .map(|(_, c)| {
                let p = c as f64 / total;
                -p * p.log2()
            })
            .sum()
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::from_counts([0; 256])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let table = FrequencyTable::from_bytes(&[]);
        assert!(table.is_empty());
        assert_eq!(table.distinct(), 0);
        assert_eq!(table.iter().count(), 0);
        assert_eq!(table.entropy(), 0.0);
    }

    #[test]
    fn test_known_frequencies() {
        let table = FrequencyTable::from_bytes(b"aaabbc");
        assert_eq!(table.get(b'a'), 3);
        assert_eq!(table.get(b'b'), 2);
        assert_eq!(table.get(b'c'), 1);
        assert_eq!(table.get(b'z'), 0);
        assert_eq!(table.total(), 6);
        assert_eq!(table.distinct(), 3);
    }

    #[test]
    fn test_iter_is_sparse_and_ordered() {
        let table = FrequencyTable::from_bytes(&[9, 200, 9, 3]);
        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![(3, 1), (9, 2), (200, 1)]);
    }

    #[test]
    fn test_single_symbol_entropy() {
        let table = FrequencyTable::from_bytes(&[0xFF; 12]);
        assert_eq!(table.distinct(), 1);
        assert_eq!(table.entropy(), 0.0);
    }

    #[test]
    fn test_uniform_distribution() {
        let input: Vec<u8> = (0..=255).collect();
        let table = FrequencyTable::from_bytes(&input);
        assert_eq!(table.distinct(), 256);
        assert!((table.entropy() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_equal_symbols() {
        let table = FrequencyTable::from_bytes(&[0x00, 0x00, 0xFF, 0xFF]);
        assert!((table.entropy() - 1.0).abs() < 1e-9);
    }
}
