//! Prefix code tables derived from a Huffman tree.
//!
//! A [`CodeBook`] maps each byte value to its code: the path from the
//! root to the symbol's leaf, `0` for a left edge and `1` for a right
//! edge. Codes are prefix-free because every symbol sits on a leaf.
//!
//! Packed form, one record per symbol in ascending order:
//!
//! | Field       | Size                     |
//! |-------------|--------------------------|
//! | symbol      | 1 byte                   |
//! | code_length | 1 byte (1-255)           |
//! | code bits   | ceil(code_length/8) bytes, MSB-first, zero-padded at the end |

use std::collections::BTreeMap;

use bitvec::prelude::*;

use crate::bitpack::{self, Bits};
use crate::huffman::HuffmanTree;
use crate::{PzError, PzResult};

/// Symbol to code mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBook {
    codes: BTreeMap<u8, Bits>,
}

impl CodeBook {
    /// Derive codes by walking `tree`. An absent tree yields an empty book;
    /// a single-leaf tree assigns the code `0`.
    pub fn generate(tree: Option<&HuffmanTree>) -> Self {
        let mut codes = BTreeMap::new();
        let Some(tree) = tree else {
            return CodeBook { codes };
        };

        let root = tree.root();
        if let (true, Some(symbol)) = (root.is_leaf(), root.symbol) {
            codes.insert(symbol, Bits::repeat(false, 1));
            return CodeBook { codes };
        }

        let mut stack = vec![(tree.root_index(), Bits::new())];
        while let Some((idx, path)) = stack.pop() {
            let node = tree.node(idx);
            if let Some(symbol) = node.symbol {
                codes.insert(symbol, path);
                continue;
            }
            if let Some(right) = node.right {
                let mut p = path.clone();
                p.push(true);
                stack.push((right, p));
            }
            if let Some(left) = node.left {
                let mut p = path;
                p.push(false);
                stack.push((left, p));
            }
        }
        CodeBook { codes }
    }

    pub fn get(&self, symbol: u8) -> Option<&BitSlice<u8, Msb0>> {
        self.codes.get(&symbol).map(|b| b.as_bitslice())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterate `(symbol, code)` in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &BitSlice<u8, Msb0>)> + '_ {
        self.codes.iter().map(|(&s, c)| (s, c.as_bitslice()))
    }

    /// True if no code is a prefix of another.
    pub fn is_prefix_free(&self) -> bool {
        let codes: Vec<&Bits> = self.codes.values().collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j && a.len() <= b.len() && b[..a.len()] == a[..] {
                    return false;
                }
            }
        }
        true
    }

    /// Serialize to the packed record form.
    pub fn pack(&self) -> PzResult<Vec<u8>> {
        let mut out = Vec::new();
        for (&symbol, code) in &self.codes {
            let len = u8::try_from(code.len())
                .ok()
                .filter(|&l| l > 0)
                .ok_or_else(|| {
                    PzError::InvalidInput(format!(
                        "code for {symbol:#04x} has unpackable length {}",
                        code.len()
                    ))
                })?;
            out.push(symbol);
            out.push(len);
            out.extend(bitpack::pack(code).0);
        }
        Ok(out)
    }

    /// Parse the packed record form.
    pub fn unpack(mut bytes: &[u8]) -> PzResult<Self> {
        let mut codes = BTreeMap::new();
        while !bytes.is_empty() {
            let [symbol, len, rest @ ..] = bytes else {
                return Err(PzError::InvalidInput("truncated codebook record".into()));
            };
            if *len == 0 {
                return Err(PzError::InvalidInput(format!(
                    "zero-length code for {symbol:#04x}"
                )));
            }
            let nbytes = (*len as usize).div_ceil(8);
            if rest.len() < nbytes {
                return Err(PzError::InvalidInput("truncated codebook record".into()));
            }
            let padding = (nbytes * 8 - *len as usize) as u8;
            let code = bitpack::unpack(&rest[..nbytes], padding)?;
            if codes.insert(*symbol, code).is_some() {
                return Err(PzError::InvalidInput(format!(
                    "duplicate codebook entry for {symbol:#04x}"
                )));
            }
            bytes = &rest[nbytes..];
        }
        Ok(CodeBook { codes })
    }

    /// Concatenate the codes of every byte in `input`.
    pub fn encode(&self, input: &[u8]) -> PzResult<Bits> {
        let mut out = Bits::new();
        for &b in input {
            let code = self.codes.get(&b).ok_or_else(|| {
                PzError::InvalidInput(format!("byte {b:#04x} has no code"))
            })?;
            out.extend_from_bitslice(code);
        }
        Ok(out)
    }

    /// Decode exactly `count` symbols; every bit must be consumed.
    pub fn decode(&self, bits: &BitSlice<u8, Msb0>, count: usize) -> PzResult<Vec<u8>> {
        let trie = DecodeTrie::new(self)?;
        // Every code is at least one bit long.
        let mut out = Vec::with_capacity(count.min(bits.len()));
        let mut node = 0;
        let mut consumed = 0;
        for bit in bits.iter().by_vals() {
            if out.len() == count {
                break;
            }
            consumed += 1;
            node = trie.children[node][bit as usize].ok_or_else(|| {
                PzError::InvalidInput(format!("invalid code at bit {}", consumed - 1))
            })?;
            if let Some(symbol) = trie.symbols[node] {
                out.push(symbol);
                node = 0;
            }
        }
        if out.len() != count {
            return Err(PzError::InvalidInput(format!(
                "bitstream ended after {} of {count} symbols",
                out.len()
            )));
        }
        if consumed != bits.len() {
            return Err(PzError::InvalidInput(format!(
                "{} trailing bits after {count} symbols",
                bits.len() - consumed
            )));
        }
        Ok(out)
    }
}

/// Binary trie over the codes, node 0 is the root.
struct DecodeTrie {
    children: Vec<[Option<usize>; 2]>,
    symbols: Vec<Option<u8>>,
}

impl DecodeTrie {
    fn new(book: &CodeBook) -> PzResult<Self> {
        let mut trie = DecodeTrie {
            children: vec![[None, None]],
            symbols: vec![None],
        };
        for (symbol, code) in book.iter() {
            let mut node = 0;
            for bit in code.iter().by_vals() {
                if trie.symbols[node].is_some() {
                    return Err(PzError::InvalidInput("codebook is not prefix-free".into()));
                }
                node = match trie.children[node][bit as usize] {
                    Some(next) => next,
                    None => {
                        trie.children.push([None, None]);
                        trie.symbols.push(None);
                        let next = trie.children.len() - 1;
                        trie.children[node][bit as usize] = Some(next);
                        next
                    }
                };
            }
            if trie.symbols[node].is_some() || trie.children[node] != [None, None] {
                return Err(PzError::InvalidInput("codebook is not prefix-free".into()));
            }
            trie.symbols[node] = Some(symbol);
        }
        Ok(trie)
    }
}
