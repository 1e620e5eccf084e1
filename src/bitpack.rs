//! Bitstring packing.
//!
//! Codes and encoded streams are sequences of bits ([`Bits`]). Storage is
//! byte-aligned: [`pack`] pads with zero bits up to the next multiple of
//! eight and reports how many it added, [`unpack`] reverses it.

use bitvec::prelude::*;

use crate::{PzError, PzResult};

/// An owned bit sequence, most significant bit first within each byte.
pub type Bits = BitVec<u8, Msb0>;

/// Pack a bitstring into bytes, MSB-first.
///
/// Returns the bytes and the number of zero bits appended (0-7).
pub fn pack(bits: &BitSlice<u8, Msb0>) -> (Vec<u8>, u8) {
    let mut out = Vec::with_capacity(bits.len().div_ceil(8));
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, bit) in chunk.iter().by_vals().enumerate() {
            if bit {
                byte |= 0x80 >> i;
            }
        }
        out.push(byte);
    }
    let padding = (out.len() * 8 - bits.len()) as u8;
    (out, padding)
}

/// Expand bytes MSB-first and drop the trailing `padding` bits.
pub fn unpack(bytes: &[u8], padding: u8) -> PzResult<Bits> {
    if padding > 7 {
        return Err(PzError::InvalidInput(format!(
            "padding of {padding} bits exceeds one byte"
        )));
    }
    if bytes.is_empty() && padding != 0 {
        return Err(PzError::InvalidInput(
            "padding declared for an empty bitstream".into(),
        ));
    }
    let mut bits = Bits::from_slice(bytes);
    bits.truncate(bytes.len() * 8 - padding as usize);
    Ok(bits)
}

/// Parse a `'0'`/`'1'` string into bits.
pub fn parse_bits(text: &str) -> PzResult<Bits> {
    text.chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => Err(PzError::InvalidInput(format!(
                "'{other}' is not a bit"
            ))),
        })
        .collect()
}

/// Render bits as a `'0'`/`'1'` string.
pub fn to_bit_string(bits: &BitSlice<u8, Msb0>) -> String {
    bits.iter()
        .by_vals()
        .map(|b| if b { '1' } else { '0' })
        .collect()
}
