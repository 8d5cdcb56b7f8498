//! SPSS "encrypted" passwords
//!
//! SPSS calls these encrypted, but they are a one-to-many encoding: each of
//! the first 10 plaintext bytes becomes a pair of printable ASCII characters,
//! and each plaintext byte has many possible pairs. An encoded password is
//! therefore an even number of characters long and at most 20 characters.
//!
//! For a pair `(a, b)`, the high nibble of the plaintext byte is the single
//! value allowed by both `AH[a >> 4]` and `BH[b >> 4]`, and the low nibble the
//! single value allowed by both `AL[a & 15]` and `BL[b & 15]`.

use zeroize::Zeroizing;

use crate::{MAX_ENCODED_LEN, MAX_PASSWORD_LEN};

const fn b(x: u32) -> u16 {
    1 << x
}

/// Each row is `(encoded nibbles, plaintext nibbles)`.
type NibbleTable = [[u16; 2]; 4];

static AH: NibbleTable = [
    [b(2), b(2) | b(3) | b(6) | b(7)],
    [b(3), b(0) | b(1) | b(4) | b(5)],
    [b(4) | b(7), b(8) | b(9) | b(12) | b(13)],
    [b(5) | b(6), b(10) | b(11) | b(14) | b(15)],
];

static AL: NibbleTable = [
    [b(0) | b(3) | b(12) | b(15), b(0) | b(1) | b(4) | b(5)],
    [b(1) | b(2) | b(13) | b(14), b(2) | b(3) | b(6) | b(7)],
    [b(4) | b(7) | b(8) | b(11), b(8) | b(9) | b(12) | b(13)],
    [b(5) | b(6) | b(9) | b(10), b(10) | b(11) | b(14) | b(15)],
];

static BH: NibbleTable = [
    [b(2), b(1) | b(3) | b(9) | b(11)],
    [b(3), b(0) | b(2) | b(8) | b(10)],
    [b(4) | b(7), b(4) | b(6) | b(12) | b(14)],
    [b(5) | b(6), b(5) | b(7) | b(13) | b(15)],
];

static BL: NibbleTable = [
    [b(0) | b(3) | b(12) | b(15), b(0) | b(2) | b(8) | b(10)],
    [b(1) | b(2) | b(13) | b(14), b(1) | b(3) | b(9) | b(11)],
    [b(4) | b(7) | b(8) | b(11), b(4) | b(6) | b(12) | b(14)],
    [b(5) | b(6) | b(9) | b(10), b(5) | b(7) | b(13) | b(15)],
];

/// Set of plaintext nibbles consistent with encoded nibble `nibble`.
fn decode_nibble(table: &NibbleTable, nibble: u8) -> u16 {
    table
        .iter()
        .find(|row| row[0] & (1 << nibble) != 0)
        .map_or(0, |row| row[1])
}

/// Index of the only set bit, if exactly one is set.
fn single_bit(x: u16) -> Option<u8> {
    x.is_power_of_two().then(|| x.trailing_zeros() as u8)
}

fn decode_pair(a: u8, b: u8) -> Option<u8> {
    let hi = single_bit(decode_nibble(&AH, a >> 4) & decode_nibble(&BH, b >> 4))?;
    let lo = single_bit(decode_nibble(&AL, a & 15) & decode_nibble(&BL, b & 15))?;
    Some((hi << 4) | lo)
}

/// Decode an SPSS encoded password.
///
/// Returns `None` when `encoded` is not a valid encoding (odd length, longer
/// than 20 bytes, or a pair that does not decode to exactly one byte). That is
/// not an error: callers then treat the input as a literal password.
pub fn decode_password(encoded: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if encoded.len() > MAX_ENCODED_LEN || encoded.len() % 2 != 0 {
        return None;
    }

    let mut plaintext = Zeroizing::new(Vec::with_capacity(encoded.len() / 2));
    for pair in encoded.chunks_exact(2) {
        plaintext.push(decode_pair(pair[0], pair[1])?);
    }
    Some(plaintext)
}

/// Encoded nibbles whose row in `table` produces plaintext nibble `nibble`.
fn encode_nibble(table: &NibbleTable, nibble: u8) -> Vec<u8> {
    let Some(row) = table.iter().find(|row| row[1] & (1 << nibble) != 0) else {
        return Vec::new();
    };
    (0..16u8).filter(|n| row[0] & (1 << n) != 0).collect()
}

fn encode_char(hi_table: &NibbleTable, lo_table: &NibbleTable, byte: u8) -> Vec<u8> {
    let his = encode_nibble(hi_table, byte >> 4);
    let los = encode_nibble(lo_table, byte & 15);
    his.iter()
        .flat_map(|hi| los.iter().map(move |lo| (hi << 4) | lo))
        .filter(|c| *c != 0x7f)
        .collect()
}

/// A plaintext password in SPSS encoded form.
///
/// Each position holds every character that may appear there, so one
/// plaintext maps to between `16^n` and `32^n` encodings of length `2n`.
#[derive(Clone, Debug)]
pub struct EncodedPassword {
    positions: Vec<Vec<u8>>,
}

impl EncodedPassword {
    /// Encode the first 10 bytes (at most) of `plaintext`.
    pub fn from_plaintext(plaintext: &[u8]) -> Self {
        let plaintext = plaintext.get(..MAX_PASSWORD_LEN).unwrap_or(plaintext);
        let positions = plaintext
            .iter()
            .flat_map(|&byte| [encode_char(&AH, &AL, byte), encode_char(&BH, &BL, byte)])
            .collect();
        Self { positions }
    }

    /// Number of distinct encodings.
    pub fn n_variants(&self) -> u64 {
        self.positions.iter().map(|chars| chars.len() as u64).product()
    }

    /// Encoding number `index` (taken modulo [`Self::n_variants`]). The first
    /// position varies fastest.
    pub fn variant(&self, mut index: u64) -> String {
        let mut out = String::with_capacity(self.positions.len());
        for chars in &self.positions {
            let n = chars.len() as u64;
            out.push(chars[(index % n) as usize] as char);
            index /= n;
        }
        out
    }
}
