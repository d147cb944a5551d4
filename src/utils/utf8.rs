//! UTF-8 <-> code point conversion for needles and queries.
//!
//! Byte layouts are described by two constant tables: one for the lead/continuation
//! byte masks and one for the code point range each sequence length may encode.
//! Anything that is not well-formed UTF-8 (stray continuation bytes, truncated
//! sequences, overlong forms, surrogates, values above U+10FFFF) is rejected, so a
//! decoded needle always re-encodes to the exact bytes it came from.

use crate::dat::Character;

/// Lead-byte layout for one sequence length
struct ByteMask {
    /// Bits carrying payload
    mask: u8,
    /// Fixed marker bits (`byte & !mask == lead`)
    lead: u8,
}

/// Index 0 describes continuation bytes, 1..=4 lead bytes of that length
const BYTE_MASKS: [ByteMask; 5] = [
    ByteMask { mask: 0b0011_1111, lead: 0b1000_0000 },
    ByteMask { mask: 0b0111_1111, lead: 0b0000_0000 },
    ByteMask { mask: 0b0001_1111, lead: 0b1100_0000 },
    ByteMask { mask: 0b0000_1111, lead: 0b1110_0000 },
    ByteMask { mask: 0b0000_0111, lead: 0b1111_0000 },
];

/// Payload bits per continuation byte
const CONTINUATION_BITS: u32 = 6;

/// Inclusive code point range per sequence length (index 1..=4)
const CODE_POINT_RANGES: [(Character, Character); 5] = [
    (0, 0),
    (0x00_0000, 0x00_007F),
    (0x00_0080, 0x00_07FF),
    (0x00_0800, 0x00_FFFF),
    (0x01_0000, 0x10_FFFF),
];

/// Decoding failure: the byte offset where the malformed sequence starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8Error {
    pub offset: usize,
}

impl std::fmt::Display for Utf8Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid UTF-8 sequence at byte {}", self.offset)
    }
}

impl std::error::Error for Utf8Error {}

/// Length of the sequence introduced by `byte`, or `None` for a continuation
/// or otherwise invalid lead byte
#[inline]
pub fn sequence_length(byte: u8) -> Option<usize> {
    (1..=4).find(|&len| byte & !BYTE_MASKS[len].mask == BYTE_MASKS[len].lead)
}

/// Number of bytes needed to encode `code_point`, or `None` if it is not a
/// Unicode scalar value
#[inline]
pub fn encoded_length(code_point: Character) -> Option<usize> {
    if (0xD800..=0xDFFF).contains(&code_point) {
        return None;
    }
    (1..=4).find(|&len| {
        let (first, last) = CODE_POINT_RANGES[len];
        first <= code_point && code_point <= last
    })
}

#[inline]
fn is_continuation(byte: u8) -> bool {
    byte & !BYTE_MASKS[0].mask == BYTE_MASKS[0].lead
}

/// Decode one code point starting at `offset`; returns it with its byte length
pub fn decode_at(bytes: &[u8], offset: usize) -> Result<(Character, usize), Utf8Error> {
    let error = Utf8Error { offset };
    let lead = *bytes.get(offset).ok_or(error)?;
    let len = sequence_length(lead).ok_or(error)?;
    let tail = bytes.get(offset + 1..offset + len).ok_or(error)?;

    let shift = (len as u32 - 1) * CONTINUATION_BITS;
    let mut code_point = Character::from(lead & BYTE_MASKS[len].mask) << shift;

    for (i, &byte) in tail.iter().enumerate() {
        if !is_continuation(byte) {
            return Err(error);
        }
        let shift = (len as u32 - i as u32 - 2) * CONTINUATION_BITS;
        code_point |= Character::from(byte & BYTE_MASKS[0].mask) << shift;
    }

    // Overlong forms and surrogates would not survive a re-encode
    if encoded_length(code_point) != Some(len) {
        return Err(error);
    }

    Ok((code_point, len))
}

/// Decode a whole byte run into code points
pub fn decode(bytes: &[u8]) -> Result<Vec<Character>, Utf8Error> {
    let mut characters = Vec::with_capacity(bytes.len());
    let mut offset = 0;

    while offset < bytes.len() {
        let (code_point, len) = decode_at(bytes, offset)?;
        characters.push(code_point);
        offset += len;
    }

    Ok(characters)
}

/// Append the UTF-8 encoding of `code_point` to `out`.
/// Returns false (and writes nothing) for values that are not scalar values.
pub fn encode_into(code_point: Character, out: &mut Vec<u8>) -> bool {
    let Some(len) = encoded_length(code_point) else {
        return false;
    };

    let shift = (len as u32 - 1) * CONTINUATION_BITS;
    out.push(((code_point >> shift) as u8 & BYTE_MASKS[len].mask) | BYTE_MASKS[len].lead);

    for c in 1..len as u32 {
        let shift = (len as u32 - c - 1) * CONTINUATION_BITS;
        out.push(((code_point >> shift) as u8 & BYTE_MASKS[0].mask) | BYTE_MASKS[0].lead);
    }

    true
}

/// Encode a run of code points into a `String`, skipping invalid values
pub fn encode(characters: &[Character]) -> String {
    let mut bytes = Vec::with_capacity(characters.len());
    for &c in characters {
        encode_into(c, &mut bytes);
    }
    // encode_into only ever emits well-formed sequences
    String::from_utf8(bytes).unwrap_or_default()
}
