//! The LSP2 `CompactBytesArray` codec.
//!
//! Every element is stored as a big-endian `uint16` length followed by the element bytes:
//!
//! ```text
//! 0x 0020 <32 bytes> 0004 <4 bytes> ...
//! ```

use alloy_primitives::Bytes;

/// Errors raised while decoding restriction lists stored in the account.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A length prefix points past the end of the value.
    #[error("compact bytes array element at offset {offset} overflows the value")]
    Truncated {
        /// Offset of the offending length prefix.
        offset: usize,
    },
    /// An element has a length the schema does not allow.
    #[error("invalid element length {length} at offset {offset}")]
    InvalidElementLength {
        /// Offset of the offending length prefix.
        offset: usize,
        /// The decoded length.
        length: usize,
    },
    /// An allowed call entry uses the wildcard for target, interface id and selector at once.
    #[error("allowed call entry at index {index} allows every call")]
    WildcardCall {
        /// Index of the offending entry.
        index: usize,
    },
}

/// Splits a `CompactBytesArray` into its elements.
pub fn decode_compact_bytes_array(value: &[u8]) -> Result<Vec<&[u8]>, CodecError> {
    let mut elements = Vec::new();
    let mut offset = 0;
    while offset < value.len() {
        let header = value.get(offset..offset + 2).ok_or(CodecError::Truncated { offset })?;
        let length = u16::from_be_bytes([header[0], header[1]]) as usize;
        let element =
            value.get(offset + 2..offset + 2 + length).ok_or(CodecError::Truncated { offset })?;
        elements.push(element);
        offset += 2 + length;
    }
    Ok(elements)
}

/// Encodes elements as a `CompactBytesArray`.
///
/// # Panics
///
/// Panics if an element is longer than `u16::MAX` bytes.
pub fn encode_compact_bytes_array<I, T>(elements: I) -> Bytes
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for element in elements {
        let element = element.as_ref();
        let length = u16::try_from(element.len()).expect("compact element exceeds u16::MAX bytes");
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(element);
    }
    out.into()
}
