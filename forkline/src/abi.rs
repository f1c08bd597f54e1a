//! Minimal ABI word codec.
//!
//! Covers the value types that appear in the collection's events and read
//! functions: unsigned integers, addresses, `bytes32` and dynamic strings.

use std::fmt;

use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Size of one ABI word in bytes.
pub const WORD: usize = 32;

/// Errors raised while decoding ABI-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Fewer bytes than the layout requires
    #[error("data too short: need {needed} bytes, got {got}")]
    DataTooShort { needed: usize, got: usize },

    /// A word does not hold a valid value of the expected kind
    #[error("invalid {kind} word")]
    InvalidWord { kind: AbiKind },

    /// Dynamic offset or length points outside the data
    #[error("offset out of bounds: {0}")]
    BadOffset(String),

    /// String payload is not UTF-8
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

/// ABI type of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiKind {
    /// `uintN`, with N in bits
    Uint(u16),
    Address,
    Bytes32,
    String,
}

impl AbiKind {
    /// Canonical type name used in signatures.
    pub fn type_name(&self) -> String {
        match self {
            AbiKind::Uint(bits) => format!("uint{}", bits),
            AbiKind::Address => "address".to_string(),
            AbiKind::Bytes32 => "bytes32".to_string(),
            AbiKind::String => "string".to_string(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, AbiKind::String)
    }
}

impl fmt::Display for AbiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

/// A decoded ABI value. Integers keep full 256-bit precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Uint(U256),
    Address(Address),
    Bytes32(B256),
    String(String),
}

impl AbiValue {
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            AbiValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Uint(v) => write!(f, "{}", v),
            AbiValue::Address(a) => write!(f, "0x{}", hex::encode(a.as_slice())),
            AbiValue::Bytes32(b) => write!(f, "0x{}", hex::encode(b.as_slice())),
            AbiValue::String(s) => f.write_str(s),
        }
    }
}

impl Serialize for AbiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// First four bytes of keccak256 over a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Build calldata: selector followed by encoded arguments.
pub fn encode_call(signature: &str, args: &[AbiValue]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(encode(args));
    data
}

/// Head/tail encoding of a parameter list.
pub fn encode(values: &[AbiValue]) -> Vec<u8> {
    let head_len = values.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for value in values {
        match value {
            AbiValue::String(s) => {
                head.extend_from_slice(&usize_word(head_len + tail.len()));
                tail.extend_from_slice(&usize_word(s.len()));
                tail.extend_from_slice(s.as_bytes());
                let pad = (WORD - s.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(pad));
            }
            other => head.extend_from_slice(&static_word(other)),
        }
    }

    head.extend(tail);
    head
}

/// Encode a static value as a single word. Strings are not static.
pub fn static_word(value: &AbiValue) -> [u8; WORD] {
    match value {
        AbiValue::Uint(v) => v.to_be_bytes::<WORD>(),
        AbiValue::Address(a) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(a.as_slice());
            word
        }
        AbiValue::Bytes32(b) => b.0,
        AbiValue::String(s) => keccak256(s.as_bytes()).0,
    }
}

/// Decode one static word as `kind`.
///
/// Dynamic kinds in indexed position arrive hashed; they decode to `Bytes32`.
pub fn decode_word(kind: AbiKind, word: &[u8; WORD]) -> Result<AbiValue, AbiError> {
    match kind {
        AbiKind::Uint(bits) => {
            let value = U256::from_be_bytes::<WORD>(*word);
            if value.bit_len() > bits as usize {
                return Err(AbiError::InvalidWord { kind });
            }
            Ok(AbiValue::Uint(value))
        }
        AbiKind::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(AbiError::InvalidWord { kind });
            }
            Ok(AbiValue::Address(Address::from_slice(&word[12..])))
        }
        AbiKind::Bytes32 | AbiKind::String => Ok(AbiValue::Bytes32(B256::from(*word))),
    }
}

/// Decode a parameter list from head/tail encoded `data`.
///
/// Trailing bytes past the last field are tolerated.
pub fn decode(kinds: &[AbiKind], data: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
    let head_len = kinds.len() * WORD;
    if data.len() < head_len {
        return Err(AbiError::DataTooShort {
            needed: head_len,
            got: data.len(),
        });
    }

    kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let word = word_at(data, i * WORD)?;
            match kind {
                AbiKind::String => decode_string_at(data, word_to_usize(&word)?),
                _ => decode_word(*kind, &word),
            }
        })
        .collect()
}

/// Decode a single `uint256` return value.
pub fn decode_uint(data: &[u8]) -> Result<U256, AbiError> {
    let word = word_at(data, 0)?;
    Ok(U256::from_be_bytes::<WORD>(word))
}

/// Decode a single `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String, AbiError> {
    match decode(&[AbiKind::String], data)?.pop() {
        Some(AbiValue::String(s)) => Ok(s),
        _ => Err(AbiError::InvalidWord {
            kind: AbiKind::String,
        }),
    }
}

/// Narrow a 256-bit integer to a token id, if it fits.
pub fn to_u64(value: U256) -> Option<u64> {
    let limbs = value.as_limbs();
    if limbs[1..].iter().all(|l| *l == 0) {
        Some(limbs[0])
    } else {
        None
    }
}

fn decode_string_at(data: &[u8], offset: usize) -> Result<AbiValue, AbiError> {
    let len_word = word_at(data, offset)?;
    let len = word_to_usize(&len_word)?;
    let start = offset
        .checked_add(WORD)
        .ok_or_else(|| AbiError::BadOffset(format!("string offset {}", offset)))?;
    let end = start
        .checked_add(len)
        .ok_or_else(|| AbiError::BadOffset(format!("string length {}", len)))?;
    if end > data.len() {
        return Err(AbiError::BadOffset(format!(
            "string [{}..{}] past {} bytes",
            start,
            end,
            data.len()
        )));
    }
    let s = std::str::from_utf8(&data[start..end]).map_err(|_| AbiError::InvalidUtf8)?;
    Ok(AbiValue::String(s.to_string()))
}

fn word_at(data: &[u8], offset: usize) -> Result<[u8; WORD], AbiError> {
    let end = offset
        .checked_add(WORD)
        .ok_or_else(|| AbiError::BadOffset(format!("word at {}", offset)))?;
    if end > data.len() {
        return Err(AbiError::DataTooShort {
            needed: end,
            got: data.len(),
        });
    }
    let mut word = [0u8; WORD];
    word.copy_from_slice(&data[offset..end]);
    Ok(word)
}

fn word_to_usize(word: &[u8; WORD]) -> Result<usize, AbiError> {
    to_u64(U256::from_be_bytes::<WORD>(*word))
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| AbiError::BadOffset("offset does not fit in usize".to_string()))
}

fn usize_word(value: usize) -> [u8; WORD] {
    U256::from(value as u64).to_be_bytes::<WORD>()
}
