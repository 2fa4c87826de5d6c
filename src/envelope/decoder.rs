//! Minimal recursive-length-prefix decoder for legacy transaction
//! envelopes.
//!
//! # Responsibilities
//! - Walk the nested length-prefixed encoding without ever panicking
//! - Extract the three fields policy needs: `to`, call data, and `v`
//! - Derive the chain id from `v` where the signature encodes one
//!
//! Only the legacy nine-field envelope (`nonce, gasPrice, gasLimit, to,
//! value, data, v, r, s`) is supported. Typed envelopes and anything
//! else that does not decode to a list of at least nine items fail with
//! [`DecodeError`].

use alloy::primitives::{Address, Bytes};
use thiserror::Error;

/// Decode failure. Deliberately opaque: callers get a single error
/// shape so parser internals never leak into responses.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("not a legacy transaction envelope")]
pub struct DecodeError;

/// Fields extracted from a legacy envelope. Immutable after decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEnvelope {
    /// Destination contract. `None` means contract creation, which the
    /// policy layer always rejects.
    pub to: Option<Address>,
    /// Call data (envelope index 5). Empty for plain value transfers.
    pub data: Bytes,
    /// Chain id derived from `v`, absent for pre-chain-id signatures.
    pub chain_id: Option<u64>,
}

enum Item<'a> {
    Bytes(&'a [u8]),
    List(Vec<Item<'a>>),
}

/// Decode a raw legacy transaction envelope.
///
/// The top-level item must be a list of at least nine items; trailing
/// items beyond index 8 are tolerated and ignored, as are trailing
/// bytes after the list itself.
pub fn decode_legacy(raw: &[u8]) -> Result<DecodedEnvelope, DecodeError> {
    let (top, _) = decode_item(raw, 0, 0)?;
    let items = match top {
        Item::List(items) if items.len() >= 9 => items,
        _ => return Err(DecodeError),
    };

    let to = match &items[3] {
        Item::Bytes(b) if b.is_empty() => None,
        Item::Bytes(b) if b.len() == 20 => Some(Address::from_slice(b)),
        _ => return Err(DecodeError),
    };
    let data = match &items[5] {
        Item::Bytes(b) => Bytes::copy_from_slice(b),
        Item::List(_) => return Err(DecodeError),
    };
    let v = match &items[6] {
        Item::Bytes(b) => be_u64(b)?,
        Item::List(_) => return Err(DecodeError),
    };

    // EIP-155: v >= 35 folds the chain id into the recovery value.
    let chain_id = if v >= 35 { Some((v - 35) / 2) } else { None };

    Ok(DecodedEnvelope { to, data, chain_id })
}

/// A legacy envelope is a flat list of byte strings; one extra level of
/// list nesting is tolerated for trailing items, nothing deeper.
/// Without the bound, a run of one-item list headers would drive one
/// stack frame per input byte.
const MAX_LIST_DEPTH: usize = 2;

fn decode_item(buf: &[u8], i: usize, depth: usize) -> Result<(Item<'_>, usize), DecodeError> {
    let b0 = *buf.get(i).ok_or(DecodeError)?;
    match b0 {
        // Single literal byte.
        0x00..=0x7f => Ok((Item::Bytes(&buf[i..i + 1]), i + 1)),
        // Short byte string, length in the leading byte.
        0x80..=0xb7 => {
            let end = i + 1 + (b0 - 0x80) as usize;
            if end > buf.len() {
                return Err(DecodeError);
            }
            Ok((Item::Bytes(&buf[i + 1..end]), end))
        }
        // Long byte string, length itself length-prefixed.
        0xb8..=0xbf => {
            let ll = (b0 - 0xb7) as usize;
            let len = read_len(buf, i + 1, ll)?;
            let start = i + 1 + ll;
            let end = start.checked_add(len).ok_or(DecodeError)?;
            if end > buf.len() {
                return Err(DecodeError);
            }
            Ok((Item::Bytes(&buf[start..end]), end))
        }
        // Short list.
        0xc0..=0xf7 => decode_list(buf, i + 1, (b0 - 0xc0) as usize, depth),
        // Long list.
        _ => {
            let ll = (b0 - 0xf7) as usize;
            let len = read_len(buf, i + 1, ll)?;
            decode_list(buf, i + 1 + ll, len, depth)
        }
    }
}

fn decode_list(
    buf: &[u8],
    start: usize,
    len: usize,
    depth: usize,
) -> Result<(Item<'_>, usize), DecodeError> {
    if depth >= MAX_LIST_DEPTH {
        return Err(DecodeError);
    }
    let end = start.checked_add(len).ok_or(DecodeError)?;
    if end > buf.len() {
        return Err(DecodeError);
    }
    let mut items = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let (item, next) = decode_item(buf, cursor, depth + 1)?;
        // An item may not run past its enclosing list.
        if next > end {
            return Err(DecodeError);
        }
        items.push(item);
        cursor = next;
    }
    Ok((Item::List(items), end))
}

fn read_len(buf: &[u8], at: usize, width: usize) -> Result<usize, DecodeError> {
    let end = at.checked_add(width).ok_or(DecodeError)?;
    let bytes = buf.get(at..end).ok_or(DecodeError)?;
    let mut len = 0usize;
    for &b in bytes {
        len = len
            .checked_mul(256)
            .and_then(|l| l.checked_add(b as usize))
            .ok_or(DecodeError)?;
    }
    Ok(len)
}

fn be_u64(bytes: &[u8]) -> Result<u64, DecodeError> {
    if bytes.len() > 8 {
        return Err(DecodeError);
    }
    Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}
