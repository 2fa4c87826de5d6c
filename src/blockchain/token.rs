//! ERC-20 read-call helpers for the chain-info endpoints.
//!
//! Calldata is built by hand: these are four fixed selectors and one
//! left-padded address argument, not worth an ABI dependency.

use alloy::primitives::{Address, Bytes, U256};

pub const SELECTOR_DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
pub const SELECTOR_TOTAL_SUPPLY: [u8; 4] = [0x18, 0x16, 0x0d, 0xdd];
pub const SELECTOR_OWNER: [u8; 4] = [0x8d, 0xa5, 0xcb, 0x5b];
pub const SELECTOR_BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Calldata for a no-argument view call.
pub fn selector_calldata(selector: [u8; 4]) -> Bytes {
    selector.to_vec().into()
}

/// `balanceOf(address)` calldata: selector plus the address left-padded
/// to a 32-byte word.
pub fn balance_of_calldata(holder: Address) -> Bytes {
    let mut out = Vec::with_capacity(36);
    out.extend_from_slice(&SELECTOR_BALANCE_OF);
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(holder.as_slice());
    out.into()
}

/// Decode an ABI return word as an unsigned integer.
pub fn word_to_u256(data: &[u8]) -> Option<U256> {
    (!data.is_empty() && data.len() <= 32).then(|| U256::from_be_slice(data))
}

/// Decode an ABI return word as an address (low 20 bytes).
pub fn word_to_address(data: &[u8]) -> Option<Address> {
    (data.len() >= 20).then(|| Address::from_slice(&data[data.len() - 20..]))
}

/// Format a raw token amount with `decimals` fractional digits,
/// trimming trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let digits = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (integral, fractional) = digits.split_at(digits.len() - decimals);
    let fractional = fractional.trim_end_matches('0');
    if fractional.is_empty() {
        integral.to_string()
    } else {
        format!("{integral}.{fractional}")
    }
}
