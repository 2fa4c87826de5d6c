//! Legacy transaction envelope decoding.

pub mod decoder;

pub use decoder::{decode_legacy, DecodeError, DecodedEnvelope};
