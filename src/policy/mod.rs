//! Transfer policy enforcement.

pub mod validator;

pub use validator::{
    AmountCheck, Policy, PolicyError, PolicyOutcome, PolicyViolation, TRANSFER_SELECTOR,
};
