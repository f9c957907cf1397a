#[macro_use]
extern crate serde;

mod ballot;
mod chain;
mod chaum_pedersen;
mod election;
mod elgamal;
mod encrypt;
mod error;
mod group;
mod hash;
mod hashed_elgamal;
mod manifest;
mod nonces;
mod precompute;
mod serde_hex;

pub use ballot::*;
pub use chain::*;
pub use chaum_pedersen::*;
pub use election::*;
pub use elgamal::*;
pub use encrypt::*;
pub use error::*;
pub use group::*;
pub use hash::*;
pub use hashed_elgamal::*;
pub use manifest::*;
pub use nonces::*;
pub use precompute::*;
pub use serde_hex::*;

#[cfg(test)]
mod tests;
