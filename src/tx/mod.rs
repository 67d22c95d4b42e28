//! Transaction Module
//!
//! Assembly, required-key negotiation, signing and submission.

mod builder;
mod keys;
mod params;
mod pipeline;
mod signer;
mod submitter;

pub use builder::*;
pub use keys::*;
pub use params::*;
pub use pipeline::*;
pub use signer::*;
pub use submitter::*;
