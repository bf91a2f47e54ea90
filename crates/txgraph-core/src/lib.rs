pub mod cache;
pub mod codec;
pub mod decode;
pub mod enrich;
pub mod error;
pub mod graph;
pub mod layout;
pub mod lookup;
pub mod normalize;
pub mod resolve;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::CoreError;
pub use graph::{MergeOutcome, SharedGraph, TransactionGraph};
pub use types::{DecodedTx, Network, UtxoKey};
