//! Remote indexing API abstraction layer.
//!
//! Defines the [`TxLookup`] trait and provides a Blockfrost-compatible
//! HTTP implementation ([`HttpLookup`]) plus a test mock (`mock::MockLookup`).

mod http_adapter;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use http_adapter::{HttpLookup, LookupConfig};
pub use types::{MetadataEntry, RemoteAmount, RemoteOutput, TxDetails};

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::Network;

/// Minimal trait covering the indexing API calls the graph needs.
///
/// Implementations own credentials and connection management; the network
/// is always passed explicitly.
#[async_trait]
pub trait TxLookup: Send + Sync {
    /// Recorded outputs of a transaction, in any order.
    async fn tx_outputs(
        &self,
        network: Network,
        tx_hash: &str,
    ) -> Result<Vec<RemoteOutput>, CoreError>;

    /// Raw transaction bytes (hex).
    async fn tx_cbor(&self, network: Network, tx_hash: &str) -> Result<String, CoreError>;

    /// Block context, size, validity interval and metadata.
    async fn tx_details(&self, network: Network, tx_hash: &str) -> Result<TxDetails, CoreError>;
}
