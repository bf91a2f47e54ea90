use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{CoreError, LookupError};
use crate::types::Network;

use super::types::{RemoteOutput, TxDetails};
use super::TxLookup;

/// A mock indexing API for testing. Returns canned outputs, CBOR and
/// details from maps populated via the builder pattern, and counts the
/// calls it receives.
pub struct MockLookup {
    outputs: HashMap<String, Vec<RemoteOutput>>,
    cbor: HashMap<String, String>,
    details: HashMap<String, TxDetails>,
    failing: HashSet<String>,
    output_calls: AtomicUsize,
}

impl MockLookup {
    pub fn builder() -> MockLookupBuilder {
        MockLookupBuilder {
            outputs: HashMap::new(),
            cbor: HashMap::new(),
            details: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    /// Number of `tx_outputs` calls served so far (including failures).
    pub fn output_calls(&self) -> usize {
        self.output_calls.load(Ordering::SeqCst)
    }

    fn not_found(network: Network, path: String) -> CoreError {
        LookupError::NotFound(format!("{network}{path}")).into()
    }

    fn check_failing(&self, tx_hash: &str) -> Result<(), CoreError> {
        if self.failing.contains(tx_hash) {
            return Err(LookupError::Status {
                status: 500,
                message: format!("injected failure for {tx_hash}"),
            }
            .into());
        }
        Ok(())
    }
}

pub struct MockLookupBuilder {
    outputs: HashMap<String, Vec<RemoteOutput>>,
    cbor: HashMap<String, String>,
    details: HashMap<String, TxDetails>,
    failing: HashSet<String>,
}

impl MockLookupBuilder {
    pub fn with_outputs(mut self, tx_hash: &str, outputs: Vec<RemoteOutput>) -> Self {
        self.outputs.insert(tx_hash.to_owned(), outputs);
        self
    }

    pub fn with_cbor(mut self, tx_hash: &str, cbor: &str) -> Self {
        self.cbor.insert(tx_hash.to_owned(), cbor.to_owned());
        self
    }

    pub fn with_details(mut self, details: TxDetails) -> Self {
        self.details.insert(details.hash.clone(), details);
        self
    }

    /// Every call naming `tx_hash` fails with a server error.
    pub fn failing(mut self, tx_hash: &str) -> Self {
        self.failing.insert(tx_hash.to_owned());
        self
    }

    pub fn build(self) -> MockLookup {
        MockLookup {
            outputs: self.outputs,
            cbor: self.cbor,
            details: self.details,
            failing: self.failing,
            output_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TxLookup for MockLookup {
    async fn tx_outputs(
        &self,
        network: Network,
        tx_hash: &str,
    ) -> Result<Vec<RemoteOutput>, CoreError> {
        self.output_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(tx_hash)?;
        self.outputs
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| Self::not_found(network, format!("/txs/{tx_hash}/utxos")))
    }

    async fn tx_cbor(&self, network: Network, tx_hash: &str) -> Result<String, CoreError> {
        self.check_failing(tx_hash)?;
        self.cbor
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| Self::not_found(network, format!("/txs/{tx_hash}/cbor")))
    }

    async fn tx_details(&self, network: Network, tx_hash: &str) -> Result<TxDetails, CoreError> {
        self.check_failing(tx_hash)?;
        self.details
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| Self::not_found(network, format!("/txs/{tx_hash}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::remote_output;

    #[tokio::test]
    async fn serves_canned_outputs_and_counts_calls() {
        let lookup = MockLookup::builder()
            .with_outputs("aa", vec![remote_output(0, 1_000_000)])
            .build();

        let outputs = lookup.tx_outputs(Network::Preview, "aa").await.unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(lookup.tx_outputs(Network::Preview, "bb").await.is_err());
        assert_eq!(lookup.output_calls(), 2);
    }

    #[tokio::test]
    async fn failing_hash_returns_status_error() {
        let lookup = MockLookup::builder()
            .with_outputs("aa", vec![remote_output(0, 1)])
            .failing("aa")
            .build();

        let err = lookup.tx_outputs(Network::Mainnet, "aa").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Lookup(LookupError::Status { status: 500, .. })
        ));
    }
}
