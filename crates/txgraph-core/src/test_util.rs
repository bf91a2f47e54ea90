//! Shared test helpers for `txgraph-core` unit tests.
//!
//! Builders for lookup responses (`remote_output`, `tx_details`), codec
//! reports, and graph-level values (`resolved_utxo`, `decoded_tx`,
//! `tx_node`) so that tests across modules share one source of dummy data.

use std::collections::BTreeMap;

use crate::codec::CodecReport;
use crate::lookup::{RemoteAmount, RemoteOutput, TxDetails};
use crate::types::{DecodedTx, Network, Point, TransactionNode, UtxoKey, UtxoNode, UtxoPointer};

// ==============================================================================
// Lookup Responses
// ==============================================================================

pub fn pointer(tx_hash: &str, index: u32) -> UtxoPointer {
    UtxoPointer {
        tx_hash: tx_hash.to_owned(),
        index,
    }
}

/// An output holding only `lovelace`, with no address or datum.
pub fn remote_output(output_index: u32, lovelace: u64) -> RemoteOutput {
    RemoteOutput {
        address: String::new(),
        amount: vec![RemoteAmount {
            unit: "lovelace".into(),
            quantity: lovelace.to_string(),
        }],
        output_index,
        data_hash: None,
        inline_datum: None,
        collateral: false,
        reference_script_hash: None,
    }
}

/// Details of a transaction confirmed at height 100 with no metadata.
pub fn tx_details(tx_hash: &str) -> TxDetails {
    TxDetails {
        hash: tx_hash.to_owned(),
        block: "b10c".into(),
        block_height: 100,
        block_time: 1_700_000_000,
        slot: 5_000,
        index: 0,
        fees: "170000".into(),
        size: 300,
        invalid_before: None,
        invalid_hereafter: None,
        valid_contract: true,
        metadata: Vec::new(),
    }
}

pub fn codec_report(raw: serde_json::Value) -> CodecReport {
    serde_json::from_value(raw).expect("test codec report must deserialize")
}

// ==============================================================================
// Graph Values
// ==============================================================================

/// A resolved UTXO worth `(index + 1)` ada.
pub fn resolved_utxo(tx_hash: &str, index: u32) -> UtxoNode {
    UtxoNode::new(tx_hash, index, u64::from(index + 1) * 1_000_000)
}

/// A mainnet transaction spending `inputs` and producing `outputs`
/// resolved outputs.
pub fn decoded_tx(tx_hash: &str, inputs: &[(&str, u32)], outputs: u32) -> DecodedTx {
    DecodedTx {
        network: Network::Mainnet,
        tx_hash: tx_hash.to_owned(),
        fee: 170_000,
        scripts_successful: true,
        inputs: inputs
            .iter()
            .map(|(hash, index)| resolved_utxo(hash, *index))
            .collect(),
        reference_inputs: Vec::new(),
        outputs: (0..outputs).map(|i| resolved_utxo(tx_hash, i)).collect(),
        mints: Vec::new(),
        block: None,
        validity_start: None,
        ttl: None,
        withdrawals: Vec::new(),
        metadata: BTreeMap::new(),
        certificates: Vec::new(),
        size: 250,
    }
}

/// A bare transaction node for layout tests.
pub fn tx_node(tx_hash: &str, inputs: &[(&str, u32)], outputs: u32) -> TransactionNode {
    TransactionNode {
        tx_hash: tx_hash.to_owned(),
        fee: 170_000,
        inputs: inputs
            .iter()
            .map(|(hash, index)| UtxoKey::new(*hash, *index))
            .collect(),
        reference_inputs: Vec::new(),
        outputs: (0..outputs).map(|i| UtxoKey::new(tx_hash, i)).collect(),
        mints: Vec::new(),
        scripts_successful: true,
        position: Point::default(),
        block: None,
        validity_start: None,
        ttl: None,
        withdrawals: Vec::new(),
        metadata: BTreeMap::new(),
        certificates: Vec::new(),
        size: 250,
        alias: String::new(),
    }
}
