//! Derived per-transaction figures for the presentation layer.
//!
//! Provides the total output value, a compact summary, and extraction of
//! the human-readable message carried in transaction metadata.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::graph::TransactionGraph;
use crate::types::TransactionNode;

/// Metadata label reserved for transaction messages.
pub const MESSAGE_LABEL: &str = "674";

// ==============================================================================
// Totals
// ==============================================================================

/// Sum of the native value of every output of `tx_hash`.
///
/// Summed in `u128` so that no combination of `u64` outputs can overflow.
pub fn total_output_lovelace(graph: &TransactionGraph, tx_hash: &str) -> Result<u128, CoreError> {
    Ok(graph
        .outputs_of(tx_hash)?
        .iter()
        .map(|utxo| u128::from(utxo.lovelace))
        .sum())
}

// ==============================================================================
// Summary
// ==============================================================================

/// Counts and totals shown next to a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxSummary {
    pub tx_hash: String,
    pub alias: String,
    pub fee: u64,
    pub input_count: usize,
    pub reference_input_count: usize,
    pub output_count: usize,
    pub mint_count: usize,
    pub burn_count: usize,
    pub total_output_lovelace: u128,
    pub message: Option<Vec<String>>,
}

pub fn tx_summary(graph: &TransactionGraph, tx_hash: &str) -> Result<TxSummary, CoreError> {
    let total_output_lovelace = total_output_lovelace(graph, tx_hash)?;
    let tx: &TransactionNode = graph
        .transaction(tx_hash)
        .ok_or_else(|| CoreError::TxNotInGraph(tx_hash.to_owned()))?;

    Ok(TxSummary {
        tx_hash: tx.tx_hash.clone(),
        alias: tx.alias.clone(),
        fee: tx.fee,
        input_count: tx.inputs.len(),
        reference_input_count: tx.reference_inputs.len(),
        output_count: tx.outputs.len(),
        mint_count: tx.mints.iter().filter(|a| a.amount > 0).count(),
        burn_count: tx.mints.iter().filter(|a| a.amount < 0).count(),
        total_output_lovelace,
        message: metadata_message(&tx.metadata),
    })
}

// ==============================================================================
// Metadata Message
// ==============================================================================

/// The `msg` lines under the message label, if present.
///
/// A single string is accepted as a one-line message; non-string entries
/// of a list are skipped.
#[must_use]
pub fn metadata_message(metadata: &BTreeMap<String, serde_json::Value>) -> Option<Vec<String>> {
    let msg = metadata.get(MESSAGE_LABEL)?.get("msg")?;
    match msg {
        serde_json::Value::String(line) => Some(vec![line.clone()]),
        serde_json::Value::Array(lines) => Some(
            lines
                .iter()
                .filter_map(|line| line.as_str().map(str::to_owned))
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{decoded_tx, resolved_utxo};
    use crate::types::{Asset, Network};

    #[test]
    fn total_output_value_does_not_overflow() {
        let mut graph = TransactionGraph::new(Network::Mainnet);
        let mut tx = decoded_tx("t1", &[], 3);
        for output in &mut tx.outputs {
            output.lovelace = u64::MAX;
        }
        graph.merge_transaction(tx).unwrap();

        assert_eq!(
            total_output_lovelace(&graph, "t1").unwrap(),
            3 * u128::from(u64::MAX)
        );
        assert!(total_output_lovelace(&graph, "nope").is_err());
    }

    #[test]
    fn summary_counts_inputs_and_mints() {
        let mut graph = TransactionGraph::new(Network::Mainnet);
        let mut tx = decoded_tx("t1", &[("p", 0), ("p", 1)], 2);
        let mut reference = tx.inputs.pop().unwrap();
        reference.is_reference_input = true;
        tx.reference_inputs.push(reference);
        tx.mints = vec![
            Asset {
                policy_id: "pp".into(),
                asset_name: "aa".into(),
                amount: 5,
            },
            Asset {
                policy_id: "pp".into(),
                asset_name: "bb".into(),
                amount: -1,
            },
        ];
        tx.metadata.insert(
            MESSAGE_LABEL.into(),
            serde_json::json!({ "msg": ["rent", "march"] }),
        );
        graph.merge_transaction(tx).unwrap();

        let summary = tx_summary(&graph, "t1").unwrap();
        assert_eq!(summary.input_count, 1);
        assert_eq!(summary.reference_input_count, 1);
        assert_eq!(summary.output_count, 2);
        assert_eq!(summary.mint_count, 1);
        assert_eq!(summary.burn_count, 1);
        assert_eq!(
            summary.message,
            Some(vec!["rent".to_owned(), "march".to_owned()])
        );
    }

    #[test]
    fn reference_count_follows_each_transaction() {
        let mut graph = TransactionGraph::new(Network::Mainnet);
        graph.merge_transaction(decoded_tx("a", &[], 1)).unwrap();
        let mut reader = decoded_tx("b", &[("p", 0)], 1);
        reader.reference_inputs.push(resolved_utxo("a", 0));
        graph.merge_transaction(reader).unwrap();
        graph
            .merge_transaction(decoded_tx("c", &[("a", 0)], 1))
            .unwrap();

        let b = tx_summary(&graph, "b").unwrap();
        assert_eq!((b.input_count, b.reference_input_count), (1, 1));
        let c = tx_summary(&graph, "c").unwrap();
        assert_eq!((c.input_count, c.reference_input_count), (1, 0));
    }

    #[test]
    fn message_requires_label_and_msg_key() {
        let mut metadata = BTreeMap::new();
        assert_eq!(metadata_message(&metadata), None);
        metadata.insert("1".into(), serde_json::json!({ "msg": ["x"] }));
        assert_eq!(metadata_message(&metadata), None);
        metadata.insert(MESSAGE_LABEL.into(), serde_json::json!({ "msg": "hello" }));
        assert_eq!(metadata_message(&metadata), Some(vec!["hello".to_owned()]));
    }
}
