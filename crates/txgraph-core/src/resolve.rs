use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, trace};

use crate::cache::Cache;
use crate::error::CoreError;
use crate::lookup::{RemoteOutput, TxLookup};
use crate::normalize::utxo_from_remote;
use crate::types::{Network, UtxoNode, UtxoPointer};

/// Which list of the transaction body a pointer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRole {
    Spent,
    Reference,
}

impl InputRole {
    fn is_reference(self) -> bool {
        matches!(self, Self::Reference)
    }
}

/// Resolve input pointers to full UTXOs.
///
/// Every distinct prior transaction is looked up exactly once, and all
/// lookups are in flight before any is awaited. The first failure aborts
/// the whole batch. Results follow the order of `pointers`.
pub async fn resolve_inputs<L>(
    lookup: &L,
    cache: Option<&Cache>,
    network: Network,
    pointers: &[UtxoPointer],
    role: InputRole,
) -> Result<Vec<UtxoNode>, CoreError>
where
    L: TxLookup + ?Sized,
{
    if pointers.is_empty() {
        return Ok(Vec::new());
    }

    let mut distinct: Vec<&str> = Vec::new();
    for pointer in pointers {
        if !distinct.contains(&pointer.tx_hash.as_str()) {
            distinct.push(&pointer.tx_hash);
        }
    }
    debug!(
        %network,
        inputs = pointers.len(),
        prior_txs = distinct.len(),
        ?role,
        "resolving inputs"
    );

    let fetched = try_join_all(
        distinct
            .iter()
            .map(|tx_hash| prior_outputs(lookup, cache, network, tx_hash)),
    )
    .await?;
    let by_hash: HashMap<&str, Arc<Vec<RemoteOutput>>> =
        distinct.into_iter().zip(fetched).collect();

    pointers
        .iter()
        .map(|pointer| {
            let outputs = by_hash
                .get(pointer.tx_hash.as_str())
                .ok_or_else(|| input_not_found(pointer))?;
            let output = outputs
                .iter()
                .find(|output| output.output_index == pointer.index)
                .ok_or_else(|| input_not_found(pointer))?;
            utxo_from_remote(&pointer.tx_hash, output, role.is_reference())
        })
        .collect()
}

async fn prior_outputs<L>(
    lookup: &L,
    cache: Option<&Cache>,
    network: Network,
    tx_hash: &str,
) -> Result<Arc<Vec<RemoteOutput>>, CoreError>
where
    L: TxLookup + ?Sized,
{
    if let Some(cache) = cache {
        if let Some(hit) = cache.get_outputs(network, tx_hash).await {
            trace!(%network, tx_hash, "prior outputs cache hit");
            return Ok(hit);
        }
    }

    let outputs = lookup.tx_outputs(network, tx_hash).await?;
    if let Some(cache) = cache {
        cache.insert_outputs(network, tx_hash, outputs.clone()).await;
    }
    Ok(Arc::new(outputs))
}

fn input_not_found(pointer: &UtxoPointer) -> CoreError {
    CoreError::InputNotFound {
        tx_hash: pointer.tx_hash.clone(),
        index: pointer.index,
    }
}
