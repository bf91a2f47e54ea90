use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::layout::{self, Connector, LayoutConfig, Side, TxLayout, UtxoPlacement};
use crate::types::{DecodedTx, LineHandle, Network, Point, TransactionNode, UtxoKey, UtxoNode};

/// Longest alias a transaction may carry, in characters.
pub const MAX_ALIAS_LEN: usize = 30;

/// Whether a merge created a new transaction or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeOutcome {
    Inserted,
    Updated,
}

/// The connector between one transaction and one of its UTXOs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtxoConnector {
    pub tx_hash: String,
    pub side: Side,
    pub connector: Connector,
}

// ==============================================================================
// Transaction Graph
// ==============================================================================

/// Ordered transactions plus an arena of UTXOs keyed by `tx_hash#index`.
///
/// Transactions refer to UTXOs by key only, so two transactions touching
/// the same output share one stored node. Nodes are only ever removed by
/// [`TransactionGraph::reset`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionGraph {
    network: Network,
    transactions: Vec<TransactionNode>,
    utxos: HashMap<UtxoKey, UtxoNode>,
    #[serde(skip)]
    tx_index: HashMap<String, usize>,
}

impl TransactionGraph {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            transactions: Vec::new(),
            utxos: HashMap::new(),
            tx_index: HashMap::new(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn transactions(&self) -> &[TransactionNode] {
        &self.transactions
    }

    pub fn utxos(&self) -> &HashMap<UtxoKey, UtxoNode> {
        &self.utxos
    }

    pub fn transaction(&self, tx_hash: &str) -> Option<&TransactionNode> {
        self.tx_index
            .get(tx_hash)
            .map(|&idx| &self.transactions[idx])
    }

    pub fn utxo(&self, key: &UtxoKey) -> Option<&UtxoNode> {
        self.utxos.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Drop every node and start over on `network`.
    pub fn reset(&mut self, network: Network) {
        info!(from = %self.network, to = %network, "resetting graph");
        *self = Self::new(network);
    }

    /// Whether `key` is an output of some transaction in the graph.
    pub fn is_output(&self, key: &UtxoKey) -> bool {
        self.transaction(&key.tx_hash)
            .is_some_and(|tx| tx.outputs.contains(key))
    }

    pub fn inputs_of(&self, tx_hash: &str) -> Result<Vec<&UtxoNode>, CoreError> {
        let tx = self.require_tx(tx_hash)?;
        Ok(tx.inputs.iter().filter_map(|k| self.utxos.get(k)).collect())
    }

    pub fn reference_inputs_of(&self, tx_hash: &str) -> Result<Vec<&UtxoNode>, CoreError> {
        let tx = self.require_tx(tx_hash)?;
        Ok(tx
            .reference_inputs
            .iter()
            .filter_map(|k| self.utxos.get(k))
            .collect())
    }

    pub fn outputs_of(&self, tx_hash: &str) -> Result<Vec<&UtxoNode>, CoreError> {
        let tx = self.require_tx(tx_hash)?;
        Ok(tx.outputs.iter().filter_map(|k| self.utxos.get(k)).collect())
    }

    // ==========================================================================
    // Merge
    // ==========================================================================

    /// Merge a decoded transaction into the graph.
    ///
    /// A transaction already present is refreshed in place and keeps its
    /// position and alias. Stored UTXOs keep their geometry; placeholders
    /// take over the fields of a resolved observation and redeemers are
    /// refreshed whenever one is observed. Re-merging the same transaction
    /// leaves the graph unchanged.
    pub fn merge_transaction(&mut self, decoded: DecodedTx) -> Result<MergeOutcome, CoreError> {
        if decoded.network != self.network {
            return Err(CoreError::NetworkMismatch {
                graph: self.network,
                decoded: decoded.network,
            });
        }

        let DecodedTx {
            tx_hash,
            fee,
            scripts_successful,
            inputs,
            reference_inputs,
            mut outputs,
            mints,
            block,
            validity_start,
            ttl,
            withdrawals,
            metadata,
            certificates,
            size,
            ..
        } = decoded;

        let input_keys = inputs
            .into_iter()
            .map(|utxo| self.upsert_utxo(utxo))
            .collect::<Vec<_>>();
        let reference_keys = reference_inputs
            .into_iter()
            .map(|utxo| self.upsert_utxo(utxo))
            .collect::<Vec<_>>();
        outputs.sort_by_key(|utxo| utxo.index);
        let output_keys = outputs
            .into_iter()
            .map(|utxo| self.upsert_utxo(utxo))
            .collect::<Vec<_>>();

        let existing_idx = self.tx_index.get(&tx_hash).copied();
        let outcome = match existing_idx {
            Some(idx) => {
                let existing = &mut self.transactions[idx];
                existing.fee = fee;
                existing.inputs = input_keys;
                existing.reference_inputs = reference_keys;
                existing.outputs = output_keys;
                existing.mints = mints;
                existing.scripts_successful = scripts_successful;
                if block.is_some() {
                    existing.block = block;
                }
                existing.validity_start = validity_start;
                existing.ttl = ttl;
                existing.withdrawals = withdrawals;
                existing.metadata = metadata;
                existing.certificates = certificates;
                existing.size = size;
                MergeOutcome::Updated
            }
            None => {
                self.tx_index
                    .insert(tx_hash.clone(), self.transactions.len());
                self.transactions.push(TransactionNode {
                    tx_hash: tx_hash.clone(),
                    fee,
                    inputs: input_keys,
                    reference_inputs: reference_keys,
                    outputs: output_keys,
                    mints,
                    scripts_successful,
                    position: Point::default(),
                    block,
                    validity_start,
                    ttl,
                    withdrawals,
                    metadata,
                    certificates,
                    size,
                    alias: String::new(),
                });
                MergeOutcome::Inserted
            }
        };

        info!(
            network = %self.network,
            %tx_hash,
            ?outcome,
            transactions = self.transactions.len(),
            utxos = self.utxos.len(),
            "merged transaction"
        );
        Ok(outcome)
    }

    fn upsert_utxo(&mut self, observed: UtxoNode) -> UtxoKey {
        let key = observed.key();
        match self.utxos.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(observed);
            }
            Entry::Occupied(mut slot) => {
                let stored = slot.get_mut();
                if !stored.resolved && observed.resolved {
                    stored.absorb(observed);
                } else if observed.redeemer.is_some() {
                    stored.redeemer = observed.redeemer;
                }
            }
        }
        key
    }

    // ==========================================================================
    // User Edits
    // ==========================================================================

    /// Set (or clear, with an empty string) a transaction's alias.
    pub fn set_alias(&mut self, tx_hash: &str, alias: &str) -> Result<(), CoreError> {
        let len = alias.chars().count();
        if len > MAX_ALIAS_LEN {
            return Err(CoreError::AliasTooLong {
                len,
                max: MAX_ALIAS_LEN,
            });
        }
        let tx = self.require_tx_mut(tx_hash)?;
        tx.alias = alias.to_owned();
        debug!(tx_hash, alias, "alias updated");
        Ok(())
    }

    /// Record the connector handles the presentation layer drew for a UTXO.
    pub fn set_lines(&mut self, key: &UtxoKey, lines: Vec<LineHandle>) -> Result<(), CoreError> {
        let utxo = self
            .utxos
            .get_mut(key)
            .ok_or_else(|| CoreError::UtxoNotInGraph(key.to_string()))?;
        utxo.lines = lines;
        Ok(())
    }

    // ==========================================================================
    // Layout
    // ==========================================================================

    /// Compute and apply a fresh layout for one transaction. Its UTXOs
    /// become owned by it, so a later drag carries them along.
    pub fn layout_transaction(
        &mut self,
        tx_hash: &str,
        screen_center_x: f64,
        config: &LayoutConfig,
    ) -> Result<TxLayout, CoreError> {
        let tx = self.require_tx(tx_hash)?;
        let layout = layout::layout_transaction(tx, screen_center_x, config);
        self.apply_layout(&layout)?;
        Ok(layout)
    }

    /// The geometry a transaction currently has, as left by its last
    /// layout and any drags since. Nothing is moved.
    pub fn stored_layout(&self, tx_hash: &str, config: &LayoutConfig) -> Result<TxLayout, CoreError> {
        let tx = self.require_tx(tx_hash)?;
        let place = |keys: Vec<&UtxoKey>, side: Side| -> Result<Vec<UtxoPlacement>, CoreError> {
            let anchor = layout::anchor(tx.position, side, config);
            keys.into_iter()
                .map(|key| {
                    let utxo = self
                        .utxos
                        .get(key)
                        .ok_or_else(|| CoreError::UtxoNotInGraph(key.to_string()))?;
                    Ok(UtxoPlacement {
                        key: key.clone(),
                        position: utxo.position,
                        distance: utxo.distance,
                        connector: layout::connector(anchor, utxo.position, side),
                    })
                })
                .collect()
        };

        let mut outputs: Vec<&UtxoKey> = tx.outputs.iter().collect();
        outputs.sort_by_key(|key| key.index);
        Ok(TxLayout {
            tx_hash: tx.tx_hash.clone(),
            position: tx.position,
            inputs: place(
                tx.inputs.iter().chain(&tx.reference_inputs).collect(),
                Side::Input,
            )?,
            outputs: place(outputs, Side::Output)?,
        })
    }

    /// Store the positions of a computed layout. Fails without changes if
    /// the layout names a node the graph does not hold.
    pub fn apply_layout(&mut self, layout: &TxLayout) -> Result<(), CoreError> {
        let placements = || layout.inputs.iter().chain(&layout.outputs);
        if let Some(missing) = placements().find(|p| !self.utxos.contains_key(&p.key)) {
            return Err(CoreError::UtxoNotInGraph(missing.key.to_string()));
        }
        self.require_tx_mut(&layout.tx_hash)?.position = layout.position;

        for placement in placements() {
            if let Some(utxo) = self.utxos.get_mut(&placement.key) {
                utxo.position = placement.position;
                utxo.distance = placement.distance;
                utxo.owner = Some(layout.tx_hash.clone());
            }
        }
        Ok(())
    }

    /// Move a transaction and the UTXOs it owns. Returns the moved UTXOs.
    pub fn drag_transaction(
        &mut self,
        tx_hash: &str,
        new_position: Point,
    ) -> Result<Vec<UtxoKey>, CoreError> {
        let idx = *self
            .tx_index
            .get(tx_hash)
            .ok_or_else(|| CoreError::TxNotInGraph(tx_hash.to_owned()))?;
        let moved =
            layout::drag_transaction(&mut self.transactions[idx], &mut self.utxos, new_position);
        debug!(tx_hash, moved = moved.len(), "dragged transaction");
        Ok(moved)
    }

    /// Move one UTXO and return its recomputed connectors. Its distance and
    /// every other node stay put.
    pub fn move_utxo(
        &mut self,
        key: &UtxoKey,
        new_position: Point,
        config: &LayoutConfig,
    ) -> Result<Vec<UtxoConnector>, CoreError> {
        let before = self.connectors_of(key, config)?;
        if let Some(utxo) = self.utxos.get_mut(key) {
            utxo.position = new_position;
        }
        Ok(before
            .into_iter()
            .flat_map(|c| {
                layout::drag_utxo(&[c.connector], new_position, c.side)
                    .into_iter()
                    .map(move |connector| UtxoConnector {
                        tx_hash: c.tx_hash.clone(),
                        side: c.side,
                        connector,
                    })
            })
            .collect())
    }

    /// Connectors between a UTXO and every transaction touching it.
    pub fn connectors_of(
        &self,
        key: &UtxoKey,
        config: &LayoutConfig,
    ) -> Result<Vec<UtxoConnector>, CoreError> {
        let utxo = self
            .utxos
            .get(key)
            .ok_or_else(|| CoreError::UtxoNotInGraph(key.to_string()))?;

        let mut connectors = Vec::new();
        for tx in &self.transactions {
            let side = if tx.outputs.contains(key) {
                Side::Output
            } else if tx.inputs.contains(key) || tx.reference_inputs.contains(key) {
                Side::Input
            } else {
                continue;
            };
            let anchor = layout::anchor(tx.position, side, config);
            connectors.push(UtxoConnector {
                tx_hash: tx.tx_hash.clone(),
                side,
                connector: layout::connector(anchor, utxo.position, side),
            });
        }
        Ok(connectors)
    }

    fn require_tx(&self, tx_hash: &str) -> Result<&TransactionNode, CoreError> {
        self.transaction(tx_hash)
            .ok_or_else(|| CoreError::TxNotInGraph(tx_hash.to_owned()))
    }

    fn require_tx_mut(&mut self, tx_hash: &str) -> Result<&mut TransactionNode, CoreError> {
        match self.tx_index.get(tx_hash) {
            Some(&idx) => Ok(&mut self.transactions[idx]),
            None => Err(CoreError::TxNotInGraph(tx_hash.to_owned())),
        }
    }
}

// ==============================================================================
// Shared Graph
// ==============================================================================

/// A graph shared between request handlers. Every mutation goes through
/// the write lock, so merges are serialized.
#[derive(Clone)]
pub struct SharedGraph {
    inner: Arc<RwLock<TransactionGraph>>,
}

impl SharedGraph {
    pub fn new(network: Network) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TransactionGraph::new(network))),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, TransactionGraph> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, TransactionGraph> {
        self.inner.write().await
    }

    pub async fn merge(&self, decoded: DecodedTx) -> Result<MergeOutcome, CoreError> {
        self.inner.write().await.merge_transaction(decoded)
    }
}
