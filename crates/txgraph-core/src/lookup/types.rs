//! Response shapes of the indexing API, limited to the fields the graph
//! needs. Anything else the API returns is ignored during deserialization.

use serde::Deserialize;

// ==============================================================================
// Transaction Outputs (`/txs/{hash}/utxos`)
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteAmount {
    pub unit: String,
    pub quantity: String,
}

/// One recorded output of a prior transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteOutput {
    pub address: String,
    pub amount: Vec<RemoteAmount>,
    pub output_index: u32,
    pub data_hash: Option<String>,
    pub inline_datum: Option<String>,
    #[serde(default)]
    pub collateral: bool,
    pub reference_script_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TxUtxosResponse {
    pub(super) hash: String,
    pub(super) outputs: Vec<RemoteOutput>,
}

// ==============================================================================
// Raw Transaction (`/txs/{hash}/cbor`)
// ==============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct TxCborResponse {
    pub(super) cbor: String,
}

// ==============================================================================
// Transaction Details (`/txs/{hash}` and `/txs/{hash}/metadata`)
// ==============================================================================

/// Block context and bookkeeping fields of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TxDetails {
    pub hash: String,
    pub block: String,
    pub block_height: u64,
    pub block_time: i64,
    pub slot: u64,
    pub index: u32,
    pub fees: String,
    pub size: u64,
    pub invalid_before: Option<String>,
    pub invalid_hereafter: Option<String>,
    #[serde(default = "default_true")]
    pub valid_contract: bool,
    /// Filled from the separate metadata endpoint.
    #[serde(skip)]
    pub metadata: Vec<MetadataEntry>,
}

/// One metadata label as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetadataEntry {
    pub label: String,
    pub json_metadata: serde_json::Value,
}

fn default_true() -> bool {
    true
}
