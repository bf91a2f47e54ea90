//! Domain types for the transaction/UTXO graph.
//!
//! Contains the canonical asset and UTXO shapes (`Asset`, `Datum`,
//! `Address`, `UtxoNode`), the transaction node, the decoder's output
//! (`DecodedTx`), and the small geometry types shared with the layout
//! engine. The graph aggregate itself lives in `crate::graph`.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Asset name used for the native currency.
pub const LOVELACE: &str = "lovelace";

// ==============================================================================
// Network
// ==============================================================================

/// The chain a graph (and every lookup made on its behalf) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Preprod,
    Preview,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Mainnet, Network::Preprod, Network::Preview];

    /// Default base URL of the Blockfrost-compatible indexing API.
    pub fn default_api_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://cardano-mainnet.blockfrost.io/api/v0",
            Self::Preprod => "https://cardano-preprod.blockfrost.io/api/v0",
            Self::Preview => "https://cardano-preview.blockfrost.io/api/v0",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Preprod => write!(f, "preprod"),
            Self::Preview => write!(f, "preview"),
        }
    }
}

impl FromStr for Network {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "preprod" => Ok(Self::Preprod),
            "preview" => Ok(Self::Preview),
            other => Err(CoreError::Config(format!(
                "unknown network `{other}`; expected mainnet, preprod or preview"
            ))),
        }
    }
}

// ==============================================================================
// Geometry
// ==============================================================================

/// A 2-D point or offset in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Opaque handle of a connector line drawn by the presentation layer.
/// The core stores these but never interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineHandle(pub u64);

// ==============================================================================
// UTXO Identity
// ==============================================================================

/// Identity of a UTXO: the producing transaction hash and output index.
///
/// Serialized as `"<tx_hash>#<index>"`, which is also the key format used
/// by the graph's UTXO map on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtxoKey {
    pub tx_hash: String,
    pub index: u32,
}

impl UtxoKey {
    pub fn new(tx_hash: impl Into<String>, index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            index,
        }
    }
}

impl fmt::Display for UtxoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

impl FromStr for UtxoKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tx_hash, index) = s
            .rsplit_once('#')
            .filter(|(tx_hash, _)| !tx_hash.is_empty())
            .ok_or_else(|| CoreError::InvalidUtxoKey(s.to_owned()))?;
        let index = index
            .parse()
            .map_err(|_| CoreError::InvalidUtxoKey(s.to_owned()))?;
        Ok(Self::new(tx_hash, index))
    }
}

impl Serialize for UtxoKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UtxoKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An unresolved input reference as declared by a transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtxoPointer {
    pub tx_hash: String,
    pub index: u32,
}

impl UtxoPointer {
    pub fn key(&self) -> UtxoKey {
        UtxoKey::new(self.tx_hash.clone(), self.index)
    }
}

// ==============================================================================
// Assets, Datums, Addresses
// ==============================================================================

/// A quantity of one asset class.
///
/// The native currency is `{ policy_id: "", asset_name: "lovelace" }`.
/// Amounts held by UTXOs are non-negative; mint entries are signed, with
/// burns negative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub policy_id: String,
    pub asset_name: String,
    pub amount: i128,
}

impl Asset {
    pub fn lovelace(amount: u64) -> Self {
        Self {
            policy_id: String::new(),
            asset_name: LOVELACE.to_owned(),
            amount: i128::from(amount),
        }
    }

    pub fn is_native(&self) -> bool {
        self.policy_id.is_empty() && self.asset_name == LOVELACE
    }

    /// `policy_id` followed by `asset_name`, the unit string used by the API.
    pub fn unit(&self) -> String {
        if self.is_native() {
            LOVELACE.to_owned()
        } else {
            format!("{}{}", self.policy_id, self.asset_name)
        }
    }
}

/// Datum attached to an output. Only constructed when at least one field
/// carries information; see [`crate::normalize::normalize_datum`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    pub hash: String,
    pub bytes: String,
    pub json: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Key,
    Script,
}

/// A decomposed Shelley (or raw Byron) address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub bech32: String,
    pub header_type: String,
    pub network_tag: String,
    /// Hex-encoded payment credential hash; empty for stake and Byron addresses.
    pub payment: String,
    pub kind: CredentialKind,
}

// ==============================================================================
// Redeemers, Withdrawals, Block Context
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

/// Redeemer supplied for spending a script-locked input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendRedeemer {
    pub script_hash: String,
    pub input_index: u32,
    pub data_json: serde_json::Value,
    pub data_bytes: String,
    pub ex_units: ExUnits,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub reward_account: String,
    pub amount: u64,
}

/// Where a confirmed transaction sits on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub block_hash: String,
    pub block_tx_index: u32,
    pub block_height: u64,
    pub block_absolute_slot: u64,
    /// Unix timestamp (seconds).
    pub block_time: i64,
}

// ==============================================================================
// Graph Nodes
// ==============================================================================

/// A UTXO stored in the graph's arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxoNode {
    pub tx_hash: String,
    pub index: u32,
    /// Raw output bytes (hex) when the decoder supplied them.
    pub bytes: String,
    pub address: Option<Address>,
    pub lovelace: u64,
    pub datum: Option<Datum>,
    pub script_ref: Option<String>,
    /// Native tokens only; the native currency lives in `lovelace`.
    pub assets: Vec<Asset>,
    /// Role in the transaction that first observed this node. The role a
    /// UTXO plays for a given transaction is its list membership there.
    pub is_reference_input: bool,
    pub redeemer: Option<SpendRedeemer>,
    pub position: Point,
    /// Offset from the position of `owner` as of the last layout.
    pub distance: Point,
    /// The transaction whose layout last placed this UTXO.
    pub owner: Option<String>,
    pub lines: Vec<LineHandle>,
    /// `false` for placeholders built from a pointer without lookup.
    pub resolved: bool,
}

impl UtxoNode {
    /// A resolved UTXO with no geometry yet.
    pub fn new(tx_hash: impl Into<String>, index: u32, lovelace: u64) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            index,
            bytes: String::new(),
            address: None,
            lovelace,
            datum: None,
            script_ref: None,
            assets: Vec::new(),
            is_reference_input: false,
            redeemer: None,
            position: Point::default(),
            distance: Point::default(),
            owner: None,
            lines: Vec::new(),
            resolved: true,
        }
    }

    /// A UTXO known only by its pointer.
    pub fn placeholder(pointer: &UtxoPointer, is_reference_input: bool) -> Self {
        Self {
            is_reference_input,
            resolved: false,
            ..Self::new(pointer.tx_hash.clone(), pointer.index, 0)
        }
    }

    pub fn key(&self) -> UtxoKey {
        UtxoKey::new(self.tx_hash.clone(), self.index)
    }

    /// Take over the semantic fields of a fresher observation of the same
    /// UTXO, keeping geometry and rendering handles untouched.
    pub(crate) fn absorb(&mut self, observed: UtxoNode) {
        self.bytes = observed.bytes;
        self.address = observed.address;
        self.lovelace = observed.lovelace;
        self.datum = observed.datum;
        self.script_ref = observed.script_ref;
        self.assets = observed.assets;
        if observed.redeemer.is_some() {
            self.redeemer = observed.redeemer;
        }
        self.resolved = true;
    }
}

/// A transaction in the graph. Inputs and outputs are keys into the UTXO
/// arena, never embedded copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionNode {
    pub tx_hash: String,
    pub fee: u64,
    /// Spent inputs, in body order.
    pub inputs: Vec<UtxoKey>,
    /// Inputs read but not consumed, in body order.
    pub reference_inputs: Vec<UtxoKey>,
    /// Sorted by output index.
    pub outputs: Vec<UtxoKey>,
    pub mints: Vec<Asset>,
    pub scripts_successful: bool,
    pub position: Point,
    pub block: Option<BlockContext>,
    pub validity_start: Option<u64>,
    pub ttl: Option<u64>,
    pub withdrawals: Vec<Withdrawal>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub certificates: Vec<serde_json::Value>,
    pub size: u64,
    /// User-chosen display name; empty when unset.
    pub alias: String,
}

/// The decoder's output: a transaction with fully built UTXOs, ready to be
/// merged into a graph of the same network.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTx {
    pub network: Network,
    pub tx_hash: String,
    pub fee: u64,
    pub scripts_successful: bool,
    pub inputs: Vec<UtxoNode>,
    pub reference_inputs: Vec<UtxoNode>,
    pub outputs: Vec<UtxoNode>,
    pub mints: Vec<Asset>,
    pub block: Option<BlockContext>,
    pub validity_start: Option<u64>,
    pub ttl: Option<u64>,
    pub withdrawals: Vec<Withdrawal>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub certificates: Vec<serde_json::Value>,
    pub size: u64,
}
