//! Seam to the binary transaction decoder.
//!
//! The decoder itself is an external collaborator: given the hex of a
//! serialized transaction it reports the structural fields as JSON. This
//! module defines the report shape ([`CodecReport`]), the [`TxCodec`]
//! trait, and two implementations: [`CommandCodec`], which runs a decoder
//! executable, and [`StaticCodec`], which serves pre-decoded reports.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::normalize::{parse_quantity, parse_signed_quantity};

/// Decode a hex transaction payload into its structural report.
///
/// Implementations never touch the network. Awaiting a decode yields to
/// the runtime while an external decoder is working.
#[async_trait]
pub trait TxCodec: Send + Sync {
    async fn decode(&self, payload_hex: &str) -> Result<CodecReport, DecodeError>;
}

// ==============================================================================
// Report Shape
// ==============================================================================

/// A number the decoder may render either as a JSON number or as a decimal
/// string (large quantities are always strings).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CodecNumber {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl CodecNumber {
    pub fn to_u64(&self) -> Result<u64, DecodeError> {
        match self {
            Self::Unsigned(n) => Ok(*n),
            Self::Signed(n) => {
                u64::try_from(*n).map_err(|_| DecodeError::InvalidQuantity(n.to_string()))
            }
            Self::Text(s) => parse_quantity(s),
        }
    }

    pub fn to_i64(&self) -> Result<i64, DecodeError> {
        match self {
            Self::Unsigned(n) => {
                i64::try_from(*n).map_err(|_| DecodeError::InvalidQuantity(n.to_string()))
            }
            Self::Signed(n) => Ok(*n),
            Self::Text(s) => parse_signed_quantity(s),
        }
    }

    pub fn to_u32(&self) -> Result<u32, DecodeError> {
        let wide = self.to_u64()?;
        u32::try_from(wide).map_err(|_| DecodeError::InvalidQuantity(wide.to_string()))
    }
}

impl From<u64> for CodecNumber {
    fn from(n: u64) -> Self {
        Self::Unsigned(n)
    }
}

/// Structural fields of one transaction as reported by the decoder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecReport {
    pub tx_hash: String,
    pub fee: CodecNumber,
    #[serde(default = "default_true")]
    pub scripts_successful: bool,
    #[serde(default)]
    pub inputs: Vec<CodecPointer>,
    #[serde(default)]
    pub reference_inputs: Vec<CodecPointer>,
    #[serde(default)]
    pub outputs: Vec<CodecOutput>,
    #[serde(default)]
    pub mints: Vec<CodecAsset>,
    #[serde(default)]
    pub size: Option<CodecNumber>,
    #[serde(default)]
    pub validity_start: Option<CodecNumber>,
    #[serde(default)]
    pub ttl: Option<CodecNumber>,
    #[serde(default)]
    pub withdrawals: Vec<CodecWithdrawal>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub certificates: Vec<serde_json::Value>,
    #[serde(default)]
    pub redeemers: CodecRedeemers,
    /// Non-empty when the decoder rejected the payload.
    #[serde(default)]
    pub error: String,
}

impl CodecReport {
    /// Turn a report carrying a decoder error into a [`DecodeError`].
    pub fn into_result(self) -> Result<Self, DecodeError> {
        let message = self.error.trim();
        if message.is_empty() {
            Ok(self)
        } else {
            Err(DecodeError::from_codec_message(message))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecPointer {
    pub tx_hash: String,
    pub index: CodecNumber,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecOutput {
    pub index: CodecNumber,
    #[serde(default)]
    pub bytes: String,
    #[serde(default)]
    pub address: Option<CodecAddress>,
    pub lovelace: CodecNumber,
    #[serde(default)]
    pub datum: Option<CodecDatum>,
    #[serde(default)]
    pub script_ref: Option<String>,
    #[serde(default)]
    pub assets: Vec<CodecAsset>,
}

/// Only the bech32 form is consumed; the header is re-derived from it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodecAddress {
    #[serde(default)]
    pub bech32: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CodecDatum {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub bytes: Option<String>,
    /// JSON rendering of the datum, itself encoded as a string.
    #[serde(default)]
    pub json: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecAsset {
    pub policy_id: String,
    pub asset_name: String,
    pub quantity: CodecNumber,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecWithdrawal {
    pub reward_account: String,
    pub amount: CodecNumber,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CodecRedeemers {
    #[serde(default)]
    pub spends: Vec<CodecSpend>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecSpend {
    #[serde(default)]
    pub script_hash: String,
    pub input: CodecPointer,
    pub input_index: CodecNumber,
    #[serde(default)]
    pub data: CodecDatum,
    pub ex_units: CodecExUnits,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodecExUnits {
    pub mem: CodecNumber,
    pub steps: CodecNumber,
}

fn default_true() -> bool {
    true
}

// ==============================================================================
// CommandCodec: external decoder executable
// ==============================================================================

/// Runs a decoder executable that reads the hex payload on stdin and
/// writes a JSON [`CodecReport`] on stdout.
#[derive(Debug, Clone)]
pub struct CommandCodec {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandCodec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Split a shell-style command line on whitespace: the first word is
    /// the program, the rest are arguments.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program).with_args(words))
    }
}

#[async_trait]
impl TxCodec for CommandCodec {
    async fn decode(&self, payload_hex: &str) -> Result<CodecReport, DecodeError> {
        debug!(program = %self.program.display(), payload_len = payload_hex.len(), "running decoder");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DecodeError::Codec(format!("failed to start {}: {e}", self.program.display()))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload_hex.as_bytes())
                .await
                .map_err(|e| DecodeError::Codec(format!("failed to write payload: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DecodeError::Codec(format!("decoder did not finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr.trim(), "decoder exited with failure");
            return Err(DecodeError::Codec(format!(
                "decoder exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| DecodeError::Codec(format!("decoder report is not valid JSON: {e}")))
    }
}

// ==============================================================================
// StaticCodec: pre-decoded reports
// ==============================================================================

/// Serves reports registered ahead of time, keyed by payload hex
/// (case-insensitive). Unknown payloads are malformed.
#[derive(Debug, Clone, Default)]
pub struct StaticCodec {
    reports: HashMap<String, CodecReport>,
}

impl StaticCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, payload_hex: &str, report: CodecReport) -> Self {
        self.reports
            .insert(payload_hex.trim().to_ascii_lowercase(), report);
        self
    }
}

#[async_trait]
impl TxCodec for StaticCodec {
    async fn decode(&self, payload_hex: &str) -> Result<CodecReport, DecodeError> {
        self.reports
            .get(&payload_hex.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| DecodeError::MalformedCbor("unrecognized transaction payload".into()))
    }
}
