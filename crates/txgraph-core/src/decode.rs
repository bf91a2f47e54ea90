//! Transaction decoding: payload validation, codec invocation, output
//! normalization and concurrent input resolution.

use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::codec::{CodecAsset, CodecOutput, CodecPointer, CodecReport, TxCodec};
use crate::error::{CoreError, DecodeError};
use crate::lookup::{TxDetails, TxLookup};
use crate::normalize::{normalize_datum, normalize_metadata, parse_address, parse_datum_json};
use crate::resolve::{resolve_inputs, InputRole};
use crate::types::{
    Asset, BlockContext, DecodedTx, ExUnits, Network, SpendRedeemer, UtxoNode, UtxoPointer,
    Withdrawal, LOVELACE,
};

/// Knobs for [`decode_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// When `false`, inputs are left as unresolved placeholders and no
    /// lookups are made.
    pub resolve_inputs: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            resolve_inputs: true,
        }
    }
}

/// Decode a hex transaction payload and resolve its inputs.
///
/// Payload and codec failures are reported before any lookup is issued.
/// Regular and reference inputs are resolved concurrently; a failure in
/// either becomes [`CoreError::Resolution`].
pub async fn decode_transaction<C, L>(
    codec: &C,
    lookup: &L,
    cache: Option<&Cache>,
    network: Network,
    payload_hex: &str,
    options: DecodeOptions,
) -> Result<DecodedTx, CoreError>
where
    C: TxCodec + ?Sized,
    L: TxLookup + ?Sized,
{
    let payload = validate_payload(payload_hex)?;
    let report = codec.decode(payload).await?.into_result()?;
    debug!(
        %network,
        tx_hash = %report.tx_hash,
        inputs = report.inputs.len(),
        reference_inputs = report.reference_inputs.len(),
        outputs = report.outputs.len(),
        "decoded transaction payload"
    );

    let tx_hash = report.tx_hash.to_ascii_lowercase();
    let mut outputs = report
        .outputs
        .iter()
        .map(|output| utxo_from_codec(&tx_hash, output))
        .collect::<Result<Vec<_>, _>>()?;
    outputs.sort_by_key(|utxo| utxo.index);

    let input_pointers = pointers(&report.inputs)?;
    let reference_pointers = pointers(&report.reference_inputs)?;
    let redeemers = spend_redeemers(&report)?;

    let (mut inputs, reference_inputs) = if options.resolve_inputs {
        tokio::try_join!(
            resolve_inputs(lookup, cache, network, &input_pointers, InputRole::Spent),
            resolve_inputs(
                lookup,
                cache,
                network,
                &reference_pointers,
                InputRole::Reference
            ),
        )
        .map_err(|err| {
            warn!(%network, %tx_hash, error = %err, "input resolution failed");
            CoreError::resolution(err)
        })?
    } else {
        (
            placeholders(&input_pointers, false),
            placeholders(&reference_pointers, true),
        )
    };

    for (pointer, redeemer) in redeemers {
        match inputs.iter_mut().find(|utxo| {
            utxo.tx_hash == pointer.tx_hash && utxo.index == pointer.index
        }) {
            Some(input) => input.redeemer = Some(redeemer),
            None => warn!(
                %tx_hash,
                input = %pointer.key(),
                "redeemer names an input the transaction does not spend"
            ),
        }
    }

    let decoded = DecodedTx {
        network,
        fee: report.fee.to_u64()?,
        scripts_successful: report.scripts_successful,
        inputs,
        reference_inputs,
        outputs,
        mints: report
            .mints
            .iter()
            .map(mint_asset)
            .collect::<Result<Vec<_>, _>>()?,
        block: None,
        validity_start: report.validity_start.as_ref().map(|n| n.to_u64()).transpose()?,
        ttl: report.ttl.as_ref().map(|n| n.to_u64()).transpose()?,
        withdrawals: report
            .withdrawals
            .iter()
            .map(|w| -> Result<Withdrawal, DecodeError> {
                Ok(Withdrawal {
                    reward_account: w.reward_account.clone(),
                    amount: w.amount.to_u64()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        metadata: report.metadata.clone(),
        certificates: report.certificates.clone(),
        size: report
            .size
            .as_ref()
            .map(|n| n.to_u64())
            .transpose()?
            .unwrap_or(payload.len() as u64 / 2),
        tx_hash,
    };
    info!(%network, tx_hash = %decoded.tx_hash, "transaction decoded");
    Ok(decoded)
}

/// Fetch a confirmed transaction by hash, decode it, and attach its block
/// context, validity interval, size and metadata.
pub async fn fetch_transaction<C, L>(
    codec: &C,
    lookup: &L,
    cache: Option<&Cache>,
    network: Network,
    tx_hash: &str,
    options: DecodeOptions,
) -> Result<DecodedTx, CoreError>
where
    C: TxCodec + ?Sized,
    L: TxLookup + ?Sized,
{
    let tx_hash = tx_hash.trim().to_ascii_lowercase();
    let cbor = lookup.tx_cbor(network, &tx_hash).await?;

    let (mut decoded, details) = tokio::try_join!(
        decode_transaction(codec, lookup, cache, network, &cbor, options),
        lookup.tx_details(network, &tx_hash),
    )?;

    if decoded.tx_hash != tx_hash {
        return Err(DecodeError::HashMismatch {
            expected: tx_hash,
            actual: decoded.tx_hash,
        }
        .into());
    }
    apply_details(&mut decoded, &details)?;
    Ok(decoded)
}

/// Overlay the indexer's view of a confirmed transaction.
pub fn apply_details(decoded: &mut DecodedTx, details: &TxDetails) -> Result<(), DecodeError> {
    decoded.block = Some(BlockContext {
        block_hash: details.block.clone(),
        block_tx_index: details.index,
        block_height: details.block_height,
        block_absolute_slot: details.slot,
        block_time: details.block_time,
    });
    decoded.size = details.size;
    decoded.scripts_successful = details.valid_contract;
    if decoded.validity_start.is_none() {
        decoded.validity_start = parse_slot("invalid_before", details.invalid_before.as_deref())?;
    }
    if decoded.ttl.is_none() {
        decoded.ttl = parse_slot("invalid_hereafter", details.invalid_hereafter.as_deref())?;
    }
    decoded.metadata.extend(normalize_metadata(&details.metadata));
    Ok(())
}

// ==============================================================================
// Field Conversion
// ==============================================================================

fn validate_payload(payload_hex: &str) -> Result<&str, DecodeError> {
    let payload = payload_hex.trim();
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }
    hex::decode(payload)?;
    Ok(payload)
}

fn pointers(raw: &[CodecPointer]) -> Result<Vec<UtxoPointer>, DecodeError> {
    raw.iter()
        .map(|p| -> Result<UtxoPointer, DecodeError> {
            Ok(UtxoPointer {
                tx_hash: p.tx_hash.to_ascii_lowercase(),
                index: p.index.to_u32()?,
            })
        })
        .collect()
}

fn placeholders(pointers: &[UtxoPointer], is_reference_input: bool) -> Vec<UtxoNode> {
    pointers
        .iter()
        .map(|p| UtxoNode::placeholder(p, is_reference_input))
        .collect()
}

fn utxo_from_codec(tx_hash: &str, output: &CodecOutput) -> Result<UtxoNode, CoreError> {
    let mut node = UtxoNode::new(tx_hash, output.index.to_u32()?, output.lovelace.to_u64()?);
    node.bytes = output.bytes.clone();
    node.address = output
        .address
        .as_ref()
        .and_then(|address| parse_address(&address.bech32));
    node.script_ref = output.script_ref.clone().filter(|s| !s.is_empty());
    node.assets = output
        .assets
        .iter()
        .filter(|asset| !(asset.policy_id.is_empty() && asset.asset_name == LOVELACE))
        .map(|asset| -> Result<Asset, DecodeError> {
            Ok(Asset {
                policy_id: asset.policy_id.clone(),
                asset_name: asset.asset_name.clone(),
                amount: i128::from(asset.quantity.to_u64()?),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(datum) = &output.datum {
        node.datum = normalize_datum(
            datum.hash.as_deref(),
            datum.bytes.as_deref(),
            parse_datum_json(datum.json.as_deref())?,
        );
    }
    Ok(node)
}

fn mint_asset(asset: &CodecAsset) -> Result<Asset, DecodeError> {
    Ok(Asset {
        policy_id: asset.policy_id.clone(),
        asset_name: asset.asset_name.clone(),
        amount: i128::from(asset.quantity.to_i64()?),
    })
}

fn spend_redeemers(report: &CodecReport) -> Result<Vec<(UtxoPointer, SpendRedeemer)>, DecodeError> {
    report
        .redeemers
        .spends
        .iter()
        .map(|spend| -> Result<(UtxoPointer, SpendRedeemer), DecodeError> {
            let pointer = UtxoPointer {
                tx_hash: spend.input.tx_hash.to_ascii_lowercase(),
                index: spend.input.index.to_u32()?,
            };
            let redeemer = SpendRedeemer {
                script_hash: spend.script_hash.clone(),
                input_index: spend.input_index.to_u32()?,
                data_json: parse_datum_json(spend.data.json.as_deref())?
                    .unwrap_or(serde_json::Value::Null),
                data_bytes: spend.data.bytes.clone().unwrap_or_default(),
                ex_units: ExUnits {
                    mem: spend.ex_units.mem.to_u64()?,
                    steps: spend.ex_units.steps.to_u64()?,
                },
            };
            Ok((pointer, redeemer))
        })
        .collect()
}

fn parse_slot(field: &'static str, raw: Option<&str>) -> Result<Option<u64>, DecodeError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| DecodeError::InvalidField {
            field,
            message: format!("expected a slot number, got `{s}`"),
        }),
    }
}
