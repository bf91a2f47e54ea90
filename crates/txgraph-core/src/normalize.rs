//! Canonicalization of asset, datum and address fields.
//!
//! Outputs reach the graph from two sources with different shapes: the
//! binary decoder (assets already split, quantities as strings, datum JSON
//! as a string) and the indexing API (concatenated units, bech32 address
//! strings, datum hash / inline datum bytes). Everything here funnels both
//! into the types in `crate::types`.

use std::collections::BTreeMap;

use crate::error::{CoreError, DecodeError};
use crate::lookup::{MetadataEntry, RemoteOutput};
use crate::types::{Address, Asset, CredentialKind, Datum, UtxoNode, LOVELACE};

/// Hex length of a minting policy id (28 bytes).
pub const POLICY_ID_LEN: usize = 56;

// ==============================================================================
// Units and Quantities
// ==============================================================================

/// Split an API unit into `(policy_id, asset_name)`.
///
/// `"lovelace"` is the native currency; every other unit is a policy id
/// followed by the hex asset name (possibly empty).
pub fn split_unit(unit: &str) -> Result<(String, String), CoreError> {
    if unit == LOVELACE {
        return Ok((String::new(), LOVELACE.to_owned()));
    }
    if unit.len() < POLICY_ID_LEN || !unit.is_char_boundary(POLICY_ID_LEN) {
        return Err(CoreError::MalformedAssetUnit(unit.to_owned()));
    }
    let (policy_id, asset_name) = unit.split_at(POLICY_ID_LEN);
    Ok((policy_id.to_owned(), asset_name.to_owned()))
}

/// Parse a non-negative decimal quantity without going through floats.
pub fn parse_quantity(raw: &str) -> Result<u64, DecodeError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| DecodeError::InvalidQuantity(raw.to_owned()))
}

/// Parse a signed decimal quantity (mints are negative when burned).
pub fn parse_signed_quantity(raw: &str) -> Result<i64, DecodeError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| DecodeError::InvalidQuantity(raw.to_owned()))
}

/// Fold `(unit, quantity)` pairs into the native amount plus token list.
///
/// Repeated native entries are summed; an overflowing sum is rejected.
pub fn normalize_amounts<'a, I>(amounts: I) -> Result<(u64, Vec<Asset>), CoreError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut lovelace: u64 = 0;
    let mut assets = Vec::new();
    for (unit, quantity) in amounts {
        let (policy_id, asset_name) = split_unit(unit)?;
        let amount = parse_quantity(quantity)?;
        if policy_id.is_empty() && asset_name == LOVELACE {
            lovelace = lovelace
                .checked_add(amount)
                .ok_or_else(|| DecodeError::InvalidQuantity(quantity.to_owned()))?;
        } else {
            assets.push(Asset {
                policy_id,
                asset_name,
                amount: i128::from(amount),
            });
        }
    }
    Ok((lovelace, assets))
}

// ==============================================================================
// Datums
// ==============================================================================

/// Apply the datum presence rule: `None` unless the hash or bytes are
/// non-empty or the JSON form is non-null.
pub fn normalize_datum(
    hash: Option<&str>,
    bytes: Option<&str>,
    json: Option<serde_json::Value>,
) -> Option<Datum> {
    let hash = hash.unwrap_or_default();
    let bytes = bytes.unwrap_or_default();
    let json = json.filter(|value| !value.is_null());
    if hash.is_empty() && bytes.is_empty() && json.is_none() {
        return None;
    }
    Some(Datum {
        hash: hash.to_owned(),
        bytes: bytes.to_owned(),
        json,
    })
}

/// Parse a datum's JSON rendering as emitted by the codec. Empty strings
/// count as absent.
pub fn parse_datum_json(raw: Option<&str>) -> Result<Option<serde_json::Value>, DecodeError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => serde_json::from_str(s)
            .map(Some)
            .map_err(|e| DecodeError::InvalidField {
                field: "datum.json",
                message: e.to_string(),
            }),
    }
}

// ==============================================================================
// Addresses
// ==============================================================================

/// Decompose an address string.
///
/// Bech32 (Shelley) addresses are split by their header byte: the high
/// nibble selects the address type and payment credential kind, the low
/// nibble is the network tag. Anything that is not bech32 is treated as a
/// Byron bootstrap address and kept verbatim.
pub fn parse_address(raw: &str) -> Option<Address> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let Ok((_hrp, data)) = bech32::decode(raw) else {
        return Some(Address {
            bech32: raw.to_owned(),
            header_type: "byron".to_owned(),
            network_tag: "unknown".to_owned(),
            payment: String::new(),
            kind: CredentialKind::Key,
        });
    };

    let &header = data.first()?;
    let address_type = header >> 4;
    let network_tag = match header & 0x0F {
        0 => "testnet".to_owned(),
        1 => "mainnet".to_owned(),
        other => format!("unknown({other})"),
    };
    let header_type = match address_type {
        0..=3 => "base",
        4 | 5 => "pointer",
        6 | 7 => "enterprise",
        8 => "byron",
        14 | 15 => "stake",
        _ => "unknown",
    };
    let kind = match address_type {
        0..=7 if address_type & 1 == 1 => CredentialKind::Script,
        15 => CredentialKind::Script,
        _ => CredentialKind::Key,
    };
    let payment = if address_type <= 7 && data.len() >= 29 {
        hex::encode(&data[1..29])
    } else {
        String::new()
    };

    Some(Address {
        bech32: raw.to_owned(),
        header_type: header_type.to_owned(),
        network_tag,
        payment,
        kind,
    })
}

// ==============================================================================
// API Outputs
// ==============================================================================

/// Build a resolved `UtxoNode` from one output of the indexing API.
pub fn utxo_from_remote(
    tx_hash: &str,
    output: &RemoteOutput,
    is_reference_input: bool,
) -> Result<UtxoNode, CoreError> {
    let (lovelace, assets) = normalize_amounts(
        output
            .amount
            .iter()
            .map(|a| (a.unit.as_str(), a.quantity.as_str())),
    )?;

    let mut node = UtxoNode::new(tx_hash, output.output_index, lovelace);
    node.address = parse_address(&output.address);
    node.assets = assets;
    node.datum = normalize_datum(
        output.data_hash.as_deref(),
        output.inline_datum.as_deref(),
        None,
    );
    node.script_ref = output.reference_script_hash.clone();
    node.is_reference_input = is_reference_input;
    Ok(node)
}

// ==============================================================================
// Metadata
// ==============================================================================

/// Fold the API's `[{label, json_metadata}]` list into the canonical
/// label-to-value map. A repeated label keeps its last value.
pub fn normalize_metadata(entries: &[MetadataEntry]) -> BTreeMap<String, serde_json::Value> {
    entries
        .iter()
        .map(|entry| (entry.label.clone(), entry.json_metadata.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::RemoteAmount;

    const POLICY: &str = "f0ff48bbb7bbe9d59a40f1ce90e9e9d0ff5002ec48f232b49ca0fb9a";

    #[test]
    fn lovelace_unit_is_native() {
        let (policy, name) = split_unit("lovelace").unwrap();
        assert_eq!(policy, "");
        assert_eq!(name, "lovelace");
    }

    #[test]
    fn token_unit_splits_at_policy_length() {
        let unit = format!("{POLICY}6d79746f6b656e");
        let (policy, name) = split_unit(&unit).unwrap();
        assert_eq!(policy, POLICY);
        assert_eq!(name, "6d79746f6b656e");
    }

    #[test]
    fn bare_policy_unit_has_empty_name() {
        let (policy, name) = split_unit(POLICY).unwrap();
        assert_eq!(policy, POLICY);
        assert_eq!(name, "");
    }

    #[test]
    fn short_unit_is_malformed() {
        let err = split_unit("abcd").unwrap_err();
        assert!(matches!(err, CoreError::MalformedAssetUnit(u) if u == "abcd"));
    }

    #[test]
    fn quantities_keep_full_precision() {
        assert_eq!(
            parse_quantity("18446744073709551615").unwrap(),
            u64::MAX
        );
        assert_eq!(parse_signed_quantity("-42").unwrap(), -42);
        assert!(parse_quantity("1.5").is_err());
        assert!(parse_quantity("-1").is_err());
    }

    #[test]
    fn amounts_fold_native_and_tokens() {
        let unit = format!("{POLICY}00");
        let (lovelace, assets) =
            normalize_amounts([("lovelace", "1000000"), (unit.as_str(), "5")]).unwrap();
        assert_eq!(lovelace, 1_000_000);
        assert_eq!(
            assets,
            vec![Asset {
                policy_id: POLICY.into(),
                asset_name: "00".into(),
                amount: 5
            }]
        );
    }

    #[test]
    fn overflowing_native_sum_is_rejected() {
        let max = u64::MAX.to_string();
        assert!(normalize_amounts([("lovelace", max.as_str()), ("lovelace", "1")]).is_err());
    }

    #[test]
    fn empty_datum_fields_collapse_to_none() {
        assert_eq!(normalize_datum(Some(""), Some(""), None), None);
        assert_eq!(
            normalize_datum(None, None, Some(serde_json::Value::Null)),
            None
        );
        let datum = normalize_datum(Some("abcd"), None, None).expect("hash alone is a datum");
        assert_eq!(datum.hash, "abcd");
        assert_eq!(datum.bytes, "");
    }

    #[test]
    fn datum_json_parses_or_fails() {
        assert_eq!(parse_datum_json(Some("")).unwrap(), None);
        assert_eq!(
            parse_datum_json(Some(r#"{"int":1}"#)).unwrap(),
            Some(serde_json::json!({ "int": 1 }))
        );
        assert!(parse_datum_json(Some("{not json")).is_err());
    }

    #[test]
    fn enterprise_script_address_is_decomposed() {
        // Header 0x71: enterprise address, script payment credential, mainnet.
        let mut payload = vec![0x71u8];
        payload.extend_from_slice(&[0xAB; 28]);
        let encoded = bech32::encode::<bech32::Bech32>(bech32::Hrp::parse("addr").unwrap(), &payload)
            .expect("must encode");

        let address = parse_address(&encoded).expect("address must parse");
        assert_eq!(address.header_type, "enterprise");
        assert_eq!(address.network_tag, "mainnet");
        assert_eq!(address.kind, CredentialKind::Script);
        assert_eq!(address.payment, "ab".repeat(28));
    }

    #[test]
    fn base_key_address_on_testnet() {
        let mut payload = vec![0x00u8];
        payload.extend_from_slice(&[0x01; 56]);
        let encoded =
            bech32::encode::<bech32::Bech32>(bech32::Hrp::parse("addr_test").unwrap(), &payload)
                .expect("must encode");

        let address = parse_address(&encoded).expect("address must parse");
        assert_eq!(address.header_type, "base");
        assert_eq!(address.network_tag, "testnet");
        assert_eq!(address.kind, CredentialKind::Key);
        assert_eq!(address.payment, "01".repeat(28));
    }

    #[test]
    fn non_bech32_address_is_byron() {
        let address = parse_address("DdzFFzCqrhsw3prhfMFDNFowbzUku3QmrMwarfjUbWXRisodn97R")
            .expect("kept verbatim");
        assert_eq!(address.header_type, "byron");
        assert!(address.payment.is_empty());
        assert!(parse_address("   ").is_none());
    }

    #[test]
    fn bech32_without_payload_has_no_address() {
        // Valid checksum, empty data part.
        assert!(parse_address("a12uel5l").is_none());
    }

    #[test]
    fn remote_output_becomes_resolved_utxo() {
        let output = RemoteOutput {
            address: String::new(),
            amount: vec![
                RemoteAmount {
                    unit: "lovelace".into(),
                    quantity: "2500000".into(),
                },
                RemoteAmount {
                    unit: format!("{POLICY}01"),
                    quantity: "3".into(),
                },
            ],
            output_index: 2,
            data_hash: Some("dd".into()),
            inline_datum: None,
            collateral: false,
            reference_script_hash: Some("5c".into()),
        };

        let node = utxo_from_remote("aa", &output, true).unwrap();
        assert_eq!(node.key().to_string(), "aa#2");
        assert_eq!(node.lovelace, 2_500_000);
        assert_eq!(node.assets.len(), 1);
        assert_eq!(node.datum.as_ref().map(|d| d.hash.as_str()), Some("dd"));
        assert_eq!(node.script_ref.as_deref(), Some("5c"));
        assert!(node.is_reference_input);
        assert!(node.resolved);
        assert!(node.address.is_none());
    }

    #[test]
    fn metadata_list_folds_into_map() {
        let entries = vec![
            MetadataEntry {
                label: "674".into(),
                json_metadata: serde_json::json!({ "msg": ["hello"] }),
            },
            MetadataEntry {
                label: "1".into(),
                json_metadata: serde_json::json!(42),
            },
        ];
        let map = normalize_metadata(&entries);
        assert_eq!(map.len(), 2);
        assert_eq!(map["674"]["msg"][0], "hello");
        assert_eq!(map["1"], 42);
    }
}
