use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use txgraph_core::decode::{decode_transaction, fetch_transaction, DecodeOptions};
use txgraph_core::enrich::{tx_summary, TxSummary};
use txgraph_core::graph::{MergeOutcome, UtxoConnector};
use txgraph_core::layout::{classify_utxo, TxLayout, UtxoOrigin};
use txgraph_core::types::{LineHandle, Network, Point, TransactionNode, UtxoKey, UtxoNode};

use super::auth::check_auth;
use super::error::AppError;
use super::SharedState;

// ==============================================================================
// DTOs
// ==============================================================================

/// Full graph snapshot, plus the origin of every UTXO as of this snapshot.
#[derive(Serialize)]
pub(super) struct GraphResponse {
    network: Network,
    transactions: Vec<TransactionNode>,
    utxos: HashMap<UtxoKey, UtxoNode>,
    origins: HashMap<UtxoKey, UtxoOrigin>,
}

#[derive(Deserialize)]
pub(super) struct ResetQuery {
    network: Option<Network>,
}

#[derive(Deserialize)]
pub(super) struct AddTxRequest {
    cbor: Option<String>,
    hash: Option<String>,
    #[serde(default = "default_true")]
    resolve_inputs: bool,
    screen_center_x: Option<f64>,
}

#[derive(Serialize)]
pub(super) struct AddTxResponse {
    outcome: MergeOutcome,
    transaction: TransactionNode,
    layout: TxLayout,
    summary: TxSummary,
}

#[derive(Deserialize)]
pub(super) struct AliasRequest {
    alias: String,
}

#[derive(Deserialize)]
pub(super) struct LayoutRequest {
    screen_center_x: Option<f64>,
}

#[derive(Serialize)]
pub(super) struct DragTxResponse {
    moved: Vec<UtxoKey>,
}

#[derive(Serialize)]
pub(super) struct DragUtxoResponse {
    connectors: Vec<UtxoConnector>,
}

#[derive(Deserialize)]
pub(super) struct LinesRequest {
    lines: Vec<LineHandle>,
}

fn default_true() -> bool {
    true
}

// ==============================================================================
// Handlers
// ==============================================================================

pub(super) async fn get_graph(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<GraphResponse>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let graph = state.graph.read().await;
    let origins = graph
        .utxos()
        .keys()
        .map(|key| (key.clone(), classify_utxo(&graph, key)))
        .collect();

    Ok(Json(GraphResponse {
        network: graph.network(),
        transactions: graph.transactions().to_vec(),
        utxos: graph.utxos().clone(),
        origins,
    }))
}

pub(super) async fn reset_graph(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<ResetQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let mut graph = state.graph.write().await;
    let network = query.network.unwrap_or_else(|| graph.network());
    graph.reset(network);
    Ok(Json(serde_json::json!({ "network": network })))
}

pub(super) async fn add_transaction(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<AddTxRequest>,
) -> Result<Json<AddTxResponse>, AppError> {
    check_auth(&state.api_token, &headers)?;

    // Decoding and lookups run outside the graph lock; only the merge
    // itself is serialized.
    let network = state.graph.read().await.network();
    let options = DecodeOptions {
        resolve_inputs: request.resolve_inputs,
    };
    let decoded = match (request.cbor.as_deref(), request.hash.as_deref()) {
        (Some(cbor), None) => {
            decode_transaction(
                state.codec.as_ref(),
                state.lookup.as_ref(),
                Some(state.cache.as_ref()),
                network,
                cbor,
                options,
            )
            .await?
        }
        (None, Some(hash)) => {
            fetch_transaction(
                state.codec.as_ref(),
                state.lookup.as_ref(),
                Some(state.cache.as_ref()),
                network,
                hash,
                options,
            )
            .await?
        }
        _ => {
            return Err(AppError::BadRequest(
                "exactly one of `cbor` or `hash` must be provided".to_string(),
            ))
        }
    };

    let tx_hash = decoded.tx_hash.clone();
    let center = request.screen_center_x.unwrap_or(state.screen_center_x);
    let mut graph = state.graph.write().await;
    let outcome = graph.merge_transaction(decoded)?;
    // A refresh keeps whatever geometry the user left the transaction in.
    let layout = match outcome {
        MergeOutcome::Inserted => graph.layout_transaction(&tx_hash, center, &state.layout)?,
        MergeOutcome::Updated => graph.stored_layout(&tx_hash, &state.layout)?,
    };
    let summary = tx_summary(&graph, &tx_hash)?;
    let transaction = graph
        .transaction(&tx_hash)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("transaction not in graph: {tx_hash}")))?;

    info!(%network, %tx_hash, ?outcome, "transaction added to graph");
    Ok(Json(AddTxResponse {
        outcome,
        transaction,
        layout,
        summary,
    }))
}

pub(super) async fn get_summary(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(tx_hash): Path<String>,
) -> Result<Json<TxSummary>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let graph = state.graph.read().await;
    Ok(Json(tx_summary(&graph, &tx_hash)?))
}

pub(super) async fn set_alias(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(tx_hash): Path<String>,
    Json(request): Json<AliasRequest>,
) -> Result<Json<TransactionNode>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let mut graph = state.graph.write().await;
    graph.set_alias(&tx_hash, &request.alias)?;
    let tx = graph
        .transaction(&tx_hash)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("transaction not in graph: {tx_hash}")))?;
    Ok(Json(tx))
}

pub(super) async fn relayout_transaction(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(tx_hash): Path<String>,
    Json(request): Json<LayoutRequest>,
) -> Result<Json<TxLayout>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let center = request.screen_center_x.unwrap_or(state.screen_center_x);
    let mut graph = state.graph.write().await;
    Ok(Json(graph.layout_transaction(&tx_hash, center, &state.layout)?))
}

pub(super) async fn drag_transaction(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(tx_hash): Path<String>,
    Json(position): Json<Point>,
) -> Result<Json<DragTxResponse>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let mut graph = state.graph.write().await;
    let moved = graph.drag_transaction(&tx_hash, position)?;
    Ok(Json(DragTxResponse { moved }))
}

pub(super) async fn drag_utxo(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(utxo_hash): Path<String>,
    Json(position): Json<Point>,
) -> Result<Json<DragUtxoResponse>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let key: UtxoKey = utxo_hash.parse()?;
    let mut graph = state.graph.write().await;
    let connectors = graph.move_utxo(&key, position, &state.layout)?;
    Ok(Json(DragUtxoResponse { connectors }))
}

pub(super) async fn set_lines(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(utxo_hash): Path<String>,
    Json(request): Json<LinesRequest>,
) -> Result<Json<UtxoNode>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let key: UtxoKey = utxo_hash.parse()?;
    let mut graph = state.graph.write().await;
    graph.set_lines(&key, request.lines)?;
    let utxo = graph
        .utxo(&key)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("utxo not in graph: {key}")))?;
    Ok(Json(utxo))
}
