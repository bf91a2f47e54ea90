mod cli;
mod server;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use eyre::{eyre, WrapErr};

use txgraph_core::cache::Cache;
use txgraph_core::codec::CommandCodec;
use txgraph_core::graph::SharedGraph;
use txgraph_core::layout::LayoutConfig;
use txgraph_core::lookup::{HttpLookup, LookupConfig};
use txgraph_core::types::Network;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    // Generate a random API token for this server session.
    let api_token = {
        use rand::Rng;
        let bytes: [u8; 16] = rand::thread_rng().r#gen();
        hex::encode(bytes)
    };

    let lookup = HttpLookup::new(lookup_config(&args))
        .wrap_err("while configuring the indexer client")?;
    for network in Network::ALL {
        if !lookup.has_credential(network) {
            tracing::debug!(%network, "no indexer credential configured");
        }
    }
    if !lookup.has_credential(args.network) {
        tracing::warn!(
            network = %args.network,
            "no API key or base URL for the selected network; lookups will fail"
        );
    }

    let codec = CommandCodec::from_command_line(&args.codec_cmd)
        .ok_or_else(|| eyre!("--codec-cmd must name a program"))?;

    let capacity = NonZeroUsize::new(args.cache_capacity)
        .ok_or_else(|| eyre!("--cache-capacity must be at least 1"))?;

    let state = server::AppState {
        lookup: Arc::new(lookup),
        codec: Arc::new(codec),
        cache: Arc::new(Cache::new(capacity)),
        graph: SharedGraph::new(args.network),
        api_token: api_token.clone(),
        layout: LayoutConfig {
            tx_width: args.tx_width,
            tx_height: args.tx_height,
            utxo_gap: args.utxo_gap,
            top_offset: args.top_offset,
        },
        screen_center_x: args.screen_center_x,
    };

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let origin = HeaderValue::from_str(&format!("http://{bind_addr}"))
        .context("build allowed CORS origin")?;
    let router = server::build_router(state, origin);

    if args.bind == "0.0.0.0" {
        tracing::warn!("server is bound to 0.0.0.0, it is accessible from the network");
    }

    println!();
    println!("  txgraph is running:");
    println!("    URL:       http://{bind_addr}");
    println!("    Token:     {api_token}");
    println!("    Network:   {}", args.network);
    println!();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("bind TCP listener")?;

    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run HTTP server")?;

    Ok(())
}

fn lookup_config(args: &cli::Cli) -> LookupConfig {
    let api_keys: HashMap<Network, String> = [
        (Network::Mainnet, &args.mainnet_api_key),
        (Network::Preprod, &args.preprod_api_key),
        (Network::Preview, &args.preview_api_key),
    ]
    .into_iter()
    .filter_map(|(network, key)| Some((network, key.clone()?)))
    .collect();

    let mut base_urls = HashMap::new();
    if let Some(url) = &args.api_base_url {
        base_urls.insert(args.network, url.clone());
    }

    LookupConfig {
        api_keys,
        base_urls,
        requests_per_second: args.requests_per_second,
        ..Default::default()
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down");
}
