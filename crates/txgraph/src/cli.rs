use clap::Parser;

use txgraph_core::types::Network;

/// txgraph: local Cardano transaction and UTXO graph server.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Network the graph starts on (mainnet, preprod or preview).
    #[arg(long, default_value = "mainnet", env = "TXGRAPH_NETWORK")]
    pub network: Network,

    /// Indexer project key for mainnet.
    #[arg(long, env = "TXGRAPH_MAINNET_API_KEY", hide_env_values = true)]
    pub mainnet_api_key: Option<String>,

    /// Indexer project key for preprod.
    #[arg(long, env = "TXGRAPH_PREPROD_API_KEY", hide_env_values = true)]
    pub preprod_api_key: Option<String>,

    /// Indexer project key for preview.
    #[arg(long, env = "TXGRAPH_PREVIEW_API_KEY", hide_env_values = true)]
    pub preview_api_key: Option<String>,

    /// Base URL of a self-hosted indexer for the selected network.
    /// Requests to it are sent without a project key when none is set.
    #[arg(long, env = "TXGRAPH_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Upper bound on indexer requests per second.
    #[arg(long, env = "TXGRAPH_REQUESTS_PER_SECOND")]
    pub requests_per_second: Option<u32>,

    /// Number of transactions whose outputs are kept in memory.
    #[arg(long, default_value = "4096")]
    pub cache_capacity: usize,

    /// Command that decodes a hex transaction read from stdin into a JSON report.
    #[arg(long, env = "TXGRAPH_CODEC_CMD")]
    pub codec_cmd: String,

    /// Address to bind the web server to.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Port to listen on.
    #[arg(long, default_value = "3080")]
    pub port: u16,

    /// Horizontal canvas center used when a request names none.
    #[arg(long, default_value = "600")]
    pub screen_center_x: f64,

    #[arg(long, default_value = "150")]
    pub tx_width: f64,

    #[arg(long, default_value = "150")]
    pub tx_height: f64,

    /// Vertical spacing between UTXOs that overflow a transaction box.
    #[arg(long, default_value = "50")]
    pub utxo_gap: f64,

    #[arg(long, default_value = "150")]
    pub top_offset: f64,
}
