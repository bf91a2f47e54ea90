use crate::types::Network;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("lookup failure: {0}")]
    Lookup(#[from] LookupError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("input not found: {tx_hash}#{index}")]
    InputNotFound { tx_hash: String, index: u32 },

    #[error("input resolution failed: {0}")]
    Resolution(#[source] Box<CoreError>),

    #[error("malformed asset unit: {0}")]
    MalformedAssetUnit(String),

    #[error("alias is {len} characters long; at most {max} allowed")]
    AliasTooLong { len: usize, max: usize },

    #[error("transaction not in graph: {0}")]
    TxNotInGraph(String),

    #[error("utxo not in graph: {0}")]
    UtxoNotInGraph(String),

    #[error("malformed utxo hash `{0}`; expected `<tx_hash>#<index>`")]
    InvalidUtxoKey(String),

    #[error("transaction decoded for {decoded} cannot be merged into a {graph} graph")]
    NetworkMismatch { graph: Network, decoded: Network },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    /// Wrap a resolver failure. Already-wrapped errors are returned as-is.
    pub fn resolution(err: CoreError) -> Self {
        match err {
            wrapped @ CoreError::Resolution(_) => wrapped,
            other => CoreError::Resolution(Box::new(other)),
        }
    }
}

/// Failures talking to the remote indexing API.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no API key configured for {0}")]
    MissingCredential(Network),
}

/// Structural failures of a submitted transaction payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is empty")]
    EmptyPayload,

    #[error("payload is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("malformed CBOR: {0}")]
    MalformedCbor(String),

    #[error("unsupported era: {0}")]
    UnsupportedEra(String),

    #[error("checksum mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("codec failure: {0}")]
    Codec(String),

    #[error("invalid quantity `{0}`")]
    InvalidQuantity(String),

    #[error("invalid field `{field}`: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("decoded hash {actual} does not match requested {expected}")]
    HashMismatch { expected: String, actual: String },
}

impl DecodeError {
    /// Classify an error message reported by the external codec.
    pub fn from_codec_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        let mentions = |word: &str| {
            lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|w| w == word)
        };
        if mentions("era") {
            Self::UnsupportedEra(message.to_owned())
        } else if mentions("checksum") {
            Self::ChecksumMismatch(message.to_owned())
        } else {
            Self::MalformedCbor(message.to_owned())
        }
    }
}
