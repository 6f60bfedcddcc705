//! Unified error types for the markets client.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the markets client.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Contract read error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Price feed metadata error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// User input rejected before any contract call.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Transaction submission or confirmation error.
    #[error("transaction error: {0}")]
    Tx(#[from] TxError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Contract read and transport errors.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// RPC endpoint URL could not be parsed.
    #[error("invalid rpc url {url}: {reason}")]
    InvalidRpcUrl {
        /// The offending URL.
        url: String,
        /// Parse failure.
        reason: String,
    },

    /// A contract call failed or reverted.
    #[error("call {method} on {address} failed: {reason}")]
    CallFailed {
        /// Contract method name.
        method: &'static str,
        /// Contract address.
        address: String,
        /// Reason for failure.
        reason: String,
    },

    /// Returned data could not be interpreted.
    #[error("failed to decode {method} result: {reason}")]
    Decode {
        /// Contract method name.
        method: &'static str,
        /// Reason for failure.
        reason: String,
    },

    /// Signer cache lock was poisoned.
    #[error("signer cache unavailable: {0}")]
    Cache(String),

    /// Private key could not be turned into a signer.
    #[error("signing error: {0}")]
    Signing(String),
}

impl GatewayError {
    /// Build a [`GatewayError::CallFailed`] from any displayable error.
    pub fn call(method: &'static str, address: impl ToString, err: impl std::fmt::Display) -> Self {
        Self::CallFailed {
            method,
            address: address.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Price feed metadata errors.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Network name or chain id has no feed directory.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// The feed directory returned a non-success status.
    #[error("failed to fetch feeds from {url}: HTTP {status}")]
    FetchFailed {
        /// Directory URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Feed directory body could not be parsed.
    #[error("failed to parse feed directory: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// User input validation errors, raised before any contract call.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Amount is empty, non-numeric or not positive.
    #[error("please enter a valid amount: {0:?}")]
    InvalidAmount(String),

    /// Amount has more fractional digits than the token supports.
    #[error("amount {amount} has more than {decimals} decimal places")]
    TooPrecise {
        /// The requested amount.
        amount: Decimal,
        /// Token decimals.
        decimals: u32,
    },

    /// Resolution time is not in the future.
    #[error("resolution time {resolution_time} is not after now ({now})")]
    ResolutionInPast {
        /// Requested resolution time (unix seconds).
        resolution_time: i64,
        /// Current time (unix seconds).
        now: i64,
    },

    /// Address string is not a valid hex address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Asset or base symbol is empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Balance does not cover the bet.
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance {
        /// Required amount.
        required: Decimal,
        /// Available amount.
        available: Decimal,
    },
}

/// Transaction errors.
#[derive(Error, Debug)]
pub enum TxError {
    /// Write attempted without a configured signer.
    #[error("no signer configured: set PRIVATE_KEY to send transactions")]
    NoSigner,

    /// Transaction could not be sent or was reverted.
    #[error("{method} on {address} failed: {reason}")]
    Failed {
        /// Contract method name.
        method: &'static str,
        /// Contract address.
        address: String,
        /// Reason for failure.
        reason: String,
    },
}

impl TxError {
    /// Build a [`TxError::Failed`] from any displayable error.
    pub fn failed(method: &'static str, address: impl ToString, err: impl std::fmt::Display) -> Self {
        Self::Failed {
            method,
            address: address.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
