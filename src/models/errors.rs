//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so logs can be grepped and
//! classified. The retry policy only ever looks at `ErrorCode::class()`.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - RPC_xxx: transport / provider errors
//! - CONTRACT_xxx: reverts and undecodable contract data

use std::fmt;

/// Error class consumed by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// HTTP 429 or an equivalent provider throttling signal
    RateLimited,
    /// Network failure, timeout, provider hiccup
    Transient,
    /// Revert, malformed response, bad request. Never retried.
    Fatal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
            Self::Fatal => "fatal",
        }
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // ============================================
    // RPC Errors
    // ============================================
    /// RPC connection failed
    RpcConnectionFailed,
    /// RPC request timeout
    RpcTimeout,
    /// RPC rate limited (HTTP 429 or provider code)
    RpcRateLimited,
    /// Provider-side failure worth retrying (5xx, -32000 family)
    RpcUnavailable,
    /// RPC returned a non-retryable error response
    RpcError,
    /// Response could not be parsed
    RpcInvalidResponse,

    // ============================================
    // Contract Errors
    // ============================================
    /// Call reverted on-chain
    ContractReverted,
    /// Return data did not match the expected ABI shape
    ContractDecodeFailed,
    /// Query key does not name a known read method
    UnknownMethod,

    // ============================================
    // Generic Errors
    // ============================================
    /// Background task died before producing a result
    TaskFailed,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcRateLimited => "RPC_RATE_LIMITED",
            Self::RpcUnavailable => "RPC_UNAVAILABLE",
            Self::RpcError => "RPC_ERROR",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",
            Self::ContractReverted => "CONTRACT_REVERTED",
            Self::ContractDecodeFailed => "CONTRACT_DECODE_FAILED",
            Self::UnknownMethod => "CONTRACT_UNKNOWN_METHOD",
            Self::TaskFailed => "TASK_FAILED",
        }
    }

    /// Retry class for this code
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RpcRateLimited => ErrorClass::RateLimited,
            Self::RpcConnectionFailed | Self::RpcTimeout | Self::RpcUnavailable => {
                ErrorClass::Transient
            }
            Self::RpcError
            | Self::RpcInvalidResponse
            | Self::ContractReverted
            | Self::ContractDecodeFailed
            | Self::UnknownMethod
            | Self::TaskFailed => ErrorClass::Fatal,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        self.class() != ErrorClass::Fatal
    }
}

/// Error surfaced by every chain read.
///
/// `Clone` so one terminal failure can be handed to every caller waiting on
/// the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

impl ChainError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.code.class()
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ChainError {}

// ============================================
// Convenience constructors
// ============================================

impl ChainError {
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcRateLimited, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcTimeout, msg)
    }

    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcConnectionFailed, msg)
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcUnavailable, msg)
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcInvalidResponse, msg)
    }

    /// Revert with a decoded reason; known reasons are translated
    pub fn reverted(reason: &str) -> Self {
        Self::new(ErrorCode::ContractReverted, revert_message(reason))
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ContractDecodeFailed, msg)
    }

    pub fn unknown_method(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnknownMethod, msg)
    }

    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::TaskFailed, msg)
    }
}

// ============================================
// Revert reasons
// ============================================

/// Known contract revert reasons and their player-facing messages
const KNOWN_REVERTS: [(&str, &str); 8] = [
    ("Insufficient balance", "Not enough balance to complete this action"),
    ("Land not available", "This land is not available to claim"),
    ("Seed not owned", "You do not own this seed"),
    ("Land not ripe", "The crop on this land is not ripe yet"),
    ("Daily help limit reached", "You have used all of today's help actions"),
    ("Booster limit reached", "No more boosters can be applied to this crop"),
    ("Invalid crop type", "Unknown crop type"),
    ("Transaction reverted", "The transaction was rejected by the contract"),
];

/// Translate a revert reason; unknown reasons pass through verbatim
pub fn revert_message(reason: &str) -> String {
    let trimmed = reason.trim();
    KNOWN_REVERTS
        .iter()
        .find(|(known, _)| *known == trimmed)
        .map(|(_, message)| (*message).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

// ============================================
// Result type alias
// ============================================

pub type ChainResult<T> = Result<T, ChainError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            Self::connection_failed(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Self::invalid_response(format!("Failed to parse response: {}", err))
        } else if err.status().map(|s| s.as_u16()) == Some(429) {
            Self::rate_limited("Rate limited (HTTP 429)")
        } else {
            // Body/redirect/request errors surface mid-flight; treat as network noise
            Self::connection_failed(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_response(format!("JSON parse error: {}", err))
    }
}
