// src/error.rs
use std::fmt;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("user not found")]
    NotFound,

    #[error("password is incorrect")]
    Unauthorized,

    #[error("user already exists")]
    Conflict,

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("quote unavailable: {0}")]
    Quote(String),
}

impl LedgerError {
    pub fn status(&self) -> StatusCode {
        match self {
            LedgerError::NotFound => StatusCode::NOT_FOUND,
            LedgerError::Unauthorized => StatusCode::UNAUTHORIZED,
            LedgerError::Conflict | LedgerError::InvalidOrder(_) => StatusCode::BAD_REQUEST,
            LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LedgerError::Quote(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Rejection carried through warp filters and rendered as `[code, message]`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized(message: &str) -> Self {
        ApiError {
            status: StatusCode::UNAUTHORIZED,
            message: message.to_string(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError {
            status: e.status(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl Reject for ApiError {}
