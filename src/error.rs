//! Crate-wide error type.
//!
//! Business-rule rejections (coupon not applicable, shipping unresolved,
//! invalid form) are typed outcomes on their own modules, not variants here;
//! this enum covers infrastructure failures only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{collaborator} request failed: {source}")]
    Collaborator {
        collaborator: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{collaborator} returned status {status}: {message}")]
    CollaboratorRejected {
        collaborator: &'static str,
        status: u16,
        message: String,
    },

    /// A persisted row failed boundary validation on its way into the
    /// domain. Loosely-shaped records never propagate past this point.
    #[error("invalid {table} row {id}: {reason}")]
    InvalidRow {
        table: &'static str,
        id: String,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
