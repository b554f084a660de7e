use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum UserError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Email address already in use")]
    DuplicateEmail,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
