//! Commerce error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur in storefront operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Quantity is not usable for the operation.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// A monetary amount could not be parsed or is out of range.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Checkout attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Product has no stock left.
    #[error("Out of stock: {0}")]
    OutOfStock(String),

    /// Input rejected before reaching the server.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Local persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] hope_cache::CacheError),

    /// The remote API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CommerceError {
    /// Message suitable for showing to a shopper.
    ///
    /// Server-provided messages win; otherwise `generic` is used for remote
    /// failures and the error's own text for local ones.
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            CommerceError::Api(e) => e.user_message(generic),
            CommerceError::Storage(_) => generic.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = CommerceError::Api(ApiError::Rejected {
            status: 400,
            message: Some("Insufficient quantity for item Rice".to_string()),
            details: None,
        });
        assert_eq!(
            err.user_message("Failed to place order"),
            "Insufficient quantity for item Rice"
        );
    }

    #[test]
    fn test_user_message_falls_back_to_generic() {
        let err = CommerceError::Api(ApiError::Rejected {
            status: 502,
            message: None,
            details: None,
        });
        assert_eq!(err.user_message("Failed to place order"), "Failed to place order");
    }

    #[test]
    fn test_user_message_for_local_errors() {
        assert_eq!(CommerceError::EmptyCart.user_message("x"), "Cart is empty");
    }
}
