//! Upstream error code translation.
//!
//! Rapyd reports failures as `{"status": {"error_code": "...", ...}}`. The
//! codes below get an end-user message and hint; anything else becomes
//! `UNKNOWN_ERROR`. Translation never fails.

use crate::error::CanonicalError;

/// `(upstream error_code, code, message, hint)`
const KNOWN_ERRORS: &[(&str, &str, &str, &str)] = &[
    (
        "ERROR_PROCESSING_CARD - [05]",
        "DO_NOT_HONOR",
        "Your card was declined by the bank.",
        "Try a different card or contact your bank for more details.",
    ),
    (
        "INVALID_PAYMENT_METHOD_TYPE",
        "INVALID_METHOD",
        "The selected payment method is not supported.",
        "Check if you selected the correct card type for your country.",
    ),
    (
        "CARD_NUMBER_INVALID",
        "INVALID_CARD_NUMBER",
        "The card number entered is invalid.",
        "Double-check the card number and try again.",
    ),
    (
        "CARD_EXPIRED",
        "EXPIRED_CARD",
        "The card has expired.",
        "Use a card with a valid expiration date.",
    ),
    (
        "INSUFFICIENT_FUNDS",
        "NO_FUNDS",
        "Not enough funds on the card.",
        "Use another card or fund the account.",
    ),
];

pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";
const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred during payment.";
const UNKNOWN_ERROR_HINT: &str = "Please try again or contact support.";

/// Map one upstream error code to its canonical triple. `raw` is left empty.
pub fn translate(error_code: &str) -> CanonicalError {
    KNOWN_ERRORS
        .iter()
        .find(|(upstream, ..)| *upstream == error_code)
        .map(|(_, code, message, hint)| CanonicalError::new(code, message, hint))
        .unwrap_or_else(|| {
            CanonicalError::new(UNKNOWN_ERROR_CODE, UNKNOWN_ERROR_MESSAGE, UNKNOWN_ERROR_HINT)
        })
}

/// Pull `status.error_code` out of an upstream error body, if present.
pub fn upstream_error_code(payload: &serde_json::Value) -> Option<&str> {
    payload
        .get("status")
        .and_then(|s| s.get("error_code"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
}

/// Translate a full upstream error body, keeping it under `raw`.
pub fn translate_upstream(payload: serde_json::Value) -> CanonicalError {
    let error = translate(upstream_error_code(&payload).unwrap_or_default());
    error.with_raw(payload)
}
