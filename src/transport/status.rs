use derive_more::Display;

/// The classification of a HTTP status code.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum StatusClass {
    /// The request succeeded.
    #[display("success")]
    Success,
    /// The request failed, but may succeed if retried.
    #[display("retryable")]
    Retryable,
    /// The request failed and must not be retried.
    #[display("fatal")]
    Fatal,
}

/// Classify a HTTP status code.
///
/// `200`, `201` and `204` are a success, server errors (`5xx`) are retryable, and everything else is fatal.
#[must_use]
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200 | 201 | 204 => StatusClass::Success,
        500..=599 => StatusClass::Retryable,
        _ => StatusClass::Fatal,
    }
}

/// Return a human-readable message for a HTTP status code.
#[must_use]
pub fn status_message(status: u16) -> &'static str {
    match status {
        200 => "200 - OK",
        201 => "201 - Created",
        204 => "204 - No content",
        400 => "400 - Malformed/Bad request for resource",
        401 => "401 - Valid authentication needed to access resource",
        403 => "403 - Unauthorized access to resource",
        404 => "404 - Resource not found",
        405 => "405 - Method not allowed",
        409 => "409 - Resource already exists",
        410 => "410 - Resource has been deleted",
        413 => "413 - Selection too large",
        500 => "500 - An internal server error occurred",
        501 => "501 - Functionality not implemented",
        502 => "502 - Bad gateway",
        503 => "503 - Service unavailable",
        504 => "504 - Gateway timeout",
        _ => "Unknown error occurred",
    }
}
