use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Identifies one of the three upstream data providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    /// Prepaid meter lookup returning a text blob with an embedded document.
    PrepaidMeter,
    /// Flat-record service carrying customer rows and balance fields.
    Billing,
    /// Structured customer-info lookup.
    CustomerInfo,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::PrepaidMeter => write!(f, "prepaid meter service"),
            SourceId::Billing => write!(f, "billing service"),
            SourceId::CustomerInfo => write!(f, "customer info service"),
        }
    }
}

/// A backend call failed or returned an explicit error indicator.
///
/// Timeouts, non-2xx statuses, unreadable bodies and open circuit breakers
/// all surface as this one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub source: SourceId,
    pub message: String,
}

impl SourceError {
    pub fn new(source: SourceId, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

impl std::error::Error for SourceError {}

/// Field-level failure while pulling a value out of a response.
///
/// Never escalated: [`crate::field_extractor::best_effort`] collapses it to
/// an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// The `"<field>":{"_text":"` pattern does not occur in the text.
    MarkerNotFound { field: String },
    /// The value's opening quote was found but no closing unescaped quote.
    UnterminatedValue { field: String },
    /// The field key occurs but is not followed by a `{"_text":"..."}` wrapper.
    MalformedWrapper { field: String },
    /// The embedded document could not be parsed.
    InvalidDocument(String),
    /// A path segment or leaf key is absent.
    MissingKey(String),
    /// A value exists but has a shape that cannot be read as text.
    UnexpectedShape { key: String, found: &'static str },
    /// A source required by the selected strategy was not supplied.
    MissingSource(SourceId),
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFailure::MarkerNotFound { field } => {
                write!(f, "marker for field '{}' not found", field)
            }
            ExtractionFailure::UnterminatedValue { field } => {
                write!(f, "value of field '{}' is not terminated", field)
            }
            ExtractionFailure::MalformedWrapper { field } => {
                write!(f, "field '{}' is not a _text wrapper", field)
            }
            ExtractionFailure::InvalidDocument(msg) => write!(f, "invalid document: {}", msg),
            ExtractionFailure::MissingKey(key) => write!(f, "missing key '{}'", key),
            ExtractionFailure::UnexpectedShape { key, found } => {
                write!(f, "key '{}' holds {} instead of a value", key, found)
            }
            ExtractionFailure::MissingSource(source) => {
                write!(f, "no payload from {}", source)
            }
        }
    }
}

impl std::error::Error for ExtractionFailure {}

/// Service-level error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return (**source).clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display_names_source() {
        let err = SourceError::new(SourceId::PrepaidMeter, "timed out");
        assert_eq!(err.to_string(), "prepaid meter service: timed out");
    }

    #[test]
    fn test_context_chain_display() {
        let result: Result<(), AppError> =
            Err(AppError::InternalError("client builder failed".to_string()));
        let err = result
            .context("Failed to initialize upstream data source")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to initialize upstream data source: Internal error: client builder failed"
        );
    }

    #[test]
    fn test_with_context_is_lazy() {
        let ok: Result<u16, AppError> = Ok(3000);
        let value = ok
            .with_context(|| panic!("context built for a successful result"))
            .unwrap();
        assert_eq!(value, 3000);
    }

    #[test]
    fn test_bad_request_maps_to_400() {
        let response = AppError::BadRequest("missing number".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_wrapped_error_keeps_inner_status() {
        let err = AppError::WithContext {
            source: Box::new(AppError::BadRequest("number is required".to_string())),
            context: "lookup".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_maps_to_500() {
        let response = AppError::InternalError("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
