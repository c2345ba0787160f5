use crate::errors::AppError;
use crate::lookup::{AccountLookup, MeterDataSource};
use crate::models::{AccountType, LookupQuery, LookupResponse};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, OnceLock};

/// Shared application state injected into handlers.
pub struct AppState<S> {
    /// Lookup pipeline over the configured data source.
    pub lookup: AccountLookup<S>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "meter-info-lookup",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1/lookup?number=<id>&type=prepaid|postpaid
///
/// A failed lookup is still a 200: the body carries the error message the
/// form displays. Only malformed requests are rejected.
pub async fn lookup_customer<S: MeterDataSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, AppError> {
    tracing::info!("GET /lookup - params: {:?}", params);

    let account_type: AccountType = params
        .account_type
        .parse()
        .map_err(AppError::BadRequest)?;
    let identifier = validate_identifier(&params.number)?;

    let result = state.lookup.lookup(identifier, account_type).await;

    Ok(Json(LookupResponse {
        account_type,
        looked_up_at: Utc::now().to_rfc3339(),
        result,
    }))
}

/// Meter and consumer numbers: 4-32 characters of letters, digits and dashes.
pub fn validate_identifier(raw: &str) -> Result<&str, AppError> {
    static IDENTIFIER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let pattern = IDENTIFIER
        .get_or_init(|| Regex::new(r"^[0-9A-Za-z-]{4,32}$"))
        .as_ref()
        .map_err(|e| AppError::InternalError(format!("Invalid identifier pattern: {}", e)))?;

    let identifier = raw.trim();
    if identifier.is_empty() {
        return Err(AppError::BadRequest("number is required".to_string()));
    }
    if !pattern.is_match(identifier) {
        tracing::warn!("❌ Invalid identifier: {}", identifier);
        return Err(AppError::BadRequest(format!(
            "'{}' is not a valid meter or consumer number",
            identifier
        )));
    }
    Ok(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SourceError, SourceId};
    use crate::models::{CustomerInfoResponse, LookupResult};
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedSource;

    #[async_trait]
    impl MeterDataSource for FixedSource {
        async fn lookup_prepaid_meter(&self, _meter_no: &str) -> Result<String, SourceError> {
            Err(SourceError::new(SourceId::PrepaidMeter, "not found"))
        }

        async fn lookup_customer_info(
            &self,
            _account_no: &str,
        ) -> Result<CustomerInfoResponse, SourceError> {
            Ok(CustomerInfoResponse {
                customer: Some(json!({"customerName": "Test Customer"})),
                customer_error: None,
                billing: None,
            })
        }
    }

    fn state() -> State<Arc<AppState<FixedSource>>> {
        State(Arc::new(AppState {
            lookup: AccountLookup::new(FixedSource),
        }))
    }

    fn query(number: &str, account_type: &str) -> Query<LookupQuery> {
        Query(LookupQuery {
            number: number.to_string(),
            account_type: account_type.to_string(),
        })
    }

    #[test]
    fn test_validate_identifier() {
        assert_eq!(validate_identifier(" 0115000123 ").unwrap(), "0115000123");
        assert!(validate_identifier("AB-1234").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("123").is_err());
        assert!(validate_identifier("12345; DROP").is_err());
    }

    #[test]
    fn test_identifier_pattern_is_reused() {
        for _ in 0..3 {
            assert_eq!(validate_identifier("0115000123").unwrap(), "0115000123");
            assert!(matches!(
                validate_identifier("৳123"),
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_lookup_returns_record() {
        let Json(response) = lookup_customer(state(), query("3301234", "postpaid"))
            .await
            .unwrap();
        assert_eq!(response.account_type, AccountType::Postpaid);
        let record = response.result.record().unwrap();
        assert_eq!(record.customer_name, "Test Customer");
        assert_eq!(record.consumer_no, "3301234");
    }

    #[tokio::test]
    async fn test_failed_lookup_is_a_domain_result() {
        let Json(response) = lookup_customer(state(), query("0115000123", "prepaid"))
            .await
            .unwrap();
        assert_eq!(
            response.result,
            LookupResult::error("meter number invalid or no data found")
        );
    }

    #[tokio::test]
    async fn test_unknown_account_type_is_rejected() {
        let err = lookup_customer(state(), query("0115000123", "metered"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
