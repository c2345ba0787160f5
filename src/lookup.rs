//! Account lookup orchestration.
//!
//! Issues the backend calls in the order each account type requires, applies
//! source-failure fallback, and turns whatever data came back into a
//! [`LookupResult`]:
//!
//! - Prepaid: meter lookup (source 1), then customer info (source 3 with the
//!   embedded billing payload) keyed by the account number source 1 reports.
//! - Postpaid: customer info keyed by the identifier; an unusable source-3
//!   payload degrades to the billing rows instead of failing.
use crate::errors::{ExtractionFailure, SourceError};
use crate::models::{AccountType, CustomerInfoResponse, CustomerRecord, LookupRequest, LookupResult};
use crate::normalizer::{prepaid_account_number, ExtractionStrategy, SourcePayloads};
use crate::recharge::DEFAULT_RECHARGE_LIMIT;
use async_trait::async_trait;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub const METER_NOT_FOUND: &str = "meter number invalid or no data found";
pub const CUSTOMER_NOT_FOUND: &str = "customer info not found";
pub const PROCESSING_FAILED: &str = "data processing failed";

/// Backend calls the lookup depends on.
///
/// Timeouts and retries belong to the implementation; every failure reaches
/// the orchestrator as a [`SourceError`].
#[async_trait]
pub trait MeterDataSource: Send + Sync {
    /// Source 1: prepaid meter lookup, returning the raw response blob.
    async fn lookup_prepaid_meter(&self, meter_no: &str) -> Result<String, SourceError>;

    /// Source 3 with the billing (source 2) payload for the same account.
    ///
    /// A source-3 failure alone is reported in-band; `Err` means no data at all.
    async fn lookup_customer_info(
        &self,
        account_no: &str,
    ) -> Result<CustomerInfoResponse, SourceError>;
}

/// Entry point handed to the presentation layer.
///
/// Holds no per-lookup state; concurrent lookups are safe whenever the
/// data source is.
pub struct AccountLookup<S> {
    source: S,
    recharge_limit: usize,
}

impl<S: MeterDataSource> AccountLookup<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            recharge_limit: DEFAULT_RECHARGE_LIMIT,
        }
    }

    /// Overrides how many recent recharges a prepaid record carries.
    pub fn with_recharge_limit(mut self, recharge_limit: usize) -> Self {
        self.recharge_limit = recharge_limit;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Looks up one account. Never fails: errors come back as
    /// [`LookupResult::Error`].
    pub async fn lookup(&self, identifier: &str, account_type: AccountType) -> LookupResult {
        let request = LookupRequest::new(identifier, account_type);
        tracing::info!(
            "Starting {} lookup for {}",
            request.account_type,
            request.identifier
        );

        let result = match ExtractionStrategy::from(account_type) {
            ExtractionStrategy::Prepaid => self.lookup_prepaid(&request).await,
            ExtractionStrategy::Postpaid => self.lookup_postpaid(&request).await,
        };

        match &result {
            LookupResult::Found { .. } => {
                tracing::info!("✓ Lookup completed for {}", request.identifier)
            }
            LookupResult::Error { message } => {
                tracing::warn!("Lookup failed for {}: {}", request.identifier, message)
            }
        }
        result
    }

    async fn lookup_prepaid(&self, request: &LookupRequest) -> LookupResult {
        tracing::info!("Step 1: Fetching prepaid meter {}", request.identifier);
        let blob = match self.source.lookup_prepaid_meter(&request.identifier).await {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!("Prepaid meter lookup failed: {}", e);
                return LookupResult::error(METER_NOT_FOUND);
            }
        };

        let Some(account_no) = prepaid_account_number(&blob) else {
            tracing::warn!(
                "Prepaid response for {} carries no account number",
                request.identifier
            );
            return LookupResult::error(METER_NOT_FOUND);
        };

        tracing::info!("Step 2: Fetching customer info for account {}", account_no);
        let info = match self.source.lookup_customer_info(&account_no).await {
            Ok(info) => info,
            Err(e) => return LookupResult::error(format!("{}: {}", CUSTOMER_NOT_FOUND, e)),
        };
        if let Some(cause) = &info.customer_error {
            return LookupResult::error(format!("{}: {}", CUSTOMER_NOT_FOUND, cause));
        }

        let sources = SourcePayloads {
            prepaid_blob: Some(&blob),
            billing: info.billing.as_ref(),
            customer: info.customer.as_ref(),
        };
        self.extract(ExtractionStrategy::Prepaid, request, &sources)
    }

    async fn lookup_postpaid(&self, request: &LookupRequest) -> LookupResult {
        tracing::info!("Step 1: Fetching customer info for {}", request.identifier);
        let info = match self.source.lookup_customer_info(&request.identifier).await {
            Ok(info) => info,
            Err(e) => return LookupResult::error(format!("{}: {}", CUSTOMER_NOT_FOUND, e)),
        };

        let customer = info.usable_customer();
        if customer.is_none() {
            tracing::warn!(
                "Customer info unusable for {} ({}), building degraded record",
                request.identifier,
                info.customer_error.as_deref().unwrap_or("empty payload")
            );
        }

        let sources = SourcePayloads {
            prepaid_blob: None,
            billing: info.billing.as_ref(),
            customer,
        };
        self.extract(ExtractionStrategy::Postpaid, request, &sources)
    }

    fn extract(
        &self,
        strategy: ExtractionStrategy,
        request: &LookupRequest,
        sources: &SourcePayloads<'_>,
    ) -> LookupResult {
        tracing::info!("Step 3: Extracting {} record", request.account_type);
        guarded_extraction(request.account_type, || {
            strategy.build_record(sources, &request.identifier, self.recharge_limit)
        })
    }
}

/// Runs an extraction, converting any failure or panic into
/// `"data processing failed: <cause>"`.
pub fn guarded_extraction<F>(account_type: AccountType, extraction: F) -> LookupResult
where
    F: FnOnce() -> Result<CustomerRecord, ExtractionFailure>,
{
    match panic::catch_unwind(AssertUnwindSafe(extraction)) {
        Ok(Ok(record)) => LookupResult::Found {
            account_type,
            record,
        },
        Ok(Err(failure)) => {
            tracing::error!("Extraction failed: {}", failure);
            LookupResult::error(format!("{}: {}", PROCESSING_FAILED, failure))
        }
        Err(payload) => {
            let cause = panic_message(payload.as_ref());
            tracing::error!("Extraction panicked: {}", cause);
            LookupResult::error(format!("{}: {}", PROCESSING_FAILED, cause))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceId;

    #[test]
    fn test_guarded_extraction_passes_record_through() {
        let result = guarded_extraction(AccountType::Postpaid, || Ok(CustomerRecord::default()));
        assert_eq!(
            result,
            LookupResult::Found {
                account_type: AccountType::Postpaid,
                record: CustomerRecord::default()
            }
        );
    }

    #[test]
    fn test_guarded_extraction_reports_failure() {
        let result = guarded_extraction(AccountType::Prepaid, || {
            Err(ExtractionFailure::MissingSource(SourceId::PrepaidMeter))
        });
        assert_eq!(
            result.error_message(),
            Some("data processing failed: no payload from prepaid meter service")
        );
    }

    #[test]
    fn test_guarded_extraction_catches_panic() {
        let result = guarded_extraction(AccountType::Prepaid, || -> Result<CustomerRecord, ExtractionFailure> {
            panic!("index out of bounds")
        });
        assert_eq!(
            result.error_message(),
            Some("data processing failed: index out of bounds")
        );
    }

    #[test]
    fn test_guarded_extraction_formatted_panic() {
        let result = guarded_extraction(AccountType::Prepaid, || -> Result<CustomerRecord, ExtractionFailure> {
            panic!("bad offset {}", 7)
        });
        assert_eq!(
            result.error_message(),
            Some("data processing failed: bad offset 7")
        );
    }
}
