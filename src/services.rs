use crate::circuit_breaker::{call_guarded, create_source_circuit_breaker, SourceCircuitBreaker};
use crate::config::Config;
use crate::errors::{AppError, ResultExt, SourceError, SourceId};
use crate::lookup::MeterDataSource;
use crate::models::CustomerInfoResponse;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// HTTP client for the three upstream sources.
///
/// The customer-info lookup owns the nested fallback: it always asks both
/// source 3 and the billing source, reporting a source-3 failure in-band so
/// the orchestrator can still build a degraded record from billing rows.
pub struct HttpMeterDataSource {
    client: Client,
    prepaid_meter_url: String,
    billing_url: String,
    customer_info_url: String,
    prepaid_meter_breaker: SourceCircuitBreaker,
    billing_breaker: SourceCircuitBreaker,
    customer_info_breaker: SourceCircuitBreaker,
}

impl HttpMeterDataSource {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .map_err(|e| AppError::InternalError(e.to_string()))
            .with_context(|| {
                format!(
                    "Failed to create upstream client ({}s timeout)",
                    config.upstream_timeout_secs
                )
            })?;

        Ok(Self {
            client,
            prepaid_meter_url: config.prepaid_meter_url.clone(),
            billing_url: config.billing_url.clone(),
            customer_info_url: config.customer_info_url.clone(),
            prepaid_meter_breaker: create_source_circuit_breaker(),
            billing_breaker: create_source_circuit_breaker(),
            customer_info_breaker: create_source_circuit_breaker(),
        })
    }

    /// GET `endpoint?<param>=<value>`, returning the body of a 2xx response.
    async fn fetch_text(
        &self,
        source: SourceId,
        endpoint: &str,
        param: &str,
        value: &str,
    ) -> Result<String, SourceError> {
        // Build URL with proper parameter encoding
        let url = reqwest::Url::parse_with_params(endpoint, &[(param, value)])
            .map_err(|e| SourceError::new(source, format!("Failed to build URL: {}", e)))?;

        tracing::info!("Querying {} for {}", source, value);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::new(source, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("{} returned error {}: {}", source, status, error_text);
            return Err(SourceError::new(
                source,
                format!("returned status {}: {}", status, error_text),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::new(source, format!("failed to read response: {}", e)))?;

        if body.trim().is_empty() {
            return Err(SourceError::new(source, "empty response"));
        }
        Ok(body)
    }

    async fn fetch_json(
        &self,
        source: SourceId,
        endpoint: &str,
        param: &str,
        value: &str,
    ) -> Result<Value, SourceError> {
        let body = self.fetch_text(source, endpoint, param, value).await?;
        serde_json::from_str(&body)
            .map_err(|e| SourceError::new(source, format!("failed to parse response: {}", e)))
    }
}

#[async_trait]
impl MeterDataSource for HttpMeterDataSource {
    async fn lookup_prepaid_meter(&self, meter_no: &str) -> Result<String, SourceError> {
        let source = SourceId::PrepaidMeter;
        call_guarded(
            &self.prepaid_meter_breaker,
            source,
            self.fetch_text(source, &self.prepaid_meter_url, "meterNo", meter_no),
        )
        .await
    }

    async fn lookup_customer_info(
        &self,
        account_no: &str,
    ) -> Result<CustomerInfoResponse, SourceError> {
        let customer = call_guarded(
            &self.customer_info_breaker,
            SourceId::CustomerInfo,
            self.fetch_json(
                SourceId::CustomerInfo,
                &self.customer_info_url,
                "accountNo",
                account_no,
            ),
        )
        .await;

        let billing = call_guarded(
            &self.billing_breaker,
            SourceId::Billing,
            self.fetch_json(SourceId::Billing, &self.billing_url, "accountNo", account_no),
        )
        .await;

        match (customer, billing) {
            (Err(customer_err), Err(billing_err)) => {
                tracing::error!(
                    "No customer data for {}: {}; {}",
                    account_no,
                    customer_err,
                    billing_err
                );
                Err(SourceError::new(
                    SourceId::CustomerInfo,
                    format!("{}; {}", customer_err.message, billing_err),
                ))
            }
            (customer, billing) => {
                let billing = billing
                    .map_err(|e| tracing::warn!("Billing lookup failed: {}", e))
                    .ok();
                Ok(match customer {
                    Ok(customer) => CustomerInfoResponse {
                        customer: Some(customer),
                        customer_error: None,
                        billing,
                    },
                    Err(e) => {
                        tracing::warn!("Customer info lookup failed: {}", e);
                        CustomerInfoResponse {
                            customer: None,
                            customer_error: Some(e.message),
                            billing,
                        }
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let config = Config {
            port: 3000,
            prepaid_meter_url: "https://meter.example.com/info".to_string(),
            billing_url: "https://billing.example.com/info".to_string(),
            customer_info_url: "https://customer.example.com/info".to_string(),
            upstream_timeout_secs: 5,
        };
        assert!(HttpMeterDataSource::new(&config).is_ok());
    }
}
