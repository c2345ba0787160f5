use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Currency glyph prefixed to recharge amounts.
pub const CURRENCY_GLYPH: &str = "৳";

/// Billing account type; selects the lookup key and source precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Looked up by meter number.
    Prepaid,
    /// Looked up by consumer/account number.
    Postpaid,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Prepaid => write!(f, "prepaid"),
            AccountType::Postpaid => write!(f, "postpaid"),
        }
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prepaid" => Ok(AccountType::Prepaid),
            "postpaid" => Ok(AccountType::Postpaid),
            other => Err(format!("unknown account type '{}'", other)),
        }
    }
}

/// One lookup invocation. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub identifier: String,
    pub account_type: AccountType,
}

impl LookupRequest {
    pub fn new(identifier: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            identifier: identifier.into(),
            account_type,
        }
    }
}

/// Combined response of the customer-info lookup.
///
/// Source 3's outcome is reported in-band (`customer` or `customer_error`)
/// alongside whatever the billing source (source 2) returned for the same
/// account, so a failed source 3 can still yield a degraded record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfoResponse {
    /// Structured source-3 payload.
    pub customer: Option<Value>,
    /// Error reported by source 3, if its call failed.
    pub customer_error: Option<String>,
    /// Source-2 payload: customer rows plus balance fields.
    pub billing: Option<Value>,
}

impl CustomerInfoResponse {
    /// Source 3's payload when it carries no error and is non-null and non-empty.
    pub fn usable_customer(&self) -> Option<&Value> {
        if self.customer_error.is_some() {
            return None;
        }
        self.customer.as_ref().filter(|value| !is_empty_payload(value))
    }
}

/// True for `null` and empty objects, arrays and strings.
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// A recent recharge transaction scraped from the prepaid blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeEntry {
    pub date: String,
    /// Raw amount prefixed with [`CURRENCY_GLYPH`].
    pub amount: String,
}

/// Normalized customer record handed to the renderer.
///
/// Every key is always present; unresolved fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub meter_no: String,
    pub consumer_no: String,
    pub customer_name: String,
    pub father_name: String,
    pub address: String,
    pub mobile_no: String,
    pub arrear: String,
    pub recharges: Vec<RechargeEntry>,
}

/// Outcome of one lookup: a record or a human-readable error, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupResult {
    Found {
        account_type: AccountType,
        record: CustomerRecord,
    },
    Error {
        message: String,
    },
}

impl LookupResult {
    pub fn error(message: impl Into<String>) -> Self {
        LookupResult::Error {
            message: message.into(),
        }
    }

    pub fn record(&self) -> Option<&CustomerRecord> {
        match self {
            LookupResult::Found { record, .. } => Some(record),
            LookupResult::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LookupResult::Found { .. } => None,
            LookupResult::Error { message } => Some(message),
        }
    }
}

// ============ API Request/Response Models ============

/// Query parameters for `GET /api/v1/lookup`.
#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    /// Meter number (prepaid) or consumer number (postpaid).
    pub number: String,
    /// `prepaid` or `postpaid`.
    #[serde(rename = "type")]
    pub account_type: String,
}

/// Response envelope for `GET /api/v1/lookup`.
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub account_type: AccountType,
    /// RFC 3339 timestamp of when the lookup completed.
    pub looked_up_at: String,
    pub result: LookupResult,
}
