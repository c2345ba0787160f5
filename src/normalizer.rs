//! Merges identity fields from whichever sources produced data.
//!
//! Source precedence differs per account type, so it is expressed once as an
//! [`ExtractionStrategy`] chosen from the [`AccountType`] at the top of a
//! lookup, not as type checks spread through the field mapping.
use crate::balance::resolve_arrear;
use crate::errors::{ExtractionFailure, SourceId};
use crate::field_extractor::{best_effort, leaf_text, CustomerDocument};
use crate::models::{is_empty_payload, AccountType, CustomerRecord, RechargeEntry};
use crate::recharge::extract_recent;
use serde_json::Value;

// Source 1 (prepaid document, under mCustomerData.result).
pub const PREPAID_NAME: &str = "customerName";
pub const PREPAID_FATHER_NAME: &str = "fatherName";
pub const PREPAID_ADDRESS: &str = "customerAddress";
pub const PREPAID_MOBILE: &str = "mobileNo";
pub const PREPAID_ACCOUNT_NO: &str = "customerAccountNo";

// Source 3 (structured customer info).
pub const CUSTOMER_NAME: &str = "customerName";
pub const CUSTOMER_FATHER_NAME: &str = "fatherName";
pub const CUSTOMER_ADDRESS: &str = "customerAddr";
pub const CUSTOMER_METER: &str = "meterNum";

// Source 2 (billing rows).
pub const BILLING_ROWS: &str = "customerInfo";
pub const BILLING_NAME: &str = "CUSTOMER_NAME";
pub const BILLING_ADDRESS: &str = "ADDRESS";
pub const BILLING_METER: &str = "METER_NUM";
pub const BILLING_CONSUMER: &str = "CUSTOMER_NUMBER";

/// The six identity fields of a [`CustomerRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerIdentity {
    pub meter_no: String,
    pub consumer_no: String,
    pub customer_name: String,
    pub father_name: String,
    pub address: String,
    pub mobile_no: String,
}

/// Identity fields while they are being gathered; `None` is unresolved.
#[derive(Debug, Default)]
struct IdentityDraft {
    meter_no: Option<String>,
    consumer_no: Option<String>,
    customer_name: Option<String>,
    father_name: Option<String>,
    address: Option<String>,
    mobile_no: Option<String>,
}

impl IdentityDraft {
    /// Unresolved fields become empty strings.
    fn finish(self) -> CustomerIdentity {
        CustomerIdentity {
            meter_no: self.meter_no.unwrap_or_default(),
            consumer_no: self.consumer_no.unwrap_or_default(),
            customer_name: self.customer_name.unwrap_or_default(),
            father_name: self.father_name.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            mobile_no: self.mobile_no.unwrap_or_default(),
        }
    }
}

/// Raw payloads available to one lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourcePayloads<'a> {
    /// Source 1 text blob.
    pub prepaid_blob: Option<&'a str>,
    /// Source 2 payload (rows and balance fields).
    pub billing: Option<&'a Value>,
    /// Source 3 payload; `None` when unusable.
    pub customer: Option<&'a Value>,
}

/// Per-account-type source precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Identity from the source-1 document; recharges from the source-1 blob.
    Prepaid,
    /// Identity from source 3, falling back to the first source-2 row.
    Postpaid,
}

impl From<AccountType> for ExtractionStrategy {
    fn from(account_type: AccountType) -> Self {
        match account_type {
            AccountType::Prepaid => ExtractionStrategy::Prepaid,
            AccountType::Postpaid => ExtractionStrategy::Postpaid,
        }
    }
}

impl ExtractionStrategy {
    pub fn identity(
        &self,
        sources: &SourcePayloads<'_>,
        identifier: &str,
    ) -> Result<CustomerIdentity, ExtractionFailure> {
        let draft = match self {
            ExtractionStrategy::Prepaid => {
                let blob = sources
                    .prepaid_blob
                    .ok_or(ExtractionFailure::MissingSource(SourceId::PrepaidMeter))?;
                prepaid_identity(blob, identifier)
            }
            ExtractionStrategy::Postpaid => {
                match sources.customer.filter(|value| !is_empty_payload(value)) {
                    Some(customer) => postpaid_identity(customer, identifier),
                    None => sources
                        .billing
                        .and_then(first_billing_row)
                        .map(billing_identity)
                        .unwrap_or_default(),
                }
            }
        };
        Ok(draft.finish())
    }

    pub fn recharges(&self, sources: &SourcePayloads<'_>, limit: usize) -> Vec<RechargeEntry> {
        match (self, sources.prepaid_blob) {
            (ExtractionStrategy::Prepaid, Some(blob)) => extract_recent(blob, limit),
            _ => Vec::new(),
        }
    }

    /// Builds the complete record: identity, arrear and recharge history.
    pub fn build_record(
        &self,
        sources: &SourcePayloads<'_>,
        identifier: &str,
        recharge_limit: usize,
    ) -> Result<CustomerRecord, ExtractionFailure> {
        let identity = self.identity(sources, identifier)?;
        Ok(CustomerRecord {
            meter_no: identity.meter_no,
            consumer_no: identity.consumer_no,
            customer_name: identity.customer_name,
            father_name: identity.father_name,
            address: identity.address,
            mobile_no: identity.mobile_no,
            arrear: resolve_arrear(sources.billing, sources.customer),
            recharges: self.recharges(sources, recharge_limit),
        })
    }
}

/// Identity fields for one lookup, per the account type's precedence.
pub fn normalize(
    prepaid_blob: Option<&str>,
    billing: Option<&Value>,
    customer: Option<&Value>,
    identifier: &str,
    account_type: AccountType,
) -> Result<CustomerIdentity, ExtractionFailure> {
    let sources = SourcePayloads {
        prepaid_blob,
        billing,
        customer,
    };
    ExtractionStrategy::from(account_type).identity(&sources, identifier)
}

/// Account number reported by the prepaid document, if any.
pub fn prepaid_account_number(blob: &str) -> Option<String> {
    let account_no =
        best_effort(CustomerDocument::parse(blob).and_then(|doc| doc.field(PREPAID_ACCOUNT_NO)));
    let account_no = account_no.trim();
    (!account_no.is_empty()).then(|| account_no.to_string())
}

fn prepaid_identity(blob: &str, identifier: &str) -> IdentityDraft {
    let document = CustomerDocument::parse(blob);
    let field = |key: &str| -> String {
        best_effort(match &document {
            Ok(doc) => doc.field(key),
            Err(failure) => Err(failure.clone()),
        })
    };

    IdentityDraft {
        // The meter number asked for is authoritative for prepaid accounts.
        meter_no: Some(identifier.to_string()),
        consumer_no: Some(field(PREPAID_ACCOUNT_NO)),
        customer_name: Some(field(PREPAID_NAME)),
        father_name: Some(field(PREPAID_FATHER_NAME)),
        address: Some(field(PREPAID_ADDRESS)),
        mobile_no: Some(field(PREPAID_MOBILE)),
    }
}

fn postpaid_identity(customer: &Value, identifier: &str) -> IdentityDraft {
    IdentityDraft {
        meter_no: Some(
            leaf_text(customer, CUSTOMER_METER).unwrap_or_else(|_| identifier.to_string()),
        ),
        consumer_no: Some(identifier.to_string()),
        customer_name: Some(best_effort(leaf_text(customer, CUSTOMER_NAME))),
        father_name: Some(best_effort(leaf_text(customer, CUSTOMER_FATHER_NAME))),
        address: Some(best_effort(leaf_text(customer, CUSTOMER_ADDRESS))),
        // Source 3 carries no phone number.
        mobile_no: None,
    }
}

fn billing_identity(row: &Value) -> IdentityDraft {
    IdentityDraft {
        meter_no: Some(best_effort(leaf_text(row, BILLING_METER))),
        consumer_no: Some(best_effort(leaf_text(row, BILLING_CONSUMER))),
        customer_name: Some(best_effort(leaf_text(row, BILLING_NAME))),
        address: Some(best_effort(leaf_text(row, BILLING_ADDRESS))),
        father_name: None,
        mobile_no: None,
    }
}

/// First customer row of a billing payload, either a bare array or an
/// object holding the rows under `customerInfo`.
fn first_billing_row(billing: &Value) -> Option<&Value> {
    let rows = match billing {
        Value::Array(rows) => rows,
        other => other.get(BILLING_ROWS)?.as_array()?,
    };
    rows.first().filter(|row| row.is_object())
}
