//! Amount-owed resolution across the billing (source 2) and customer-info
//! (source 3) payloads.
use crate::field_extractor::leaf_text;
use serde_json::Value;

/// Source 2: pre-formatted balance, sometimes `"<amount>,<more>"`.
pub const BILLING_BALANCE_TEXT: &str = "finalBalanceInfo";
/// Source 2: structured balance lookup holding a `Result` array.
pub const BILLING_BALANCE_INFO: &str = "balanceInfo";
pub const BILLING_BALANCE_RESULT: &str = "Result";
pub const BILLING_BALANCE_AMOUNT: &str = "BALANCE";
/// Source 3: arrear amount.
pub const CUSTOMER_ARREAR: &str = "arrearAmount";

const REJECTED_VALUES: [&str; 4] = ["0", "0.00", "null", "N/A"];

/// Returns the amount owed, or `""` when nothing is owed or it is unknown.
///
/// Candidates in order, first accepted wins:
/// 1. the billing pre-formatted balance, cut at its first comma;
/// 2. the first billing balance result, if strictly positive;
/// 3. the customer-info arrear amount.
pub fn resolve_arrear(billing: Option<&Value>, customer: Option<&Value>) -> String {
    let resolved = billing
        .and_then(preformatted_balance)
        .or_else(|| billing.and_then(structured_balance))
        .or_else(|| customer.and_then(customer_arrear))
        .unwrap_or_default();

    if resolved == "0" || resolved == "0.00" {
        return String::new();
    }
    resolved
}

/// Rejects blanks and the placeholder values upstreams use for "nothing".
pub fn passes_validity_filter(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !REJECTED_VALUES.contains(&value)
}

fn preformatted_balance(billing: &Value) -> Option<String> {
    let raw = leaf_text(billing, BILLING_BALANCE_TEXT).ok()?;
    if !passes_validity_filter(&raw) {
        return None;
    }
    let raw = raw.trim();
    let value = if raw.contains(',') || raw.contains(':') {
        raw.split(',').next().unwrap_or_default()
    } else {
        raw
    };
    Some(value.trim().to_string())
}

fn structured_balance(billing: &Value) -> Option<String> {
    let amount = billing
        .get(BILLING_BALANCE_INFO)?
        .get(BILLING_BALANCE_RESULT)?
        .as_array()?
        .first()?
        .get(BILLING_BALANCE_AMOUNT)?;
    let amount = match amount {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if amount.is_finite() && amount > 0.0 {
        // Halves round up: 842.5 owes 843, 0.5 owes 1.
        Some(format!("{:.0}", amount.round()))
    } else {
        None
    }
}

fn customer_arrear(customer: &Value) -> Option<String> {
    let raw = leaf_text(customer, CUSTOMER_ARREAR).ok()?;
    let raw = raw.trim();
    if passes_validity_filter(raw) && raw != "0" {
        Some(raw.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(amount: serde_json::Value) -> serde_json::Value {
        json!({"balanceInfo": {"Result": [{"BALANCE": amount}]}})
    }

    #[test]
    fn test_structured_balance_rounds_halves_up() {
        assert_eq!(resolve_arrear(Some(&structured(json!(842.5))), None), "843");
        assert_eq!(resolve_arrear(Some(&structured(json!(2.5))), None), "3");
        assert_eq!(resolve_arrear(Some(&structured(json!("1804.5"))), None), "1805");
        assert_eq!(resolve_arrear(Some(&structured(json!(842.49))), None), "842");
    }

    #[test]
    fn test_half_unit_balance_is_still_owed() {
        assert_eq!(resolve_arrear(Some(&structured(json!(0.5))), None), "1");
        assert_eq!(resolve_arrear(Some(&structured(json!(0.4))), None), "");
    }

    #[test]
    fn test_preformatted_balance_wins() {
        let billing = json!({
            "finalBalanceInfo": "1530.50",
            "balanceInfo": {"Result": [{"BALANCE": 99.0}]}
        });
        let customer = json!({"arrearAmount": "12"});
        assert_eq!(resolve_arrear(Some(&billing), Some(&customer)), "1530.50");
    }

    #[test]
    fn test_preformatted_balance_is_cut_at_first_comma() {
        let billing = json!({"finalBalanceInfo": "1200,extra:data"});
        assert_eq!(resolve_arrear(Some(&billing), None), "1200");
    }

    #[test]
    fn test_preformatted_balance_with_colon_only_is_kept() {
        let billing = json!({"finalBalanceInfo": "due:1200"});
        assert_eq!(resolve_arrear(Some(&billing), None), "due:1200");
    }

    #[test]
    fn test_truncated_zero_is_suppressed() {
        let billing = json!({
            "finalBalanceInfo": "0,arrear:0",
            "balanceInfo": {"Result": [{"BALANCE": 250.0}]}
        });
        assert_eq!(resolve_arrear(Some(&billing), None), "");
    }

    #[test]
    fn test_structured_balance_used_when_preformatted_rejected() {
        for rejected in ["", "  ", "0", "0.00", "null", "N/A"] {
            let billing = json!({
                "finalBalanceInfo": rejected,
                "balanceInfo": {"Result": [{"BALANCE": 842.6}]}
            });
            assert_eq!(resolve_arrear(Some(&billing), None), "843", "for {:?}", rejected);
        }
    }

    #[test]
    fn test_structured_balance_accepts_numeric_string() {
        let billing = json!({"balanceInfo": {"Result": [{"BALANCE": "310"}]}});
        assert_eq!(resolve_arrear(Some(&billing), None), "310");
    }

    #[test]
    fn test_non_positive_structured_balance_falls_through() {
        let billing = json!({"balanceInfo": {"Result": [{"BALANCE": -15.0}]}});
        let customer = json!({"arrearAmount": {"_text": "760"}});
        assert_eq!(resolve_arrear(Some(&billing), Some(&customer)), "760");
    }

    #[test]
    fn test_customer_arrear_filters() {
        for rejected in ["0", "0.00", "null", "N/A", ""] {
            let customer = json!({"arrearAmount": rejected});
            assert_eq!(resolve_arrear(None, Some(&customer)), "");
        }
        let customer = json!({"arrearAmount": 455});
        assert_eq!(resolve_arrear(None, Some(&customer)), "455");
    }

    #[test]
    fn test_everything_rejected_is_empty() {
        let billing = json!({
            "finalBalanceInfo": "N/A",
            "balanceInfo": {"Result": [{"BALANCE": 0}]}
        });
        let customer = json!({"arrearAmount": "0.00"});
        assert_eq!(resolve_arrear(Some(&billing), Some(&customer)), "");
        assert_eq!(resolve_arrear(None, None), "");
    }

    #[test]
    fn test_unexpected_shapes_are_ignored() {
        let billing = json!({
            "finalBalanceInfo": ["1200"],
            "balanceInfo": {"Result": "none"}
        });
        assert_eq!(resolve_arrear(Some(&billing), Some(&json!([]))), "");
    }
}
