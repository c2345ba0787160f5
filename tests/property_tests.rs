/// Property-based tests using proptest
/// Extraction must never panic on arbitrary upstream text
use meter_info_lookup::core::extraction::{extract_recent, resolve_arrear, text_field, CustomerDocument};
use meter_info_lookup::core::models::AccountType;
use meter_info_lookup::core::normalizer::normalize;
use meter_info_lookup::recharge::DEFAULT_RECHARGE_LIMIT;
use proptest::prelude::*;
use serde_json::json;

// Property: raw blob scanning should never panic
proptest! {
    #[test]
    fn text_field_never_panics(blob in "\\PC*", field in "[a-zA-Z]{1,12}") {
        let _ = text_field(blob.as_bytes(), &field);
    }

    #[test]
    fn document_parse_never_panics(blob in "\\PC*") {
        let _ = CustomerDocument::parse(&blob);
    }

    #[test]
    fn recharge_scan_never_panics(noise in "\\PC{0,900}", hits in 0usize..15) {
        // Multibyte noise around the markers exercises window edges
        let mut blob = noise.clone();
        for i in 0..hits {
            blob.push_str(&format!(
                r#""tokens":{{"_text":"t{}"}},"date":{{"_text":"d{}"}},"grossAmount":{{"_text":"{}"}}"#,
                i, i, i
            ));
            blob.push_str(&noise);
        }
        let entries = extract_recent(&blob, DEFAULT_RECHARGE_LIMIT);
        prop_assert!(entries.len() <= DEFAULT_RECHARGE_LIMIT);
        for entry in entries {
            prop_assert!(entry.amount.starts_with('৳'));
        }
    }
}

// Property: arrear resolution
proptest! {
    #[test]
    fn placeholder_balances_resolve_to_empty(
        placeholder in prop::sample::select(vec!["0", "0.00", "null", "N/A", "", "   "])
    ) {
        let billing = json!({"finalBalanceInfo": placeholder});
        let customer = json!({"arrearAmount": placeholder});
        prop_assert_eq!(resolve_arrear(Some(&billing), Some(&customer)), "");
    }

    #[test]
    fn positive_structured_balance_rounds_half_up(cents in 50u64..100_000_000) {
        // Whole-cent amounts; expected value computed in integers
        let amount = cents as f64 / 100.0;
        let billing = json!({"balanceInfo": {"Result": [{"BALANCE": amount}]}});
        let arrear = resolve_arrear(Some(&billing), None);
        prop_assert_eq!(arrear, ((cents + 50) / 100).to_string());
    }

    #[test]
    fn non_positive_structured_balance_is_skipped(amount in -1_000_000.0f64..=0.0) {
        let billing = json!({"balanceInfo": {"Result": [{"BALANCE": amount}]}});
        prop_assert_eq!(resolve_arrear(Some(&billing), None), "");
    }
}

// Property: identity normalization
proptest! {
    #[test]
    fn prepaid_meter_number_is_the_identifier(
        identifier in "[0-9A-Za-z-]{4,32}",
        reported in "[0-9]{1,12}"
    ) {
        let blob = format!(
            r#"1:{{"mCustomerData":{{"result":{{"meterNumber":{{"_text":"{}"}}}}}}}}"#,
            reported
        );
        let identity =
            normalize(Some(&blob), None, None, &identifier, AccountType::Prepaid).unwrap();
        prop_assert_eq!(identity.meter_no, identifier);
    }

    #[test]
    fn normalize_is_idempotent(
        name in "[A-Za-z. ]{0,20}",
        address in "\\PC{0,40}",
        identifier in "[0-9]{4,12}"
    ) {
        let customer = json!({"customerName": name, "customerAddr": address});
        let billing = json!({"customerInfo": [{"CUSTOMER_NAME": "fallback"}]});
        let first = normalize(
            None,
            Some(&billing),
            Some(&customer),
            &identifier,
            AccountType::Postpaid,
        );
        let second = normalize(
            None,
            Some(&billing),
            Some(&customer),
            &identifier,
            AccountType::Postpaid,
        );
        prop_assert_eq!(first, second);
    }
}
