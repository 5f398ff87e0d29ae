// src/services/payment_methods.rs

use crate::models::finance::Payment;

const CASH_TO_ADMIN: &str = "Cash to Admin";

/// Raw methods shown to members as a single "Online Payment" bucket.
const ONLINE_METHODS: &[&str] = &[
    "Screenshot",
    "Bank Transfer",
    "FPS",
    "PayMe",
    "Alipay",
    "Credit Card",
    "Online Payment",
];

pub const CASH_LABEL: &str = "Cash";
pub const ONLINE_LABEL: &str = "Online Payment";
pub const UNKNOWN_LABEL: &str = "N/A";

/// Collapses a raw payment method into the display vocabulary.
/// Every place that lists or groups methods goes through here.
///
/// Method names match exactly as stored; anything unrecognised is shown as
/// entered, and only a missing or blank method becomes "N/A".
pub fn normalize_method(
    method: Option<&str>,
    paid_to_admin: bool,
    paid_to_admin_name: Option<&str>,
) -> String {
    let method = method.filter(|m| !m.trim().is_empty());
    let admin_named = paid_to_admin_name.is_some_and(|n| !n.trim().is_empty());

    if paid_to_admin || admin_named || method == Some(CASH_TO_ADMIN) {
        return CASH_LABEL.to_string();
    }

    match method {
        Some(m) if ONLINE_METHODS.contains(&m) => ONLINE_LABEL.to_string(),
        Some(m) => m.to_string(),
        None => UNKNOWN_LABEL.to_string(),
    }
}

pub fn display_method(payment: &Payment) -> String {
    normalize_method(
        payment.method.as_deref(),
        payment.paid_to_admin,
        payment.paid_to_admin_name.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_cash_marker_wins() {
        assert_eq!(normalize_method(Some("FPS"), true, None), "Cash");
        assert_eq!(normalize_method(Some("Bank Transfer"), false, Some("Imran")), "Cash");
        assert_eq!(normalize_method(Some("Cash to Admin"), false, None), "Cash");
    }

    #[test]
    fn online_methods_collapse() {
        for raw in ONLINE_METHODS {
            assert_eq!(normalize_method(Some(*raw), false, None), "Online Payment");
        }
        assert_eq!(normalize_method(Some("PayMe"), false, Some("  ")), "Online Payment");
    }

    #[test]
    fn others_pass_through() {
        assert_eq!(normalize_method(Some("Cheque"), false, None), "Cheque");
        // no case folding or trimming of recognised names
        assert_eq!(normalize_method(Some("payme"), false, None), "payme");
        assert_eq!(normalize_method(Some(" FPS "), false, None), " FPS ");
        assert_eq!(normalize_method(Some("cash to admin"), false, None), "cash to admin");
        assert_eq!(normalize_method(None, false, None), "N/A");
        assert_eq!(normalize_method(Some("   "), false, None), "N/A");
    }
}
