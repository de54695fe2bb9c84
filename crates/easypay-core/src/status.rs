//! # Invoice Status
//!
//! The closed status vocabulary every gateway adapter folds into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized status of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Invoice object exists locally, nothing has been sent to a gateway yet
    Creating,
    /// Gateway knows the invoice, payment not received
    Pending,
    /// Payment received (terminal)
    Paid,
    /// Gateway gave up on the invoice (terminal)
    Expired,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Creating => "creating",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Expired => "expired",
        }
    }

    /// `paid` and `expired` end the invoice's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Expired)
    }

    /// Fold a vendor status word into the normalized vocabulary.
    ///
    /// Adapters with their own vocabulary map it first and fall back here.
    /// Anything not recognized as paid or expired is pending.
    pub fn fold(vendor_status: &str) -> Self {
        match vendor_status.trim().to_ascii_lowercase().as_str() {
            "paid" | "payed" | "success" | "hold" => InvoiceStatus::Paid,
            "expired" => InvoiceStatus::Expired,
            _ => InvoiceStatus::Pending,
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Creating
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_paid_words() {
        for word in ["paid", "payed", "success", "hold", "SUCCESS", " hold "] {
            assert_eq!(InvoiceStatus::fold(word), InvoiceStatus::Paid, "{word}");
        }
    }

    #[test]
    fn test_fold_expired_and_pending() {
        assert_eq!(InvoiceStatus::fold("expired"), InvoiceStatus::Expired);
        assert_eq!(InvoiceStatus::fold("active"), InvoiceStatus::Pending);
        assert_eq!(InvoiceStatus::fold("in_process"), InvoiceStatus::Pending);
        assert_eq!(InvoiceStatus::fold(""), InvoiceStatus::Pending);
    }

    #[test]
    fn test_terminal_states() {
        assert!(InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Expired.is_terminal());
        assert!(!InvoiceStatus::Pending.is_terminal());
        assert!(!InvoiceStatus::Creating.is_terminal());
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Creating);
    }
}
