//! Bank transaction and balance models
//!
//! A `BankTransaction` is the per-event input of the balance pipeline; a
//! `BankBalance` is the per-account aggregate it folds into. The fold logic
//! lives on the aggregate itself (`BankBalance::apply`) so the pipeline
//! reducer stays a one-liner and the settlement rules are testable without
//! any engine machinery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settlement state of a bank transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Submitted but not yet settled against a balance
    Requested,
    /// Settled and applied to the balance
    Approved,
    /// Settled and refused (insufficient funds)
    Rejected,
}

/// A single money movement against one account
///
/// Amounts are integer minor units (cents). Positive amounts are credits,
/// negative amounts are debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Transaction identifier, unique within an account
    pub id: u64,
    /// Signed amount in minor units
    pub amount: i64,
    /// Settlement state
    pub status: TransactionStatus,
    /// When the transaction was submitted
    pub timestamp: DateTime<Utc>,
}

impl BankTransaction {
    /// Create a transaction in the `Requested` state
    pub fn requested(id: u64, amount: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            amount,
            status: TransactionStatus::Requested,
            timestamp,
        }
    }
}

/// Running balance aggregate for one account
///
/// Created empty on the first transaction for an account and updated by
/// every subsequent one. The most recent settled transaction is retained so
/// downstream consumers can react to individual settlements (e.g. routing
/// rejections) without a second event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankBalance {
    /// Current balance in minor units
    pub total: i64,
    /// The last transaction folded into this balance, with its settled status
    pub latest_transaction: Option<BankTransaction>,
}

impl BankBalance {
    /// Fold one transaction into the balance
    ///
    /// `Requested` transactions are settled here: a credit is always
    /// approved, a debit is approved only when the current balance covers
    /// it. Transactions arriving already settled keep their status. Only
    /// approved amounts change the total; every transaction becomes the
    /// `latest_transaction` with its settled status.
    ///
    /// Deterministic: the result depends only on the current balance and
    /// the incoming transaction.
    pub fn apply(mut self, mut transaction: BankTransaction) -> Self {
        if transaction.status == TransactionStatus::Requested {
            transaction.status = if transaction.amount >= 0 || self.total + transaction.amount >= 0
            {
                TransactionStatus::Approved
            } else {
                TransactionStatus::Rejected
            };
        }

        if transaction.status == TransactionStatus::Approved {
            self.total += transaction.amount;
        }
        self.latest_transaction = Some(transaction);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: u64, amount: i64) -> BankTransaction {
        BankTransaction::requested(id, amount, Utc::now())
    }

    #[test]
    fn test_credit_is_approved() {
        let balance = BankBalance::default().apply(tx(1, 100));

        assert_eq!(balance.total, 100);
        let latest = balance.latest_transaction.unwrap();
        assert_eq!(latest.id, 1);
        assert_eq!(latest.status, TransactionStatus::Approved);
    }

    #[test]
    fn test_covered_debit_is_approved() {
        let balance = BankBalance::default().apply(tx(1, 100)).apply(tx(2, -30));

        assert_eq!(balance.total, 70);
        assert_eq!(
            balance.latest_transaction.unwrap().status,
            TransactionStatus::Approved
        );
    }

    #[test]
    fn test_uncovered_debit_is_rejected() {
        let balance = BankBalance::default().apply(tx(1, 50)).apply(tx(2, -80));

        // Total unchanged, but the rejection is recorded as latest.
        assert_eq!(balance.total, 50);
        let latest = balance.latest_transaction.unwrap();
        assert_eq!(latest.id, 2);
        assert_eq!(latest.status, TransactionStatus::Rejected);
    }

    #[test]
    fn test_presettled_transaction_keeps_status() {
        let mut rejected = tx(7, 10);
        rejected.status = TransactionStatus::Rejected;

        let balance = BankBalance::default().apply(rejected);

        assert_eq!(balance.total, 0);
        assert_eq!(
            balance.latest_transaction.unwrap().status,
            TransactionStatus::Rejected
        );
    }

    #[test]
    fn test_apply_is_deterministic() {
        let transactions = vec![tx(1, 100), tx(2, -30), tx(3, -200), tx(4, 5)];

        let a = transactions
            .iter()
            .cloned()
            .fold(BankBalance::default(), BankBalance::apply);
        let b = transactions
            .into_iter()
            .fold(BankBalance::default(), BankBalance::apply);

        assert_eq!(a, b);
    }

    #[test]
    fn test_status_serde_format() {
        let json = serde_json::to_string(&TransactionStatus::Rejected).unwrap();
        assert_eq!(json, "\"REJECTED\"");
    }
}
