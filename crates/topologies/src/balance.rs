//! Bank balance aggregation pipeline
//!
//! Consumes requested transactions keyed by account, folds each into the
//! account's running balance and publishes every updated balance. A side
//! chain peels the settled transaction back out of the aggregate and
//! publishes the rejected ones on their own channel.

use anyhow::Context;

use keystream_processor::{JsonCodec, StreamBuilder, Topology, TopologyError};
use keystream_types::{BankBalance, BankTransaction, TransactionStatus};
use tracing::debug;

/// Input channel of requested transactions, keyed by account id
pub const BANK_TRANSACTIONS: &str = "bank-transactions";

/// Output channel of updated balances, one per processed transaction
pub const BANK_BALANCES: &str = "bank-balances";

/// Output channel of settled-but-refused transactions
pub const REJECTED_TRANSACTIONS: &str = "rejected-transactions";

/// State store holding the per-account balance aggregates
pub const BALANCE_STORE: &str = "bank-balances";

/// Declare the balance pipeline
pub fn topology() -> Result<Topology, TopologyError> {
    let builder = StreamBuilder::new();

    let balances = builder
        .stream(
            BANK_TRANSACTIONS,
            JsonCodec::<u64>::new(),
            JsonCodec::<BankTransaction>::new(),
        )
        .aggregate(
            "settle-transaction",
            BALANCE_STORE,
            JsonCodec::<BankBalance>::new(),
            BankBalance::default,
            |_account, transaction, balance: BankBalance| balance.apply(transaction),
        );

    balances.clone().to(BANK_BALANCES);

    // The aggregate always carries the transaction it just settled; route
    // the refused ones to their own channel.
    balances
        .try_map_values(
            "latest-transaction",
            JsonCodec::<BankTransaction>::new(),
            |balance| {
                balance
                    .latest_transaction
                    .clone()
                    .context("balance aggregate without a settled transaction")
            },
        )
        .filter("rejected-only", |_account, transaction: &BankTransaction| {
            transaction.status == TransactionStatus::Rejected
        })
        .to(REJECTED_TRANSACTIONS);

    let topology = builder.build()?;
    debug!(nodes = topology.node_count(), "balance topology built");
    Ok(topology)
}
