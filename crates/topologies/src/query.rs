//! Balance lookup service
//!
//! The read-side counterpart of the balance pipeline: the shape an HTTP
//! handler calls into. Answers are eventually consistent with in-flight
//! processing.

use std::sync::Arc;

use keystream_processor::{
    JsonCodec, MaterializedView, Result, SinkConnector, TopologyDriver,
};
use keystream_types::BankBalance;

use crate::balance::BALANCE_STORE;

/// Point lookups over the materialized account balances
pub struct BalanceQueryService {
    view: MaterializedView<u64, BankBalance>,
}

impl BalanceQueryService {
    /// Open the service over a driver running the balance topology
    pub fn new<S: SinkConnector>(driver: &TopologyDriver<S>) -> Result<Self> {
        let view = driver.view(
            BALANCE_STORE,
            Arc::new(JsonCodec::new()),
            Arc::new(JsonCodec::new()),
        )?;
        Ok(Self { view })
    }

    /// Current balance for one account, `None` if the account has never
    /// transacted
    pub async fn balance(&self, account: u64) -> Result<Option<BankBalance>> {
        self.view.get(&account).await
    }
}
