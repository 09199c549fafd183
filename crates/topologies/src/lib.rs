//! Reference pipelines built on the keystream engine
//!
//! Two instantiations exercise the engine's two capabilities end to end:
//! [`balance`] is the stateful aggregation path (running account balances
//! with a rejected-transaction side stream and a query service), and
//! [`commands`] is the routing path (confidence and language branching with
//! translation and re-merge). [`services`] holds the external service
//! boundaries the parser is built around.

pub mod balance;
pub mod commands;
pub mod query;
pub mod services;

pub use commands::VoiceCommandParser;
pub use query::BalanceQueryService;
pub use services::{EnrichmentError, SpeechToText, Translate};
