//! Domain data models for the keystream pipelines
//!
//! This crate provides the data structures flowing through the two reference
//! pipelines: bank transactions and their running balances, and voice
//! commands with their parsed transcriptions.

pub mod command;
pub mod transaction;

pub use command::{ParsedVoiceCommand, VoiceCommand};
pub use transaction::{BankBalance, BankTransaction, TransactionStatus};
