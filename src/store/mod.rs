// file: src/store/mod.rs
// description: persistent processing record module exports
// reference: internal module structure

pub mod ledger;

pub use ledger::{Ledger, LedgerCheck};
