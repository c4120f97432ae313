//! Core business logic for Poolbank.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and balance transitions live here.
//!
//! # Modules
//!
//! - `ledger` - Pool-first ledger: accounts, transfers, allocations, audit trail

pub mod ledger;
