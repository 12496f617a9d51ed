//! Keeps the JSON translation catalogs of a multilingual site in step with
//! the base language: backfill, machine translation, coverage reports and a
//! `data-i18n` key scanner.

pub mod config;
pub mod error;
pub mod model;
pub mod parsers;
pub mod services;

pub use error::{Result, SyncError};
