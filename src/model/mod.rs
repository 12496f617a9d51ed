pub mod catalog;
pub mod entry;
