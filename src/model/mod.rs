//! Core data model: metadata records, account batches, addresses, and synthesized messages.

pub mod address;
pub mod message;
pub mod record;
