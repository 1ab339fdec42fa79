//! Domain model module declarations.

pub mod event;
pub mod filter;
pub mod payload;
pub mod self_audit;
pub mod session;
