//! # vport-ovsdb
//!
//! A client for the Open vSwitch control database (OVSDB).
//!
//! This crate speaks the JSON-RPC wire protocol to `ovsdb-server`:
//! - [`Session`] owns the connection, mirrors monitored tables into a
//!   local [`TableCache`], and submits transactions;
//! - [`provision`] builds the three-operation transaction that creates
//!   an internal port and links it into a bridge;
//! - [`vsctl`] is the subprocess fallback for hosts where the database
//!   socket is not reachable.

#![warn(missing_docs)]

pub mod cache;
pub mod codec;
pub mod protocol;
pub mod provision;
pub mod session;
pub mod vsctl;

pub use cache::TableCache;
pub use provision::create_internal_port;
pub use session::{DEFAULT_ENDPOINT, Session};
