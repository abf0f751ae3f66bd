//! A Redis-compatible key-value server.
//!
//! The crate provides:
//!
//! - Six typed namespaces (strings, lists, hashes, sets, sorted sets, streams) with
//!   per-key versions
//! - Blocking commands (BLPOP, XREAD BLOCK) driven by a per-key waiter registry
//! - Optimistic transactions (WATCH, MULTI, EXEC, DISCARD)
//! - Binary snapshots with a CRC64 trailer, atomic saves and a background saver
//! - Single-master replication with full resynchronization and command propagation
//! - Pub/sub channels
//!
//! The server speaks RESP and serves every connection on its own Tokio task.

pub mod blocking;
pub mod commands;
pub mod config;
pub mod connection;
pub mod input;
pub mod key_value_store;
pub mod pub_sub;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod server;
pub mod session;
pub mod state;
pub mod transactions;
