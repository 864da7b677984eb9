// Path: crates/kv/src/lib.rs
#![forbid(unsafe_code)]

//! # Weave Gateway KV Buffers
//!
//! Binary-safe key/value backends behind the uniform
//! [`KvBuffer`](weave_api::KvBuffer) contract, plus a typed JSON layer.
//!
//! | Backend | TTL | Durable | Notes |
//! |---|---|---|---|
//! | [`FsKvStore`] | no | yes | one file per key, tmp + atomic rename |
//! | [`RedbKvStore`] | no | yes | background commit coalescing (~100 ms) |
//! | [`LruKvStore`] | yes | no | bounded `max_keys`, per-entry TTL |
//! | [`RedisKvStore`] | yes | depends | per-key TTL on every `set` |
//!
//! Multiple logical stores share one backend through
//! [`KvJsonStore`] key prefixes (`arns|`, `CM|`, `H|`, `#|`).

mod fs;
mod json;
mod lru;
mod redb_store;
mod redis_store;

pub use fs::FsKvStore;
pub use json::KvJsonStore;
pub use lru::LruKvStore;
pub use redb_store::RedbKvStore;
pub use redis_store::RedisKvStore;
