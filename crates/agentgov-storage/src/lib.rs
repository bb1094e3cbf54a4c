// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Persistence backends for `agentgov` beyond the in-memory default shipped
//! in `agentgov-core`.
//!
//! [`file::FileStorage`] is a `std`-only JSON file backend, generalized from
//! the teacher's fixed-schema snapshot file into a generic `Store<T>` over
//! any serde-serializable `T` (one JSON file per logical store). [`pg::PgStore`]
//! is a relational backend: one table per logical store, `(key, data, created_at,
//! updated_at)`, matching spec §4.1/§6's persisted schema.

pub mod file;

#[cfg(feature = "postgres")]
pub mod pg;