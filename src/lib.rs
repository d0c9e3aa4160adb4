// Copyright 2026 Forage Contributors
// SPDX-License-Identifier: Apache-2.0

//! Forage library: dynamic-content harvester for rendered marketing sites.
//!
//! Drives a headless Chromium session through hover menus, load-more
//! pagination, and popup overlays, then normalizes the discovered pages
//! into `{url, type, title, content}` records for a retrieval index.

pub mod answer;
pub mod config;
pub mod discovery;
pub mod dom;
pub mod extract;
pub mod harvest;
pub mod ingest;
pub mod interact;
pub mod pagination;
pub mod session;
pub mod urls;

#[cfg(test)]
pub(crate) mod testutil;
