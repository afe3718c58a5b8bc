//! # Image Harvest
//!
//! Keyword image search harvester with fallback-quality downloads.
//!
//! Image Harvest pages through an image search endpoint, reconstructs each
//! result's candidate URLs (obfuscated original, mid-resolution, thumbnail),
//! and downloads at most one file per result by trying those candidates in
//! order. Downloads are staged and only copied into the destination, under
//! sequential zero-padded names, once every batch has finished.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐   ┌────────────┐
//! │   Query     │──▶│  Candidate   │──▶│  Concurrent  │──▶│  Staging   │
//! │  Paginator  │   │    chains    │   │   Fetcher    │   │  Assembler │
//! └─────┬───────┘   └──────────────┘   └──────┬───────┘   └────────────┘
//!       │ decode + resolve                    │ content-type filter
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! harvest fetch "mountains" --count 40 --out ./mountains
//! harvest urls "mountains" --count 10 > urls.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`decode`] | `objURL` de-obfuscation |
//! | [`resolve`] | Candidate chain construction |
//! | [`query`] | Search pagination and acquisition |
//! | [`filter`] | Content-type whitelist |
//! | [`fetch`] | Batched concurrent fetching |
//! | [`assemble`] | Staging directory assembly |
//! | [`download`] | Download phase entry point |
//! | [`progress`] | Progress reporting |
//! | [`harvest_cmd`] | CLI command bodies |

pub mod assemble;
pub mod config;
pub mod decode;
pub mod download;
pub mod fetch;
pub mod filter;
pub mod harvest_cmd;
pub mod models;
pub mod progress;
pub mod query;
pub mod resolve;
