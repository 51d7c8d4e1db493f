//! Veritrail - Tamper-evident audit ledger with a resilient content-processing pipeline
//!
//! Veritrail sits between an application and its automated decisions over
//! user-generated text. Every decision is reconstructible and provably
//! un-tampered, and processing degrades through weaker capability tiers
//! instead of failing outright — while still being audited.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Veritrail Gateway                            │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                 Moderation Pipeline                          │   │
//! │  │   text ──► Sensitivity Classifier ──► Sanitization Engine    │   │
//! │  │                                            │                 │   │
//! │  │  ┌─────────────────────────────────────────▼──────────────┐  │   │
//! │  │  │              Processing Orchestrator                   │  │   │
//! │  │  │  accelerated_local ─► cpu_fallback ─► pattern_fallback │  │   │
//! │  │  │                (emergency_block last resort)           │  │   │
//! │  │  └─────────────────────────┬──────────────────────────────┘  │   │
//! │  └────────────────────────────┼─────────────────────────────────┘   │
//! │                               │ audit events                        │
//! │  ┌────────────────────────────▼─────────────────────────────────┐   │
//! │  │                    Hash-Chain Ledger                         │   │
//! │  │  - Append-only, per-stream SHA-256 chain                     │   │
//! │  │  - Durable before return, single writer per store            │   │
//! │  │  - Tamper detection via whole-chain validation               │   │
//! │  └────────────────────────────┬─────────────────────────────────┘   │
//! └───────────────────────────────┼─────────────────────────────────────┘
//!                                 │ background, eventually consistent
//! ┌───────────────────────────────▼─────────────────────────────────────┐
//! │                  Remote Compliance Store (Sync Relay)               │
//! │  - Per-event retry with exponential backoff, capped attempts        │
//! │  - Exhausted failures surfaced to operators, never dropped          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Properties
//!
//! ### Tamper Evidence
//! - Every event embeds its predecessor's SHA-256 digest
//! - Recomputing any event's hash from its stored fields reproduces it
//! - Validation reports every break with its exact position
//!
//! ### Fail-Safe Processing
//! - Capability tiers cascade from accelerated inference to pure rules
//! - An in-flight failure gets exactly one fallback, then a full-confidence
//!   reject — never fail-open
//! - Abandoned requests still leave a ledger entry
//!
//! ### Privacy by Construction
//! - Only hashes, lengths, and redaction tags are persisted — never text
//! - Sensitivity is classified before processing and never under-estimated
//!
//! ## Modules
//!
//! - [`ledger`]: Append-only hash-chain audit ledger
//! - [`privacy`]: Sensitivity classification and sanitization
//! - [`pipeline`]: Capability tiers and the processing orchestrator
//! - [`sync`]: Background replication to the remote compliance store
//! - [`gateway`]: HTTP ingress and operations surface
//! - [`config`]: Configuration management

pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod pipeline;
pub mod privacy;
pub mod sync;

pub use config::VeritrailConfig;
pub use error::{Error, Result};
