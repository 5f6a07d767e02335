//! Core domain for the procura procurement agent.
//!
//! This crate carries everything that does not touch the network or the
//! filesystem at runtime:
//!
//! - `telemetry` - the per-request telemetry collector and the reducer that
//!   folds a raw invocation log into client-visible tool steps
//! - `domain` - product catalog types, conversation transcripts, and the
//!   slot-keyed workflow state threaded across turns
//! - `config` - typed application configuration (TOML file + env overrides)
//! - `errors` - the layered error taxonomy shared by the other crates
//! - `json` - resilient JSON field extraction with smart defaults

pub mod config;
pub mod domain;
pub mod errors;
pub mod json;
pub mod telemetry;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::conversation::{ChatMessage, ChatRole, SessionState, Transcript};
pub use domain::product::{BaseSpecs, Product, ProductSummary, UpgradeKind, UpgradeOption};
pub use domain::workflow::{StateSlot, WorkflowState};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use telemetry::{reduce, TelemetryCollector, TelemetryEntry, ToolStep};
