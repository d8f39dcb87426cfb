//! Webhook receiver that reconciles Prometheus Alertmanager notifications
//! against ServiceNow incidents.
//!
//! This crate provides:
//! - Serde types for the Alertmanager webhook payload
//! - Identity derivation used to deduplicate alerts against incidents
//! - ServiceNow Table API client (session, query, create/update/close)
//! - The reconciliation engine mapping alert state to incident operations
//! - HTTP server for webhook handling (standalone service)
//!
//! Alerts within a batch are processed sequentially against one shared
//! session, so a batch never races with itself. Two concurrent deliveries
//! for the same new alert can still both observe zero matches and create
//! duplicate incidents; guarding that requires a uniqueness rule on the
//! identity field in the instance itself.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Client methods document failure in their contracts

pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod reconcile;
pub mod server;
pub mod snow;

pub use config::{Config, Credentials};
pub use error::BridgeError;
pub use identity::alert_identity;
pub use models::{Alert, AlertStatus, WebhookPayload};
pub use reconcile::{BatchReport, ReconcileAction, Reconciler};
pub use snow::{ServiceNowClient, Session};
