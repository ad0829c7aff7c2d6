//! Core types for the Nimbus functions deploy pipeline.
//!
//! This crate provides the foundational data model shared by every stage of
//! a functions deployment: the declarative [`Endpoint`] description, the
//! [`ProjectContext`] it deploys into, and the event-family classification
//! used by the IAM layer.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Model Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  nimbus-types   : Endpoint, ProjectContext, EventFamily  ◄── │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Engine Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  nimbus-iam     : binding rules, reconciler, gateway        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Closed variants**: platform generation and trigger kind are enums,
//!   not loosely structured option bags, so downstream rule tables can
//!   match exhaustively.
//! - **Pure data**: no I/O, no clients. Anything that talks to a backing
//!   service lives behind a trait in `nimbus-iam`.
//! - **Deterministic identities**: platform-managed service accounts are
//!   derived from the project context, never looked up where a fixed
//!   formula exists.
//!
//! # Example
//!
//! ```
//! use nimbus_types::{Endpoint, Platform, ProjectContext, Trigger};
//!
//! let project = ProjectContext::new("my-proj", "123456789");
//! let endpoint = Endpoint {
//!     id: "resizer".to_string(),
//!     region: "us-central1".to_string(),
//!     project: "my-proj".to_string(),
//!     platform: Platform::SecondGen,
//!     trigger: Trigger::Event {
//!         event_type: "google.cloud.storage.object.v1.finalized".to_string(),
//!         retry: false,
//!     },
//!     service_account: None,
//!     secret_env: Vec::new(),
//! };
//!
//! assert!(endpoint.is_event_triggered());
//! assert_eq!(
//!     project.default_service_account(endpoint.platform),
//!     "123456789-compute@developer.gserviceaccount.com",
//! );
//! ```

mod endpoint;
mod error;
mod events;
mod project;

pub use endpoint::{Endpoint, Platform, SecretBinding, Trigger, DEFAULT_SERVICE_ACCOUNT};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use events::EventFamily;
pub use project::ProjectContext;
