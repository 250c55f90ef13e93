//! # Kiln
//!
//! A build server with namespaced, shareable resources, usable both as a
//! standalone binary and as a library.
//!
//! Resources (builds, objects, variables, SSH keys, images) belong either
//! directly to a user or to a namespace: a hierarchical grouping that can be
//! shared with other users at controlled visibility levels. The namespace
//! tree, the invite/collaborator workflow, and the authorization gate live in
//! [`namespace`], [`invites`], and [`server::access`] respectively.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! kiln = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kiln::server::{AppState, create_router};
//! use kiln::store::SqliteStore;
//!
//! let store = SqliteStore::new("./data/kiln.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the binary entrypoint. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod invites;
pub mod namespace;
pub mod server;
pub mod store;
pub mod types;
