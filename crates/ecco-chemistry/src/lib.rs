//! # Ecco Chemistry Architecture
//!
//! Ecco Chemistry maps the Ecco outliner's items and folders onto typed Rust
//! values. Items are outline entries, folders are typed attribute columns,
//! and declared *item classes* say which folder values make an item a
//! `Contact`, a `Task` or anything else.
//!
//! The host is reached only through the [`transport::Transport`] trait; the
//! DDE client itself lives outside this crate.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Owns transport, folder registry and schema               │
//! │  - Thin facade over commands and queries                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs, query.rs)                    │
//! │  - create / wrap / update / upgrade / access / links        │
//! │  - Containers and re-iterable queries                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core (schema/, resolve.rs, registry.rs, codec.rs)          │
//! │  - Class rules compiled to folder bit masks                 │
//! │  - Subclass resolution                                      │
//! │  - Folder lookup/cache and the wire codec                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Transport (transport/)                                     │
//! │  - Abstract Transport trait                                 │
//! │  - MemTransport (testing, fixtures)                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use ecco_chemistry::api::EccoApi;
//! use ecco_chemistry::codec::{FolderType, Value};
//! use ecco_chemistry::schema::{attrs, ClassSpec};
//! use ecco_chemistry::transport::memory::MemTransport;
//!
//! let host = MemTransport::new();
//! host.add_folder("Contacts", FolderType::Checkmark);
//! host.add_folder("Email", FolderType::Text);
//!
//! let mut api = EccoApi::new(host);
//! let contact = api
//!     .declare(
//!         ClassSpec::new("Contact")
//!             .folder("is_contact", "Contacts")
//!             .folder("email", "Email")
//!             .require("is_contact", true),
//!     )
//!     .unwrap();
//!
//! let ada = api
//!     .create(contact, "Ada", &attrs([("email", "ada@example.org")]))
//!     .unwrap();
//! let emails = api.container(contact, "email").unwrap();
//! assert_eq!(emails.get("ada@example.org").unwrap(), Some(ada));
//! assert_eq!(api.get(ada, "is_contact").unwrap(), Value::Bool(true));
//! ```
//!
//! ## Testing Strategy
//!
//! 1. **Core and commands**: unit tests beside the code, against
//!    [`transport::memory::MemTransport`]. This is where most tests live.
//! 2. **API** (`api.rs`): dispatch and wiring.
//! 3. **Integration** (`tests/`): end-to-end behavior through [`api::EccoApi`].
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Item operations
//! - [`query`]: Containers and queries
//! - [`schema`]: Class declarations and attribute splitting
//! - [`resolve`]: Subclass resolution
//! - [`registry`]: Folder lookup, cache and bit index
//! - [`codec`]: Folder value encoding
//! - [`transport`]: Host interface and the in-memory host
//! - [`model`]: Ids, items and folders
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod transport;
