//! `QueryDesk` Server: catalog-driven SQL queries with optional filters and
//! whitelisted row updates over role-elevated database sessions.
//!
//! Request flow: HTTP handler -> [`service`] pipeline -> [`engine`] executors
//! -> [`session`] backend, with definitions read from the [`catalog`].

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod network;
pub mod service;
pub mod session;
pub mod telemetry;

pub use catalog::{CatalogError, JsonFileCatalog, QueryCatalog};
pub use config::Cli;
pub use error::{EngineError, ErrorKind};
pub use network::NetworkModule;
pub use service::{build_operation_pipeline, QueryDeskService};
pub use session::ConnectionSession;
