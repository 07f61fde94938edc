//! Request dispatch and per-session state for the subjob callback server.
//!
//! Everything in this crate is transport-agnostic: the HTTP layer parses a
//! body into a [`serde_json::Value`], hands it to [`rpc::RpcRequest::parse`],
//! resolves the caller's [`session::SessionState`] from a
//! [`session::SessionStore`] and runs [`dispatch::dispatch`].

pub mod dispatch;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod provenance;
pub mod routing;
pub mod rpc;
pub mod schema;
pub mod session;
pub mod types;
