//! HTTP transport for the records server.
//!
//! The server speaks a single-endpoint action protocol: every call is a
//! POST to `api.php?action=...` under the configured base URL,
//! authenticated by an `X-API-Key` header. Replies are JSON; the server
//! reports refusals as an `error` field inside an HTTP 200 body, so both
//! layers are checked here.

mod client;
mod error;

pub use client::*;
pub use error::*;
