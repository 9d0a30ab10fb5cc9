//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, request ID)
//!     → handlers.rs (endpoint dispatch)
//!     → request.rs (parse + validate add/reject bodies)
//!     → relay::Relay (track + schedule)
//!     → response.rs (JSON bodies, error mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
