pub mod config;
pub mod error;
pub mod extract;
pub mod handoff;
pub mod logging;
pub mod metrics;
pub mod qr;
pub mod recognizer;
pub mod server;
pub mod session;
pub mod types;
