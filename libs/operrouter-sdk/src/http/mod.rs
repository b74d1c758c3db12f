//! JSON-RPC 2.0 over HTTP.

mod client;
mod envelope;

pub use client::HttpClient;
