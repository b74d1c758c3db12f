#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! gRPC plumbing shared by OperRouter clients.
//!
//! [`channel`] opens the HTTP/2 channel (timeouts, keepalive, connect
//! retry); [`status`] decides which non-OK statuses are transport failures
//! and which are answers from the remote service.

pub mod channel;
pub mod status;

pub use channel::{ChannelSettings, ConnectPolicy, Keepalive, open_channel};
pub use status::{StatusClass, classify};
