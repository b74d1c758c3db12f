//! gRPC/Protobuf realization.

mod client;
pub mod convert;

pub use client::GrpcClient;
