// Commission settlement engine
// Exposes the engine, storage and HTTP layers for the binary and integration tests

extern crate log;

pub mod config;
pub mod core;
pub mod rpc;
