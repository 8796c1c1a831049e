//! modscan - Cheat Module Detection Library
//!
//! This library exposes the signature store, classification engine, and
//! scan session management for detecting known cheat client modules in
//! running game processes.

pub mod classifier;
pub mod config;
pub mod constants;
pub mod enumeration;
pub mod models;
pub mod output;
pub mod report;
pub mod session;
pub mod store;
