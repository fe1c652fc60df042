//! AI-driven JavaScript reverse-engineering MCP tool server: a stateful
//! runtime mediating between an LLM client and one live Chromium session
//! over CDP. See the module docs on each subsystem for its slice of the
//! design.

pub mod analysis;
pub mod browser;
pub mod budget;
pub mod cache;
pub mod code_cache;
pub mod config;
pub mod console;
pub mod debugger;
pub mod detail_store;
pub mod error;
pub mod hooks;
pub mod network;
pub mod script_catalog;
pub mod tools;
pub mod transport;
