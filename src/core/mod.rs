//! Core library components.
//!
//! This module contains the reusable logic behind each command: target
//! resolution, external tool invocation, key extraction and derivation, and
//! remote provisioning. None of it prints to the terminal.

pub mod config;
pub mod constants;
pub mod derive;
pub mod extract;
pub mod provision;
pub mod registry;
pub mod remote;
pub mod sops;
pub mod tool;
