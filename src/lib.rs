//! fleetkeys - SSH host key management for NixOS fleets.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── list          # Table of configured targets
//! │   ├── sops          # Refresh SOPS recipients
//! │   ├── keys          # Print SSH and age public keys
//! │   ├── install       # Install host keys and reboot
//! │   ├── prompt        # Continue-after-failure confirmation
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # fleet.toml management
//!     ├── registry      # alias → target host
//!     ├── tool          # external tool invocation
//!     ├── extract       # SOPS field → owner-only key file
//!     ├── derive        # ssh-keygen / ssh-to-age
//!     ├── remote        # ssh / scp transport
//!     ├── provision     # install-host-key state machine
//!     └── sops          # sops updatekeys over the tree
//! ```
//!
//! Every operation runs sequentially and blocks on the external tools it
//! calls (`sops`, `ssh-keygen`, `ssh-to-age`, `ssh`, `scp`).

pub mod cli;
pub mod core;
pub mod error;
