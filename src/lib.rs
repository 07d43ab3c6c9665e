//! DHCP Crab
//!
//! Manages the ISC DHCP server configuration of Samba AD domain controllers over SSH.
//!
//! The [`dhcpd`] module reads and writes the subnet and host reservation blocks of
//! `dhcpd.conf`, and reads the lease database. [`service::DhcpService`] applies changes to a
//! remote server with a syntax check, a backup and a service restart. The [`api`] module
//! exposes both over HTTP.
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod dhcpd;
pub mod error;
pub mod remote;
pub mod service;

pub use api::new as new_http;
pub use config::{Config, SharedConfig};
pub use remote::{InMemoryRemote, SshRemote};
pub use service::DhcpService;
