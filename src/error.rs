//! Error types.

use std::net::IpAddr;
use std::time::Duration;

/// Error enumerates the possible DHCP Crab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a request names a `server_id` that isn't in
    /// [`Config::servers`][`crate::config::Config::servers`].
    #[error("server \"{0}\" is not configured")]
    UnknownServer(String),

    /// Returned when a request names a server whose
    /// [`ServerServices::dhcp`][`crate::config::ServerServices::dhcp`] flag is unset.
    #[error("DHCP service is not available on server \"{0}\"")]
    DhcpUnavailable(String),

    /// Returned when no subnet in the remote `dhcpd.conf` has the given id.
    #[error("subnet \"{0}\" not found")]
    SubnetNotFound(String),

    /// Returned when no reservation in the remote `dhcpd.conf` has the given id.
    #[error("reservation \"{0}\" not found")]
    ReservationNotFound(String),

    /// Returned when a create or update would leave two subnets with the same network and
    /// netmask, or two reservations with the same hostname or MAC address.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Returned when a submitted subnet or reservation fails
    /// [validation][`crate::dhcpd::model::SubnetSpec::validate`].
    #[error("invalid {entity}: {reason}")]
    InvalidEntity {
        entity: &'static str,
        reason: String,
    },

    /// Returned by [`parse_strict`][`crate::dhcpd::conf::parse_strict`] for the first block that
    /// the lenient parser would have skipped.
    #[error("malformed {kind} block at line {line}: {reason}")]
    MalformedBlock {
        kind: String,
        line: usize,
        reason: String,
    },

    /// Returned when the remote configuration or lease file can't be read.
    #[error("could not read remote file {path}: {stderr}")]
    RemoteRead { path: String, stderr: String },

    /// Returned when a file can't be written on the remote server.
    #[error("could not write remote file {path}: {stderr}")]
    RemoteWrite { path: String, stderr: String },

    /// Returned when a remote command other than the syntax check or the service restart
    /// exits unsuccessfully.
    #[error("remote command `{command}` failed with exit code {exit_code}: {stderr}")]
    RemoteCommand {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Returned when the remote command transport (the `ssh` client) can't be started.
    #[error("remote transport error: {0}")]
    Transport(String),

    /// Returned when a remote command doesn't finish within the server's
    /// [`command_timeout`][`crate::config::ServerConfig::command_timeout`].
    #[error("remote command timed out after {0:?}")]
    RemoteTimeout(Duration),

    /// Returned when the generated `dhcpd.conf` is rejected by the remote `dhcpd -t` check. The
    /// live configuration is left untouched.
    #[error("generated configuration is invalid: {0}")]
    InvalidGeneratedConfig(String),

    /// Returned when the new configuration was written but the DHCP service failed to restart.
    #[error("DHCP service failed to restart: {0}")]
    RestartFailed(String),

    /// Returned when the task applying a configuration change ends without reporting back.
    #[error("configuration update was interrupted: {0}")]
    Interrupted(String),

    /// Returned when the [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`] is
    /// not a loopback address, or an address within a private network space. The HTTP API
    /// drives root-level changes on domain controllers and must never face the internet.
    #[error("API bind address ({0}) must be a loopback or private IP")]
    InsecureAPIBind(IpAddr),

    /// Returned when a backup timestamp can't be formatted.
    #[error("timestamp formatting failed")]
    TimeFormat(#[from] time::error::Format),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when [trying to load a `Config`][crate::config::Config::try_from_file] fails due
    /// to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}
