//! JSON configuration: where the HTTP API listens, which domain controllers it manages, and
//! where `isc-dhcp-server` keeps its files on them.

use crate::error::Error;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub type SharedConfig = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    #[serde(default)]
    pub dhcpd: DhcpdConfig,
    pub servers: HashMap<String, ServerConfig>,
}

/// Locations and tool names of the DHCP daemon on every managed server.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DhcpdConfig {
    pub conf_path: String,
    pub leases_path: String,
    pub service_name: String,
    pub check_command: String,
    /// Directory for `dhcpd.conf` backups. Defaults to the directory holding `conf_path`.
    pub backup_dir: Option<String>,
}

impl Default for DhcpdConfig {
    fn default() -> Self {
        Self {
            conf_path: "/etc/dhcp/dhcpd.conf".to_string(),
            leases_path: "/var/lib/dhcp/dhcpd.leases".to_string(),
            service_name: "isc-dhcp-server".to_string(),
            check_command: "dhcpd".to_string(),
            backup_dir: None,
        }
    }
}

/// A managed domain controller, reached over SSH.
#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default = "default_ssh_user")]
    pub user: String,
    pub key_path: Option<PathBuf>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_command_timeout")]
    pub command_timeout: Duration,
    #[serde(default)]
    pub services: ServerServices,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerServices {
    #[serde(default)]
    pub ad: bool,
    #[serde(default)]
    pub dns: bool,
    #[serde(default)]
    pub dhcp: bool,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_ssh_user() -> String {
    "root".to_string()
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(30)
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.bind_addr_is_secure()?;
        Ok(conf)
    }

    /// Look up a server that is configured and runs the DHCP service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownServer`] or [`Error::DhcpUnavailable`].
    pub fn dhcp_server(&self, server_id: &str) -> Result<&ServerConfig, Error> {
        let server = self
            .servers
            .get(server_id)
            .ok_or_else(|| Error::UnknownServer(server_id.to_string()))?;
        if !server.services.dhcp {
            return Err(Error::DhcpUnavailable(server_id.to_string()));
        }
        Ok(server)
    }

    fn bind_addr_is_secure(&self) -> Result<(), Error> {
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(json: &str) -> Result<Config, Error> {
        let conf: Config = serde_json::from_str(json)?;
        conf.bind_addr_is_secure()?;
        Ok(conf)
    }

    const MINIMAL: &str = r#"{
        "api_bind_addr": "127.0.0.1:3000",
        "api_timeout": 30,
        "servers": {
            "dc1": { "name": "DC 1", "host": "10.0.0.2", "services": { "dhcp": true } },
            "dc2": { "name": "DC 2", "host": "10.0.0.3", "port": 2222, "user": "admin" }
        }
    }"#;

    #[test]
    fn test_defaults_applied() {
        let conf = config_from(MINIMAL).unwrap();
        assert_eq!(conf.api_timeout, Duration::from_secs(30));
        assert_eq!(conf.dhcpd, DhcpdConfig::default());

        let dc1 = &conf.servers["dc1"];
        assert_eq!(dc1.port, 22);
        assert_eq!(dc1.user, "root");
        assert_eq!(dc1.command_timeout, Duration::from_secs(30));
        assert!(dc1.services.dhcp);
        assert!(!dc1.services.ad);

        let dc2 = &conf.servers["dc2"];
        assert_eq!(dc2.port, 2222);
        assert_eq!(dc2.user, "admin");
        assert_eq!(dc2.services, ServerServices::default());
    }

    #[test]
    fn test_dhcp_server_lookup() {
        let conf = config_from(MINIMAL).unwrap();
        assert_eq!(conf.dhcp_server("dc1").unwrap().host, "10.0.0.2");
        assert!(matches!(
            conf.dhcp_server("dc2"),
            Err(Error::DhcpUnavailable(id)) if id == "dc2"
        ));
        assert!(matches!(
            conf.dhcp_server("nope"),
            Err(Error::UnknownServer(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_partial_dhcpd_section() {
        let conf = config_from(
            r#"{
                "api_bind_addr": "[::1]:3000",
                "api_timeout": 5,
                "dhcpd": { "conf_path": "/usr/local/etc/dhcpd.conf", "backup_dir": "/backups" },
                "servers": {}
            }"#,
        )
        .unwrap();
        assert_eq!(conf.dhcpd.conf_path, "/usr/local/etc/dhcpd.conf");
        assert_eq!(conf.dhcpd.backup_dir.as_deref(), Some("/backups"));
        assert_eq!(conf.dhcpd.service_name, "isc-dhcp-server");
    }

    #[test]
    fn test_public_bind_rejected() {
        let res = config_from(
            r#"{ "api_bind_addr": "8.8.8.8:3000", "api_timeout": 5, "servers": {} }"#,
        );
        assert!(matches!(res, Err(Error::InsecureAPIBind(_))));

        let res = config_from(
            r#"{ "api_bind_addr": "[2001:db8::1]:3000", "api_timeout": 5, "servers": {} }"#,
        );
        assert!(matches!(res, Err(Error::InsecureAPIBind(_))));
    }

    #[test]
    fn test_private_bind_accepted() {
        for addr in ["10.1.2.3:80", "192.168.0.1:80", "[fd00::1]:80"] {
            let json = format!(
                r#"{{ "api_bind_addr": "{addr}", "api_timeout": 5, "servers": {{}} }}"#
            );
            assert!(config_from(&json).is_ok(), "{addr} should be accepted");
        }
    }
}
