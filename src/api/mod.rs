//! HTTP API for managing the DHCP configuration of domain controllers.
//!
//! Every `/api/dhcp` endpoint takes a `server_id` query parameter naming an entry of
//! [`Config::servers`][crate::config::Config::servers] with the `dhcp` service enabled. Unknown
//! servers return HTTP 404, servers without DHCP return HTTP 400. Errors have a JSON body of the
//! form `{"error": "..."}`.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!   
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/api/dhcp/subnets` (GET, POST)
//!
//!   `GET` lists the subnets of the remote `dhcpd.conf` in file order. `POST` expects a JSON
//!   request body of the form:
//!
//!   ```json
//!   {
//!     "network": "192.168.1.0",
//!     "netmask": "255.255.255.0",
//!     "range_start": "192.168.1.100",
//!     "range_end": "192.168.1.200",
//!     "routers": "192.168.1.1",
//!     "domain_name_servers": "192.168.1.10, 192.168.1.11",
//!     "domain_name": "corp.local",
//!     "default_lease_time": 86400,
//!     "max_lease_time": 172800
//!   }
//!   ```
//!
//!   Only `network` and `netmask` are required. The created subnet is returned with its `id`.
//!   A subnet with the same network and netmask returns HTTP 409 (Conflict).
//!
//! ## `/api/dhcp/subnets/:subnet_id` (PATCH, DELETE)
//!
//!   `PATCH` replaces the subnet with the `POST` body above and returns it. `DELETE` returns
//!   `{"message": "subnet <id> deleted"}`.
//!
//! ## `/api/dhcp/reservations` (GET, POST)
//!
//!   `POST` expects:
//!
//!   ```json
//!   { "hostname": "printer", "mac": "00:11:22:33:44:55", "ip": "192.168.1.50" }
//!   ```
//!
//!   Duplicate hostnames or MAC addresses return HTTP 409 (Conflict).
//!
//! ## `/api/dhcp/reservations/:reservation_id` (PATCH, DELETE)
//!
//!   As for subnets.
//!
//! ## `/api/dhcp/leases` (GET)
//!
//!   Lists the current leases of the remote `dhcpd.leases` file, one entry per IP address.
//!
//! Every write is checked with `dhcpd -t` before it replaces the live file. A rejected
//! configuration returns HTTP 400, an unreachable server HTTP 502.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
