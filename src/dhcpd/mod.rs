//! ISC `isc-dhcp-server` configuration model.
//!
//! # `dhcpd.conf`
//!
//! [`conf::parse`] reads the top-level subnet and host declarations of a `dhcpd.conf`:
//!
//! ```text
//! subnet 192.168.1.0 netmask 255.255.255.0 {
//!     range 192.168.1.100 192.168.1.200;
//!     option routers 192.168.1.1;
//!     option domain-name-servers 192.168.1.10;
//!     option domain-name "test.local";
//!     default-lease-time 86400;
//!     max-lease-time 172800;
//! }
//!
//! host printer {
//!     hardware ethernet 00:11:22:33:44:55;
//!     fixed-address 192.168.1.50;
//! }
//! ```
//!
//! and [`conf::serialize`] writes them back in exactly that layout. For any subnets and
//! reservations that pass validation (and have distinct hostnames), `parse(serialize(s, r))`
//! gives back `s` and `r`, and serializing the result again reproduces the same text. Ids are
//! not part of the file; they are derived from the content by [`model::subnet_id`] and
//! [`model::reservation_id`].
//!
//! # `dhcpd.leases`
//!
//! [`leases::parse_leases`] reads the lease journal, reporting the last block listed for each
//! address.
//!
//! Everything here is pure: no I/O, no shared state.

pub mod conf;
pub mod leases;
pub mod model;
pub mod syntax;

pub use conf::{parse, serialize, ConfDocument};
pub use leases::parse_leases;
pub use model::{Lease, Reservation, ReservationSpec, Subnet, SubnetSpec};
