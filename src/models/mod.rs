//! Domain models for the provisioning console.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`Ipv4`] and [`derive_range`] - CIDR math for default lease ranges
//! - [`EntityKind`] - per-kind endpoints, keys and defaults
//! - [`Record`] - a cached entity with its lifecycle flags
//! - [`DhcpOption`] and [`Interface`] - typed pieces of subnet records

mod dhcp_option;
mod interface;
mod ipv4;
mod kind;
mod record;

// Re-export public types
pub use dhcp_option::{default_options, merge_options, DhcpOption, WELL_KNOWN_CODES};
pub use interface::Interface;
pub use ipv4::{
    broadcast_addr, cut_addr, derive_range, derive_range_cidr, get_cidr_mask, parse_octets, Ipv4,
    MAX_LENGTH,
};
pub use kind::{is_reserved, key_string, path_segment, EntityKind, RESERVED_PREFIX, SEED_IP};
pub(crate) use kind::decode;
pub use record::{Operation, Record, RecordId, RecordState};
