//! DHCP options carried by subnet records.

use serde::{Deserialize, Serialize};

/// Option codes every new subnet starts with: router, DNS server, domain
/// name and boot file name.
pub const WELL_KNOWN_CODES: [u8; 4] = [3, 6, 15, 67];

/// One DHCP option as the server stores it (`{"Code": 6, "Value": "..."}`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DhcpOption {
    pub code: u8,
    #[serde(default)]
    pub value: String,
}

impl DhcpOption {
    pub fn new(code: u8, value: &str) -> DhcpOption {
        DhcpOption {
            code,
            value: value.to_string(),
        }
    }
}

/// Default option list, gateway and DNS pointing at `ip` when known.
pub fn default_options(ip: Option<&str>) -> Vec<DhcpOption> {
    let ip = ip.unwrap_or("");
    vec![
        DhcpOption::new(3, ip),
        DhcpOption::new(6, ip),
        DhcpOption::new(15, "example.com"),
        DhcpOption::new(67, "lpxelinux.0"),
    ]
}

/// Merge `seed` options into `options`.
///
/// A well-known code overwrites the value of the existing entry with that
/// code, so each of them appears once. Any other code is appended.
pub fn merge_options(options: &mut Vec<DhcpOption>, seed: Vec<DhcpOption>) {
    for opt in seed {
        let slot = if WELL_KNOWN_CODES.contains(&opt.code) {
            options.iter_mut().find(|o| o.code == opt.code)
        } else {
            None
        };
        match slot {
            Some(existing) => existing.value = opt.value,
            None => options.push(opt),
        }
    }
}
