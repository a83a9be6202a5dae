//! Network interfaces reported by the server.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A server-side interface, offered as a template for new subnets.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Interface {
    pub name: String,
    #[serde(default)]
    pub index: Option<i64>,
    /// Addresses in `a.b.c.d/nn` form.
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl Interface {
    /// Seed for a subnet created from one of this interface's addresses.
    ///
    /// `IP` is consumed by the subnet defaults to derive the active range.
    pub fn subnet_seed(&self, address: &str) -> Map<String, Value> {
        let seed = json!({
            "Name": self.name,
            "Subnet": address,
            "IP": address,
        });
        match seed {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}
