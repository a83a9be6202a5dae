//! Entity kinds managed by the console and their per-kind wire rules.

use super::dhcp_option::{default_options, merge_options, DhcpOption};
use super::ipv4::Ipv4;
use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Seed key carrying an interface address (`a.b.c.d/nn`) for new subnets.
pub const SEED_IP: &str = "IP";

/// Prefix of keys that are local bookkeeping and never merged or sent.
pub const RESERVED_PREFIX: char = '_';

pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Percent-encode `key` as exactly one URL path segment.
///
/// Empty, `.` and `..` are rejected since no encoding keeps them from
/// being read as a reference to the collection or its parent.
pub fn path_segment(key: &str) -> Result<String> {
    if matches!(key, "" | "." | "..") {
        return Err(ConsoleError::InvalidInput(format!(
            "'{key}' cannot be used in a URL path"
        )));
    }
    Ok(urlencoding::encode(key).into_owned())
}

/// The administrable entity kinds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Subnet,
    Machine,
    BootEnv,
    Pref,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Subnet,
        EntityKind::BootEnv,
        EntityKind::Pref,
        EntityKind::Machine,
    ];

    /// Collection endpoint relative to the API prefix.
    pub fn collection_path(self) -> &'static str {
        match self {
            EntityKind::Subnet => "/subnets",
            EntityKind::Machine => "/machines",
            EntityKind::BootEnv => "/bootenvs",
            EntityKind::Pref => "/prefs",
        }
    }

    /// Item endpoint for a persisted record.
    pub fn item_path(self, key: &str) -> Result<String> {
        Ok(format!("{}/{}", self.collection_path(), path_segment(key)?))
    }

    /// Field holding the record key.
    pub fn key_field(self) -> &'static str {
        match self {
            EntityKind::Machine => "Uuid",
            _ => "Name",
        }
    }

    /// Whether the server exposes `PUT`/`DELETE` on `/{key}`.
    ///
    /// Preferences only support `GET` and `POST` on the collection.
    pub fn has_item_routes(self) -> bool {
        !matches!(self, EntityKind::Pref)
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Subnet => "subnet",
            EntityKind::Machine => "machine",
            EntityKind::BootEnv => "boot environment",
            EntityKind::Pref => "preference",
        }
    }

    /// Field values of a freshly added record before any seed is applied.
    pub fn defaults(self) -> Map<String, Value> {
        let value = match self {
            EntityKind::Subnet => subnet_defaults(None, None),
            EntityKind::Machine => json!({
                "Name": "",
                "Address": "0.0.0.0",
                "BootEnv": "ignore",
                "Description": "",
                "Uuid": null,
            }),
            EntityKind::BootEnv => json!({
                "Name": "",
                "Description": "",
                "OS": {
                    "Name": "",
                    "Family": "",
                    "Codename": "",
                    "Version": "",
                    "IsoFile": "",
                    "IsoSha256": "",
                    "IsoUrl": "",
                },
                "Templates": [],
                "Kernel": "",
                "Initrds": [],
                "RequiredParams": [],
                "Available": true,
                "Errors": [],
            }),
            EntityKind::Pref => json!({"Name": "", "Val": ""}),
        };
        into_map(value)
    }

    /// Build the fields of a new record: defaults, then `seed` shallow-merged.
    ///
    /// Reserved `_` keys are skipped. For subnets an `IP` seed key derives
    /// the active range, next server, gateway and DNS defaults, and seeded
    /// `Options` are merged by code.
    pub fn build_new(self, seed: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut fields = match (self, seed.get(SEED_IP)) {
            (EntityKind::Subnet, Some(ip)) => {
                let ip = ip.as_str().ok_or_else(|| {
                    ConsoleError::InvalidInput(format!("{SEED_IP} must be a string, got {ip}"))
                })?;
                let ipv4 = Ipv4::new(ip)?;
                let range = ipv4.active_range()?;
                into_map(subnet_defaults(Some(&ipv4.addr.to_string()), Some(range)))
            }
            _ => self.defaults(),
        };

        for (key, value) in seed {
            if is_reserved(key) || (self == EntityKind::Subnet && key == SEED_IP) {
                continue;
            }
            if self == EntityKind::Subnet && key == "Options" {
                merge_seed_options(&mut fields, value)?;
            } else {
                fields.insert(key.clone(), value.clone());
            }
        }
        Ok(fields)
    }

    /// Split a collection GET response into per-record field maps.
    pub fn records_from_list(self, body: Value) -> std::result::Result<Vec<Map<String, Value>>, String> {
        match self {
            EntityKind::Pref => {
                let prefs: Map<String, Value> = decode(body)?;
                let mut names: Vec<&String> = prefs.keys().collect();
                names.sort();
                Ok(names
                    .into_iter()
                    .map(|name| pref_fields(name, prefs[name].clone()))
                    .collect())
            }
            _ => decode(body),
        }
    }

    /// Wire body of a save request for the given record fields.
    pub fn save_body(self, key: &str, fields: &Map<String, Value>) -> Value {
        match self {
            EntityKind::Pref => {
                let val = match fields.get("Val") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                let mut body = Map::new();
                body.insert(key.to_string(), Value::String(val));
                Value::Object(body)
            }
            _ => Value::Object(wire_fields(fields)),
        }
    }

    /// Fields to keep after a successful save.
    ///
    /// Uses the server's representation when it has the expected shape and
    /// falls back to what was sent otherwise.
    pub fn fields_from_saved(
        self,
        key: &str,
        sent: &Map<String, Value>,
        response: Value,
    ) -> Map<String, Value> {
        match (self, response) {
            (EntityKind::Pref, Value::Object(mut prefs)) => match prefs.remove(key) {
                Some(val) => pref_fields(key, val),
                None => sent.clone(),
            },
            (EntityKind::Pref, _) => sent.clone(),
            (_, Value::Object(map)) => map,
            (kind, other) => {
                log::warn!("unexpected {kind} save response {other}, keeping sent fields");
                sent.clone()
            }
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Render a key field value the way it appears in item paths.
pub fn key_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Fields without reserved keys.
pub fn wire_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(k, _)| !is_reserved(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn subnet_defaults(
    ip: Option<&str>,
    range: Option<(std::net::Ipv4Addr, std::net::Ipv4Addr)>,
) -> Value {
    let (start, end) = range
        .map(|(lo, hi)| (lo.to_string(), hi.to_string()))
        .unwrap_or_default();
    json!({
        "Name": "",
        "Subnet": "",
        "ActiveLeaseTime": 60,
        "ReservedLeaseTime": 7200,
        "OnlyReservations": false,
        "ActiveStart": start,
        "ActiveEnd": end,
        "Strategy": "MAC",
        "NextServer": ip.unwrap_or(""),
        "Options": default_options(ip),
    })
}

fn merge_seed_options(fields: &mut Map<String, Value>, seed: &Value) -> Result<()> {
    let seeded: Vec<DhcpOption> = decode(seed.clone())
        .map_err(|e| ConsoleError::InvalidInput(format!("Options: {e}")))?;
    let mut options: Vec<DhcpOption> = fields
        .get("Options")
        .cloned()
        .map(decode::<Vec<DhcpOption>>)
        .transpose()
        .map_err(|e| ConsoleError::InvalidInput(format!("Options: {e}")))?
        .unwrap_or_default();
    merge_options(&mut options, seeded);
    let options =
        serde_json::to_value(options).map_err(|e| ConsoleError::InvalidInput(e.to_string()))?;
    fields.insert("Options".to_string(), options);
    Ok(())
}

fn pref_fields(name: &str, val: Value) -> Map<String, Value> {
    into_map(json!({"Name": name, "Val": val}))
}

/// Decode with the JSON path of the first mismatch in the message.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(value: Value) -> std::result::Result<T, String> {
    serde_path_to_error::deserialize(value)
        .map_err(|e| format!("path={} error={}", e.path(), e.inner()))
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(value: Value) -> Map<String, Value> {
        into_map(value)
    }

    #[test]
    fn test_paths_and_keys() {
        assert_eq!(EntityKind::Subnet.collection_path(), "/subnets");
        assert_eq!(EntityKind::Machine.item_path("abc").unwrap(), "/machines/abc");
        assert_eq!(EntityKind::Machine.key_field(), "Uuid");
        assert_eq!(EntityKind::BootEnv.key_field(), "Name");
        assert!(!EntityKind::Pref.has_item_routes());
        assert_eq!(EntityKind::BootEnv.to_string(), "boot environment");
    }

    #[test]
    fn test_item_path_keeps_key_in_one_segment() {
        assert_eq!(
            EntityKind::Subnet.item_path("lab#2").unwrap(),
            "/subnets/lab%232"
        );
        assert_eq!(
            EntityKind::BootEnv.item_path("../machines/x").unwrap(),
            "/bootenvs/..%2Fmachines%2Fx"
        );
        assert_eq!(
            EntityKind::BootEnv.item_path("a b?c").unwrap(),
            "/bootenvs/a%20b%3Fc"
        );
        for key in ["", ".", ".."] {
            assert!(matches!(
                EntityKind::Subnet.item_path(key),
                Err(ConsoleError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_subnet_empty_seed() {
        let fields = EntityKind::Subnet.build_new(&Map::new()).unwrap();
        assert_eq!(fields["Strategy"], "MAC");
        assert_eq!(fields["ActiveLeaseTime"], 60);
        assert_eq!(fields["ActiveStart"], "");
        let codes: Vec<u64> = fields["Options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["Code"].as_u64().unwrap())
            .collect();
        assert_eq!(codes, vec![3, 6, 15, 67]);
    }

    #[test]
    fn test_subnet_seed_ip_derives_range() {
        let fields = EntityKind::Subnet
            .build_new(&seed(json!({"Name": "eth0", "Subnet": "192.168.124.10/24", "IP": "192.168.124.10/24"})))
            .unwrap();
        assert_eq!(fields["Name"], "eth0");
        assert_eq!(fields["ActiveStart"], "192.168.124.0");
        assert_eq!(fields["ActiveEnd"], "192.168.124.255");
        assert_eq!(fields["NextServer"], "192.168.124.10");
        assert_eq!(fields["Options"][0]["Value"], "192.168.124.10");
        assert_eq!(fields["Options"][1]["Value"], "192.168.124.10");
        assert!(!fields.contains_key("IP"));
    }

    #[test]
    fn test_subnet_seed_bad_ip() {
        let err = EntityKind::Subnet
            .build_new(&seed(json!({"IP": "192.168.124.300/24"})))
            .unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidInput(_)));
    }

    #[test]
    fn test_subnet_seed_options_merge() {
        let fields = EntityKind::Subnet
            .build_new(&seed(json!({"Options": [{"Code": 6, "Value": "x"}, {"Code": 99, "Value": "y"}]})))
            .unwrap();
        let options = fields["Options"].as_array().unwrap();
        assert_eq!(options.len(), 5);
        assert_eq!(options[1], json!({"Code": 6, "Value": "x"}));
        assert_eq!(options[4], json!({"Code": 99, "Value": "y"}));

        let err = EntityKind::Subnet
            .build_new(&seed(json!({"Options": "nope"})))
            .unwrap_err();
        assert!(err.to_string().contains("Options"));
    }

    #[test]
    fn test_seed_skips_reserved_keys() {
        let fields = EntityKind::Machine
            .build_new(&seed(json!({"_new": false, "_error": true, "Name": "node1"})))
            .unwrap();
        assert_eq!(fields["Name"], "node1");
        assert_eq!(fields["BootEnv"], "ignore");
        assert!(fields.keys().all(|k| !is_reserved(k)));
    }

    #[test]
    fn test_bootenv_seed_replaces_whole_values() {
        let fields = EntityKind::BootEnv
            .build_new(&seed(json!({"OS": {"Name": "centos-7"}})))
            .unwrap();
        assert_eq!(fields["OS"], json!({"Name": "centos-7"}));
        assert_eq!(fields["Available"], true);
    }

    #[test]
    fn test_prefs_from_list_sorted() {
        let records = EntityKind::Pref
            .records_from_list(json!({"unknownBootEnv": "ignore", "defaultBootEnv": "sledgehammer"}))
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Name"], "defaultBootEnv");
        assert_eq!(records[0]["Val"], "sledgehammer");
        assert!(EntityKind::Pref.records_from_list(json!([1])).is_err());
    }

    #[test]
    fn test_list_rejects_non_objects() {
        let err = EntityKind::Machine
            .records_from_list(json!([{"Name": "a"}, 3]))
            .unwrap_err();
        assert!(err.contains("[1]"), "{err}");
    }

    #[test]
    fn test_save_body_and_saved_fields() {
        let fields = seed(json!({"Name": "logLevel", "Val": "debug"}));
        assert_eq!(
            EntityKind::Pref.save_body("logLevel", &fields),
            json!({"logLevel": "debug"})
        );
        let saved = EntityKind::Pref.fields_from_saved(
            "logLevel",
            &fields,
            json!({"logLevel": "info", "defaultBootEnv": "x"}),
        );
        assert_eq!(saved["Val"], "info");

        let subnet = seed(json!({"Name": "a", "_expand": true}));
        assert_eq!(EntityKind::Subnet.save_body("a", &subnet), json!({"Name": "a"}));
        let saved = EntityKind::Subnet.fields_from_saved("a", &subnet, Value::Null);
        assert_eq!(saved, subnet);
    }

    #[test]
    fn test_key_string() {
        assert_eq!(key_string(Some(&json!("n1"))), "n1");
        assert_eq!(key_string(Some(&Value::Null)), "");
        assert_eq!(key_string(None), "");
        assert_eq!(key_string(Some(&json!(42))), "42");
    }
}
