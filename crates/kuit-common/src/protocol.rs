//! Wire types for the controller's REST resources.
//!
//! The suite never owns these resources. It reads them while reconciling and
//! deletes them during cleanup, so every field is optional and unknown fields
//! are kept in `extra` rather than rejected.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

/// A JSON object keyed by resource id, kept in the order the server sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T>(pub Vec<(String, T)>);

impl<T> Keyed<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(id, item)| (id.as_str(), item))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Keyed<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for KeyedVisitor<T> {
            type Value = Keyed<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object keyed by resource id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((id, item)) = map.next_entry::<String, T>()? {
                    entries.push((id, item));
                }
                Ok(Keyed(entries))
            }
        }

        deserializer.deserialize_map(KeyedVisitor(PhantomData))
    }
}

/// Ethernet virtual circuit as listed by the circuit collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvcRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub inserted_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One hop in a trace result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceHop {
    #[serde(default)]
    pub dpid: Option<String>,
    #[serde(default)]
    pub port: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl TraceHop {
    /// Ports come back as numbers or strings depending on the hop type.
    pub fn port_text(&self) -> Option<String> {
        match self.port.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn matches(&self, dpid: &str, port: &str) -> bool {
        self.dpid.as_deref() == Some(dpid) && self.port_text().as_deref() == Some(port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    #[serde(default)]
    pub request_id: Option<Value>,
    #[serde(default)]
    pub result: Vec<TraceHop>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TraceEntry {
    pub fn request_id_text(&self) -> Option<String> {
        match self.request_id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Trace listings arrive either keyed by id or as a plain array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TraceCollection {
    Keyed(Keyed<TraceEntry>),
    List(Vec<TraceEntry>),
}

impl TraceCollection {
    pub fn entries(&self) -> Vec<(Option<String>, &TraceEntry)> {
        match self {
            TraceCollection::Keyed(keyed) => keyed
                .iter()
                .map(|(id, entry)| (Some(id.to_string()), entry))
                .collect(),
            TraceCollection::List(list) => list.iter().map(|entry| (None, entry)).collect(),
        }
    }
}

/// VLAN tag value: a single tag or a list of inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Single(u16),
    Ranges(Vec<[u16; 2]>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag_type: String,
    pub value: TagValue,
}

impl Tag {
    pub fn vlan(value: TagValue) -> Self {
        Self {
            tag_type: "vlan".to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uni {
    pub interface_id: String,
    pub tag: Tag,
}

/// Body for `POST` on the circuit collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvcPayload {
    pub name: String,
    pub uni_a: Uni,
    pub uni_z: Uni,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_paths: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_int: Option<bool>,
}
