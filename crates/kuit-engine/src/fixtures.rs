//! Input records for the scenario catalog.
//!
//! Records are built fresh for every scenario run. Maintenance windows are
//! derived from the wall clock handed in by the caller.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::BTreeMap;

/// Timestamp format accepted by the maintenance form and API.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+0000";

/// A value a page driver can put into a form control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Flag(bool),
}

impl FieldValue {
    /// Empty text, an empty list and an unset flag count as absent.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Flag(set) => !set,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::List(items) => items.join(", "),
            FieldValue::Flag(set) => set.to_string(),
        }
    }
}

fn text(value: &str) -> Option<FieldValue> {
    Some(FieldValue::Text(value.to_string()))
}

fn opt_text(value: &Option<String>) -> Option<FieldValue> {
    value.as_deref().and_then(text)
}

/// Anything that can be typed into a domain form, field by field.
pub trait FormRecord: Sync {
    /// Value for the named form field, `None` when the record has none.
    fn field(&self, name: &str) -> Option<FieldValue>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitRecord {
    pub name: String,
    pub endpoint_a: String,
    pub endpoint_z: String,
    pub vlan_a: String,
    pub vlan_z: String,
    pub service_level: Option<String>,
    pub priority: Option<String>,
    pub max_paths: Option<String>,
    pub qos_queue: Option<String>,
    pub enable_int: bool,
    /// Message the UI is expected to show for an invalid record.
    pub expected_error: Option<String>,
}

impl CircuitRecord {
    pub fn new(name: &str, endpoint_a: &str, vlan_a: &str, endpoint_z: &str, vlan_z: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint_a: endpoint_a.to_string(),
            endpoint_z: endpoint_z.to_string(),
            vlan_a: vlan_a.to_string(),
            vlan_z: vlan_z.to_string(),
            ..Default::default()
        }
    }

    fn expecting(mut self, error: &str) -> Self {
        self.expected_error = Some(error.to_string());
        self
    }
}

impl FormRecord for CircuitRecord {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "name" => text(&self.name),
            "endpoint_a" => text(&self.endpoint_a),
            "endpoint_z" => text(&self.endpoint_z),
            "vlan_a" => text(&self.vlan_a),
            "vlan_z" => text(&self.vlan_z),
            "service_level" => opt_text(&self.service_level),
            "priority" => opt_text(&self.priority),
            "max_paths" => opt_text(&self.max_paths),
            "qos_queue" => opt_text(&self.qos_queue),
            "enable_int" => Some(FieldValue::Flag(self.enable_int)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRecord {
    pub source: String,
    pub destination: String,
    /// Optional metric inputs keyed by form field name.
    pub metrics: BTreeMap<&'static str, String>,
}

impl PathRecord {
    pub fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &'static str, value: &str) -> Self {
        self.metrics.insert(field, value.to_string());
        self
    }
}

impl FormRecord for PathRecord {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "source" => text(&self.source),
            "destination" => text(&self.destination),
            other => self.metrics.get(other).and_then(|v| text(v)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceRecord {
    pub dpid: String,
    pub port: String,
    /// Optional packet header match fields (`dl_vlan`, `nw_src`, ...).
    pub header: BTreeMap<&'static str, String>,
}

impl TraceRecord {
    pub fn new(dpid: &str, port: &str) -> Self {
        Self {
            dpid: dpid.to_string(),
            port: port.to_string(),
            header: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &'static str, value: &str) -> Self {
        self.header.insert(field, value.to_string());
        self
    }
}

impl FormRecord for TraceRecord {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "dpid" => text(&self.dpid),
            "port" => text(&self.port),
            other => self.header.get(other).and_then(|v| text(v)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceRecord {
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub switches: Vec<String>,
    pub interfaces: Vec<String>,
    pub links: Vec<String>,
    pub force: bool,
}

impl MaintenanceRecord {
    pub fn new(description: &str, window: (String, String)) -> Self {
        Self {
            description: description.to_string(),
            start_time: window.0,
            end_time: window.1,
            force: true,
            ..Default::default()
        }
    }

    pub fn switches(mut self, items: &[&str]) -> Self {
        self.switches = items.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn interfaces(mut self, items: &[&str]) -> Self {
        self.interfaces = items.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn links(mut self, items: &[&str]) -> Self {
        self.links = items.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl FormRecord for MaintenanceRecord {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "description" => text(&self.description),
            "start_time" => text(&self.start_time),
            "end_time" => text(&self.end_time),
            "switches" => Some(FieldValue::List(self.switches.clone())),
            "interfaces" => Some(FieldValue::List(self.interfaces.clone())),
            "links" => Some(FieldValue::List(self.links.clone())),
            "force" => Some(FieldValue::Flag(self.force)),
            _ => None,
        }
    }
}

/// Start and end of a one hour window `days` after `now`.
pub fn future_window(now: DateTime<Utc>, days: i64) -> (String, String) {
    let start = now + ChronoDuration::days(days);
    let end = start + ChronoDuration::hours(1);
    (
        start.format(TIME_FORMAT).to_string(),
        end.format(TIME_FORMAT).to_string(),
    )
}

pub mod circuits {
    use super::CircuitRecord;

    pub const ENDPOINT_A: &str = "00:00:00:00:00:00:00:18:13";
    pub const ENDPOINT_Z: &str = "00:00:00:00:00:00:00:18:8";
    pub const PERFORMANCE_CIRCUIT: &str = "Performance_Test_Circuit";
    pub const API_CIRCUIT: &str = "Api_Roundtrip_Circuit";

    pub fn valid() -> Vec<CircuitRecord> {
        vec![
            CircuitRecord::new("Test_Circuit_001", ENDPOINT_A, "104", ENDPOINT_Z, "100"),
            CircuitRecord {
                service_level: Some("5".into()),
                priority: Some("high".into()),
                max_paths: Some("3".into()),
                qos_queue: Some("premium".into()),
                enable_int: true,
                ..CircuitRecord::new("Full_Feature_Circuit", ENDPOINT_A, "104", ENDPOINT_Z, "100")
            },
            CircuitRecord::new(
                "VLAN_Range_Circuit",
                ENDPOINT_A,
                "[100, 200]",
                ENDPOINT_Z,
                "[100, 200]",
            ),
        ]
    }

    pub fn invalid() -> Vec<CircuitRecord> {
        vec![
            CircuitRecord::new("", "Switch01:eth1", "100", "Switch02:eth1", "100")
                .expecting("Circuit Name is required"),
            CircuitRecord::new(
                "Invalid_VLAN_Test",
                "Switch01:eth1",
                "invalid_vlan",
                "Switch02:eth1",
                "100",
            )
            .expecting("Invalid VLAN format"),
            CircuitRecord::new(
                "Invalid_Endpoint_Test",
                "NonExistentSwitch:eth1",
                "100",
                "Switch02:eth1",
                "100",
            )
            .expecting("Endpoint not found"),
        ]
    }

    pub fn performance() -> CircuitRecord {
        CircuitRecord::new(PERFORMANCE_CIRCUIT, ENDPOINT_A, "110", ENDPOINT_Z, "110")
    }

    /// Circuit created straight through the REST API.
    pub fn api_roundtrip() -> CircuitRecord {
        CircuitRecord::new(API_CIRCUIT, ENDPOINT_A, "104", ENDPOINT_Z, "104")
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Boundary {
        pub max_vlan: String,
        pub invalid_vlan: String,
        pub long_name: String,
    }

    pub fn boundary() -> Boundary {
        Boundary {
            max_vlan: "4094".into(),
            invalid_vlan: "4095".into(),
            long_name: "a".repeat(256),
        }
    }

    /// Every circuit name a scenario may leave behind.
    pub fn cleanup_names() -> Vec<String> {
        valid()
            .into_iter()
            .map(|c| c.name)
            .chain([PERFORMANCE_CIRCUIT.to_string(), API_CIRCUIT.to_string()])
            .chain(["Boundary_Max_VLAN".to_string(), "Boundary_Reserved_VLAN".to_string()])
            .chain(invalid().into_iter().map(|c| c.name).filter(|n| !n.is_empty()))
            .chain([boundary().long_name])
            .collect()
    }
}

pub mod paths {
    use super::PathRecord;

    pub const SOURCE: &str = "00:00:00:00:00:00:00:18:13";
    pub const DESTINATION: &str = "00:00:00:00:00:00:00:14:32";

    pub fn valid() -> Vec<PathRecord> {
        vec![
            PathRecord::new(SOURCE, DESTINATION),
            PathRecord::new(SOURCE, DESTINATION)
                .with("bandwidth", "100")
                .with("reliability", "1")
                .with("delay", "10")
                .with("spf_max_paths", "2"),
        ]
    }
}

pub mod traces {
    use super::TraceRecord;

    pub fn valid() -> Vec<TraceRecord> {
        vec![
            TraceRecord::new("00:00:00:00:00:00:00:14", "13"),
            TraceRecord::new("00:00:00:00:00:00:00:14", "13")
                .with("dl_vlan", "300")
                .with("dl_type", "2048")
                .with("dl_src", "1")
                .with("dl_dst", "a1:b2:c3:d4:e5:f6")
                .with("nw_src", "10.10.10.1")
                .with("nw_dst", "10.10.10.254")
                .with("nw_proto", "6")
                .with("nw_tos", "2")
                .with("tp_src", "1234")
                .with("tp_dst", "80"),
        ]
    }

    pub fn invalid() -> Vec<TraceRecord> {
        vec![
            TraceRecord::new("00:00:00:00:00:00:00:01", "13"),
            TraceRecord::new("ff:ff:ff:ff:ff:ff:ff:ff", "13"),
            TraceRecord::new("00:00:00:00:00:00:00:18", "a"),
        ]
    }
}

pub mod maintenance {
    use super::{MaintenanceRecord, TIME_FORMAT, future_window};
    use chrono::{DateTime, Duration as ChronoDuration, Utc};

    pub fn valid(now: DateTime<Utc>) -> Vec<MaintenanceRecord> {
        vec![
            MaintenanceRecord::new("Valid data", future_window(now, 3))
                .switches(&["MIA-MI1-SW14"])
                .interfaces(&["00:00:00:00:00:00:00:14:32"])
                .links(&["e879d80c5907429087330d24ac29f6fc78513c02bb21f91212d0dd0db89a7d55"]),
            MaintenanceRecord::new("Valid data - multiple switches", future_window(now, 4))
                .switches(&["MIA-MI1-SW14", "SJU-H787-SW02"]),
        ]
    }

    pub fn invalid(now: DateTime<Utc>) -> Vec<MaintenanceRecord> {
        let window = future_window(now, 2);

        let past_start = (now - ChronoDuration::days(365))
            .format(TIME_FORMAT)
            .to_string();
        let wrong_format = window
            .0
            .split('T')
            .next()
            .unwrap_or_default()
            .to_string();

        vec![
            MaintenanceRecord::new("Invalid data - empty lists", window.clone()),
            MaintenanceRecord::new("Invalid data - past time", (past_start, window.1.clone()))
                .switches(&["MIA-MI1-SW14"]),
            MaintenanceRecord::new(
                "Invalid data - unexpected time format",
                (wrong_format, window.1.clone()),
            )
            .switches(&["MIA-MI1-SW14"]),
        ]
    }

    pub fn descriptions(now: DateTime<Utc>) -> Vec<String> {
        valid(now)
            .into_iter()
            .chain(invalid(now))
            .map(|r| r.description)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_future_window_format() {
        let (start, end) = future_window(noon(), 2);
        assert_eq!(start, "2026-03-12T12:00:00+0000");
        assert_eq!(end, "2026-03-12T13:00:00+0000");
    }

    #[test]
    fn test_invalid_maintenance_variants() {
        let invalid = maintenance::invalid(noon());
        assert!(invalid[0].switches.is_empty());
        assert_eq!(invalid[1].start_time, "2025-03-10T12:00:00+0000");
        assert_eq!(invalid[2].start_time, "2026-03-12");
    }

    #[test]
    fn test_circuit_fields() {
        let full = &circuits::valid()[1];
        assert_eq!(full.field("priority"), Some(FieldValue::Text("high".into())));
        assert_eq!(full.field("enable_int"), Some(FieldValue::Flag(true)));
        assert_eq!(circuits::valid()[0].field("service_level"), None);
        assert_eq!(full.field("unknown"), None);
    }

    #[test]
    fn test_empty_name_is_still_a_field() {
        let blank = &circuits::invalid()[0];
        let value = blank.field("name").unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn test_boundary_long_name() {
        assert_eq!(circuits::boundary().long_name.chars().count(), 256);
    }

    #[test]
    fn test_cleanup_names_cover_valid_circuits() {
        let names = circuits::cleanup_names();
        assert!(names.contains(&"Test_Circuit_001".to_string()));
        assert!(names.contains(&circuits::PERFORMANCE_CIRCUIT.to_string()));
    }

    #[test]
    fn test_cleanup_names_cover_negative_circuits() {
        let names = circuits::cleanup_names();
        assert!(names.contains(&"Invalid_VLAN_Test".to_string()));
        assert!(names.contains(&"Invalid_Endpoint_Test".to_string()));
        assert!(names.contains(&circuits::boundary().long_name));
        assert!(!names.iter().any(String::is_empty));
    }

    #[test]
    fn test_trace_header_fields() {
        let trace = &traces::valid()[1];
        assert_eq!(trace.field("nw_dst"), Some(FieldValue::Text("10.10.10.254".into())));
        assert_eq!(traces::valid()[0].field("nw_dst"), None);
    }
}
