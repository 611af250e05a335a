//! Circuit creation payloads built from fixture records.

use crate::fixtures::CircuitRecord;
use kuit_common::protocol::{EvcPayload, Tag, TagValue, Uni};
use thiserror::Error;

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_VLAN: u16 = 4094;
pub const RESERVED_VLAN: u16 = 4095;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Circuit name is required")]
    EmptyName,

    #[error("Circuit name has {len} characters, limit is 255")]
    NameTooLong { len: usize },

    #[error("Invalid VLAN format: '{0}'")]
    InvalidVlan(String),

    #[error("VLAN {0} is reserved")]
    ReservedVlan(u16),

    #[error("VLAN {0} is outside 1..=4094")]
    VlanOutOfRange(i64),

    #[error("Invalid VLAN range [{start}, {end}]")]
    InvalidRange { start: u16, end: u16 },

    #[error("Invalid value for {field}: '{value}'")]
    InvalidField { field: &'static str, value: String },
}

pub fn validate_name(name: &str) -> Result<(), PayloadError> {
    let len = name.chars().count();
    if name.trim().is_empty() {
        Err(PayloadError::EmptyName)
    } else if len > MAX_NAME_LEN {
        Err(PayloadError::NameTooLong { len })
    } else {
        Ok(())
    }
}

/// Parse a VLAN token into a tag.
///
/// Accepts a bare tag (`"104"`), a single range (`"[100, 200]"`) and a list
/// of ranges (`"[[100, 200]]"`, `"[[1, 5], [10, 20]]"`).
pub fn parse_vlan(input: &str) -> Result<Tag, PayloadError> {
    let token = input.trim();
    let invalid = || PayloadError::InvalidVlan(input.to_string());

    if !token.starts_with('[') {
        return Ok(Tag::vlan(TagValue::Single(parse_tag(token, input)?)));
    }

    let inner = token
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(invalid)?
        .trim();

    let ranges = if inner.starts_with('[') {
        inner
            .split("],")
            .map(|part| parse_range(part.trim().trim_start_matches('[').trim_end_matches(']'), input))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![parse_range(inner, input)?]
    };
    Ok(Tag::vlan(TagValue::Ranges(ranges)))
}

fn parse_range(pair: &str, input: &str) -> Result<[u16; 2], PayloadError> {
    let mut bounds = pair.split(',').map(str::trim);
    let (Some(start), Some(end), None) = (bounds.next(), bounds.next(), bounds.next()) else {
        return Err(PayloadError::InvalidVlan(input.to_string()));
    };
    let start = parse_tag(start, input)?;
    let end = parse_tag(end, input)?;
    if start > end {
        return Err(PayloadError::InvalidRange { start, end });
    }
    Ok([start, end])
}

fn parse_tag(token: &str, input: &str) -> Result<u16, PayloadError> {
    let value: i64 = token
        .trim()
        .parse()
        .map_err(|_| PayloadError::InvalidVlan(input.to_string()))?;
    if value == RESERVED_VLAN as i64 {
        return Err(PayloadError::ReservedVlan(RESERVED_VLAN));
    }
    if !(1..=MAX_VLAN as i64).contains(&value) {
        return Err(PayloadError::VlanOutOfRange(value));
    }
    Ok(value as u16)
}

fn parse_optional<T: std::str::FromStr>(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<T>, PayloadError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| PayloadError::InvalidField {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Build the `POST` body for a circuit record.
pub fn build_evc_payload(record: &CircuitRecord) -> Result<EvcPayload, PayloadError> {
    validate_name(&record.name)?;
    Ok(EvcPayload {
        name: record.name.clone(),
        uni_a: Uni {
            interface_id: record.endpoint_a.clone(),
            tag: parse_vlan(&record.vlan_a)?,
        },
        uni_z: Uni {
            interface_id: record.endpoint_z.clone(),
            tag: parse_vlan(&record.vlan_z)?,
        },
        service_level: parse_optional("service_level", &record.service_level)?,
        priority: record.priority.clone().filter(|p| !p.is_empty()),
        max_paths: parse_optional("max_paths", &record.max_paths)?,
        queue_id: record.qos_queue.clone().filter(|q| !q.is_empty()),
        enable_int: record.enable_int.then_some(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::circuits;
    use serde_json::json;

    #[test]
    fn test_single_vlan() {
        let tag = serde_json::to_value(parse_vlan("104").unwrap()).unwrap();
        assert_eq!(tag, json!({"tag_type": "vlan", "value": 104}));
    }

    #[test]
    fn test_range_encodings_normalize() {
        let expected = json!({"tag_type": "vlan", "value": [[100, 200]]});
        for input in ["[100, 200]", "[[100, 200]]", " [100,200] "] {
            let tag = serde_json::to_value(parse_vlan(input).unwrap()).unwrap();
            assert_eq!(tag, expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_multiple_ranges() {
        let tag = parse_vlan("[[1, 5], [10, 20]]").unwrap();
        assert_eq!(tag.value, TagValue::Ranges(vec![[1, 5], [10, 20]]));
    }

    #[test]
    fn test_vlan_boundaries() {
        assert!(parse_vlan("4094").is_ok());
        assert_eq!(parse_vlan("4095"), Err(PayloadError::ReservedVlan(4095)));
        assert_eq!(parse_vlan("0"), Err(PayloadError::VlanOutOfRange(0)));
        assert_eq!(parse_vlan("5000"), Err(PayloadError::VlanOutOfRange(5000)));
        assert_eq!(
            parse_vlan("[200, 100]"),
            Err(PayloadError::InvalidRange {
                start: 200,
                end: 100
            })
        );
    }

    #[test]
    fn test_malformed_vlan() {
        for input in ["invalid_vlan", "[100]", "[100, 200", "[1, 2, 3]", ""] {
            assert!(
                matches!(parse_vlan(input), Err(PayloadError::InvalidVlan(_))),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_name_limits() {
        let boundary = circuits::boundary();
        assert_eq!(
            validate_name(&boundary.long_name),
            Err(PayloadError::NameTooLong { len: 256 })
        );
        assert!(validate_name(&"a".repeat(255)).is_ok());
        assert_eq!(validate_name(""), Err(PayloadError::EmptyName));
    }

    #[test]
    fn test_full_feature_payload() {
        let payload = build_evc_payload(&circuits::valid()[1]).unwrap();
        assert_eq!(payload.service_level, Some(5));
        assert_eq!(payload.max_paths, Some(3));
        assert_eq!(payload.queue_id.as_deref(), Some("premium"));
        assert_eq!(payload.enable_int, Some(true));
        assert_eq!(payload.uni_a.interface_id, circuits::ENDPOINT_A);
    }

    #[test]
    fn test_minimal_payload_omits_optionals() {
        let payload = build_evc_payload(&circuits::valid()[0]).unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Test_Circuit_001",
                "uni_a": {"interface_id": circuits::ENDPOINT_A, "tag": {"tag_type": "vlan", "value": 104}},
                "uni_z": {"interface_id": circuits::ENDPOINT_Z, "tag": {"tag_type": "vlan", "value": 100}},
            })
        );
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        let invalid = circuits::invalid();
        assert_eq!(build_evc_payload(&invalid[0]), Err(PayloadError::EmptyName));
        assert!(matches!(
            build_evc_payload(&invalid[1]),
            Err(PayloadError::InvalidVlan(_))
        ));
    }
}
