use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::sector_slug;

/// The single "current operational status" snapshot exchanged between the
/// entry form, the document store and the dashboard. Wire field names match
/// the persisted JSON shape (`data`, `turno`, `setores`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusDocument {
    /// Milliseconds since epoch, stamped by the collector at submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<String>,
    #[serde(rename = "turno", default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
    #[serde(rename = "setores", default)]
    pub sectors: Vec<SectorEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorEntry {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// Raw priority text as submitted. Classification against the known
    /// levels happens at render time, never here.
    #[serde(rename = "prioridade", default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl StatusDocument {
    /// Lenient decode for payloads arriving from the store boundary.
    /// Unlike the derived `Deserialize`, this never fails the whole
    /// document: a missing `setores` field becomes an empty list and a
    /// non-string `prioridade` is carried as raw text so the renderer can
    /// sink it into the unrecognized bucket.
    pub fn from_value(value: &Value) -> Self {
        let sectors = value
            .get("setores")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(SectorEntry::from_value).collect())
            .unwrap_or_default();

        Self {
            timestamp: value.get("timestamp").and_then(Value::as_i64),
            reference_date: non_empty_string(value.get("data")),
            shift: non_empty_string(value.get("turno")),
            sectors,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(&value))
    }
}

impl SectorEntry {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let name = object
            .get("nome")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = object
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| sector_slug(&name));

        let priority = match object.get("prioridade") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            // Wrong-typed priority stays visible as raw text; it must land
            // in the unrecognized bucket, not crash the sort.
            Some(other) => Some(other.to_string()),
        };

        Some(Self {
            id,
            name,
            status: object
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            priority,
        })
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_are_portuguese() {
        let doc = StatusDocument {
            timestamp: Some(1_700_000_000_000),
            reference_date: Some("2026-08-06".into()),
            shift: Some("TURNO 1".into()),
            sectors: vec![SectorEntry {
                id: "ensaque".into(),
                name: "ENSAQUE".into(),
                status: "ok".into(),
                priority: Some("NORMAL".into()),
            }],
        };
        let value = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(value["data"], "2026-08-06");
        assert_eq!(value["turno"], "TURNO 1");
        assert_eq!(value["setores"][0]["nome"], "ENSAQUE");
        assert_eq!(value["setores"][0]["prioridade"], "NORMAL");
    }

    #[test]
    fn lenient_decode_tolerates_missing_sectors() {
        let doc = StatusDocument::from_value(&json!({}));
        assert!(doc.sectors.is_empty());
        assert_eq!(doc.timestamp, None);
        assert_eq!(doc.reference_date, None);
    }

    #[test]
    fn lenient_decode_keeps_non_string_priority_as_raw_text() {
        let doc = StatusDocument::from_value(&json!({
            "setores": [{"nome": "ENSAQUE", "status": "x", "prioridade": 5}]
        }));
        assert_eq!(doc.sectors[0].priority.as_deref(), Some("5"));
    }

    #[test]
    fn lenient_decode_derives_missing_ids_from_names() {
        let doc = StatusDocument::from_value(&json!({
            "setores": [{"nome": "SILO PULMÃO", "status": ""}]
        }));
        assert_eq!(doc.sectors[0].id, "silo-pulm-o");
        assert_eq!(doc.sectors[0].priority, None);
    }
}
