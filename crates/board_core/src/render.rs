//! Dashboard rendering: priority-ordered view model derivation.
//!
//! `render` is synchronous and side-effect free. It never mutates the input
//! document; ordering is computed over borrowed entries and materialized
//! into a fresh view model, so a caller may keep using its document after
//! rendering.

use chrono::{TimeZone, Utc};

use shared::domain::{Priority, PriorityClass};
use shared::protocol::{SectorEntry, StatusDocument};

/// Placeholder shown when the store holds no transmission yet. Distinct
/// from "still loading": emitting this means the feed delivered an answer.
pub const EMPTY_BOARD_NOTICE: &str = "Nenhum dado de planejamento encontrado. \
     Utilize a interface de entrada para transmitir o primeiro status operacional.";

const MISSING_FIELD: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub header: HeaderView,
    pub body: BoardBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub reference_date: String,
    pub shift: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardBody {
    /// Loaded successfully, nothing submitted yet.
    AwaitingFirstTransmission,
    Sectors(Vec<SectorCard>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorCard {
    pub id: String,
    pub name: String,
    pub priority_label: String,
    pub tone: PriorityTone,
    /// Operator free text, embedded line breaks preserved verbatim.
    pub status: String,
}

/// Style hook for the view binding, one tone per known level. Unrecognized
/// priorities render with the neutral tone while still sinking to the
/// bottom of the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityTone {
    Alta,
    Media,
    Baixa,
    Normal,
}

impl PriorityTone {
    fn from_class(class: PriorityClass) -> Self {
        match class {
            PriorityClass::Known(Priority::Alta) => PriorityTone::Alta,
            PriorityClass::Known(Priority::Media) => PriorityTone::Media,
            PriorityClass::Known(Priority::Baixa) => PriorityTone::Baixa,
            PriorityClass::Known(Priority::Normal) | PriorityClass::Unrecognized => {
                PriorityTone::Normal
            }
        }
    }
}

/// Derives the dashboard view for one status document.
///
/// Sectors are ordered by ascending priority weight. The sort is stable:
/// entries sharing a weight keep their relative order from the input
/// sequence, which carries the canonical registry order and so acts as the
/// deterministic secondary key.
pub fn render(document: &StatusDocument) -> ViewModel {
    let header = HeaderView {
        reference_date: field_or_na(document.reference_date.as_deref()),
        shift: field_or_na(document.shift.as_deref()),
        last_updated: document
            .timestamp
            .and_then(format_timestamp)
            .unwrap_or_else(|| MISSING_FIELD.to_string()),
    };

    if document.sectors.is_empty() {
        return ViewModel {
            header,
            body: BoardBody::AwaitingFirstTransmission,
        };
    }

    let mut ordered: Vec<&SectorEntry> = document.sectors.iter().collect();
    ordered.sort_by_key(|entry| PriorityClass::classify(entry.priority.as_deref()).weight());

    ViewModel {
        header,
        body: BoardBody::Sectors(ordered.into_iter().map(sector_card).collect()),
    }
}

/// View for "no document at all" (absent on the wire, or nothing persisted).
pub fn render_absent() -> ViewModel {
    ViewModel {
        header: HeaderView {
            reference_date: MISSING_FIELD.to_string(),
            shift: MISSING_FIELD.to_string(),
            last_updated: MISSING_FIELD.to_string(),
        },
        body: BoardBody::AwaitingFirstTransmission,
    }
}

fn sector_card(entry: &SectorEntry) -> SectorCard {
    let class = PriorityClass::classify(entry.priority.as_deref());
    let raw = entry.priority.as_deref().map(str::trim).unwrap_or("");
    let priority_label = if raw.is_empty() {
        // Absent input classified NORMAL; show the resolved level instead
        // of an empty label.
        Priority::Normal.label().to_string()
    } else {
        raw.to_uppercase()
    };

    SectorCard {
        id: entry.id.clone(),
        name: entry.name.clone(),
        priority_label,
        tone: PriorityTone::from_class(class),
        status: entry.status.clone(),
    }
}

fn field_or_na(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => MISSING_FIELD.to_string(),
    }
}

fn format_timestamp(millis: i64) -> Option<String> {
    match Utc.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(instant) => {
            Some(instant.format("%d/%m/%Y %H:%M:%S").to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
