//! Form submission collection: turns the current input snapshot into a
//! canonical status document.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use shared::domain::sector_registry;
use shared::protocol::{SectorEntry, StatusDocument};

pub const DEFAULT_SHIFT: &str = "TURNO 1";
pub const DEFAULT_PRIORITY: &str = "NORMAL";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorInput {
    pub status: String,
    pub priority: String,
}

/// Snapshot of the entry form's current field values, keyed by sector id.
/// The collector only ever reads sectors that exist in the shared registry,
/// so a document can never carry duplicate or unknown ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub reference_date: String,
    pub shift: String,
    pub sectors: HashMap<String, SectorInput>,
}

impl FormState {
    /// A reset form: every sector empty with default priority, reference
    /// date set to `today`, shift set to the default label.
    pub fn cleared(today: NaiveDate) -> Self {
        let sectors = sector_registry()
            .iter()
            .map(|def| {
                (
                    def.id.clone(),
                    SectorInput {
                        status: String::new(),
                        priority: DEFAULT_PRIORITY.to_string(),
                    },
                )
            })
            .collect();
        Self {
            reference_date: today.format("%Y-%m-%d").to_string(),
            shift: DEFAULT_SHIFT.to_string(),
            sectors,
        }
    }

    pub fn sector(&self, id: &str) -> Option<&SectorInput> {
        self.sectors.get(id)
    }

    pub fn set_sector(&mut self, id: impl Into<String>, input: SectorInput) {
        self.sectors.insert(id.into(), input);
    }

    /// Repopulates the form from a previously persisted document, e.g. the
    /// operator's last private draft. Entries whose id is not in the
    /// registry are ignored, mirroring a form that has no field for them.
    pub fn apply_document(&mut self, document: &StatusDocument) {
        if let Some(reference_date) = &document.reference_date {
            self.reference_date = reference_date.clone();
        }
        if let Some(shift) = &document.shift {
            self.shift = shift.clone();
        }
        for entry in &document.sectors {
            if !sector_registry().iter().any(|def| def.id == entry.id) {
                continue;
            }
            self.sectors.insert(
                entry.id.clone(),
                SectorInput {
                    status: entry.status.clone(),
                    priority: entry
                        .priority
                        .clone()
                        .filter(|p| !p.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
                },
            );
        }
    }
}

/// Builds a status document from the form snapshot.
///
/// With `require_complete` set, returns `None` unless reference date and
/// shift are filled in and at least one sector carries a non-empty status;
/// empty-status sectors are dropped from the result. Without it (draft
/// save), every registry sector is included as-is.
pub fn collect(
    form: &FormState,
    require_complete: bool,
    collected_at: DateTime<Utc>,
) -> Option<StatusDocument> {
    let reference_date = form.reference_date.trim();
    let shift = form.shift.trim();
    if require_complete && (reference_date.is_empty() || shift.is_empty()) {
        return None;
    }

    let mut sectors = Vec::new();
    for def in sector_registry() {
        let input = form.sectors.get(&def.id);
        let status = input.map(|i| i.status.trim()).unwrap_or_default();
        if require_complete && status.is_empty() {
            continue;
        }
        let priority = input
            .map(|i| i.priority.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| DEFAULT_PRIORITY.to_string());

        sectors.push(SectorEntry {
            id: def.id.clone(),
            name: def.name.clone(),
            status: status.to_string(),
            priority: Some(priority),
        });
    }

    if require_complete && sectors.is_empty() {
        return None;
    }

    Some(StatusDocument {
        timestamp: Some(collected_at.timestamp_millis()),
        reference_date: (!reference_date.is_empty()).then(|| reference_date.to_string()),
        shift: (!shift.is_empty()).then(|| shift.to_string()),
        sectors,
    })
}

#[cfg(test)]
#[path = "tests/collector_tests.rs"]
mod tests;
