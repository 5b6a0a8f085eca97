use super::*;

use chrono::{NaiveDate, TimeZone, Utc};

use crate::render::{render, BoardBody};
use shared::domain::{sector_registry, sector_slug};
use shared::protocol::StatusDocument;

fn filled_form() -> FormState {
    let mut form = FormState::cleared(NaiveDate::from_ymd_opt(2026, 8, 6).expect("date"));
    form.set_sector(
        sector_slug("ENSAQUE"),
        SectorInput {
            status: "Linha 2 parada".into(),
            priority: "alta".into(),
        },
    );
    form.set_sector(
        sector_slug("MARCOLD"),
        SectorInput {
            status: "Operação normal".into(),
            priority: String::new(),
        },
    );
    form
}

fn collection_instant() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 6, 14, 30, 0).single().expect("instant")
}

#[test]
fn complete_collection_drops_empty_sectors_and_uppercases_priority() {
    let document = collect(&filled_form(), true, collection_instant()).expect("document");

    assert_eq!(document.reference_date.as_deref(), Some("2026-08-06"));
    assert_eq!(document.shift.as_deref(), Some("TURNO 1"));
    assert_eq!(document.sectors.len(), 2);

    let ensaque = &document.sectors[0];
    assert_eq!(ensaque.id, sector_slug("ENSAQUE"));
    assert_eq!(ensaque.priority.as_deref(), Some("ALTA"));

    // Empty priority input defaults to NORMAL.
    let marcold = &document.sectors[1];
    assert_eq!(marcold.priority.as_deref(), Some("NORMAL"));
}

#[test]
fn draft_collection_keeps_every_registry_sector() {
    let document = collect(&filled_form(), false, collection_instant()).expect("document");
    assert_eq!(document.sectors.len(), sector_registry().len());

    let ids: Vec<&str> = document.sectors.iter().map(|s| s.id.as_str()).collect();
    let expected: Vec<&str> = sector_registry().iter().map(|def| def.id.as_str()).collect();
    assert_eq!(ids, expected);
}

#[test]
fn complete_collection_requires_header_fields() {
    let mut form = filled_form();
    form.reference_date = String::new();
    assert!(collect(&form, true, collection_instant()).is_none());

    let mut form = filled_form();
    form.shift = "  ".into();
    assert!(collect(&form, true, collection_instant()).is_none());
}

#[test]
fn complete_collection_requires_at_least_one_status() {
    let form = FormState::cleared(NaiveDate::from_ymd_opt(2026, 8, 6).expect("date"));
    assert!(collect(&form, true, collection_instant()).is_none());
    // The same empty form is still a valid draft.
    assert!(collect(&form, false, collection_instant()).is_some());
}

#[test]
fn collection_stamps_submission_time() {
    let document = collect(&filled_form(), true, collection_instant()).expect("document");
    assert_eq!(
        document.timestamp,
        Some(collection_instant().timestamp_millis())
    );
}

#[test]
fn collect_then_render_round_trips_in_canonical_order() {
    let mut form = FormState::cleared(NaiveDate::from_ymd_opt(2026, 8, 6).expect("date"));
    for def in sector_registry() {
        form.set_sector(
            def.id.clone(),
            SectorInput {
                status: format!("ok em {}", def.name),
                priority: "NORMAL".into(),
            },
        );
    }

    let document = collect(&form, true, collection_instant()).expect("document");
    let BoardBody::Sectors(cards) = render(&document).body else {
        panic!("expected cards");
    };

    // All priorities equal: rendered order is the fixed registry order,
    // statuses and priorities verbatim.
    assert_eq!(cards.len(), sector_registry().len());
    for (card, def) in cards.iter().zip(sector_registry()) {
        assert_eq!(card.name, def.name);
        assert_eq!(card.status, format!("ok em {}", def.name));
        assert_eq!(card.priority_label, "NORMAL");
    }
}

#[test]
fn cleared_form_uses_defaults() {
    let form = FormState::cleared(NaiveDate::from_ymd_opt(2026, 8, 6).expect("date"));
    assert_eq!(form.reference_date, "2026-08-06");
    assert_eq!(form.shift, DEFAULT_SHIFT);
    assert_eq!(form.sectors.len(), sector_registry().len());
    for input in form.sectors.values() {
        assert!(input.status.is_empty());
        assert_eq!(input.priority, DEFAULT_PRIORITY);
    }
}

#[test]
fn apply_document_repopulates_known_sectors_only() {
    let mut form = FormState::cleared(NaiveDate::from_ymd_opt(2026, 8, 6).expect("date"));
    let document = StatusDocument::from_json_str(
        r#"{
            "data": "2026-08-05",
            "turno": "TURNO 2",
            "setores": [
                {"id": "ensaque", "nome": "ENSAQUE", "status": "retomada", "prioridade": "BAIXA"},
                {"id": "setor-fantasma", "nome": "SETOR FANTASMA", "status": "x", "prioridade": "ALTA"}
            ]
        }"#,
    )
    .expect("decode");

    form.apply_document(&document);

    assert_eq!(form.reference_date, "2026-08-05");
    assert_eq!(form.shift, "TURNO 2");
    let ensaque = form.sector("ensaque").expect("known sector");
    assert_eq!(ensaque.status, "retomada");
    assert_eq!(ensaque.priority, "BAIXA");
    assert!(form.sector("setor-fantasma").is_none());
}
