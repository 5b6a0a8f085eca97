use super::*;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex as AsyncMutex;

use crate::collector::SectorInput;
use crate::gateway::Subscription;
use shared::domain::sector_slug;
use shared::error::StoreError;

struct RecordingGateway {
    writes: AsyncMutex<Vec<(DocumentPath, StatusDocument)>>,
    fail_unavailable: bool,
}

impl RecordingGateway {
    fn ok() -> Self {
        Self {
            writes: AsyncMutex::new(Vec::new()),
            fail_unavailable: false,
        }
    }

    fn unavailable() -> Self {
        Self {
            writes: AsyncMutex::new(Vec::new()),
            fail_unavailable: true,
        }
    }

    async fn recorded(&self) -> Vec<(DocumentPath, StatusDocument)> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl StatusGateway for RecordingGateway {
    async fn write(&self, path: &DocumentPath, document: &StatusDocument) -> anyhow::Result<()> {
        if self.fail_unavailable {
            return Err(anyhow!(StoreError::unavailable("store offline")));
        }
        self.writes
            .lock()
            .await
            .push((path.clone(), document.clone()));
        Ok(())
    }

    async fn read_once(&self, path: &DocumentPath) -> anyhow::Result<Option<StatusDocument>> {
        let writes = self.writes.lock().await;
        Ok(writes
            .iter()
            .rev()
            .find(|(written_path, _)| written_path == path)
            .map(|(_, document)| document.clone()))
    }

    async fn subscribe(&self, _path: &DocumentPath) -> anyhow::Result<Subscription> {
        Err(anyhow!("not a feed source in these tests"))
    }
}

fn session(gateway: Arc<RecordingGateway>) -> EntrySession {
    EntrySession::new(gateway, OperatorId("op-123".into()))
}

fn filled_form() -> FormState {
    let mut form = FormState::cleared(NaiveDate::from_ymd_opt(2026, 8, 6).expect("date"));
    form.set_sector(
        sector_slug("ENSAQUE"),
        SectorInput {
            status: "Linha 2 parada".into(),
            priority: "ALTA".into(),
        },
    );
    form
}

#[tokio::test]
async fn transmit_validation_failure_writes_nothing() {
    let gateway = Arc::new(RecordingGateway::ok());
    let entry = session(Arc::clone(&gateway));
    let empty = FormState::cleared(NaiveDate::from_ymd_opt(2026, 8, 6).expect("date"));

    let feedback = entry.transmit(&empty).await;

    assert_eq!(feedback, Feedback::ValidationError);
    assert!(gateway.recorded().await.is_empty());
}

#[tokio::test]
async fn transmit_writes_private_then_public() {
    let gateway = Arc::new(RecordingGateway::ok());
    let entry = session(Arc::clone(&gateway));

    let feedback = entry.transmit(&filled_form()).await;
    assert_eq!(feedback, Feedback::Saved);

    let writes = gateway.recorded().await;
    assert_eq!(writes.len(), 2);
    assert_eq!(
        writes[0].0,
        DocumentPath::private(OperatorId("op-123".into()))
    );
    assert_eq!(writes[1].0, DocumentPath::Public);
    // Both scopes receive the same document.
    assert_eq!(writes[0].1, writes[1].1);
}

#[tokio::test]
async fn save_draft_against_unavailable_store_degrades() {
    let gateway = Arc::new(RecordingGateway::unavailable());
    let entry = session(gateway);

    let feedback = entry.save_draft(&filled_form()).await;

    assert_eq!(feedback, Feedback::SaveError);
    assert!(feedback.is_error());
}

#[tokio::test]
async fn draft_round_trips_through_private_path() {
    let gateway = Arc::new(RecordingGateway::ok());
    let entry = session(Arc::clone(&gateway));

    assert_eq!(entry.save_draft(&filled_form()).await, Feedback::Saved);

    let draft = entry
        .load_last_draft()
        .await
        .expect("read")
        .expect("draft present");
    // Draft keeps every registry sector, including the empty ones.
    assert_eq!(draft.sectors.len(), shared::domain::sector_registry().len());

    let mut repopulated = FormState::cleared(NaiveDate::from_ymd_opt(2026, 8, 7).expect("date"));
    repopulated.apply_document(&draft);
    assert_eq!(
        repopulated.sector(&sector_slug("ENSAQUE")).expect("sector").status,
        "Linha 2 parada"
    );
}

#[test]
fn feedback_catalog_flags_errors() {
    assert!(Feedback::ValidationError.is_error());
    assert!(Feedback::SaveError.is_error());
    assert!(Feedback::ConnectionError.is_error());
    assert!(!Feedback::Saved.is_error());
    assert!(!Feedback::Connected.is_error());
    assert!(!Feedback::Connecting.is_error());
    assert!(Feedback::SaveError.message().contains("quando reconectar"));
}
