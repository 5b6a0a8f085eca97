//! Entry-side workflow: draft persistence and full transmission.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, warn};

use shared::domain::OperatorId;
use shared::error::StoreError;
use shared::protocol::StatusDocument;

use crate::collector::{collect, FormState};
use crate::gateway::{DocumentPath, StatusGateway};

/// User-facing feedback catalog for the entry surface. Validation and save
/// failures never lose data: the form keeps its values and a failed save is
/// retried on the next change once connectivity returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Connecting,
    Connected,
    ConnectionError,
    SaveError,
    Saved,
    ValidationError,
}

impl Feedback {
    pub const fn message(self) -> &'static str {
        match self {
            Feedback::Connecting => "Conectando ao servidor...",
            Feedback::Connected => "Conectado ao servidor.",
            Feedback::ConnectionError => "Erro de conexão. Tentando reconectar...",
            Feedback::SaveError => {
                "Erro ao salvar. Suas alterações serão salvas quando reconectar."
            }
            Feedback::Saved => "Alterações salvas com sucesso!",
            Feedback::ValidationError => "Por favor, preencha todos os campos obrigatórios.",
        }
    }

    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Feedback::ConnectionError | Feedback::SaveError | Feedback::ValidationError
        )
    }
}

pub struct EntrySession {
    gateway: Arc<dyn StatusGateway>,
    operator: OperatorId,
    // Draft writes must land in submission order even when saves overlap.
    write_order: Mutex<()>,
}

impl EntrySession {
    pub fn new(gateway: Arc<dyn StatusGateway>, operator: OperatorId) -> Self {
        Self {
            gateway,
            operator,
            write_order: Mutex::new(()),
        }
    }

    pub fn operator(&self) -> &OperatorId {
        &self.operator
    }

    fn private_path(&self) -> DocumentPath {
        DocumentPath::private(self.operator.clone())
    }

    /// Last persisted private draft, for repopulating the form.
    pub async fn load_last_draft(&self) -> Result<Option<StatusDocument>> {
        self.gateway.read_once(&self.private_path()).await
    }

    /// Persists the current form as a private draft. Empty sectors are
    /// kept; nothing is validated.
    pub async fn save_draft(&self, form: &FormState) -> Feedback {
        let Some(document) = collect(form, false, Utc::now()) else {
            return Feedback::ValidationError;
        };

        let _order = self.write_order.lock().await;
        match self.gateway.write(&self.private_path(), &document).await {
            Ok(()) => Feedback::Saved,
            Err(err) => {
                report_write_failure("draft save", &err);
                Feedback::SaveError
            }
        }
    }

    /// Full submission: validates, persists the private draft, then
    /// replaces the public board document. A validation failure writes
    /// nothing and leaves the form untouched.
    pub async fn transmit(&self, form: &FormState) -> Feedback {
        let Some(document) = collect(form, true, Utc::now()) else {
            return Feedback::ValidationError;
        };

        let _order = self.write_order.lock().await;
        if let Err(err) = self.gateway.write(&self.private_path(), &document).await {
            report_write_failure("transmission draft save", &err);
            return Feedback::SaveError;
        }
        match self.gateway.write(&DocumentPath::Public, &document).await {
            Ok(()) => Feedback::Saved,
            Err(err) => {
                report_write_failure("public transmission", &err);
                Feedback::SaveError
            }
        }
    }
}

fn report_write_failure(operation: &str, err: &anyhow::Error) {
    match err.downcast_ref::<StoreError>() {
        Some(store_err) if store_err.is_unavailable() => {
            warn!(operation, error = %store_err, "store unavailable, connectivity degraded");
        }
        _ => error!(operation, error = %err, "store write failed"),
    }
}

#[cfg(test)]
#[path = "tests/entry_tests.rs"]
mod tests;
