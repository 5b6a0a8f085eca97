//! Text binding of the dashboard view model for the terminal.

use board_core::{BoardBody, FeedStatus, PriorityTone, ViewModel, EMPTY_BOARD_NOTICE};

const RULE: &str = "------------------------------------------------------------";

pub fn connectivity_line(status: &FeedStatus) -> String {
    format!("[conexão] {}", status.describe())
}

pub fn render_text(view: &ViewModel) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "Data: {}  |  Turno: {}  |  Atualizado: {}\n",
        view.header.reference_date, view.header.shift, view.header.last_updated
    ));
    out.push_str(RULE);
    out.push('\n');

    match &view.body {
        BoardBody::AwaitingFirstTransmission => {
            out.push_str(EMPTY_BOARD_NOTICE);
            out.push('\n');
        }
        BoardBody::Sectors(cards) => {
            for card in cards {
                out.push_str(&format!(
                    "{} {}  (Prioridade: {})\n",
                    tone_marker(card.tone),
                    card.name,
                    card.priority_label
                ));
                for line in card.status.lines() {
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }

    out
}

fn tone_marker(tone: PriorityTone) -> &'static str {
    match tone {
        PriorityTone::Alta => "[!]",
        PriorityTone::Media => "[~]",
        PriorityTone::Baixa => "[.]",
        PriorityTone::Normal => "[ ]",
    }
}
