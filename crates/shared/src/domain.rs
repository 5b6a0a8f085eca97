use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Fixed set of facility processing areas, in canonical display order.
/// This order doubles as the fallback sort key: the collector emits sectors
/// in registry order, and the renderer's stable sort preserves it among
/// entries of equal priority.
pub const SECTOR_NAMES: [&str; 8] = [
    "MOEGAS/RECEPÇÃO",
    "SILOS E PRÉ-SECAGENS",
    "SILO PULMÃO",
    "SILOS DE REPASSE",
    "BENEFICIAMENTO",
    "ENSAQUE",
    "MARCOLD",
    "GRANELEIRO ADRIANA",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorDef {
    pub id: String,
    pub name: String,
}

/// Shared registry of known sectors. All call sites (collector, renderer,
/// clear operations) reference this single value so the slug derivation
/// cannot drift between them.
pub fn sector_registry() -> &'static [SectorDef] {
    static REGISTRY: OnceLock<Vec<SectorDef>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        SECTOR_NAMES
            .iter()
            .map(|name| SectorDef {
                id: sector_slug(name),
                name: (*name).to_string(),
            })
            .collect()
    })
}

/// Derives the stable slug for a sector name: ASCII lowercase, runs of
/// non-alphanumeric characters collapsed to a single `-`, leading and
/// trailing separators trimmed. Same name always yields the same id.
pub fn sector_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }
    slug
}

/// Ranked urgency levels attached to a sector's status. Lower weight sorts
/// first on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Alta,
    Media,
    Baixa,
    Normal,
}

impl Priority {
    pub const fn weight(self) -> u8 {
        match self {
            Priority::Alta => 1,
            Priority::Media => 2,
            Priority::Baixa => 3,
            Priority::Normal => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Priority::Alta => "ALTA",
            Priority::Media => "MÉDIA",
            Priority::Baixa => "BAIXA",
            Priority::Normal => "NORMAL",
        }
    }

    /// Matches a raw priority string against the known levels. Case and
    /// diacritics are folded first, so "Média", "MEDIA" and "média" all
    /// resolve to the same level.
    pub fn parse(raw: &str) -> Option<Self> {
        match fold_priority_text(raw).as_str() {
            "alta" => Some(Priority::Alta),
            "media" => Some(Priority::Media),
            "baixa" => Some(Priority::Baixa),
            "normal" => Some(Priority::Normal),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sort weight for priority text that matches none of the known levels.
/// Such entries sink below every recognized level, NORMAL included.
pub const UNRECOGNIZED_WEIGHT: u8 = 99;

/// Result of classifying a raw priority value at render time. Absent or
/// empty input defaults to NORMAL; present-but-unrecognized text is kept
/// distinct so garbage never silently becomes NORMAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityClass {
    Known(Priority),
    Unrecognized,
}

impl PriorityClass {
    pub fn classify(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => PriorityClass::Known(Priority::Normal),
            Some(text) => Priority::parse(text)
                .map(PriorityClass::Known)
                .unwrap_or(PriorityClass::Unrecognized),
        }
    }

    pub fn weight(self) -> u8 {
        match self {
            PriorityClass::Known(priority) => priority.weight(),
            PriorityClass::Unrecognized => UNRECOGNIZED_WEIGHT,
        }
    }
}

fn fold_priority_text(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(strip_diacritic)
        .collect()
}

fn strip_diacritic(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        other => other,
    }
}

/// Opaque session identifier from the identity boundary. Selects the
/// private document path; the contents are never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId(pub String);

impl OperatorId {
    pub fn anonymous() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
