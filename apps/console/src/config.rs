use std::{collections::HashMap, fs};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Hosted store endpoint. Absent means local-only mode.
    pub server_url: Option<String>,
    pub database_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: None,
            database_url: "sqlite://./data/board.db".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("board.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("BOARD_SERVER_URL") {
        settings.server_url = Some(v);
    }
    if let Ok(v) = std::env::var("BOARD_DATABASE_URL") {
        settings.database_url = v;
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("server_url") {
            settings.server_url = Some(v.clone());
        }
        if let Some(v) = file_cfg.get("database_url") {
            settings.database_url = v.clone();
        }
    }
}
