use std::{collections::HashMap, fs};

#[derive(Debug)]
pub struct Settings {
    pub server_url: String,
    pub database_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:4000".into(),
            database_url: "sqlite://./data/client.db".into(),
        }
    }
}

/// Defaults, overridden by `desktop.toml`, overridden by environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("desktop.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = v.clone();
            }
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("RETRO_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("RETRO_DATABASE_URL") {
        settings.database_url = v;
    }

    settings
}
