use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_savedir")]
    pub savedir: String,
    #[serde(default = "default_os_list")]
    pub os_list: Vec<String>,
    #[serde(default = "default_lang_list")]
    pub lang_list: Vec<String>,
    #[serde(default)]
    pub compress_downloads: bool,
    #[serde(default = "default_true")]
    pub dark_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            savedir: default_savedir(),
            os_list: default_os_list(),
            lang_list: default_lang_list(),
            compress_downloads: false,
            dark_mode: true,
        }
    }
}

impl AppConfig {
    pub fn load_or_create() -> Result<Self> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let path = base_dir.join("config.json");
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            return Ok(config);
        }

        let config = AppConfig::default();
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let path = base_dir.join("config.json");
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(path, raw).context("write app config")?;
        Ok(())
    }
}

fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_savedir() -> String {
    "~/Games/GOG".to_string()
}

fn default_os_list() -> Vec<String> {
    vec!["windows".to_string()]
}

fn default_lang_list() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_true() -> bool {
    true
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("gogshelf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"server_url": "http://box:9000"}"#).expect("config");
        assert_eq!(config.server_url, "http://box:9000");
        assert_eq!(config.os_list, vec!["windows".to_string()]);
        assert_eq!(config.lang_list, vec!["en".to_string()]);
        assert!(!config.compress_downloads);
        assert!(config.dark_mode);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = AppConfig {
            compress_downloads: true,
            savedir: "/srv/gog".to_string(),
            ..AppConfig::default()
        };
        let raw = serde_json::to_string(&config).expect("serialize");
        let back: AppConfig = serde_json::from_str(&raw).expect("parse");
        assert_eq!(back.savedir, "/srv/gog");
        assert!(back.compress_downloads);
    }
}
