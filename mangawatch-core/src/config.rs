use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::discord::DEFAULT_DISCORD_API;
use crate::error::ConfigError;
use crate::feed::{SiteLinks, TrackedId, DEFAULT_SITE_URL};
use crate::poller::{PollConfig, DEFAULT_API_URL};
use crate::schedule::{DailySchedule, DEFAULT_SCHEDULE};

pub const ENV_MANGADEX_TOKEN: &str = "MANGADEX_TOKEN";
pub const ENV_DISCORD_TOKEN: &str = "DISCORD_TOKEN";
pub const ENV_CHANNEL_ID: &str = "DISCORD_CHANNEL_ID";
pub const ENV_GUILD_ID: &str = "DISCORD_GUILD_ID";
pub const ENV_APPLICATION_ID: &str = "DISCORD_APPLICATION_ID";
pub const ENV_SCHEDULE: &str = "MANGAWATCH_SCHEDULE";
pub const ENV_TRACKED_IDS: &str = "MANGAWATCH_TRACKED_IDS";

const DEFAULT_TRACKED_IDS: [&str; 4] = [
    "ed996855-70de-449f-bba2-e8e24224c14d",
    "462bd3fc-019c-4f28-8884-d7513d1e5a80",
    "027df837-7a15-4893-9dc3-e2ae11b94717",
    "a287ef9c-3718-4c6f-80be-44e404b78641",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub mangadex: MangaDexConfig,
    pub discord: DiscordConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MangaDexConfig {
    pub api_url: String,
    pub site_url: String,
    pub token: Option<String>,
    pub language: String,
    pub request_timeout_seconds: u64,
    pub tracked_ids: Vec<TrackedId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    pub application_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub cron: String,
}

impl Default for MangaDexConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            site_url: DEFAULT_SITE_URL.to_owned(),
            token: None,
            language: "en".to_owned(),
            request_timeout_seconds: 30,
            tracked_ids: DEFAULT_TRACKED_IDS.into_iter().map(TrackedId::from).collect(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_DISCORD_API.to_owned(),
            token: None,
            channel_id: None,
            guild_id: None,
            application_id: None,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: DEFAULT_SCHEDULE.to_owned(),
        }
    }
}

impl BotConfig {
    /// Chemin par défaut du fichier de configuration (~/.config/mangawatch/config.json)
    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mangawatch").join("config.json"))
    }

    /// Charge la configuration: fichier explicite, sinon fichier par défaut s'il existe,
    /// sinon valeurs par défaut. Les variables d'environnement ne sont pas appliquées ici.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Charge la configuration depuis un fichier JSON
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: BotConfig = serde_json::from_str(&content)?;
        info!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Charge un fichier `.env` dans l'environnement du processus, sans écraser les variables
    /// déjà définies. Sans chemin explicite, cherche `.env` dans le répertoire courant et ses
    /// parents; son absence n'est pas une erreur.
    pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        let loaded = match path {
            Some(path) => {
                dotenvy::from_path(path)?;
                path.to_path_buf()
            }
            None => match dotenvy::dotenv() {
                Ok(path) => path,
                Err(err) if err.not_found() => {
                    debug!("no .env file found");
                    return Ok(None);
                }
                Err(err) => {
                    warn!(error = %err, "failed to load .env file");
                    return Err(err.into());
                }
            },
        };
        info!(path = %loaded.display(), "loaded .env file");
        Ok(Some(loaded))
    }

    /// Applique les variables d'environnement du processus
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Surcharge les valeurs avec celles fournies par `lookup`; les valeurs vides sont ignorées
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(token) = get(ENV_MANGADEX_TOKEN) {
            self.mangadex.token = Some(token);
        }
        if let Some(token) = get(ENV_DISCORD_TOKEN) {
            self.discord.token = Some(token);
        }
        if let Some(channel_id) = get(ENV_CHANNEL_ID) {
            self.discord.channel_id = Some(channel_id);
        }
        if let Some(guild_id) = get(ENV_GUILD_ID) {
            self.discord.guild_id = Some(guild_id);
        }
        if let Some(application_id) = get(ENV_APPLICATION_ID) {
            self.discord.application_id = Some(application_id);
        }
        if let Some(cron) = get(ENV_SCHEDULE) {
            self.schedule.cron = cron;
        }
        if let Some(ids) = get(ENV_TRACKED_IDS) {
            self.mangadex.tracked_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(TrackedId::from)
                .collect();
        }
    }

    /// Vérifie les réglages nécessaires au démon
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.discord_token()?;
        self.channel_id()?;
        if self.tracked_ids().is_empty() {
            return Err(ConfigError::Missing("mangadex.tracked_ids"));
        }
        if self.mangadex.language.trim().is_empty() {
            return Err(ConfigError::Missing("mangadex.language"));
        }
        if self.mangadex.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                name: "mangadex.request_timeout_seconds",
                reason: "must be at least one second".to_owned(),
            });
        }
        self.daily_schedule()?;
        Ok(())
    }

    /// Identifiants suivis, dédoublonnés en conservant l'ordre
    pub fn tracked_ids(&self) -> Vec<TrackedId> {
        let mut unique = HashSet::new();
        self.mangadex
            .tracked_ids
            .iter()
            .filter(|id| unique.insert(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn discord_token(&self) -> Result<&str, ConfigError> {
        required(&self.discord.token, "discord.token")
    }

    pub fn channel_id(&self) -> Result<&str, ConfigError> {
        required(&self.discord.channel_id, "discord.channel_id")
    }

    pub fn guild_id(&self) -> Result<&str, ConfigError> {
        required(&self.discord.guild_id, "discord.guild_id")
    }

    pub fn application_id(&self) -> Result<&str, ConfigError> {
        required(&self.discord.application_id, "discord.application_id")
    }

    pub fn daily_schedule(&self) -> Result<DailySchedule, ConfigError> {
        DailySchedule::parse(&self.schedule.cron).map_err(|err| ConfigError::Invalid {
            name: "schedule.cron",
            reason: err.to_string(),
        })
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            api_url: self.mangadex.api_url.clone(),
            language: self.mangadex.language.clone(),
            token: self.mangadex.token.clone(),
            request_timeout: Duration::from_secs(self.mangadex.request_timeout_seconds),
        }
    }

    pub fn site_links(&self) -> SiteLinks {
        SiteLinks::new(self.mangadex.site_url.clone())
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}
