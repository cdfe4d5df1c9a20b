use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("feed request failed with status {status}")]
    Status { status: reqwest::StatusCode },
    #[error("feed decoding error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid feed url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum AnnounceError {
    #[error("channel {0} not found")]
    ChannelNotFound(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("discord api error {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid setting `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression `{expression}`: {reason}")]
    InvalidCron { expression: String, reason: String },
    #[error("schedule `{0}` has no upcoming firing")]
    Exhausted(String),
    #[error("scheduler task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
