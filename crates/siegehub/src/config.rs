//! Engine configuration.
//!
//! All tunables live in one serde struct with documented defaults. The file
//! form is JSON; a missing or unreadable file is replaced with the defaults,
//! the same load-or-create behavior the hub has always had.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tunable knobs for the matchmaking engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Format vote window, seconds.
    pub format_vote_secs: u64,
    /// Winner vote window, seconds.
    pub winner_vote_secs: u64,
    /// Cooldown applied to every participant when a match opens, seconds.
    pub match_cooldown_secs: i64,
    /// Flat currency bonus for each winning-side member.
    pub win_currency_bonus: u32,
    /// Flat currency credited by the daily claim.
    pub daily_claim_amount: u32,
    /// Name of the implicit first-side team bucket.
    pub team_one_name: String,
    /// Name of the implicit second-side team bucket.
    pub team_two_name: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            format_vote_secs: 30,
            winner_vote_secs: 60,
            match_cooldown_secs: 300,
            win_currency_bonus: 250,
            daily_claim_amount: 100,
            team_one_name: "Team 1".to_string(),
            team_two_name: "Team 2".to_string(),
        }
    }
}

/// Errors from reading or writing the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl HubConfig {
    /// Load the config file, writing defaults when it is missing, empty, or
    /// unparsable. Never fails on bad content, only on I/O.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            if !content.trim().is_empty() {
                match serde_json::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "invalid config, rewriting defaults");
                    }
                }
            }
        }
        let config = Self::default();
        fs::write(path, serde_json::to_string_pretty(&config)?)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("siegehub-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn defaults() {
        let config = HubConfig::default();
        assert_eq!(config.format_vote_secs, 30);
        assert_eq!(config.match_cooldown_secs, 300);
        assert_eq!(config.win_currency_bonus, 250);
        assert_eq!(config.team_one_name, "Team 1");
    }

    #[test]
    fn load_or_create_writes_defaults() {
        let path = temp_path("create");
        let _ = fs::remove_file(&path);

        let config = HubConfig::load_or_create(&path).unwrap();
        assert_eq!(config.winner_vote_secs, 60);
        assert!(path.exists());

        // Second load reads the written file.
        let again = HubConfig::load_or_create(&path).unwrap();
        assert_eq!(again.winner_vote_secs, config.winner_vote_secs);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invalid_file_is_replaced_with_defaults() {
        let path = temp_path("invalid");
        fs::write(&path, "{ not json").unwrap();

        let config = HubConfig::load_or_create(&path).unwrap();
        assert_eq!(config.daily_claim_amount, 100);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{"format_vote_secs": 5}"#).unwrap();

        let config = HubConfig::load_or_create(&path).unwrap();
        assert_eq!(config.format_vote_secs, 5);
        assert_eq!(config.winner_vote_secs, 60);
        let _ = fs::remove_file(&path);
    }
}
