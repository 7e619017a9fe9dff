use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::exam::timer::SkillBudgets;

const MIN_SKILL_MINUTES: u32 = 1;
const MAX_SKILL_MINUTES: u32 = 240;
const MIN_TICK_MILLIS: u64 = 50;
const MAX_TICK_MILLIS: u64 = 5000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_candidate_name")]
    pub candidate_name: String,
    #[serde(default = "default_listening_minutes")]
    pub listening_minutes: u32,
    #[serde(default = "default_reading_minutes")]
    pub reading_minutes: u32,
    #[serde(default = "default_writing_minutes")]
    pub writing_minutes: u32,
    #[serde(default = "default_speaking_minutes")]
    pub speaking_minutes: u32,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub catalog_path: Option<String>,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Wall-clock length of one exam second. Lower it to rehearse quickly.
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

fn default_candidate_name() -> String {
    "candidate".to_string()
}
fn default_listening_minutes() -> u32 {
    45
}
fn default_reading_minutes() -> u32 {
    60
}
fn default_writing_minutes() -> u32 {
    60
}
fn default_speaking_minutes() -> u32 {
    12
}
fn default_theme() -> String {
    "exam-hall".to_string()
}
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("examroom")
}
fn default_results_dir() -> String {
    default_data_dir()
        .join("submissions")
        .to_string_lossy()
        .to_string()
}
fn default_log_file() -> String {
    default_data_dir()
        .join("examroom.log")
        .to_string_lossy()
        .to_string()
}
fn default_tick_millis() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            candidate_name: default_candidate_name(),
            listening_minutes: default_listening_minutes(),
            reading_minutes: default_reading_minutes(),
            writing_minutes: default_writing_minutes(),
            speaking_minutes: default_speaking_minutes(),
            theme: default_theme(),
            catalog_path: None,
            results_dir: default_results_dir(),
            log_file: default_log_file(),
            tick_millis: default_tick_millis(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examroom")
            .join("config.toml")
    }

    /// Clamp numeric fields into usable ranges. Call after deserialization
    /// and after applying command-line overrides.
    pub fn validate(&mut self) {
        for minutes in [
            &mut self.listening_minutes,
            &mut self.reading_minutes,
            &mut self.writing_minutes,
            &mut self.speaking_minutes,
        ] {
            *minutes = (*minutes).clamp(MIN_SKILL_MINUTES, MAX_SKILL_MINUTES);
        }
        self.tick_millis = self.tick_millis.clamp(MIN_TICK_MILLIS, MAX_TICK_MILLIS);
        if self.candidate_name.trim().is_empty() {
            self.candidate_name = default_candidate_name();
        }
    }

    pub fn skill_budgets(&self) -> SkillBudgets {
        SkillBudgets::from_minutes(
            self.listening_minutes,
            self.reading_minutes,
            self.writing_minutes,
            self.speaking_minutes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::skill::Skill;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.listening_minutes, 45);
        assert_eq!(config.reading_minutes, 60);
        assert_eq!(config.writing_minutes, 60);
        assert_eq!(config.speaking_minutes, 12);
        assert_eq!(config.tick_millis, 1000);
        assert!(config.catalog_path.is_none());
        assert!(config.results_dir.contains("submissions"));
        assert!(config.log_file.ends_with("examroom.log"));
    }

    #[test]
    fn test_config_partial_file_keeps_other_defaults() {
        let toml_str = r#"
candidate_name = "Tran Thi B"
speaking_minutes = 15
theme = "paper"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.candidate_name, "Tran Thi B");
        assert_eq!(config.speaking_minutes, 15);
        assert_eq!(config.theme, "paper");
        assert_eq!(config.listening_minutes, 45);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.catalog_path = Some("/tmp/mock.json".to_string());
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.catalog_path, deserialized.catalog_path);
        assert_eq!(config.results_dir, deserialized.results_dir);
        assert_eq!(config.tick_millis, deserialized.tick_millis);
    }

    #[test]
    fn test_config_validate_clamps_values() {
        let mut config = Config::default();
        config.listening_minutes = 0;
        config.writing_minutes = 1000;
        config.tick_millis = 1;
        config.candidate_name = "   ".to_string();
        config.validate();

        assert_eq!(config.listening_minutes, 1);
        assert_eq!(config.writing_minutes, 240);
        assert_eq!(config.tick_millis, 50);
        assert_eq!(config.candidate_name, "candidate");
    }

    #[test]
    fn test_skill_budgets_are_in_seconds() {
        let budgets = Config::default().skill_budgets();
        assert_eq!(budgets.budget(Skill::Listening), 45 * 60);
        assert_eq!(budgets.budget(Skill::Speaking), 12 * 60);
    }
}
