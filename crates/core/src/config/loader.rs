use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("NEWSREEL_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmProvider, SpeechBackend};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[llm]
provider = "qwen"
model = "qwen-max"
api_key = "sk-test"

[news]
url = "https://example.com/hot"

[speech]
backend = "dash_scope"

[speech.dash_scope]
api_key = "ds-test"

[imagery]
api_key = "ds-test"

[publisher]
command = "upload-bulletin"
"#;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Qwen);
        assert_eq!(config.speech.backend, SpeechBackend::DashScope);
        assert_eq!(config.subtitle.wrap_width, 12);
        assert_eq!(config.data.root.to_str().unwrap(), "daily");
        assert_eq!(config.retry.generation.max_attempts, 6);
    }

    #[test]
    fn test_defaults_can_be_overridden() {
        let toml = format!(
            "{}\n[subtitle]\nwrap_width = 16\n\n[retry.upload]\nmax_attempts = 1\ndelay_ms = 100\n",
            MINIMAL
        );
        let config = load_config_from_str(&toml).unwrap();
        assert_eq!(config.subtitle.wrap_width, 16);
        assert_eq!(config.retry.upload.max_attempts, 1);
        // Untouched sections keep their defaults.
        assert_eq!(config.retry.scrape.max_attempts, 3);
    }

    #[test]
    fn test_missing_required_section_fails() {
        let result = load_config_from_str("[news]\nurl = \"https://example.com\"\n");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", MINIMAL).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.llm.model, "qwen-max");
        assert_eq!(config.publisher.command, "upload-bulletin");
    }

    #[test]
    fn test_sanitized_config_carries_no_secrets() {
        let config = load_config_from_str(MINIMAL).unwrap();
        let json = serde_json::to_string(&config.sanitized()).unwrap();
        assert!(!json.contains("sk-test"));
        assert!(!json.contains("ds-test"));
    }
}
