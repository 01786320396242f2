//! agentfm configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compression::BackendId;
use crate::orchestrator::OrchestratorConfig;

/// Goal handed to the planner when none is given on the command line
pub const DEFAULT_GOAL: &str = "Scan the input folder and move every file into a folder named after its file type \
     inside the output folder. Only create folders that do not exist yet. \
     Then compress each moved file that has a known type, inside its type folder.";

/// Main agentfm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Planner LLM configuration
    pub llm: LlmConfig,

    /// Input/output roots
    pub paths: PathsConfig,

    /// Recognized file type tags (upper-case extensions)
    #[serde(rename = "file-types")]
    pub file_types: Vec<String>,

    /// Per-type compression backend selection
    pub compression: CompressionConfig,

    /// Orchestration loop limits
    pub orchestrator: OrchestratorConfig,

    /// Default high-level goal for a run
    pub goal: String,

    /// Log level (overridden by --log-level)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            paths: PathsConfig::default(),
            file_types: vec!["PDF".to_string(), "PNG".to_string(), "JPG".to_string()],
            compression: CompressionConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            goal: DEFAULT_GOAL.to_string(),
            log_level: None,
        }
    }
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.file_types.is_empty() {
            return Err(eyre::eyre!("file-types must list at least one type"));
        }
        if let Some(bad) = self
            .file_types
            .iter()
            .find(|t| t.is_empty() || !t.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(eyre::eyre!("Invalid file type tag '{}': use letters and digits only", bad));
        }
        if self.paths.input == self.paths.output {
            return Err(eyre::eyre!(
                "Input and output folders must differ (both are {})",
                self.paths.input.display()
            ));
        }
        if self.orchestrator.max_iterations == 0 {
            return Err(eyre::eyre!("orchestrator.max-iterations must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .agentfm.yml
        let local_config = PathBuf::from(".agentfm.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/agentfm/agentfm.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("agentfm").join("agentfm.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Planner LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "gemini", "anthropic" or "openai"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// File containing the API key (takes precedence over the env var)
    #[serde(rename = "api-key-file")]
    pub api_key_file: Option<PathBuf>,

    /// API base URL (provider default when unset)
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key_file: None,
            base_url: None,
            max_tokens: 2048,
            temperature: 0.2,
            timeout_ms: 60_000,
        }
    }
}

impl LlmConfig {
    /// Base URL, falling back to the provider's public endpoint
    pub fn resolved_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider.as_str() {
            "anthropic" => "https://api.anthropic.com".to_string(),
            "openai" => "https://api.openai.com".to_string(),
            _ => "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    /// Read the API key from the key file or the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        if let Some(path) = &self.api_key_file {
            let key = fs::read_to_string(path)
                .context(format!("Failed to read API key file {}", path.display()))?
                .trim()
                .to_string();
            if key.is_empty() {
                return Err(eyre::eyre!("API key file {} is empty", path.display()));
            }
            return Ok(key);
        }

        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.api_key_env
            )),
        }
    }
}

/// Input and output roots
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Folder new files are dropped into
    pub input: PathBuf,

    /// Folder that receives one sub-folder per file type
    pub output: PathBuf,

    /// Optional directory with `.pmt` prompt overrides
    pub prompts: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/input_folder"),
            output: PathBuf::from("data/output_folder"),
            prompts: None,
        }
    }
}

/// Compression backend selection and remote service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// File type tag -> backend
    pub rules: BTreeMap<String, BackendId>,

    /// TinyPNG image service
    pub tinypng: ServiceConfig,

    /// ConvertAPI document service
    pub convertapi: ServiceConfig,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert("PDF".to_string(), BackendId::SpecializedDocument);
        rules.insert("PNG".to_string(), BackendId::SpecializedImage);
        rules.insert("JPG".to_string(), BackendId::SpecializedImage);

        Self {
            rules,
            tinypng: ServiceConfig {
                url: "https://api.tinify.com/shrink".to_string(),
                api_key_env: "TINYPNG_API_KEY".to_string(),
                timeout_ms: 120_000,
            },
            convertapi: ServiceConfig {
                url: "https://v2.convertapi.com/convert/pdf/to/compress".to_string(),
                api_key_env: "CONVERTAPI_API_KEY".to_string(),
                timeout_ms: 120_000,
            },
        }
    }
}

/// Remote compression service endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Endpoint URL
    pub url: String,

    /// Environment variable holding the service credential
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl ServiceConfig {
    /// Credential from the environment, if set
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.file_types, vec!["PDF", "PNG", "JPG"]);
        assert_eq!(config.compression.rules.get("PDF"), Some(&BackendId::SpecializedDocument));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolved_base_url_per_provider() {
        let mut llm = LlmConfig {
            provider: "anthropic".to_string(),
            ..Default::default()
        };
        assert_eq!(llm.resolved_base_url(), "https://api.anthropic.com");

        llm.provider = "openai".to_string();
        assert_eq!(llm.resolved_base_url(), "https://api.openai.com");

        llm.base_url = Some("http://localhost:8080/".to_string());
        assert_eq!(llm.resolved_base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_api_key_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let key_path = temp.path().join("key");
        fs::write(&key_path, "  secret-key\n").unwrap();

        let llm = LlmConfig {
            api_key_file: Some(key_path),
            ..Default::default()
        };
        assert_eq!(llm.get_api_key().unwrap(), "secret-key");
    }

    #[test]
    fn test_missing_api_key_names_env_var() {
        let llm = LlmConfig {
            api_key_env: "AGENTFM_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        let err = llm.get_api_key().unwrap_err();
        assert!(err.to_string().contains("AGENTFM_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  provider: anthropic
  model: claude-sonnet-4
  api-key-env: MY_API_KEY
  max-tokens: 4096

paths:
  input: /data/in
  output: /data/out

file-types: [PDF, JPG, PNG, TXT]

compression:
  rules:
    PDF: convertapi
    JPG: specialized-image
    TXT: zip

orchestrator:
  max-iterations: 20
  oracle-retries: 5
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "claude-sonnet-4");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.paths.input, PathBuf::from("/data/in"));
        assert_eq!(config.file_types.len(), 4);
        assert_eq!(config.compression.rules.get("PDF"), Some(&BackendId::SpecializedDocument));
        assert_eq!(config.compression.rules.get("TXT"), Some(&BackendId::GenericArchive));
        assert_eq!(config.orchestrator.max_iterations, 20);
        assert_eq!(config.orchestrator.oracle_retries, 5);
        // Untouched sections keep their defaults
        assert_eq!(config.compression.tinypng.api_key_env, "TINYPNG_API_KEY");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  model: gemini-1.5-pro
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.orchestrator.max_iterations, OrchestratorConfig::default().max_iterations);
        assert_eq!(config.goal, DEFAULT_GOAL);
    }

    #[test]
    fn test_validate_rejects_same_roots() {
        let mut config = Config::default();
        config.paths.output = config.paths.input.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_type_tag() {
        let config = Config {
            file_types: vec!["PDF".to_string(), "../X".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            file_types: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
