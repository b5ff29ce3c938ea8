use crate::error::{InkdeskError, Result};
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the managed backend, e.g. `https://abc.backend.example`.
    #[serde(default)]
    pub url: String,
    /// Environment variable holding the API key. The key itself is never
    /// written to disk.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "INKDESK_GATEWAY_KEY".to_string()
}

fn default_gateway_timeout() -> u64 {
    15
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_gateway_timeout(),
        }
    }
}

impl GatewayConfig {
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| InkdeskError::MissingEnv(self.api_key_env.clone()))
    }
}

// ---------------------------------------------------------------------------
// AssistantConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Remote function that answers `{messages}` with `{content}`.
    #[serde(default = "default_assistant_function")]
    pub function: String,
    #[serde(default = "default_assistant_timeout")]
    pub timeout_secs: u64,
}

fn default_assistant_function() -> String {
    "ai-chat".to_string()
}

fn default_assistant_timeout() -> u64 {
    30
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            function: default_assistant_function(),
            timeout_secs: default_assistant_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// EffectsConfig
// ---------------------------------------------------------------------------

/// Where each remote-backed action lands on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub clients_collection: String,
    pub bookings_collection: String,
    pub audit_collection: String,
    pub deposit_function: String,
    pub quote_function: String,
    pub reply_function: String,
    pub slots_function: String,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            clients_collection: "clients".to_string(),
            bookings_collection: "bookings".to_string(),
            audit_collection: "action_log".to_string(),
            deposit_function: "create-deposit-link".to_string(),
            quote_function: "generate-quote".to_string(),
            reply_function: "ai-generate-reply".to_string(),
            slots_function: "ai-suggest-slots".to_string(),
        }
    }
}

impl EffectsConfig {
    fn named(&self) -> [(&'static str, &str); 7] {
        [
            ("clients_collection", &self.clients_collection),
            ("bookings_collection", &self.bookings_collection),
            ("audit_collection", &self.audit_collection),
            ("deposit_function", &self.deposit_function),
            ("quote_function", &self.quote_function),
            ("reply_function", &self.reply_function),
            ("slots_function", &self.slots_function),
        ]
    }
}

// ---------------------------------------------------------------------------
// NoticeConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeConfig {
    #[serde(default = "default_history")]
    pub history: usize,
}

fn default_history() -> usize {
    50
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            history: default_history(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: u32,
    pub studio: StudioConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub notices: NoticeConfig,
}

impl Config {
    pub fn new(studio_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            studio: StudioConfig {
                name: studio_name.into(),
            },
            gateway: GatewayConfig::default(),
            assistant: AssistantConfig::default(),
            effects: EffectsConfig::default(),
            notices: NoticeConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(InkdeskError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    /// Write atomically: a crash mid-save leaves the old file intact.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let dir = paths::inkdesk_dir(root);
        std::fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(serde_yaml::to_string(self)?.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message })
        };

        let url = self.gateway.url.trim();
        if url.is_empty() {
            push(
                WarnLevel::Warning,
                "gateway.url is empty; only --offline mode will work".to_string(),
            );
        } else if !(url.starts_with("https://") || url.starts_with("http://")) {
            push(
                WarnLevel::Error,
                format!("gateway.url '{url}' must start with http:// or https://"),
            );
        }

        if self.gateway.timeout_secs == 0 {
            push(WarnLevel::Error, "gateway.timeout_secs must be > 0".to_string());
        }
        if self.assistant.timeout_secs == 0 {
            push(WarnLevel::Error, "assistant.timeout_secs must be > 0".to_string());
        }
        if !is_resource_name(&self.assistant.function) {
            push(
                WarnLevel::Error,
                format!(
                    "assistant.function '{}' is not a valid function name",
                    self.assistant.function
                ),
            );
        }

        for (key, value) in self.effects.named() {
            if !is_resource_name(value) {
                push(
                    WarnLevel::Error,
                    format!("effects.{key} '{value}' is not a valid name"),
                );
            }
        }

        if self.notices.history == 0 {
            push(
                WarnLevel::Warning,
                "notices.history is 0; one notice will still be kept".to_string(),
            );
        }

        warnings
    }
}

/// Collection and function names: lowercase, digits, `-` and `_`.
fn is_resource_name(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid regex"))
        .is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("Black Lotus Tattoo");
        cfg.gateway.url = "https://lotus.backend.example".to_string();
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.studio.name, "Black Lotus Tattoo");
        assert_eq!(loaded.gateway.url, "https://lotus.backend.example");
        assert_eq!(loaded.effects, EffectsConfig::default());
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(InkdeskError::NotInitialized)
        ));
    }

    #[test]
    fn minimal_yaml_gets_defaults() {
        let cfg: Config = serde_yaml::from_str("version: 1\nstudio:\n  name: x\n").unwrap();
        assert_eq!(cfg.assistant.function, "ai-chat");
        assert_eq!(cfg.gateway.api_key_env, "INKDESK_GATEWAY_KEY");
        assert_eq!(cfg.effects.bookings_collection, "bookings");
        assert_eq!(cfg.notices.history, 50);
    }

    #[test]
    fn partial_effects_keep_other_defaults() {
        let cfg: Config = serde_yaml::from_str(
            "version: 1\nstudio:\n  name: x\neffects:\n  deposit_function: stripe-link\n",
        )
        .unwrap();
        assert_eq!(cfg.effects.deposit_function, "stripe-link");
        assert_eq!(cfg.effects.quote_function, "generate-quote");
    }

    #[test]
    fn validate_default_warns_only_about_url() {
        let warnings = Config::new("x").validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(warnings[0].message.contains("gateway.url"));
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::new("x");
        cfg.gateway.url = "ftp://nope".to_string();
        cfg.gateway.timeout_secs = 0;
        cfg.effects.quote_function = "Generate Quote".to_string();
        let warnings = cfg.validate();
        let errors: Vec<&str> = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message.as_str())
            .collect();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|m| m.contains("effects.quote_function")));
    }

    #[test]
    fn api_key_missing_env_is_an_error() {
        let mut cfg = Config::new("x");
        cfg.gateway.api_key_env = "INKDESK_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(matches!(
            cfg.gateway.api_key(),
            Err(InkdeskError::MissingEnv(_))
        ));
    }
}
