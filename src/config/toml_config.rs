use crate::core::registry::RegistryConfig;
use crate::core::server::ServerConfig;
use crate::core::ssl::{HttpVersion, SslConfig};
use crate::utils::error::{RestError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// `restlink.toml` 的完整結構
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub server: ServerSection,
    pub registry: Option<RegistryConfig>,
    pub ssl: Option<SslSection>,
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub namespaces: Option<Vec<String>>,
    pub health_probe: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslSection {
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// PEM bundle; `$HOME/keystore` when omitted.
    pub keystore: Option<String>,
    pub confidential_port: Option<u16>,
    pub scheme: Option<String>,
    pub idle_timeout_ms: Option<u64>,
    pub http_version: Option<HttpVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `compact` (預設) 或 `json`
    pub format: Option<String>,
}

fn enabled() -> bool {
    true
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RestError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| RestError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HOME})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(host) = &self.server.host {
            validation::validate_non_empty_string("server.host", host)?;
        }

        let namespaces = validation::validate_required_field("server.namespaces", &self.server.namespaces)?;
        if namespaces.is_empty() {
            return Err(RestError::InvalidConfigValueError {
                field: "server.namespaces".to_string(),
                value: "[]".to_string(),
                reason: "At least one namespace is required".to_string(),
            });
        }
        for namespace in namespaces {
            validation::validate_non_empty_string("server.namespaces", namespace)?;
        }

        if let Some(probe) = &self.server.health_probe {
            validation::validate_non_empty_string("server.health_probe", probe)?;
        }

        if let Some(ssl) = self.ssl.as_ref().filter(|ssl| ssl.enabled) {
            if let Some(keystore) = &ssl.keystore {
                validation::validate_path("ssl.keystore", keystore)?;
            }
            if let Some(port) = ssl.confidential_port {
                validation::validate_range("ssl.confidential_port", port, 1, u16::MAX)?;
            }
            if let Some(idle) = ssl.idle_timeout_ms {
                validation::validate_range("ssl.idle_timeout_ms", idle, 1, u64::MAX)?;
            }
            if let Some(scheme) = &ssl.scheme {
                validation::validate_non_empty_string("ssl.scheme", scheme)?;
            }
        }

        if let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_deref()) {
            if !matches!(format, "compact" | "json") {
                return Err(RestError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }

    /// 轉成伺服器設定
    pub fn server_config(&self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: self.server.host.clone().unwrap_or(defaults.host),
            port: self.server.port.unwrap_or(defaults.port),
            namespaces: self.server.namespaces.clone().unwrap_or_default(),
            health_probe: self
                .server
                .health_probe
                .clone()
                .unwrap_or(defaults.health_probe),
            registry: self.registry.clone().unwrap_or_default(),
        }
    }

    /// `None` 代表未啟用 SSL
    pub fn ssl_config(&self) -> Option<SslConfig> {
        let ssl = self.ssl.as_ref().filter(|ssl| ssl.enabled)?;

        let keystore = ssl
            .keystore
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(SslConfig::default_keystore);
        let mut config = SslConfig::new(keystore);
        if let Some(port) = ssl.confidential_port {
            config = config.confidential_port(port);
        }
        if let Some(scheme) = &ssl.scheme {
            config = config.scheme(scheme.clone());
        }
        if let Some(idle) = ssl.idle_timeout_ms {
            config = config.idle_timeout(Duration::from_millis(idle));
        }
        if let Some(version) = ssl.http_version {
            config = config.http_version(version);
        }
        Some(config)
    }

    pub fn json_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .is_some_and(|format| format == "json")
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
