use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub ui: UiConfig,
    pub render: RenderConfig,
    pub produce: ProduceConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub page_size: u32,
    pub max_size: u32,
    pub start_route: String,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub allowed_content_types: Vec<String>,
    pub message_id_regex: Regex,
}

#[derive(Debug, Clone)]
pub struct ProduceConfig {
    pub topic: String,
    pub client: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    server: RawServerConfig,
    #[serde(default)]
    ui: RawUiConfig,
    #[serde(default)]
    render: RawRenderConfig,
    #[serde(default)]
    produce: RawProduceConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServerConfig {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

impl Default for RawServerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUiConfig {
    #[serde(default = "default_page_size")]
    page_size: u32,
    #[serde(default = "default_max_size")]
    max_size: u32,
    #[serde(default = "default_start_route")]
    start_route: String,
}

impl Default for RawUiConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_size: default_max_size(),
            start_route: default_start_route(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRenderConfig {
    #[serde(default = "default_allowed_content_types")]
    allowed_content_types: Vec<String>,
    #[serde(default = "default_message_id_regex")]
    message_id_regex: String,
}

impl Default for RawRenderConfig {
    fn default() -> Self {
        Self {
            allowed_content_types: default_allowed_content_types(),
            message_id_regex: default_message_id_regex(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProduceConfig {
    #[serde(default = "default_topic")]
    topic: String,
    #[serde(default = "default_client")]
    client: String,
}

impl Default for RawProduceConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            client: default_client(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

fn default_max_size() -> u32 {
    10
}

fn default_start_route() -> String {
    "/home".to_string()
}

fn default_allowed_content_types() -> Vec<String> {
    vec!["text/html".to_string(), "text/plain".to_string()]
}

fn default_message_id_regex() -> String {
    "^[A-Za-z0-9._@+-]+$".to_string()
}

fn default_topic() -> String {
    "friends".to_string()
}

fn default_client() -> String {
    "mailpage".to_string()
}

impl Config {
    /// Load the config file, optionally overriding the server URL. A missing
    /// file is fine when the URL comes from the command line.
    pub fn load<P: AsRef<Path>>(path: P, base_url: Option<&str>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && base_url.is_some() => {
                log::info!("No config at {}, using defaults", path.display());
                String::new()
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Self::parse_with_override(&contents, base_url)
    }

    #[cfg(test)]
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Self::parse_with_override(contents, None)
    }

    fn parse_with_override(contents: &str, base_url: Option<&str>) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let base_url = base_url
            .map(str::to_string)
            .or(raw.server.base_url)
            .ok_or_else(|| ConfigError::Parse("missing base_url in [server]".to_string()))?;
        let base_url = parse_base_url(&base_url)?;

        if raw.ui.page_size == 0 {
            return Err(ConfigError::Parse(
                "page_size must be greater than 0 in [ui]".to_string(),
            ));
        }
        if raw.ui.max_size == 0 {
            return Err(ConfigError::Parse(
                "max_size must be greater than 0 in [ui]".to_string(),
            ));
        }
        if !raw.ui.start_route.starts_with('/') {
            return Err(ConfigError::Parse(format!(
                "start_route '{}' must start with '/'",
                raw.ui.start_route
            )));
        }

        let message_id_regex = Regex::new(&raw.render.message_id_regex).map_err(|e| {
            ConfigError::Parse(format!(
                "invalid regex '{}' for message_id_regex: {}",
                raw.render.message_id_regex, e
            ))
        })?;
        if raw.render.allowed_content_types.is_empty() {
            return Err(ConfigError::Parse(
                "allowed_content_types must not be empty in [render]".to_string(),
            ));
        }

        if raw.produce.topic.trim().is_empty() {
            return Err(ConfigError::Parse(
                "topic must not be empty in [produce]".to_string(),
            ));
        }

        Ok(Config {
            server: ServerConfig {
                base_url,
                timeout: Duration::from_secs(raw.server.timeout_secs),
            },
            ui: UiConfig {
                page_size: raw.ui.page_size,
                max_size: raw.ui.max_size,
                start_route: raw.ui.start_route,
            },
            render: RenderConfig {
                allowed_content_types: raw.render.allowed_content_types,
                message_id_regex,
            },
            produce: ProduceConfig {
                topic: raw.produce.topic,
                client: raw.produce.client,
            },
        })
    }
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Parse(format!("invalid base_url '{}': {}", value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Parse(format!(
            "base_url must use http or https, got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_config(extra: &str) -> String {
        format!(
            r#"
{extra}
[server]
base_url = "http://localhost:8080"
"#
        )
    }

    #[test]
    fn test_parse_minimal_config_defaults() {
        let config = Config::parse(&server_config("")).unwrap();
        assert_eq!(config.server.base_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.server.timeout, Duration::from_secs(30));
        assert_eq!(config.ui.page_size, 100);
        assert_eq!(config.ui.max_size, 10);
        assert_eq!(config.ui.start_route, "/home");
        assert_eq!(
            config.render.allowed_content_types,
            vec!["text/html", "text/plain"]
        );
        assert_eq!(config.produce.topic, "friends");
        assert_eq!(config.produce.client, "mailpage");
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
[server]
base_url = "https://mail.example.com/app/"
timeout_secs = 5

[ui]
page_size = 25
max_size = 5
start_route = "/dashboard"

[render]
allowed_content_types = ["text/plain"]
message_id_regex = "^[0-9]+$"

[produce]
topic = "emails"
client = "tester"
"#,
        )
        .unwrap();

        assert_eq!(config.server.base_url.path(), "/app/");
        assert_eq!(config.server.timeout, Duration::from_secs(5));
        assert_eq!(config.ui.page_size, 25);
        assert_eq!(config.ui.start_route, "/dashboard");
        assert!(config.render.message_id_regex.is_match("123"));
        assert!(!config.render.message_id_regex.is_match("abc"));
        assert_eq!(config.produce.topic, "emails");
    }

    #[test]
    fn test_missing_base_url() {
        let err = Config::parse("[ui]\npage_size = 10\n").unwrap_err();
        match err {
            ConfigError::Parse(msg) => assert!(msg.contains("missing base_url"), "got: {}", msg),
            _ => panic!("expected parse error"),
        }
    }

    #[test]
    fn test_base_url_override() {
        let config =
            Config::parse_with_override(&server_config(""), Some("http://127.0.0.1:9000")).unwrap();
        assert_eq!(config.server.base_url.port(), Some(9000));
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let err = Config::parse("[server]\nbase_url = \"ftp://example.com\"\n").unwrap_err();
        match err {
            ConfigError::Parse(msg) => assert!(msg.contains("http or https"), "got: {}", msg),
            _ => panic!("expected parse error"),
        }
    }

    #[test]
    fn test_unknown_section_or_key_errors() {
        let err = Config::parse(&server_config("[bogus]\nfoo = \"bar\"")).unwrap_err();
        match err {
            ConfigError::Parse(msg) => assert!(msg.contains("unknown field"), "got: {}", msg),
            _ => panic!("expected parse error"),
        }
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = Config::parse(&server_config("[ui]\npage_size = 0")).unwrap_err();
        match err {
            ConfigError::Parse(msg) => assert!(msg.contains("page_size"), "got: {}", msg),
            _ => panic!("expected parse error"),
        }
    }

    #[test]
    fn test_invalid_regex_validation() {
        let err =
            Config::parse(&server_config("[render]\nmessage_id_regex = \"(\"")).unwrap_err();
        match err {
            ConfigError::Parse(msg) => {
                assert!(msg.contains("invalid regex"), "got: {}", msg);
                assert!(msg.contains("message_id_regex"), "got: {}", msg);
            }
            _ => panic!("expected parse error"),
        }
    }

    #[test]
    fn test_load_missing_file_with_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load(&path, Some("http://localhost:1234")).unwrap();
        assert_eq!(config.server.base_url.port(), Some(1234));

        let err = Config::load(&path, None).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, server_config("[ui]\npage_size = 7")).unwrap();
        let config = Config::load(&path, None).unwrap();
        assert_eq!(config.ui.page_size, 7);
    }
}
