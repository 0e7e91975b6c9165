use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path (YAML, TOML or JSON)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Interface to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Public base URL advertised in generated OpenAPI documents
    #[arg(long)]
    pub public_url: Option<String>,

    /// Request timeout in seconds (0 disables it)
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub public_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LimitsConfig {
    pub body_limit_bytes: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                public_url: None,
            },
            limits: LimitsConfig {
                body_limit_bytes: 10 * 1024 * 1024,
                request_timeout_secs: 30,
            },
            log: LogConfig {
                format: LogFormat::Text,
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layered load: defaults → config file → `TOOLSET_*` env → CLI flags.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        let defaults = Self::default();

        // 1. Defaults
        let mut builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port)?
            .set_default("limits.body_limit_bytes", defaults.limits.body_limit_bytes as u64)?
            .set_default("limits.request_timeout_secs", defaults.limits.request_timeout_secs)?
            .set_default("log.format", "text")?;

        // 2. Config file: explicit path must exist, ./toolset.* is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("toolset").required(false)),
        };

        // 3. Environment variables, e.g. TOOLSET_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("TOOLSET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (and the plain env vars clap maps onto them)
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(url) = cli.public_url {
            builder = builder.set_override("server.public_url", url)?;
        }
        if let Some(secs) = cli.request_timeout_secs {
            builder = builder.set_override("limits.request_timeout_secs", secs)?;
        }

        let mut cfg: Self = builder.build()?.try_deserialize()?;

        // Fallbacks apply only when neither file, env nor CLI set the URL
        if cfg.server.public_url.is_none() {
            cfg.server.public_url = non_empty_env("TOOL_URL");
        }
        if cfg.server.public_url.is_none() {
            cfg.server.public_url =
                non_empty_env("RAILWAY_PUBLIC_DOMAIN").map(|domain| format!("https://{domain}"));
        }
        Ok(cfg)
    }

    /// Base URL for the `servers` entry of generated OpenAPI documents.
    pub fn public_url(&self) -> String {
        self.server
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
