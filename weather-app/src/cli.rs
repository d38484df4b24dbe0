use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode};
use tracing::info;
use weather_core::{
    Config, ProviderId, RecordService, RecordStore, SystemClock, WeatherProvider,
    cache::WeatherCache,
    geocode::Geocoder,
    provider::{provider_from_config, provider_with_key},
    resolver::WeatherResolver,
};

use crate::{api, output, state::AppState};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather lookups with saved, exportable records")]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Provider to use instead of the configured default, e.g. "weatherapi".
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// API key to use instead of the one in the configuration file.
    #[arg(long, global = true, env = "WEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Show current weather and the forecast for a location.
    Lookup {
        /// City, postal code, "lat,lon" or landmark.
        query: String,
    },

    /// Run the HTTP API.
    Serve {
        /// Bind address (overrides config).
        #[arg(long)]
        bind: Option<String>,

        /// Record file (overrides config).
        #[arg(long)]
        data_file: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        match &self.command {
            Command::Configure { provider } => self.configure(&mut config, provider),
            Command::Lookup { query } => {
                let provider = self.provider(&config)?;
                lookup(provider, &config, query).await
            }
            Command::Serve { bind, data_file } => {
                if let Some(bind) = bind {
                    config.server.bind = bind.clone();
                }
                if let Some(path) = data_file {
                    config.storage.data_file = Some(path.clone());
                }
                let provider = self.provider(&config)?;
                serve(provider, &config).await
            }
        }
    }

    /// Provider named on the command line or configured as default, keyed by
    /// `--api-key` when given and by the config file otherwise.
    fn provider(&self, config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
        let id = match &self.provider {
            Some(name) => ProviderId::try_from(name.as_str())?,
            None if config.default_provider.is_none() && self.api_key.is_some() => {
                ProviderId::WeatherApi
            }
            None => config.default_provider_id()?,
        };

        match &self.api_key {
            Some(key) => Ok(provider_with_key(id, key.clone())),
            None => provider_from_config(id, config),
        }
    }

    fn configure(&self, config: &mut Config, provider: &str) -> anyhow::Result<()> {
        let id = ProviderId::try_from(provider)?;

        let api_key = Password::new(&format!("API key for {id}:"))
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()?;
        let api_key = api_key.trim();
        if api_key.is_empty() {
            bail!("API key must not be empty");
        }

        config.upsert_provider_api_key(id, api_key.to_string());

        if config.default_provider_id().ok() != Some(id) {
            let make_default = Confirm::new(&format!("Make {id} the default provider?"))
                .with_default(true)
                .prompt()?;
            if make_default {
                config.set_default_provider(id);
            }
        }

        let path = match &self.config {
            Some(path) => path.clone(),
            None => Config::config_file_path()?,
        };
        config.save_to(&path)?;

        println!("Saved {id} credentials to {}", path.display());
        Ok(())
    }
}

async fn lookup(
    provider: Arc<dyn WeatherProvider>,
    config: &Config,
    query: &str,
) -> anyhow::Result<()> {
    let cache = Arc::new(WeatherCache::new(config.cache_ttl(), Arc::new(SystemClock)));
    let geocoder = Geocoder::new(provider.clone());
    let resolver = WeatherResolver::new(provider, cache);

    let location = geocoder.resolve(query).await?;
    let payload = resolver.fetch(location.lat, location.lon).await?;

    print!("{}", output::render_lookup(&location, &payload));
    Ok(())
}

async fn serve(provider: Arc<dyn WeatherProvider>, config: &Config) -> anyhow::Result<()> {
    let data_file = config.data_file_path()?;
    info!("Storing records in {}", data_file.display());

    let service = RecordService::with_provider(
        provider,
        RecordStore::new(data_file),
        config.cache_ttl(),
        Arc::new(SystemClock),
    );
    let app = api::app(AppState::new(service));

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn serve_overrides_parse() {
        let cli = parse(&["weather", "serve", "--bind", "0.0.0.0:8080", "--data-file", "/tmp/r.json"]);
        match cli.command {
            Command::Serve { bind, data_file } => {
                assert_eq!(bind.as_deref(), Some("0.0.0.0:8080"));
                assert_eq!(data_file, Some(PathBuf::from("/tmp/r.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = parse(&["weather", "lookup", "Paris", "--provider", "openweather", "--api-key", "K"]);
        assert_eq!(cli.provider.as_deref(), Some("openweather"));
        assert_eq!(cli.api_key.as_deref(), Some("K"));
        assert!(matches!(cli.command, Command::Lookup { ref query } if query == "Paris"));
    }

    #[test]
    fn explicit_key_without_config_defaults_to_weatherapi() {
        let cli = parse(&["weather", "--api-key", "K", "lookup", "Paris"]);
        assert!(cli.provider(&Config::default()).is_ok());
    }

    #[test]
    fn missing_provider_configuration_is_reported() {
        let cli = Cli {
            config: None,
            provider: None,
            api_key: None,
            command: Command::Lookup {
                query: "Paris".into(),
            },
        };
        let err = cli.provider(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("No default provider configured"));

        let cli = Cli {
            provider: Some("weatherapi".into()),
            ..cli
        };
        let err = cli.provider(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let cli = Cli {
            config: None,
            provider: Some("accuweather".into()),
            api_key: Some("K".into()),
            command: Command::Lookup {
                query: "Paris".into(),
            },
        };
        assert!(cli.provider(&Config::default()).is_err());
    }
}
