use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::Config;
use crate::output::print_summary;
use crate::providers::{CollectOptions, GitHubProvider};
use crate::snapshot::Snapshot;

#[derive(Parser)]
#[command(name = "statsgen")]
#[command(author, version, about = "GitHub profile statistics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect statistics for a GitHub user
    Collect {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        username: Option<String>,

        #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[arg(long)]
        api_url: Option<String>,

        #[arg(short, long)]
        max_concurrent: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = Format::Summary)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Summary,
    Json,
}

impl Cli {
    async fn execute_collect(
        &self,
        config_path: Option<&PathBuf>,
        username: Option<&str>,
        token: Option<&str>,
        api_url: Option<&str>,
        max_concurrent: Option<usize>,
        format: Format,
    ) -> Result<()> {
        let config = Config::load(config_path.map(PathBuf::as_path))?;

        let username = config
            .resolve_username(username)
            .ok_or_else(|| anyhow!("No username configured; pass --username or set profile.username"))?;

        let token = token.map(Token::from).or_else(Token::from_env);
        if token.is_none() {
            warn!("No GitHub token found, collecting anonymously");
        }

        let mut client_options = config.client_options();
        if let Some(max_concurrent) = max_concurrent {
            client_options.max_concurrent_requests = max_concurrent;
        }

        let options = CollectOptions {
            username,
            filters: config.repository_filters(),
            include_contributed: !config.filters.exclude_forks,
        };

        let api_url = api_url.unwrap_or(&config.client.api_url);
        let provider = GitHubProvider::new(api_url, token, client_options, options)?;

        // Dropping the collection future cancels every in-flight request
        let snapshot = tokio::select! {
            result = provider.collect() => result?,
            _ = tokio::signal::ctrl_c() => {
                return Err(anyhow!("Interrupted, no statistics written"));
            }
        };

        // Files are always written as JSON
        match format {
            Format::Summary if self.output.is_none() => {
                print_summary(&snapshot, config.display.max_languages);
                Ok(())
            }
            _ => self.write_report(&snapshot),
        }
    }

    fn write_report(&self, snapshot: &Snapshot) -> Result<()> {
        let report = snapshot.report();
        let json_output = if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Statistics written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Collect {
                config,
                username,
                token,
                api_url,
                max_concurrent,
                format,
            } => {
                self.execute_collect(
                    config.as_ref(),
                    username.as_deref(),
                    token.as_deref(),
                    api_url.as_deref(),
                    *max_concurrent,
                    *format,
                )
                .await
            }
        }
    }
}
