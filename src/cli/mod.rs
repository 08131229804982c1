pub mod commands;
pub mod dispatch;

use crate::config::{Config, ConfigOverrides};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pulp")]
#[command(version, about = "Terminal web browser core")]
#[command(long_about = "Fetch web pages as renderable documents, with site-specific handlers, \
tabs, and persistent visit history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<commands::Command>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, global = true, help = "User-Agent for outbound requests")]
    pub user_agent: Option<String>,

    #[arg(long, global = true, help = "Skip thumbnail downloads")]
    pub no_thumbnails: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
            thumbnails: self.no_thumbnails.then_some(false),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?.load_with_overrides(cli.overrides());

    dispatch::dispatch(cli, config).await
}
