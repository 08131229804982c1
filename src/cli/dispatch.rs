use super::{
    Cli,
    commands::{Command, ConfigCommand, HistoryCommand},
};
use crate::{
    config::{Config, default_config_path},
    output::{self, OutputFormatter, text},
    session::{Browser, HistoryHit},
};
use serde::Serialize;

pub async fn dispatch(mut cli: Cli, config: Config) -> anyhow::Result<()> {
    let command = match cli.command.take() {
        Some(cmd) => cmd,
        None => {
            eprintln!("No command provided. Use --help for usage.");
            std::process::exit(1);
        }
    };

    match command {
        Command::Fetch { url } => handle_fetch(&url, &cli, config).await,
        Command::History { subcommand } => handle_history_command(subcommand, &cli, config).await,
        Command::Config { subcommand } => handle_config_command(subcommand, &cli, config),
    }
}

async fn handle_fetch(url: &str, cli: &Cli, config: Config) -> anyhow::Result<()> {
    let browser = Browser::new(config)?;
    let tab = browser.open_tab().await;
    let result = browser.resolve_and_fetch(url, tab).await;

    let failed = result.is_error();
    output::print_output(&result, cli.json)?;

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn handle_history_command(
    subcommand: HistoryCommand,
    cli: &Cli,
    config: Config,
) -> anyhow::Result<()> {
    let browser = Browser::new(config)?;

    match subcommand {
        HistoryCommand::Search { query, limit } => {
            let hits = browser.search_history(query.as_deref().unwrap_or(""), limit)?;
            output::print_output(&HistorySearchResult { hits }, cli.json)?;
        }
        HistoryCommand::Prune => {
            let removed = browser.prune_history()?;
            println!("{}", text::success(&format!("Pruned {} entries", removed)));
        }
    }
    Ok(())
}

fn handle_config_command(
    subcommand: ConfigCommand,
    cli: &Cli,
    config: Config,
) -> anyhow::Result<()> {
    match subcommand {
        ConfigCommand::Show => {
            if cli.json {
                println!("{}", output::to_json(&config, true)?);
            } else {
                println!("{}", config.show());
            }
        }
        ConfigCommand::Path => {
            println!("{}", default_config_path()?.display());
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct HistorySearchResult {
    hits: Vec<HistoryHit>,
}

impl OutputFormatter for HistorySearchResult {
    fn format_text(&self) -> String {
        if self.hits.is_empty() {
            return "No matching history entries".to_string();
        }

        self.hits
            .iter()
            .map(|hit| {
                if hit.title.is_empty() {
                    text::bullet(&hit.url)
                } else {
                    text::bullet(&format!("{} — {}", hit.url, text::truncate(&hit.title, 60)))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_json(&self, pretty: bool) -> crate::Result<String> {
        output::to_json(&self.hits, pretty)
    }
}
