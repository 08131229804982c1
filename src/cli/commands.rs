use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a URL and print the rendered document
    Fetch {
        /// URL or bare domain to fetch
        url: String,
    },

    /// Inspect or maintain visit history
    History {
        #[command(subcommand)]
        subcommand: HistoryCommand,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Search history by URL or title substring
    Search {
        /// Substring to match; omit to list everything
        query: Option<String>,

        #[arg(long, default_value_t = 10, help = "Maximum results")]
        limit: usize,
    },

    /// Delete entries older than the retention window
    Prune,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,
}
