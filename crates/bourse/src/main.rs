use anyhow::{bail, Context, Result};
use bourse::client::{BourseClient, DEFAULT_PERIOD_TYPE, DEFAULT_SIGNAL_SOURCE};
use bourse::models::{BourseConfig, HistoryQuery};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bourse",
    about = "Cached client for the Tehran exchange dashboard backend"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/bourse.toml")]
    config: String,

    /// Skip fresh cache entries and always ask the backend
    #[arg(long, global = true)]
    refresh: bool,

    /// Pretty-print the output JSON
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Gold, coins, gold funds, exchange indices and global metals
    Overview,
    /// Weekly watchlist with ML outlooks
    Watchlist,
    /// Golden-key screener with ML outlooks
    GoldenKey,
    /// Potential buy queues
    Queues,
    /// Signal performance for a period and source
    Performance {
        #[arg(long, default_value = DEFAULT_PERIOD_TYPE)]
        period: String,
        #[arg(long, default_value = DEFAULT_SIGNAL_SOURCE)]
        source: String,
    },
    /// Daily or weekly market summary
    Summary,
    /// Daily history for one symbol
    History {
        symbol: String,
        /// Trailing window in days (ignored when --start and --end are given)
        #[arg(long)]
        days: Option<u32>,
        /// Range start, YYYY-MM-DD
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,
        /// Range end, YYYY-MM-DD
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },
    /// ML prediction map
    Predictions,
    /// Every per-symbol analysis plus market context
    Analysis { symbol: String },
    /// Show user settings, or save new ones
    Settings {
        /// Settings JSON to save
        #[arg(long)]
        set: Option<String>,
    },
    /// Profile of the signed-in user
    Profile,
    Login {
        username: String,
        #[arg(long)]
        password: String,
        /// Keep the token across runs. Without it the token only lasts for
        /// this invocation, so later commands run signed out.
        #[arg(long)]
        remember: bool,
    },
    Register {
        username: String,
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Exchange the current token for a new one
    Refresh,
    Logout,
    /// Drop one cached dataset, e.g. `market_overview`
    CacheClear { dataset: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    let client = bourse::build_client(&config)
        .await
        .context("Failed to build client")?;

    run(&client, &cli).await
}

/// A missing config file means defaults; a broken one is an error.
fn load_config(path: &str) -> Result<BourseConfig> {
    match std::fs::read_to_string(path) {
        Ok(config_str) => {
            toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path, "Config file not found, using defaults");
            Ok(BourseConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read config: {path}")),
    }
}

async fn run(client: &BourseClient, cli: &Cli) -> Result<()> {
    let refresh = cli.refresh;
    match &cli.command {
        Command::Overview => print(cli, &client.fetch_market_overview(refresh, None).await),
        Command::Watchlist => print(cli, &client.fetch_weekly_watchlist(refresh).await),
        Command::GoldenKey => print(cli, &client.fetch_golden_key(refresh).await),
        Command::Queues => print(cli, &client.fetch_potential_queues(refresh).await),
        Command::Performance { period, source } => print(
            cli,
            &client.fetch_app_performance(refresh, period, source).await,
        ),
        Command::Summary => print(cli, &client.fetch_market_summary(refresh).await),
        Command::History {
            symbol,
            days,
            start,
            end,
        } => {
            let query = HistoryQuery {
                days: *days,
                start_date: *start,
                end_date: *end,
            };
            print(cli, &client.fetch_stock_history(symbol, &query, refresh).await)
        }
        Command::Predictions => print(cli, &client.fetch_ml_predictions(refresh).await),
        Command::Analysis { symbol } => {
            let analysis = client
                .fetch_full_analysis(symbol)
                .await
                .map_err(|e| anyhow::anyhow!("Analysis failed: {e}"))?;
            print(cli, &analysis)
        }
        Command::Settings { set: None } => print(cli, &client.fetch_settings().await),
        Command::Settings { set: Some(raw) } => {
            let settings: serde_json::Value =
                serde_json::from_str(raw).context("Failed to parse settings JSON")?;
            match client.update_settings(&settings).await {
                Some(saved) => print(cli, &saved),
                None => bail!("Settings were not saved"),
            }
        }
        Command::Profile => {
            let profile = client
                .fetch_user_profile()
                .await
                .map_err(|e| anyhow::anyhow!("Profile request failed: {e}"))?;
            print(cli, &profile)
        }
        Command::Login {
            username,
            password,
            remember,
        } => {
            client.session().set_remember_me(*remember).await;
            let outcome = client
                .login(username, password)
                .await
                .map_err(|e| anyhow::anyhow!("Login failed: {e}"))?;
            if !*remember {
                tracing::warn!("Token kept for this run only; pass --remember to stay signed in");
            }
            print(cli, &outcome)
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let outcome = client.register(username, email, password).await;
            print(cli, &outcome)?;
            if !outcome.success {
                bail!("Registration failed");
            }
            Ok(())
        }
        Command::Refresh => {
            let refreshed = client
                .refresh_token()
                .await
                .map_err(|e| anyhow::anyhow!("Token refresh failed: {e}"))?;
            print(cli, &refreshed)
        }
        Command::Logout => {
            client.logout().await;
            Ok(())
        }
        Command::CacheClear { dataset } => {
            client.clear_cached(dataset).await;
            Ok(())
        }
    }
}

/// JSON to stdout; logs go to stderr.
fn print<T: Serialize>(cli: &Cli, value: &T) -> Result<()> {
    let output = if cli.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn history_flags_parse() {
        let cli = Cli::parse_from([
            "bourse", "--refresh", "history", "FOLD", "--days", "30", "--start", "2024-03-01",
            "--end", "2024-03-20",
        ]);
        assert!(cli.refresh);
        match cli.command {
            Command::History {
                symbol,
                days,
                start,
                end,
            } => {
                assert_eq!(symbol, "FOLD");
                assert_eq!(days, Some(30));
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 20));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn performance_defaults() {
        let cli = Cli::parse_from(["bourse", "performance"]);
        match cli.command {
            Command::Performance { period, source } => {
                assert_eq!(period, "weekly");
                assert_eq!(source, "overall");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn remember_help_explains_run_scope() {
        use clap::CommandFactory;
        let mut command = Cli::command();
        let login = command
            .find_subcommand_mut("login")
            .expect("login subcommand");
        let remember = login
            .get_arguments()
            .find(|arg| arg.get_id() == "remember")
            .expect("remember flag");
        let help = remember
            .get_long_help()
            .or_else(|| remember.get_help())
            .map(|help| help.to_string())
            .unwrap_or_default();
        assert!(help.contains("this invocation"));
    }

    #[test]
    fn missing_config_uses_defaults() {
        let config = load_config("does/not/exist.toml").unwrap();
        assert_eq!(config.api.timeout_seconds, 30);
    }
}
