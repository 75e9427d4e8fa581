//! Letterbox CLI
//!
//! Command-line interface for the Letterbox newsletter service.
//!
//! # Usage
//!
//! ```bash
//! # Work out the schedule token for Wednesdays at 8 AM in Tokyo
//! letterbox schedule encode WED 8 AM --tz Asia/Tokyo
//!
//! # Read your inbox
//! LETTERBOX_PASSWORD=... letterbox --email reader@example.com inbox
//!
//! # Create a newsletter that goes out every Friday at 7 PM
//! letterbox create-provider --title "Rust Weekly" --summary "All things Rust" \
//!     --tag rust --tag systems --day FRI --hour 7 --period PM
//! ```

use anyhow::{Context, Result, anyhow};
use chrono::DateTime;
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use letterbox_client::{ApiClient, LetterboxApi, LogInRequest, Provider, UpdateProviderRequest};
use letterbox_core::schedule::{FixedTimezone, SystemClock, SystemTimezone, TimezoneSource};
use letterbox_core::{LetterboxError, Period, ScheduleCodec, ScheduleSelection, Weekday};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod config;

use config::CliConfig;

type Codec = ScheduleCodec<SystemClock, FixedTimezone>;

#[derive(Parser)]
#[command(name = "letterbox")]
#[command(about = "Newsletter curation from the command line")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Account email for commands that talk to the backend
    #[arg(long, global = true, env = "LETTERBOX_EMAIL")]
    email: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "LETTERBOX_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Backend base URL, overriding the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode and decode weekly schedules (offline)
    Schedule {
        #[command(subcommand)]
        action: ScheduleCommand,
    },

    /// Show the latest letters from your subscriptions
    Inbox,

    /// List the letters a provider has sent
    Letters {
        /// Provider ID
        provider: String,
    },

    /// Show one letter
    Letter {
        /// Letter ID
        letter: String,
    },

    /// List your subscriptions
    Subscriptions,

    /// Subscribe to a provider
    Subscribe {
        /// Provider ID
        provider: String,
    },

    /// Unsubscribe from a provider
    Unsubscribe {
        /// Provider ID
        provider: String,
    },

    /// List providers you can subscribe to
    Providers {
        /// Only list providers you created
        #[arg(long)]
        mine: bool,
    },

    /// Create a provider
    CreateProvider {
        #[arg(long)]
        title: String,

        #[arg(long)]
        summary: String,

        /// Topic tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Weekday code (SUN, MON, ...)
        #[arg(long)]
        day: Weekday,

        /// Hour on a 12-hour clock
        #[arg(long)]
        hour: u8,

        /// AM or PM
        #[arg(long)]
        period: Period,

        /// Timezone the schedule is picked in
        #[arg(long)]
        tz: Option<String>,
    },

    /// Change a provider's title or summary
    UpdateProvider {
        /// Provider ID
        provider: String,

        /// New title (kept when omitted)
        #[arg(long)]
        title: Option<String>,

        /// New summary (kept when omitted)
        #[arg(long)]
        summary: Option<String>,
    },

    /// Delete a provider you created
    DeleteProvider {
        /// Provider ID
        provider: String,
    },
}

#[derive(Subcommand)]
enum ScheduleCommand {
    /// Turn a local weekday and hour into a schedule token
    Encode {
        day: Weekday,
        hour: u8,
        period: Period,
        #[arg(long)]
        tz: Option<String>,
    },

    /// Read a schedule token in local time
    Decode {
        token: String,
        #[arg(long)]
        tz: Option<String>,
    },

    /// When the first newsletter for a schedule would go out
    FirstDispatch {
        day: Weekday,
        hour: u8,
        period: Period,
        #[arg(long)]
        tz: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config()?;

    init_logging(cli.verbose, &config.log_level);
    debug!("Loaded configuration from {:?}", config.config_path);

    let Cli {
        format,
        email,
        password,
        base_url,
        command,
        ..
    } = cli;

    match command {
        Commands::Schedule { action } => Ok(run_schedule(action, &config, format)?),
        command => {
            let api = sign_in(&config, base_url, email, password).await?;
            let ticker = api.spawn_refresh_ticker(config.refresh_interval());

            let outcome = run_api_command(&api, &config, format, command).await;

            ticker.abort();
            if let Err(e) = api.session().log_out().await {
                warn!("Logout failed: {}", e);
            }
            outcome
        }
    }
}

fn init_logging(verbose: bool, default_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Codec for `tz`, the configured timezone, or the system one, in that order.
fn codec_for(tz: Option<&str>, config: &CliConfig) -> Result<Codec, LetterboxError> {
    let timezone = match tz.or(config.timezone.as_deref()) {
        Some(name) => FixedTimezone::parse(name)?,
        None => FixedTimezone(SystemTimezone.timezone()),
    };
    debug!("Using timezone {}", timezone.timezone());
    Ok(ScheduleCodec::new(SystemClock, timezone))
}

fn run_schedule(
    action: ScheduleCommand,
    config: &CliConfig,
    format: OutputFormat,
) -> Result<(), LetterboxError> {
    match action {
        ScheduleCommand::Encode { day, hour, period, tz } => {
            let codec = codec_for(tz.as_deref(), config)?;
            let selection = ScheduleSelection::new(day, hour, period)?;
            let token = codec.encode_selection(&selection)?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "schedule": token,
                    "selection": selection,
                    "timezone": codec.timezone().name(),
                })),
                OutputFormat::Text => println!("{}", token),
            }
        }
        ScheduleCommand::Decode { token, tz } => {
            let codec = codec_for(tz.as_deref(), config)?;
            let decoded = codec.decode(&token)?;
            match format {
                OutputFormat::Json => print_json(&decoded),
                OutputFormat::Text => println!("{}", decoded.display),
            }
        }
        ScheduleCommand::FirstDispatch { day, hour, period, tz } => {
            let codec = codec_for(tz.as_deref(), config)?;
            let selection = ScheduleSelection::new(day, hour, period)?;
            let dispatch = codec.first_dispatch(&selection)?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "firstDispatch": dispatch.to_rfc3339(),
                    "every": format!("Every {}", selection.weekday.label()),
                })),
                OutputFormat::Text => println!("{}", format_dispatch(&dispatch)),
            }
        }
    }
    Ok(())
}

async fn sign_in(
    config: &CliConfig,
    base_url: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<LetterboxApi> {
    let email = email.ok_or_else(|| anyhow!("--email or LETTERBOX_EMAIL is required"))?;
    let password = password.ok_or_else(|| anyhow!("LETTERBOX_PASSWORD is required"))?;

    let mut builder = ApiClient::builder().base_url(base_url.unwrap_or_else(|| config.base_url.clone()));
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    let api = LetterboxApi::new(builder.build().context("Failed to build HTTP client")?);

    api.session()
        .log_in(&LogInRequest {
            email,
            password,
            is_session_only: !config.persistent_login,
        })
        .await
        .context("Login failed")?;
    info!("Signed in");

    Ok(api)
}

async fn run_api_command(
    api: &LetterboxApi,
    config: &CliConfig,
    format: OutputFormat,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Schedule { action } => run_schedule(action, config, format)?,
        Commands::Inbox => {
            let inbox = api.inbox().await.context("Failed to load inbox")?;
            match format {
                OutputFormat::Json => print_json(&inbox),
                OutputFormat::Text if inbox.letters.is_empty() => println!("Your inbox is empty"),
                OutputFormat::Text => {
                    for letter in &inbox.letters {
                        println!("{}  {}: {}", letter.letter_id, letter.provider_title, letter.title);
                    }
                }
            }
        }
        Commands::Letters { provider } => {
            let letters = api.letters(&provider).await.context("Failed to load letters")?;
            match format {
                OutputFormat::Json => print_json(&letters),
                OutputFormat::Text => {
                    for letter in &letters {
                        let sent = letter
                            .created_date
                            .map(|d| d.format("%Y-%m-%d").to_string())
                            .unwrap_or_default();
                        println!("{}  {}  {}", letter.letter_id, sent, letter.title);
                    }
                }
            }
        }
        Commands::Letter { letter } => {
            let letter = api.letter(&letter).await.context("Failed to load letter")?;
            match format {
                OutputFormat::Json => print_json(&letter),
                OutputFormat::Text => {
                    println!("{}\n", letter.title);
                    println!("{}", letter.html);
                }
            }
        }
        Commands::Subscriptions => {
            let subscriptions = api
                .subscriptions()
                .await
                .context("Failed to load subscriptions")?;
            match format {
                OutputFormat::Json => print_json(&subscriptions),
                OutputFormat::Text => {
                    let codec = codec_for(None, config)?;
                    for subscription in &subscriptions {
                        println!(
                            "{}  {}  ({})",
                            subscription.provider_id,
                            subscription.title,
                            describe_schedule(&codec, &subscription.schedule)
                        );
                    }
                }
            }
        }
        Commands::Subscribe { provider } => {
            let response = api.subscribe(&provider).await.context("Failed to subscribe")?;
            match format {
                OutputFormat::Json => print_json(&response),
                OutputFormat::Text => println!("Subscribed to {}", provider),
            }
        }
        Commands::Unsubscribe { provider } => {
            let response = api
                .unsubscribe(&provider)
                .await
                .context("Failed to unsubscribe")?;
            match format {
                OutputFormat::Json => print_json(&response),
                OutputFormat::Text => println!("Unsubscribed from {}", provider),
            }
        }
        Commands::Providers { mine } => {
            let providers = if mine {
                api.my_providers().await
            } else {
                api.subscribable_providers().await
            }
            .context("Failed to load providers")?;
            match format {
                OutputFormat::Json => print_json(&providers),
                OutputFormat::Text => print_providers(&codec_for(None, config)?, &providers),
            }
        }
        Commands::CreateProvider {
            title,
            summary,
            tags,
            day,
            hour,
            period,
            tz,
        } => {
            let codec = codec_for(tz.as_deref(), config)?;
            let selection = ScheduleSelection::new(day, hour, period)?;
            let schedule = codec.encode_selection(&selection)?;
            let dispatch = codec.first_dispatch(&selection)?;

            let response = api
                .create_provider_with_schedule(&title, &summary, tags, &selection, &codec)
                .await
                .context("Failed to create provider")?;

            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "response": response,
                    "schedule": schedule,
                    "firstDispatch": dispatch.to_rfc3339(),
                })),
                OutputFormat::Text => {
                    println!("Created \"{}\" ({})", title, schedule);
                    println!("Your first newsletter will be sent on {}", format_dispatch(&dispatch));
                }
            }
        }
        Commands::UpdateProvider {
            provider,
            title,
            summary,
        } => {
            if title.is_none() && summary.is_none() {
                return Err(anyhow!("Nothing to update: pass --title or --summary"));
            }
            let request = match (title, summary) {
                (Some(title), Some(summary)) => UpdateProviderRequest {
                    provider_id: provider,
                    title,
                    summary,
                },
                (title, summary) => {
                    let current = api
                        .provider(&provider)
                        .await
                        .context("Failed to load provider")?;
                    UpdateProviderRequest {
                        provider_id: provider,
                        title: title.unwrap_or(current.title),
                        summary: summary.unwrap_or(current.summary),
                    }
                }
            };
            let response = api
                .update_provider(&request)
                .await
                .context("Failed to update provider")?;
            match format {
                OutputFormat::Json => print_json(&response),
                OutputFormat::Text => println!("Updated \"{}\"", request.title),
            }
        }
        Commands::DeleteProvider { provider } => {
            let response = api
                .delete_provider(&provider)
                .await
                .context("Failed to delete provider")?;
            match format {
                OutputFormat::Json => print_json(&response),
                OutputFormat::Text => println!("Deleted {}", provider),
            }
        }
    }
    Ok(())
}

fn print_providers(codec: &Codec, providers: &[Provider]) {
    if providers.is_empty() {
        println!("No providers found");
        return;
    }
    for provider in providers {
        println!(
            "{}  {}  [{}]  ({})",
            provider.provider_id,
            provider.title,
            provider.tags.join(", "),
            describe_schedule(codec, &provider.schedule)
        );
    }
}

/// `"Every Friday at 7:00 PM"`, or the raw token if it does not decode.
fn describe_schedule(codec: &Codec, token: &str) -> String {
    match codec.decode(token) {
        Ok(decoded) => format!("{} at {}:00 {}", decoded.every_label(), decoded.hour, decoded.period),
        Err(e) => {
            warn!("Could not decode schedule {:?}: {}", token, e);
            token.to_string()
        }
    }
}

/// `"Friday, March 6, 2026 at 7:00 PM JST"`.
fn format_dispatch(dispatch: &DateTime<Tz>) -> String {
    dispatch.format("%A, %B %-d, %Y at %-I:%M %p %Z").to_string()
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!("Failed to render JSON: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create_provider() {
        let cli = Cli::try_parse_from([
            "letterbox",
            "create-provider",
            "--title",
            "Rust Weekly",
            "--summary",
            "All things Rust",
            "--tag",
            "rust",
            "--tag",
            "systems",
            "--day",
            "fri",
            "--hour",
            "7",
            "--period",
            "pm",
        ])
        .unwrap();

        match cli.command {
            Commands::CreateProvider { tags, day, hour, period, tz, .. } => {
                assert_eq!(tags, vec!["rust", "systems"]);
                assert_eq!(day, Weekday::Fri);
                assert_eq!(hour, 7);
                assert_eq!(period, Period::Pm);
                assert!(tz.is_none());
            }
            _ => panic!("expected create-provider"),
        }
    }

    #[test]
    fn test_parse_update_and_delete_provider() {
        let cli = Cli::try_parse_from(["letterbox", "update-provider", "p-1", "--title", "Rust Fortnightly"])
            .unwrap();
        match cli.command {
            Commands::UpdateProvider { provider, title, summary } => {
                assert_eq!(provider, "p-1");
                assert_eq!(title.as_deref(), Some("Rust Fortnightly"));
                assert!(summary.is_none());
            }
            _ => panic!("expected update-provider"),
        }

        let cli = Cli::try_parse_from(["letterbox", "delete-provider", "p-1"]).unwrap();
        assert!(matches!(cli.command, Commands::DeleteProvider { provider } if provider == "p-1"));
    }

    #[test]
    fn test_parse_rejects_unknown_weekday() {
        let result = Cli::try_parse_from(["letterbox", "schedule", "encode", "FUNDAY", "5", "AM"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_codec_prefers_flag_over_config() {
        let config = CliConfig {
            timezone: Some("Asia/Tokyo".to_string()),
            ..CliConfig::default()
        };

        let codec = codec_for(Some("America/New_York"), &config).unwrap();
        assert_eq!(codec.timezone(), chrono_tz::America::New_York);

        let codec = codec_for(None, &config).unwrap();
        assert_eq!(codec.timezone(), chrono_tz::Asia::Tokyo);

        assert!(matches!(
            codec_for(Some("Mars/Olympus_Mons"), &config),
            Err(LetterboxError::Schedule(_))
        ));
    }

    #[test]
    fn test_describe_schedule() {
        let codec = codec_for(Some("Etc/GMT+5"), &CliConfig::default()).unwrap();
        assert_eq!(
            describe_schedule(&codec, "cron(0 4 ? * 5 *)"),
            "Every Wednesday at 11:00 PM"
        );
        assert_eq!(describe_schedule(&codec, "weekly"), "weekly");
    }
}
