use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use reform::api::{AnalysisQuery, Exercise, ProfileAttributes};
use reform::charts::{exercise_breakdown, score_trend};
use reform::config::{ConfigError, ConfigOverrides};
use reform::validation::{ChangePasswordForm, SignupForm};
use reform::{ApiError, AuthRedirect, ErrorCode, ReformApi, ReformConfig};
use serde_json::Value;
use time::Date;
use time::macros::format_description;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("nothing to chart")]
    NoChartData,
}

#[derive(Parser, Debug)]
#[command(name = "reform", about = "Reform account and analysis CLI")]
struct Cli {
    #[arg(long, help = "Backend base URL [default: REFORM_API_URL or http://127.0.0.1:8000]")]
    base_url: Option<String>,

    #[arg(long, help = "Session file [default: REFORM_SESSION_FILE or <config dir>/reform/session.json]")]
    session_file: Option<PathBuf>,

    #[arg(long, help = "Request timeout [default: REFORM_REQUEST_TIMEOUT_SECS or none]")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Signup(SignupArgs),
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "REFORM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Print the locally stored session without contacting the server.
    Whoami,
    /// Fetch the profile from the server.
    Me,
    ChangePassword(ChangePasswordArgs),
    SetUsername {
        username: String,
    },
    Verify(VerifyCommand),
    Analyses(AnalysesCommand),
    Profile(ProfileCommand),
    Tokens(TokensCommand),
}

#[derive(Args, Debug)]
struct SignupArgs {
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "REFORM_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, env = "REFORM_CONFIRM_PASSWORD", hide_env_values = true, help = "Defaults to --password")]
    confirm_password: Option<String>,
}

#[derive(Args, Debug)]
struct ChangePasswordArgs {
    #[arg(long, env = "REFORM_CURRENT_PASSWORD", hide_env_values = true)]
    current: String,
    #[arg(long, env = "REFORM_NEW_PASSWORD", hide_env_values = true)]
    new: String,
    #[arg(long, env = "REFORM_CONFIRM_PASSWORD", hide_env_values = true, help = "Defaults to --new")]
    confirm: Option<String>,
}

#[derive(Args, Debug)]
struct VerifyCommand {
    #[command(subcommand)]
    command: VerifySubcommand,
}

#[derive(Subcommand, Debug)]
enum VerifySubcommand {
    Send,
    Status,
    Confirm { token: String },
}

#[derive(Args, Debug)]
struct AnalysesCommand {
    #[command(subcommand)]
    command: AnalysesSubcommand,
}

#[derive(Subcommand, Debug)]
enum AnalysesSubcommand {
    List(ListArgs),
    Show { analysis_id: String },
    Progress,
    Trend,
    Breakdown,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long, default_value_t = reform::api::analyses::DEFAULT_PAGE_LIMIT)]
    limit: u32,
    #[arg(long, default_value_t = 0)]
    offset: u32,
    #[arg(long, help = "squat, bench, deadlift, or 1-3")]
    exercise: Option<Exercise>,
    #[arg(long)]
    min_score: Option<u8>,
    #[arg(long)]
    max_score: Option<u8>,
    #[arg(long, value_parser = parse_date)]
    start_date: Option<Date>,
    #[arg(long, value_parser = parse_date)]
    end_date: Option<Date>,
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Privacy {
        #[arg(long, action = clap::ArgAction::Set)]
        public: bool,
    },
    Update {
        #[arg(long)]
        technical_level: Option<String>,
        #[arg(long)]
        favorite_exercise: Option<String>,
        #[arg(long)]
        community_preference: Option<String>,
    },
}

#[derive(Args, Debug)]
struct TokensCommand {
    #[command(subcommand)]
    command: TokensSubcommand,
}

#[derive(Subcommand, Debug)]
enum TokensSubcommand {
    Activate,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        let code = match &e {
            CliError::Api(api) => api.error_code(),
            _ => "E_CLI",
        };
        eprintln!("error [{code}]: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ReformConfig::from_env_with(ConfigOverrides {
        api_url: cli.base_url,
        session_file: cli.session_file,
        request_timeout_secs: cli.timeout_secs,
    })?;
    let api = ReformApi::from_config(&config, |signal: AuthRedirect| {
        eprintln!("session expired; log in again (redirect {})", signal.path());
    })?;

    match cli.command {
        Command::Signup(args) => {
            let form = SignupForm {
                confirm_password: args.confirm_password.unwrap_or_else(|| args.password.clone()),
                full_name: args.full_name,
                email: args.email,
                password: args.password,
            };
            let identity = api.signup(&form).await?;
            print_json(&serde_json::to_value(&identity)?)
        }
        Command::Login { email, password } => {
            let identity = api.login(&email, &password).await?;
            eprintln!("logged in as {}", identity.email);
            Ok(())
        }
        Command::Logout => {
            api.logout()?;
            eprintln!("logged out");
            Ok(())
        }
        Command::Whoami => match api.session().session().identity() {
            Some(identity) => print_json(&serde_json::to_value(identity)?),
            None => {
                println!("not logged in");
                Ok(())
            }
        },
        Command::Me => print_json(&serde_json::to_value(api.me().await?)?),
        Command::ChangePassword(args) => {
            let form = ChangePasswordForm {
                confirm_password: args.confirm.unwrap_or_else(|| args.new.clone()),
                current_password: args.current,
                new_password: args.new,
            };
            api.change_password(&form).await?;
            eprintln!("password changed");
            Ok(())
        }
        Command::SetUsername { username } => {
            let username = api.update_username(&username).await?;
            println!("{username}");
            Ok(())
        }
        Command::Verify(verify) => run_verify(&api, verify).await,
        Command::Analyses(analyses) => run_analyses(&api, analyses).await,
        Command::Profile(profile) => run_profile(&api, profile).await,
        Command::Tokens(tokens) => match tokens.command {
            TokensSubcommand::Activate => {
                let activation = api.activate_tokens().await?;
                println!("{}", activation.message);
                Ok(())
            }
        },
    }
}

async fn run_verify(api: &ReformApi, verify: VerifyCommand) -> Result<(), CliError> {
    match verify.command {
        VerifySubcommand::Send => {
            api.send_verification_email().await?;
            eprintln!("verification email sent");
            Ok(())
        }
        VerifySubcommand::Status => {
            let status = api.verification_status().await?;
            println!("{}", if status.is_verified { "verified" } else { "not verified" });
            Ok(())
        }
        VerifySubcommand::Confirm { token } => print_json(&api.verify_email(&token).await?),
    }
}

async fn run_analyses(api: &ReformApi, analyses: AnalysesCommand) -> Result<(), CliError> {
    match analyses.command {
        AnalysesSubcommand::List(args) => {
            let query = AnalysisQuery {
                limit: args.limit,
                offset: args.offset,
                exercise: args.exercise,
                min_score: args.min_score,
                max_score: args.max_score,
                start_date: args.start_date,
                end_date: args.end_date,
            };
            print_json(&api.list_analyses(&query).await?)
        }
        AnalysesSubcommand::Show { analysis_id } => print_json(&api.analysis(&analysis_id).await?),
        AnalysesSubcommand::Progress => print_json(&serde_json::to_value(api.progress_metrics().await?)?),
        AnalysesSubcommand::Trend => {
            let metrics = api.progress_metrics().await?;
            let chart = score_trend(&metrics).ok_or(CliError::NoChartData)?;
            print_json(&serde_json::to_value(chart)?)
        }
        AnalysesSubcommand::Breakdown => {
            let metrics = api.progress_metrics().await?;
            let chart = exercise_breakdown(&metrics).ok_or(CliError::NoChartData)?;
            print_json(&serde_json::to_value(chart)?)
        }
    }
}

async fn run_profile(api: &ReformApi, profile: ProfileCommand) -> Result<(), CliError> {
    match profile.command {
        ProfileSubcommand::Privacy { public } => {
            let is_public = api.set_privacy(public).await?;
            println!("{}", if is_public { "public" } else { "private" });
            Ok(())
        }
        ProfileSubcommand::Update {
            technical_level,
            favorite_exercise,
            community_preference,
        } => {
            let attributes = ProfileAttributes {
                technical_level,
                favorite_exercise,
                community_preference,
            };
            let saved = api.update_profile(&attributes).await?;
            print_json(&serde_json::to_value(saved)?)
        }
    }
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
