use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use proxysync::{
    config::{Settings, DEFAULT_CONFIG_FILE},
    console, menu,
    proxy::CheckPolicy,
    Pipeline, RunOutcome,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Download, validate and distribute proxy lists
#[derive(Parser)]
#[command(name = "proxysync")]
#[command(about = "Download, validate and distribute proxy lists")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (TOML); defaults apply when it does not exist
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive menu
    Menu,
    /// Download raw proxy lists from the URLs in the API list file
    Download,
    /// Convert the raw proxy list into proxy URLs
    Convert,
    /// Validate the proxy file and save working proxies
    Check {
        #[command(flatten)]
        check: CheckArgs,
    },
    /// Backup, validate and distribute proxies
    Run {
        #[command(flatten)]
        check: CheckArgs,
        /// Save working proxies instead of distributing them
        #[arg(long)]
        no_distribute: bool,
    },
    /// Distribute an already validated list to every target path
    Distribute {
        /// List to distribute (defaults to the success file)
        input: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Number of concurrent checks
    #[arg(short = 'n', long)]
    workers: Option<usize>,
    /// Timeout in seconds per request
    #[arg(long)]
    timeout: Option<u64>,
    /// Attempts per check URL
    #[arg(long)]
    attempts: Option<u32>,
    /// URL to test proxies against (can specify multiple)
    #[arg(long = "check-url")]
    check_urls: Vec<String>,
    /// How several check URLs combine (strict, lenient)
    #[arg(long)]
    policy: Option<String>,
    /// Show the full-screen progress view
    #[arg(long)]
    tui: bool,
}

impl CheckArgs {
    fn apply(&self, settings: &mut Settings) -> Result<()> {
        let check = &mut settings.check;
        if let Some(workers) = self.workers {
            check.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            check.timeout_secs = timeout;
        }
        if let Some(attempts) = self.attempts {
            check.attempts = attempts;
        }
        if !self.check_urls.is_empty() {
            check.urls = self.check_urls.clone();
        }
        if let Some(policy) = &self.policy {
            check.policy = parse_policy(policy)?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;

    match cli.command {
        Some(Commands::Menu) | None => {
            let pipeline = Pipeline::new(settings);
            let mut prompter = menu::Prompter::new(io::stdin().lock(), io::stdout());
            menu::run(&pipeline, &mut prompter).await?;
        }
        Some(Commands::Download) => {
            Pipeline::new(settings).download().await?;
        }
        Some(Commands::Convert) => {
            Pipeline::new(settings).convert()?;
        }
        Some(Commands::Check { check }) => {
            check.apply(&mut settings)?;
            print_check_settings(&settings);
            let report = Pipeline::new(settings).check(check.tui).await?;
            println!(
                "Results: {} good, {} bad",
                report.good.len(),
                report.failed.len()
            );
        }
        Some(Commands::Run {
            check,
            no_distribute,
        }) => {
            check.apply(&mut settings)?;
            print_check_settings(&settings);
            let outcome = Pipeline::new(settings)
                .run(!no_distribute, check.tui)
                .await?;
            if let RunOutcome::Distributed { results, .. } = &outcome {
                let failed = results.iter().filter(|r| !r.is_success()).count();
                if failed > 0 {
                    console::warn(&format!("{} target(s) could not be written", failed));
                }
            }
        }
        Some(Commands::Distribute { input }) => {
            let input = input.unwrap_or_else(|| settings.files.success.clone());
            Pipeline::new(settings).distribute_file(&input)?;
        }
    }

    Ok(())
}

fn print_check_settings(settings: &Settings) {
    let check = &settings.check;
    println!(
        "Checking with {} workers, timeout: {}s, attempts: {}",
        check.workers, check.timeout_secs, check.attempts
    );
    println!("Check URLs: {}", check.urls.join(", "));
    println!();
}

fn parse_policy(s: &str) -> Result<CheckPolicy> {
    match s.to_lowercase().as_str() {
        "strict" | "all" => Ok(CheckPolicy::AllMustPass),
        "lenient" | "first" => Ok(CheckPolicy::FirstSuccess),
        _ => Err(anyhow!("Invalid policy: {}. Use: strict, lenient", s)),
    }
}
