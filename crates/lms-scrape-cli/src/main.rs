//! `lms-scrape` binary entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use lms_scrape::{list_enrolled_courses, scrape_all, scrape_with, ScrapeState};
use lms_scrape_cli::config::{
    build_config, resolve_base_url, resolve_course_url, resolve_credentials,
    resolve_download_dir, ConfigOptions,
};
use lms_scrape_cli::output::{emit, emit_batch, render, render_batch};

#[derive(Parser)]
#[command(
    name = "lms-scrape",
    about = "Scrape learning-management-system course pages into structured JSON",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one course page and print the result as JSON.
    Scrape {
        /// Course page URL. Optional when --course-id is given.
        url: Option<String>,

        /// Course id, combined with --base-url or MOODLE_URL.
        #[arg(long)]
        course_id: Option<String>,

        /// Site root (default: MOODLE_URL).
        #[arg(long)]
        base_url: Option<String>,

        /// Login username (default: MOODLE_USERNAME).
        #[arg(short, long)]
        username: Option<String>,

        /// Login password (default: MOODLE_PASSWORD).
        #[arg(long)]
        password: Option<String>,

        /// Download documents into this directory (default: LMS_DOWNLOAD_DIR).
        #[arg(long)]
        download: Option<PathBuf>,

        /// Emit one flat list of materials instead of sections.
        #[arg(long)]
        flat: bool,

        /// Write JSON here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Order of numeric dates: day-first or month-first.
        #[arg(long, default_value = "day-first")]
        date_order: String,

        /// Also require the username on the post-login page.
        #[arg(long)]
        require_username: bool,
    },

    /// List the courses on the dashboard.
    Courses {
        /// Site root (default: MOODLE_URL).
        base_url: Option<String>,

        /// Login username (default: MOODLE_USERNAME).
        #[arg(short, long)]
        username: Option<String>,

        /// Login password (default: MOODLE_PASSWORD).
        #[arg(long)]
        password: Option<String>,

        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Log in, list the dashboard courses and scrape each one.
    Sync {
        /// Site root (default: MOODLE_URL).
        base_url: Option<String>,

        /// Login username (default: MOODLE_USERNAME).
        #[arg(short, long)]
        username: Option<String>,

        /// Login password (default: MOODLE_PASSWORD).
        #[arg(long)]
        password: Option<String>,

        /// Download documents into this directory (default: LMS_DOWNLOAD_DIR).
        #[arg(long)]
        download: Option<PathBuf>,

        /// Emit flat material lists instead of sections.
        #[arg(long)]
        flat: bool,

        /// Write one `course_<id>_<name>.json` per course here instead of
        /// printing a JSON array.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Order of numeric dates: day-first or month-first.
        #[arg(long, default_value = "day-first")]
        date_order: String,

        /// Also require the username on the post-login page.
        #[arg(long)]
        require_username: bool,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   lms-scrape completions bash > ~/.local/share/bash-completion/completions/lms-scrape
    ///   lms-scrape completions zsh > ~/.zfunc/_lms-scrape
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scrape {
            url,
            course_id,
            base_url,
            username,
            password,
            download,
            flat,
            output,
            timeout,
            date_order,
            require_username,
        } => {
            let course_url =
                resolve_course_url(url.as_deref(), course_id.as_deref(), base_url.as_deref())?;
            let credentials = resolve_credentials(username.as_deref(), password.as_deref())?;
            let config = build_config(&ConfigOptions {
                timeout_secs: Some(timeout),
                date_order: Some(date_order),
                download_dir: resolve_download_dir(download.as_deref()),
                require_username,
            })?;

            tracing::info!("Scraping {course_url}");
            let outcome = scrape_with(config, &course_url, credentials.as_ref()).await;
            let json = render(&outcome.result, flat)?;
            emit(&json, output.as_deref())
                .with_context(|| format!("writing output for {course_url}"))?;

            if outcome.final_state() == ScrapeState::Failed {
                std::process::exit(1);
            }
        }

        Commands::Courses {
            base_url,
            username,
            password,
            timeout,
        } => {
            let base = resolve_base_url(base_url.as_deref())?;
            let credentials = resolve_credentials(username.as_deref(), password.as_deref())?;
            let config = build_config(&ConfigOptions {
                timeout_secs: Some(timeout),
                ..ConfigOptions::default()
            })?;

            let courses = list_enrolled_courses(&config, &base, credentials.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&courses)?);
        }

        Commands::Sync {
            base_url,
            username,
            password,
            download,
            flat,
            output_dir,
            timeout,
            date_order,
            require_username,
        } => {
            let base = resolve_base_url(base_url.as_deref())?;
            let credentials = resolve_credentials(username.as_deref(), password.as_deref())?;
            let config = build_config(&ConfigOptions {
                timeout_secs: Some(timeout),
                date_order: Some(date_order),
                download_dir: resolve_download_dir(download.as_deref()),
                require_username,
            })?;

            tracing::info!("Syncing courses from {base}");
            let runs = scrape_all(config, &base, credentials.as_ref())
                .await
                .with_context(|| format!("listing courses on {base}"))?;
            match output_dir {
                Some(dir) => {
                    let written = emit_batch(&runs, flat, &dir)?;
                    tracing::info!("wrote {} course files to {}", written.len(), dir.display());
                }
                None => emit(&render_batch(&runs, flat)?, None)?,
            }

            let failed = runs
                .iter()
                .filter(|r| r.outcome.final_state() == ScrapeState::Failed)
                .count();
            if failed > 0 {
                tracing::warn!("{failed} of {} courses failed", runs.len());
                std::process::exit(1);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "lms-scrape", &mut std::io::stdout());
        }
    }

    Ok(())
}
