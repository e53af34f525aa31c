use chrono::Utc;
use clap::{Parser, Subcommand};
use podcast_site::api::ApiClient;
use podcast_site::publish::GitCli;
use podcast_site::source::SqliteSource;
use podcast_site::{config, output, pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "podcast-site")]
#[command(about = "Regenerates and publishes a static podcast website")]
#[command(long_about = "\
Regenerates and publishes a static podcast website

Episodes are read from a SQLite database, rendered into an index page and one
page per year, exported as podcasts.json, and copied into a git clone of the
site repository. Episode artwork is downloaded from the podcast API and cached
under episode-photos/.

Output layout (page staging):

  build/pages/
  ├── podcasts.json            # Every episode, machine-readable
  ├── index.html               # Latest three episodes + all years
  ├── 2023.html                # One page per publication year
  └── episode-photos/
      └── <uid>.jpg            # Downloaded artwork or the default image

When the active profiles include \"cloud\", every top-level entry of the clone
is committed separately and the clone is pushed.

Run 'podcast-site gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "podcast-site.toml", global = true)]
    config: PathBuf,

    /// Extra deployment profile, e.g. `--profile cloud` (repeatable)
    #[arg(long = "profile", global = true)]
    profiles: Vec<String>,

    /// Password for the podcast API token endpoint
    #[arg(long, env = "PODCAST_SITE_API_PASSWORD", hide_env_values = true, global = true)]
    api_password: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one full build (default)
    Build,
    /// Load config and records, print a summary, write nothing
    Check,
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command.take().unwrap_or(Command::Build) {
        Command::Build => {
            let site_config = load_site_config(cli)?;
            init_thread_pool(&site_config.processing);
            let records =
                SqliteSource::new(&site_config.sql.database, &site_config.sql.load_podcasts);
            let api = ApiClient::new(&site_config.api)?;
            let git = GitCli::new(&site_config.output.git_clone);
            let clone = &site_config.output.git_clone;

            println!("==> Building site → {}", clone.display());
            let outcome =
                pipeline::Generator::new(&site_config, &records, &api, &git).build()?;
            output::print_build_outcome(&outcome, clone);
        }
        Command::Check => {
            let site_config = load_site_config(cli)?;
            let records =
                SqliteSource::new(&site_config.sql.database, &site_config.sql.load_podcasts);

            println!("==> Checking {}", site_config.sql.database.display());
            let report = pipeline::check(&site_config, &records, Utc::now())?;
            output::print_check_summary(&report);
            println!("==> Configuration and records are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file and apply command-line overrides.
fn load_site_config(cli: Cli) -> Result<config::SiteConfig, config::ConfigError> {
    let mut site_config = config::load_config(&cli.config)?;
    site_config.profiles.extend(cli.profiles);
    if let Some(password) = cli.api_password {
        site_config.api.password = password;
    }
    tracing::debug!(
        config = %cli.config.display(),
        profiles = ?site_config.profiles,
        "loaded config"
    );
    Ok(site_config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can constrain down,
/// not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
