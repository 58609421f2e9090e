use clap::{Parser, Subcommand};
use simple_assets::{config, manager::AssetManager, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simple-assets")]
#[command(about = "Dependency-ordered script and stylesheet tags with cached, combined bundles")]
#[command(long_about = "\
Dependency-ordered script and stylesheet tags with cached, combined bundles

Scripts and stylesheets are declared in assets.toml, alone or in named
groups. Rendering a group prints the <script> and <link> tags a page needs,
requirements first, served from minified cache artifacts or combined
bundles that are rebuilt whenever a source changes.

Directory layout (defaults):

  assets.toml                  # Declarations and options
  public/                      # base_path, served at base_url
  ├── js/                      # script_dir
  ├── css/                     # style_dir
  └── cache/                   # cache_dir (generated, safe to clear)

Run 'simple-assets gen-config' to generate a documented assets.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "assets.toml", global = true)]
    config: PathBuf,

    /// Overlay config merged on top (ignored when missing)
    #[arg(long, global = true)]
    overlay: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tags for the default group plus any groups given
    Render {
        /// Groups to load
        groups: Vec<String>,
    },
    /// Validate the config and list the declared inventory
    Check {
        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every generated artifact and bundle
    ClearCache,
    /// Print a stock assets.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Render { groups } => {
            let mut manager = open(&cli.config, cli.overlay.as_deref())?;
            for group in groups {
                manager.load_group(group)?;
            }
            let tags = manager.render();
            output::print_render_output(&tags, manager.stats());
        }
        Command::Check { json } => {
            let manager = open(&cli.config, cli.overlay.as_deref())?;
            if *json {
                let inventory = output::Inventory::from_registry(manager.registry());
                println!("{}", serde_json::to_string_pretty(&inventory)?);
            } else {
                println!("==> Checking {}", cli.config.display());
                output::print_inventory(manager.registry());
                println!("==> Config is valid");
            }
        }
        Command::ClearCache => {
            let manager = open(&cli.config, cli.overlay.as_deref())?;
            let removed = manager.clear_cache()?;
            println!(
                "Removed {} cached file(s) from {}",
                removed,
                manager.config().cache_path().display()
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so rendered tags on stdout stay clean.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn open(path: &Path, overlay: Option<&Path>) -> Result<AssetManager, Box<dyn std::error::Error>> {
    let config = config::load_config_layered(path, overlay)?;
    Ok(AssetManager::new(config)?)
}
