//! `mapmodel`: render, refresh and reconcile identity map models against a
//! JSON store snapshot

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context as _};
use clap::{Args, Parser, Subcommand};
use mm_model::MapModel;
use mm_store::{InMemoryStore, ObjectStoreExt, StaticAccountDirectory};
use mm_transform::{Context, IdentityTransformer, ReconcilerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mapmodel", version, about = "Identity map model reconciler")]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the map model of a stored identity
    Show {
        #[command(flatten)]
        common: Common,

        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        id: Option<String>,

        #[arg(long)]
        name: Option<String>,

        /// Populate derived info
        #[arg(long)]
        expand: bool,

        /// Include account links
        #[arg(long)]
        links: bool,
    },

    /// Recompute the derived info of an edited model
    Refresh {
        #[command(flatten)]
        common: Common,

        /// Model JSON file, `-` for stdin
        #[arg(long)]
        model: PathBuf,
    },

    /// Print the change plan of an edited model, or `null`
    Plan {
        #[command(flatten)]
        common: Common,

        /// Model JSON file, `-` for stdin
        #[arg(long)]
        model: PathBuf,
    },
}

#[derive(Debug, Args)]
struct Common {
    /// Store snapshot JSON file
    #[arg(long)]
    snapshot: PathBuf,

    /// Reconciler config (YAML, or JSON by extension)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Common {
    fn load(&self) -> anyhow::Result<(InMemoryStore, ReconcilerConfig)> {
        let store = InMemoryStore::load(&self.snapshot)
            .with_context(|| format!("loading snapshot {}", self.snapshot.display()))?;
        let config = match &self.config {
            Some(path) => ReconcilerConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ReconcilerConfig::default(),
        };
        Ok((store, config))
    }
}

fn read_model(path: &Path) -> anyhow::Result<MapModel> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).context("parsing map model")
}

/// Accounts already linked in the snapshot, for the pre-creation existence check
fn linked_accounts(store: &InMemoryStore) -> StaticAccountDirectory {
    let accounts = StaticAccountDirectory::new();
    for link in store.snapshot().links {
        if let Some(native_identity) = link.native_identity {
            accounts.add(link.application, native_identity);
        }
    }
    accounts
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> anyhow::Result<String> {
    match cli.command {
        Command::Show {
            common,
            id,
            name,
            expand,
            links,
        } => {
            let (store, config) = common.load()?;
            let encryptor = config.encryptor()?;
            let identity = match (&id, &name) {
                (Some(id), _) => store.identity_by_id(id)?,
                (None, Some(name)) => store.identity_by_name(name)?,
                (None, None) => bail!("one of --id or --name is required"),
            };
            let Some(identity) = identity else {
                bail!("identity {} not found", id.or(name).unwrap_or_default());
            };
            let mut options = config.options;
            if expand {
                options = options.with_expand_identity(true);
            }
            if links {
                options = options.with_expand_links(true);
            }
            let ctx = Context::new(&store, &config.identity_config, &encryptor);
            let model = IdentityTransformer::new(ctx, options).to_map(&identity)?;
            Ok(serde_json::to_string_pretty(&model)?)
        }
        Command::Refresh { common, model } => {
            let (store, config) = common.load()?;
            let encryptor = config.encryptor()?;
            let model = read_model(&model)?;
            let ctx = Context::new(&store, &config.identity_config, &encryptor);
            let model = IdentityTransformer::new(ctx, config.options).refresh(model)?;
            Ok(serde_json::to_string_pretty(&model)?)
        }
        Command::Plan { common, model } => {
            let (store, config) = common.load()?;
            let encryptor = config.encryptor()?;
            let model = read_model(&model)?;
            let accounts = linked_accounts(&store);
            let mut ctx = Context::new(&store, &config.identity_config, &encryptor);
            if config.options.check_account_exists {
                ctx = ctx.with_accounts(&accounts);
            }
            let plan = IdentityTransformer::new(ctx, config.options).map_to_plan(&model)?;
            Ok(serde_json::to_string_pretty(&plan)?)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
