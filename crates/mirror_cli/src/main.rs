//! ShopMirror CLI - local administration and on-demand sync runs
//!
//! Usage: shopmirror <command> [options]

use clap::{Parser, Subcommand};
use mirror_common::{Installation, ResourceKind, EXIT_CONFIG_ERROR, EXIT_ERROR};
use mirror_config::{default_config_toml, Config};
use mirror_store::Db;
use mirror_sync::SyncOrchestrator;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "shopmirror",
    version = "0.1.0",
    about = "Mirror remote commerce data into local storage"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(long, global = true, default_value = "shopmirror.toml")]
    config: PathBuf,

    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file and create the mirror database
    Init,

    /// Manage stored installations
    Installation {
        #[command(subcommand)]
        action: InstallationAction,
    },

    /// Run one synchronization for an installation
    Sync {
        /// Remote installation identifier
        #[arg(long)]
        installation: String,

        /// Resource kind: products or orders
        #[arg(long)]
        resource: String,

        /// Output the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show mirror database statistics
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum InstallationAction {
    /// Register or update an installation
    Add {
        /// Remote installation identifier
        id: String,

        /// Shop domain prefix (e.g. "acme")
        #[arg(long)]
        shop: Option<String>,

        /// Company-scoped API token
        #[arg(long)]
        company_token: Option<String>,

        /// Integration API token
        #[arg(long)]
        integration_token: Option<String>,

        /// Webhook-verification token
        #[arg(long)]
        webhook_token: Option<String>,

        /// Register as inactive
        #[arg(long)]
        inactive: bool,
    },

    /// List stored installations
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark an installation active
    Activate { id: String },

    /// Mark an installation inactive
    Deactivate { id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    mirror_common::telemetry::init_tracing(cli.verbose, false);
    tracing::debug!("ShopMirror CLI started");

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let result = match cli.command {
        Commands::Init => cmd_init(&cli.config, &config),
        Commands::Installation { action } => cmd_installation(&config, action),
        Commands::Sync {
            installation,
            resource,
            json,
        } => cmd_sync(&config, &installation, &resource, json).await,
        Commands::Status { json } => cmd_status(&config, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(EXIT_ERROR);
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = Config::load(path)?;
    config.validate()?;
    Ok(config)
}

fn open_db(config: &Config) -> anyhow::Result<Db> {
    Db::open(&config.database.path)
}

//
// Command implementations
//

fn cmd_init(config_path: &Path, config: &Config) -> anyhow::Result<()> {
    if config_path.exists() {
        eprintln!("✓ {} already exists", config_path.display());
    } else {
        std::fs::write(config_path, default_config_toml())?;
        eprintln!("✓ Created {}", config_path.display());
    }

    // Opening runs the schema migrations
    open_db(config)?;
    eprintln!("✓ Database ready at {}", config.database.path.display());
    Ok(())
}

fn cmd_installation(config: &Config, action: InstallationAction) -> anyhow::Result<()> {
    let db = open_db(config)?;

    match action {
        InstallationAction::Add {
            id,
            shop,
            company_token,
            integration_token,
            webhook_token,
            inactive,
        } => {
            let now = chrono::Utc::now().timestamp();
            db.upsert_installation(&Installation {
                remote_installation_id: id.clone(),
                shop_domain: shop,
                active: !inactive,
                company_token,
                integration_token,
                webhook_token,
                created_at: now,
                updated_at: now,
            })?;
            eprintln!("✓ Stored installation {}", id);
        }
        InstallationAction::List { json } => {
            let installations = db.list_installations()?;
            if json {
                let rows: Vec<_> = installations
                    .iter()
                    .map(|i| {
                        serde_json::json!({
                            "id": i.remote_installation_id,
                            "shop_domain": i.shop_domain,
                            "active": i.active,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for i in &installations {
                    println!(
                        "{}  shop={}  {}",
                        i.remote_installation_id,
                        i.shop_domain.as_deref().unwrap_or("-"),
                        if i.active { "active" } else { "inactive" }
                    );
                }
                if installations.is_empty() {
                    eprintln!("No installations stored");
                }
            }
        }
        InstallationAction::Activate { id } => {
            set_active(&db, &id, true)?;
            eprintln!("✓ Activated {}", id);
        }
        InstallationAction::Deactivate { id } => {
            set_active(&db, &id, false)?;
            eprintln!("✓ Deactivated {}", id);
        }
    }

    Ok(())
}

fn set_active(db: &Db, id: &str, active: bool) -> anyhow::Result<()> {
    if !db.set_installation_active(id, active)? {
        anyhow::bail!("installation not found: {}", id);
    }
    Ok(())
}

async fn cmd_sync(
    config: &Config,
    installation: &str,
    resource: &str,
    json: bool,
) -> anyhow::Result<()> {
    let resource: ResourceKind = resource
        .parse()
        .map_err(|e: mirror_common::MirrorError| anyhow::anyhow!(e))?;

    let mut db = open_db(config)?;
    let orchestrator =
        SyncOrchestrator::from_config(config).map_err(|e| anyhow::anyhow!("{}", e))?;

    let summary = orchestrator
        .run(&mut db, installation, resource)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Synced {} {} ({} errors)",
            summary.synced, resource, summary.errors
        );
    }
    Ok(())
}

fn cmd_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let db = open_db(config)?;
    let stats = db.stats()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "database": config.database.path,
                "installations": stats.installation_count,
                "products": stats.product_count,
                "orders": stats.order_count,
            }))?
        );
    } else {
        println!("Database:      {}", config.database.path.display());
        println!("Installations: {}", stats.installation_count);
        println!("Products:      {}", stats.product_count);
        println!("Orders:        {}", stats.order_count);
    }
    Ok(())
}
