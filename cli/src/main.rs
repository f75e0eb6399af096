//! HANDLERSYNC CLI - Desired-state driver for handler mappings

use clap::{Args, Parser, Subcommand};
use handlersync_core::{DesiredHandler, Field, ScopePath, SyncConfig};
use handlersync_store::create_persistent_store;
use handlersync_webhandler::HandlerResource;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "handlersync")]
#[command(about = "Reconcile HTTP handler mappings against a configuration store")]
#[command(version)]
struct Cli {
    /// Store database path
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Logging level
    #[arg(long)]
    log_level: Option<String>,

    /// Configuration file (JSON), overridden by the flags above
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current state of a handler mapping
    Get {
        /// Handler name
        name: String,

        /// Scope path, e.g. "Default Web Site/app"
        #[arg(long, default_value = "")]
        scope: String,
    },

    /// Check whether a handler mapping is in its desired state
    Test {
        /// Handler name
        name: String,

        /// Scope path
        #[arg(long, default_value = "")]
        scope: String,

        /// The entry should not exist
        #[arg(long)]
        absent: bool,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Converge a handler mapping toward its desired state
    Set {
        /// Handler name
        name: String,

        /// Scope path
        #[arg(long, default_value = "")]
        scope: String,

        /// Remove the entry
        #[arg(long)]
        absent: bool,

        #[command(flatten)]
        fields: FieldArgs,
    },
}

#[derive(Args)]
struct FieldArgs {
    /// Native-module executable path
    #[arg(long)]
    path: Option<String>,

    /// HTTP verbs handled, e.g. "GET,POST"
    #[arg(long)]
    verb: Option<String>,

    /// Managed handler type name
    #[arg(long)]
    handler_type: Option<String>,

    /// Module list
    #[arg(long)]
    modules: Option<String>,

    /// Script processor
    #[arg(long)]
    script_processor: Option<String>,

    /// Precondition expression
    #[arg(long)]
    pre_condition: Option<String>,

    /// Required access rights: None, Read, Write, Script, or Execute
    #[arg(long)]
    require_access: Option<String>,

    /// Resource type
    #[arg(long)]
    resource_type: Option<String>,

    /// Allow path info
    #[arg(long)]
    allow_path_info: Option<bool>,

    /// Response buffer limit in bytes
    #[arg(long)]
    response_buffer_limit: Option<u64>,

    /// Fields to clear explicitly, comma-separated
    #[arg(long, value_delimiter = ',')]
    clear: Vec<String>,
}

impl FieldArgs {
    fn into_desired(self, absent: bool) -> anyhow::Result<DesiredHandler> {
        let mut desired = if absent {
            DesiredHandler::absent()
        } else {
            DesiredHandler::present()
        };
        if let Some(path) = self.path {
            desired = desired.physical_handler_path(path);
        }
        if let Some(verb) = self.verb {
            desired = desired.verb(verb);
        }
        if let Some(handler_type) = self.handler_type {
            desired = desired.handler_type(handler_type);
        }
        if let Some(modules) = self.modules {
            desired = desired.modules(modules);
        }
        if let Some(script_processor) = self.script_processor {
            desired = desired.script_processor(script_processor);
        }
        if let Some(pre_condition) = self.pre_condition {
            desired = desired.pre_condition(pre_condition);
        }
        if let Some(require_access) = self.require_access {
            desired = desired.require_access(require_access.parse()?);
        }
        if let Some(resource_type) = self.resource_type {
            desired = desired.resource_type(resource_type);
        }
        if let Some(allow_path_info) = self.allow_path_info {
            desired = desired.allow_path_info(allow_path_info);
        }
        if let Some(limit) = self.response_buffer_limit {
            desired = desired.response_buffer_limit(limit);
        }
        for field in self.clear {
            let field: Field = field.parse()?;
            desired = desired.clear(field)?;
        }
        Ok(desired)
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SyncConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(SyncConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }

    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = create_persistent_store(&config.store_path)?;
    let resource = HandlerResource::new(store);

    match cli.command {
        Commands::Get { name, scope } => {
            let scope: ScopePath = scope.parse()?;
            let state = resource.get(&name, &scope)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::Test {
            name,
            scope,
            absent,
            fields,
        } => {
            let scope: ScopePath = scope.parse()?;
            let desired = fields.into_desired(absent)?;
            let result = resource.test_verbose(&name, &scope, &desired)?;
            if result.converged {
                println!("'{}' is in the desired state", name);
            } else {
                println!("'{}' is NOT in the desired state", name);
                if config.verbose_drift {
                    for field in &result.drift {
                        println!("  drift: {}", field);
                    }
                }
                std::process::exit(1);
            }
        }

        Commands::Set {
            name,
            scope,
            absent,
            fields,
        } => {
            let scope: ScopePath = scope.parse()?;
            let desired = fields.into_desired(absent)?;
            resource.set(&name, &scope, &desired)?;
            println!("Converged '{}'", name);
        }
    }

    Ok(())
}
