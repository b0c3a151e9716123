use assetgate_manifest::{parse_manifest_file, resolve, AliasTable, BUILTIN_PRESETS};
use assetgate_server::config::NO_PRESET;
use assetgate_server::{Gateway, GatewayConfig, ResponseStrategy};
use assetgate_store::OriginConfig;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "assetgate",
    version,
    about = "Serve stable asset URLs backed by a content-hashed build manifest"
)]
struct Cli {
    /// Path to the gateway config file (default: ./assetgate.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP gateway.
    Serve(ServeArgs),
    /// Resolve an alias against a manifest file without serving.
    Resolve {
        /// Public alias path, e.g. /main.css.
        alias: String,
        /// Path to the manifest JSON file.
        #[arg(long, default_value = "dist/.vite/manifest.json")]
        manifest: PathBuf,
        /// Built-in alias preset to use instead of the configured table.
        #[arg(long)]
        preset: Option<String>,
    },
    /// Print an alias table.
    Aliases {
        /// Built-in preset to print instead of the configured table.
        #[arg(long)]
        preset: Option<String>,
        /// List the built-in presets.
        #[arg(long, default_value_t = false)]
        list: bool,
    },
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Interface to listen on.
    #[arg(long)]
    bind: Option<String>,
    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,
    /// Serve assets from a local build directory.
    #[arg(long, conflicts_with = "origin_url")]
    origin_dir: Option<PathBuf>,
    /// Serve assets from a remote HTTP origin.
    #[arg(long)]
    origin_url: Option<String>,
    /// Answer aliases with a redirect or the proxied file.
    #[arg(long, value_enum)]
    strategy: Option<ResponseStrategy>,
    /// URL path of the build manifest on the origin.
    #[arg(long)]
    manifest_path: Option<String>,
    /// Built-in alias preset to start from.
    #[arg(long)]
    preset: Option<String>,
    /// Number of request worker threads.
    #[arg(long)]
    workers: Option<usize>,
}

impl ServeArgs {
    fn apply(self, config: &mut GatewayConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = self.origin_dir {
            config.origin = OriginConfig::dir(dir);
        } else if let Some(url) = self.origin_url {
            config.origin = OriginConfig::url(&url);
        }
        if let Some(strategy) = self.strategy {
            config.response.strategy = strategy;
        }
        if let Some(path) = self.manifest_path {
            config.manifest.path = path;
        }
        if let Some(preset) = self.preset {
            config.aliases.preset = preset;
        }
        if let Some(workers) = self.workers {
            config.server.workers = workers;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn alias_table(config: &GatewayConfig, preset: Option<&str>) -> Result<AliasTable, String> {
    let mut config = config.clone();
    if let Some(preset) = preset {
        config.aliases.preset = preset.to_owned();
        config.aliases.entries.clear();
    }
    config.alias_table().map_err(|e| e.to_string())
}

fn cmd_serve(mut config: GatewayConfig, args: ServeArgs) -> Result<(), String> {
    args.apply(&mut config);
    let gateway = Gateway::from_config(&config).map_err(|e| e.to_string())?;
    let addr = config.listen_addr();
    info!(
        "starting assetgate on {addr} ({} origin, {} strategy, manifest {})",
        gateway.store_name(),
        gateway.strategy(),
        gateway.manifest_path()
    );
    for alias in gateway.aliases().iter() {
        info!("alias {} -> {:?}", alias.path, alias.keys);
    }
    assetgate_server::run_server(gateway, &addr, config.server.workers).map_err(|e| e.to_string())
}

fn cmd_resolve(
    config: &GatewayConfig,
    alias_path: &str,
    manifest_path: &Path,
    preset: Option<&str>,
    json: bool,
) -> Result<bool, String> {
    let table = alias_table(config, preset)?;
    let Some(alias) = table.classify(alias_path) else {
        return Err(format!("'{alias_path}' is not a configured alias"));
    };
    let manifest = parse_manifest_file(manifest_path)
        .map_err(|e| format!("{}: {e}", manifest_path.display()))?;

    let resolution = resolve(&manifest, alias);
    if json {
        let value = match &resolution {
            Some(r) => serde_json::json!({
                "alias": alias.path,
                "location": r.location(),
                "key": r.key,
                "phase": r.phase.as_str(),
            }),
            None => serde_json::json!({ "alias": alias.path, "location": null }),
        };
        let out = serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?;
        println!("{out}");
    } else {
        match &resolution {
            Some(r) => println!(
                "{} -> {} (key '{}', {})",
                alias.path,
                r.location(),
                r.key,
                r.phase
            ),
            None => println!("{}: entry not found in manifest", alias.path),
        }
    }
    Ok(resolution.is_some())
}

fn cmd_aliases(
    config: &GatewayConfig,
    preset: Option<&str>,
    list: bool,
    json: bool,
) -> Result<(), String> {
    if list {
        if json {
            let presets: Vec<_> = BUILTIN_PRESETS
                .iter()
                .map(|p| serde_json::json!({ "name": p.name, "description": p.description }))
                .collect();
            let out = serde_json::to_string_pretty(&presets).map_err(|e| e.to_string())?;
            println!("{out}");
        } else {
            for p in BUILTIN_PRESETS {
                println!("{:<10} {}", p.name, p.description);
            }
            println!("{NO_PRESET:<10} start from an empty table");
        }
        return Ok(());
    }

    let table = alias_table(config, preset)?;
    if json {
        let aliases: Vec<_> = table
            .iter()
            .map(|a| serde_json::json!({ "path": a.path, "kind": a.kind(), "keys": a.keys }))
            .collect();
        let out = serde_json::to_string_pretty(&aliases).map_err(|e| e.to_string())?;
        println!("{out}");
    } else {
        for alias in table.iter() {
            println!("{:<24} [{}] {}", alias.path, alias.kind(), alias.keys.join(", "));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match GatewayConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => cmd_serve(config, args).map(|()| true),
        Commands::Resolve {
            alias,
            manifest,
            preset,
        } => cmd_resolve(&config, &alias, &manifest, preset.as_deref(), cli.json),
        Commands::Aliases { preset, list } => {
            cmd_aliases(&config, preset.as_deref(), list, cli.json).map(|()| true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
