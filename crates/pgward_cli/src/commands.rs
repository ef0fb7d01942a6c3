use crate::{BackupKind, Commands, ConfigAction, RestoreKind};
use anyhow::Result;
use pgward_backup::{BackupManager, StackStatus};
use pgward_core::Config;
use pgward_exec::{build_executor, with_executor, Executor, OutputSink, StdoutSink};
use std::path::Path;
use std::sync::Arc;

pub async fn run(command: Commands, config_path: &Path) -> Result<()> {
    // Config management works without (and before) a usable config file.
    let command = match command {
        Commands::Config { action } => return run_config(action, config_path),
        other => other,
    };

    if !config_path.exists() {
        println!(
            "Configuration not found: {} (run `pgward config init`)",
            config_path.display()
        );
        std::process::exit(1);
    }
    let config = Arc::new(Config::load(config_path)?);
    if !config.validate() {
        for error in config.validation_errors() {
            eprintln!("config error: {error}");
        }
        anyhow::bail!("invalid configuration: {}", config_path.display());
    }

    let sink: Arc<dyn OutputSink> = Arc::new(StdoutSink);
    let executor = build_executor(config, sink).await?;
    with_executor(executor.as_ref(), |exec| dispatch(command, exec)).await
}

async fn dispatch(command: Commands, exec: &dyn Executor) -> Result<()> {
    let manager = BackupManager::new(exec);
    match command {
        Commands::Backup { kind } => match kind {
            BackupKind::Logical { db } => {
                let databases = match db {
                    Some(db) => vec![db],
                    None => exec.config().databases.clone(),
                };
                anyhow::ensure!(!databases.is_empty(), "no databases configured");
                for db in databases {
                    let path = manager.logical_backup(&db).await?;
                    println!("Backed up {db} -> {path}");
                }
            }
            BackupKind::Walg => {
                manager.walg_backup().await?;
                println!("WAL-G base backup pushed");
            }
        },
        Commands::Restore { kind } => match kind {
            RestoreKind::Logical { file, db } => {
                manager.logical_restore(&db, &file).await?;
                println!("Restored {db} from {file}");
            }
            RestoreKind::Walg { name } => {
                manager.walg_restore(&name).await?;
                println!("Fetched WAL-G backup {name}");
            }
        },
        Commands::List => {
            let logical = manager.list_logical_backups().await?;
            println!("Logical dumps ({}):", logical.len());
            for name in logical {
                println!("  {name}");
            }
            let listing = manager.walg_list().await?;
            println!("WAL-G backups:");
            for line in listing.lines() {
                println!("  {line}");
            }
        }
        Commands::Status => print_status(&manager.status().await?),
        Commands::Config { .. } => unreachable!("handled before transport setup"),
    }
    Ok(())
}

fn print_status(status: &StackStatus) {
    for report in [&status.postgres, &status.backup] {
        let state = if report.running { "running" } else { "stopped" };
        let detail = report.status.as_deref().unwrap_or("not found");
        println!("{:<16} {:<8} {}", report.name, state, detail);
    }
    match status.postgres_ready {
        Some(true) => println!("postgres is accepting connections"),
        Some(false) => println!("postgres is NOT accepting connections"),
        None => {}
    }
}

fn run_config(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            if path.exists() {
                let config = Config::load(path)?;
                println!("pgward configuration ({})", path.display());
                print_config(&config);
            } else {
                // No file yet: show what the tool would actually run with,
                // i.e. defaults plus PGWARD_* env overrides.
                let config = Config::load_or_default(path);
                println!(
                    "No configuration found at {} (showing effective defaults)",
                    path.display()
                );
                print_config(&config);
            }
        }
        ConfigAction::Init => {
            Config::write_template(path)?;
            println!("Wrote starter config to {}", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

fn print_config(config: &Config) {
    println!("  execution_mode: {:?}", config.execution_mode);
    println!("  databases:      {}", config.databases.join(", "));
    println!(
        "  containers:     postgres={} backup={}",
        config.containers.postgres, config.containers.backup
    );
    println!("  backup_dir:     {}", config.paths.backup_dir);
    println!("  docker_compose: {}", config.paths.docker_compose);
    if config.execution_mode == pgward_core::ExecutionMode::Remote {
        println!(
            "  remote:         {}@{}:{} (key: {})",
            config.remote.user, config.remote.host, config.remote.port, config.remote.ssh_key_path
        );
    }
    let errors = config.validation_errors();
    if errors.is_empty() {
        println!("  valid: yes");
    } else {
        println!("  valid: no");
        for error in errors {
            println!("    - {error}");
        }
    }
}
