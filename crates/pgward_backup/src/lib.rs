//! Backup, restore and status orchestration on top of the executor layer.
//!
//! Everything here is a sequence of shell invocations through [`Executor`] /
//! [`DockerOps`]; no transport details leak in. Logical dumps land on the
//! target host under `paths.backup_dir`; WAL-G runs inside the backup
//! container and manages its own storage.

use anyhow::{Context, Result};
use chrono::Utc;
use pgward_core::Config;
use pgward_exec::{DockerOps, Executor, Invocation};

const PG_DATA: &str = "/var/lib/postgresql/data";

pub struct BackupManager<'a> {
    exec: &'a dyn Executor,
}

/// Running/status view of one container.
#[derive(Debug, Clone)]
pub struct ContainerReport {
    pub name: String,
    pub running: bool,
    pub status: Option<String>,
}

/// What `pgward status` reports.
#[derive(Debug, Clone)]
pub struct StackStatus {
    pub postgres: ContainerReport,
    pub backup: ContainerReport,
    /// `pg_isready` result; only probed while the postgres container is up.
    pub postgres_ready: Option<bool>,
}

impl<'a> BackupManager<'a> {
    pub fn new(exec: &'a dyn Executor) -> Self {
        Self { exec }
    }

    fn config(&self) -> &Config {
        self.exec.config()
    }

    /// Dump one database with `pg_dump` into a timestamped file under the
    /// backup directory. Returns the dump path on the target host.
    pub async fn logical_backup(&self, db: &str) -> Result<String> {
        let config = self.config();
        let container = &config.containers.postgres;
        let dir = &config.paths.backup_dir;
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let path = format!("{dir}/{db}-{stamp}.sql");

        // Redirection runs in the host shell, so the dump lands outside the
        // container without needing a volume mount for the backup dir.
        self.exec
            .execute(Invocation::new(format!(
                "mkdir -p {dir} && docker exec {container} pg_dump -U postgres {db} > {path}"
            )))
            .await
            .with_context(|| format!("pg_dump of {db} failed"))?;

        tracing::info!(db, path = %path, "logical backup written");
        Ok(path)
    }

    /// Restore a logical dump by feeding it to `psql` on stdin.
    pub async fn logical_restore(&self, db: &str, path: &str) -> Result<()> {
        anyhow::ensure!(
            self.exec.file_exists(path).await?,
            "backup file not found: {path}"
        );

        let dump = self
            .exec
            .execute(Invocation::new(format!("cat {path}")).quiet())
            .await
            .with_context(|| format!("failed to read {path}"))?;

        let container = self.config().containers.postgres.clone();
        self.exec
            .docker_exec(
                &container,
                &format!("psql -U postgres {db}"),
                None,
                Some(&dump.stdout),
                true,
            )
            .await
            .with_context(|| format!("psql restore into {db} failed"))?;

        tracing::info!(db, path, "logical restore applied");
        Ok(())
    }

    /// Dump file names under the backup directory, newest naming last.
    /// A missing directory reads as "no backups", not an error.
    pub async fn list_logical_backups(&self) -> Result<Vec<String>> {
        let dir = &self.config().paths.backup_dir;
        let output = self
            .exec
            .execute(Invocation::new(format!("ls -1 {dir}")).quiet().check(false))
            .await?;
        if output.exit_code != 0 {
            return Ok(Vec::new());
        }
        Ok(output
            .stdout
            .lines()
            .filter(|line| line.ends_with(".sql"))
            .map(str::to_string)
            .collect())
    }

    /// Push a full base backup with WAL-G from inside the backup container.
    pub async fn walg_backup(&self) -> Result<()> {
        let container = self.config().containers.backup.clone();
        self.exec
            .docker_exec(
                &container,
                &format!("wal-g backup-push {PG_DATA}"),
                None,
                None,
                true,
            )
            .await
            .context("wal-g backup-push failed")?;
        tracing::info!("wal-g base backup pushed");
        Ok(())
    }

    /// WAL-G's own listing, verbatim.
    pub async fn walg_list(&self) -> Result<String> {
        let container = self.config().containers.backup.clone();
        let output = self
            .exec
            .docker_exec(&container, "wal-g backup-list", None, None, true)
            .await
            .context("wal-g backup-list failed")?;
        Ok(output.stdout)
    }

    /// Fetch a named base backup (`LATEST` works) into the data directory.
    /// The postgres container must be stopped by the operator first; this
    /// call does not manage container lifecycle.
    pub async fn walg_restore(&self, name: &str) -> Result<()> {
        let container = self.config().containers.backup.clone();
        self.exec
            .docker_exec(
                &container,
                &format!("wal-g backup-fetch {PG_DATA} {name}"),
                None,
                None,
                true,
            )
            .await
            .with_context(|| format!("wal-g backup-fetch {name} failed"))?;
        tracing::info!(name, "wal-g base backup fetched");
        Ok(())
    }

    pub async fn status(&self) -> Result<StackStatus> {
        let config = self.config();
        let postgres_name = config.containers.postgres.clone();
        let backup_name = config.containers.backup.clone();

        let postgres = self.container_report(&postgres_name).await?;
        let backup = self.container_report(&backup_name).await?;

        let postgres_ready = if postgres.running {
            let probe = self
                .exec
                .docker_exec(&postgres_name, "pg_isready -U postgres", None, None, false)
                .await?;
            Some(probe.exit_code == 0)
        } else {
            None
        };

        Ok(StackStatus {
            postgres,
            backup,
            postgres_ready,
        })
    }

    async fn container_report(&self, name: &str) -> Result<ContainerReport> {
        Ok(ContainerReport {
            name: name.to_string(),
            running: self.exec.check_container_running(name).await?,
            status: self.exec.get_container_status(name).await?,
        })
    }
}
