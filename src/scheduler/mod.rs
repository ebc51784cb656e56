pub mod tasks;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};
use uuid::Uuid;

/// Cron runner for configured sends.
pub struct Scheduler {
    jobs: JobScheduler,
}

impl Scheduler {
    pub async fn new() -> Result<Self> {
        let jobs = JobScheduler::new()
            .await
            .context("Could not initialise the cron runner")?;
        Ok(Self { jobs })
    }

    /// Register `send` to fire on `cron_expr`. Returns the job id.
    pub async fn add_cron_job<F>(&self, cron_expr: &str, name: &str, send: F) -> Result<Uuid>
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let label = name.to_string();
        let job = Job::new_async(cron_expr, move |job_id, _runner| {
            let label = label.clone();
            let firing = send();
            Box::pin(async move {
                debug!("Cron job {} fired for task '{}'", job_id, label);
                firing.await;
            })
        })
        .with_context(|| format!("Failed to create cron job '{}' ({})", name, cron_expr))?;

        let job_id = self
            .jobs
            .add(job)
            .await
            .with_context(|| format!("Cron runner refused task '{}'", name))?;

        info!("Task '{}' scheduled as job {} ({})", name, job_id, cron_expr);
        Ok(job_id)
    }

    pub async fn start(&self) -> Result<()> {
        self.jobs
            .start()
            .await
            .context("Could not start the cron runner")?;
        info!("Cron runner started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.jobs
            .shutdown()
            .await
            .context("Cron runner did not shut down cleanly")?;
        info!("Cron runner stopped");
        Ok(())
    }
}
