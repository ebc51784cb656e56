use std::sync::Arc;

use anyhow::{Context, Result};
use futures::FutureExt;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{Config, TaskConfig};
use crate::dispatch::DingClient;
use crate::scheduler::Scheduler;

/// Send a configured task's message once.
pub async fn run_task(client: &DingClient, config: &Config, task: &TaskConfig) -> Result<()> {
    let robot = config
        .robot(&task.robot)
        .with_context(|| format!("Task '{}' references unknown robot '{}'", task.name, task.robot))?;
    let message = config.task_message(task)?;
    client
        .send_group_message(robot, &message)
        .await
        .with_context(|| format!("Task '{}' failed", task.name))?;
    Ok(())
}

/// Register one cron job per configured task. Each firing is a single
/// best-effort send; failures are logged and the job keeps its schedule.
pub async fn register_tasks(
    scheduler: &Scheduler,
    client: Arc<DingClient>,
    config: Arc<Config>,
) -> Result<Vec<(String, Uuid)>> {
    let mut registered = Vec::with_capacity(config.tasks.len());

    for task in &config.tasks {
        let client = client.clone();
        let config_for_job = config.clone();
        let task_name = task.name.clone();

        let id = scheduler
            .add_cron_job(&task.cron, &task.name, move || {
                let client = client.clone();
                let config = config_for_job.clone();
                let task_name = task_name.clone();
                async move {
                    let Some(task) = config.task(&task_name) else {
                        error!("Task '{}' disappeared from config", task_name);
                        return;
                    };
                    match run_task(&client, &config, task).await {
                        Ok(()) => info!("Task '{}' delivered", task_name),
                        Err(e) => error!("{:#}", e),
                    }
                }
                .boxed()
            })
            .await?;

        registered.push((task.name.clone(), id));
    }

    info!("Registered {} scheduled task(s)", registered.len());
    Ok(registered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config_for(server: &MockServer) -> Config {
        let body = format!(
            r#"
[gateway]
webhook_url = "{}"

[[robots]]
id = "tok-ops"
type = "1"
name = "ops"

[[tasks]]
name = "ping"
robot = "ops"
cron = "0 0 9 * * *"

[tasks.msg_text]
content = "ping"
"#,
            server.url("/robot/send")
        );
        Config::parse(&body).unwrap()
    }

    #[tokio::test]
    async fn test_run_task_sends_configured_message() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/robot/send")
                .query_param("access_token", "tok-ops")
                .json_body(json!({
                    "msgtype": "text",
                    "text": {"content": "ping"},
                    "at": {"atMobiles": [], "atUserIds": [], "isAtAll": false}
                }));
            then.status(200)
                .json_body(json!({"errcode": 0, "errmsg": "ok"}));
        });

        let config = config_for(&server);
        let client = DingClient::new(&config.gateway).unwrap();
        let task = config.task("ping").unwrap();
        run_task(&client, &config, task).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_run_task_reports_gateway_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/robot/send");
            then.status(200)
                .json_body(json!({"errcode": 310000, "errmsg": "keywords not in content"}));
        });

        let config = config_for(&server);
        let client = DingClient::new(&config.gateway).unwrap();
        let task = config.task("ping").unwrap();
        let err = run_task(&client, &config, task).await.unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("Task 'ping' failed"));
        assert!(rendered.contains("keywords not in content"));
    }

    #[tokio::test]
    async fn test_register_tasks_returns_job_ids() {
        let server = MockServer::start();
        let config = Arc::new(config_for(&server));
        let client = Arc::new(DingClient::new(&config.gateway).unwrap());
        let scheduler = Scheduler::new().await.unwrap();

        let registered = register_tasks(&scheduler, client, config).await.unwrap();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].0, "ping");
    }

    #[tokio::test]
    async fn test_register_tasks_rejects_bad_cron() {
        let server = MockServer::start();
        let mut config = config_for(&server);
        config.tasks[0].cron = "not a cron".to_string();
        let client = Arc::new(DingClient::new(&config.gateway).unwrap());
        let scheduler = Scheduler::new().await.unwrap();

        let err = register_tasks(&scheduler, client, Arc::new(config))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to create cron job 'ping'"));
    }
}
