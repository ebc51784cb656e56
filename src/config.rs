use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::message::{MessageVariant, RawMessage, UnmatchedPolicy};
use crate::robot::RobotIdentity;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub robots: Vec<RobotIdentity>,
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,
    #[serde(default = "default_batch_send_url")]
    pub batch_send_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Skip TLS certificate checks on the batch-send endpoint only.
    #[serde(default)]
    pub batch_send_insecure_skip_verify: bool,
    #[serde(default)]
    pub unmatched_message: UnmatchedPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            webhook_url: default_webhook_url(),
            batch_send_url: default_batch_send_url(),
            timeout_secs: default_timeout_secs(),
            batch_send_insecure_skip_verify: false,
            unmatched_message: UnmatchedPolicy::default(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// A message sent on a cron schedule.
#[derive(Debug, Deserialize, Clone)]
pub struct TaskConfig {
    pub name: String,
    /// Robot name or id.
    pub robot: String,
    /// Six-field cron expression (seconds first).
    pub cron: String,
    #[serde(flatten)]
    pub message: RawMessage,
}

fn default_webhook_url() -> String {
    "https://oapi.dingtalk.com/robot/send".to_string()
}

fn default_batch_send_url() -> String {
    "https://api.dingtalk.com/v1.0/robot/oToMessages/batchSend".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Look a robot up by name first, then by id.
    pub fn robot(&self, key: &str) -> Option<&RobotIdentity> {
        self.robots
            .iter()
            .find(|r| !r.name.is_empty() && r.name == key)
            .or_else(|| self.robots.iter().find(|r| r.id == key))
    }

    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// The task's message under the configured unmatched-message policy.
    pub fn task_message(&self, task: &TaskConfig) -> Result<MessageVariant> {
        task.message
            .resolve(self.gateway.unmatched_message)
            .with_context(|| format!("Task '{}' has an invalid message", task.name))
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for robot in &self.robots {
            if robot.id.trim().is_empty() {
                bail!("Robot '{}' has an empty id", robot.name);
            }
            if !robot.name.is_empty() && !names.insert(robot.name.as_str()) {
                bail!("Duplicate robot name: {}", robot.name);
            }
        }

        let mut task_names = HashSet::new();
        for task in &self.tasks {
            if !task_names.insert(task.name.as_str()) {
                bail!("Duplicate task name: {}", task.name);
            }
            if task.cron.trim().is_empty() {
                bail!("Task '{}' has an empty cron expression", task.name);
            }
            if self.robot(&task.robot).is_none() {
                bail!("Task '{}' references unknown robot '{}'", task.name, task.robot);
            }
            self.task_message(task)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::{DeliveryStrategy, RobotKind};
    use std::io::Write;

    const SAMPLE: &str = r###"
[gateway]
timeout_secs = 3

[[robots]]
id = "tok-ops"
type = "2"
secret = "SECabc"
name = "ops"

[[robots]]
id = "tok-internal"
type = "enterprise_internal"
name = "internal"

[[tasks]]
name = "standup"
robot = "ops"
cron = "0 30 9 * * Mon-Fri"

[tasks.msg_text]
content = "Standup in 5 minutes"

[tasks.msg_text.at]
is_at_all = true

[[tasks]]
name = "weekly"
robot = "tok-internal"
cron = "0 0 17 * * Fri"

[tasks.msg_markdown]
title = "Weekly"
text = "## Ship it"
"###;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.gateway.timeout(), Duration::from_secs(3));
        assert_eq!(config.gateway.webhook_url, "https://oapi.dingtalk.com/robot/send");
        assert!(!config.gateway.batch_send_insecure_skip_verify);
        assert_eq!(config.robots.len(), 2);

        let ops = config.robot("ops").unwrap();
        assert_eq!(ops.kind, RobotKind::CustomWebhook);
        assert_eq!(ops.strategy(), DeliveryStrategy::Signed);

        let internal = config.robot("tok-internal").unwrap();
        assert_eq!(internal.strategy(), DeliveryStrategy::Token);

        let standup = config.task("standup").unwrap();
        match config.task_message(standup).unwrap() {
            MessageVariant::Text(text) => {
                assert_eq!(text.content, "Standup in 5 minutes");
                assert!(text.at.is_at_all);
            }
            other => panic!("expected text message, got {other:?}"),
        }
        let weekly = config.task("weekly").unwrap();
        match config.task_message(weekly).unwrap() {
            MessageVariant::Markdown(markdown) => assert_eq!(markdown.text, "## Ship it"),
            other => panic!("expected markdown message, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_markdown_section_name() {
        let config = Config::parse(
            r#"
[[robots]]
id = "tok"
type = "1"
name = "r"

[[tasks]]
name = "legacy"
robot = "r"
cron = "0 0 9 * * *"

[tasks.msg_mark_down]
title = "Daily"
text = "all good"
"#,
        )
        .unwrap();
        let task = config.task("legacy").unwrap();
        assert_eq!(config.task_message(task).unwrap().msgtype(), "markdown");
    }

    #[test]
    fn test_defaults_when_gateway_missing() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.gateway.timeout(), Duration::from_secs(5));
        assert_eq!(
            config.gateway.batch_send_url,
            "https://api.dingtalk.com/v1.0/robot/oToMessages/batchSend"
        );
        assert_eq!(config.gateway.unmatched_message, UnmatchedPolicy::Reject);
    }

    #[test]
    fn test_unknown_robot_rejected() {
        let err = Config::parse(
            r#"
[[tasks]]
name = "t"
robot = "ghost"
cron = "0 * * * * *"
[tasks.msg_text]
content = "hi"
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("unknown robot 'ghost'"));
    }

    #[test]
    fn test_task_without_message_depends_on_policy() {
        let body = r#"
[[robots]]
id = "tok"
type = "1"
name = "r"

[[tasks]]
name = "empty"
robot = "r"
cron = "0 * * * * *"
"#;
        assert!(Config::parse(body).is_err());

        let lenient = format!("[gateway]\nunmatched_message = \"text\"\n{body}");
        let config = Config::parse(&lenient).unwrap();
        let task = config.task("empty").unwrap();
        assert_eq!(config.task_message(task).unwrap().msgtype(), "text");
    }

    #[test]
    fn test_duplicate_robot_names_rejected() {
        let err = Config::parse(
            r#"
[[robots]]
id = "a"
type = "1"
name = "dup"

[[robots]]
id = "b"
type = "2"
name = "dup"
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Duplicate robot name"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.tasks.len(), 2);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = Config::load(Path::new("/nonexistent/dingsend.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dingsend.toml"));
    }
}
