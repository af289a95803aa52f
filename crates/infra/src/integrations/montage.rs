//! Child-process host for the photo montage app
//!
//! Protocol, one JSON document per line:
//!
//! ```text
//! child  → host   {"ready": true}                       once, after startup
//! host   → child  {"actionName": "...", "parameters": {..}}
//! child  → host   {"ok": true, "text": "...", "data": {..}}
//!                 {"ok": false, "error": "..."}
//! ```

use std::process::Stdio;
use std::time::Duration;

use actionarc_core::MontageHost;
use actionarc_domain::config::MontageConfig;
use actionarc_domain::{ActionArcError, ActionResult, MontageAction, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ReadyLine {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default = "default_ok")]
    ok: bool,
    #[serde(default)]
    text: String,
    data: Option<Value>,
    error: Option<String>,
}

fn default_ok() -> bool {
    true
}

struct MontageProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl MontageProcess {
    fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    async fn exchange(&mut self, line: &str, reply_timeout: Duration) -> Result<Reply> {
        self.stdin.write_all(line.as_bytes()).await.map_err(process_io)?;
        self.stdin.write_all(b"\n").await.map_err(process_io)?;
        self.stdin.flush().await.map_err(process_io)?;

        let reply = timeout(reply_timeout, self.stdout.next_line())
            .await
            .map_err(|_| ActionArcError::Process(format!("montage process did not answer within {reply_timeout:?}")))?
            .map_err(process_io)?
            .ok_or_else(|| ActionArcError::Process("montage process closed its output".into()))?;

        serde_json::from_str(&reply)
            .map_err(|e| ActionArcError::Process(format!("unreadable montage reply: {e}")))
    }
}

fn process_io(err: std::io::Error) -> ActionArcError {
    ActionArcError::Process(format!("montage process I/O failed: {err}"))
}

/// Lazily started montage child process, shared by all callers.
///
/// Requests are serialised through one async mutex; a child that has exited
/// or broken the protocol is discarded and respawned on the next call.
pub struct ProcessMontageHost {
    command: String,
    args: Vec<String>,
    startup_timeout: Duration,
    reply_timeout: Duration,
    process: Mutex<Option<MontageProcess>>,
}

impl ProcessMontageHost {
    pub fn new(command: impl Into<String>, args: Vec<String>, startup_timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            startup_timeout,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            process: Mutex::new(None),
        }
    }

    pub fn from_config(config: &MontageConfig) -> Result<Self> {
        if config.command.trim().is_empty() {
            return Err(ActionArcError::Config("montage.command is not set".into()));
        }
        Ok(Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.startup_timeout_secs),
        ))
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    #[instrument(skip(self), fields(command = %self.command))]
    async fn spawn(&self) -> Result<MontageProcess> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ActionArcError::Process(format!("failed to start montage process `{}`: {e}", self.command)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ActionArcError::Process("montage process has no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ActionArcError::Process("montage process has no stdout".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        let wait_ready = async {
            while let Some(line) = lines.next_line().await.map_err(process_io)? {
                match serde_json::from_str::<ReadyLine>(&line) {
                    Ok(ReadyLine { ready: true }) => return Ok(()),
                    _ => debug!(line = %line, "montage output before ready"),
                }
            }
            Err(ActionArcError::Process("montage process exited before signalling ready".into()))
        };

        timeout(self.startup_timeout, wait_ready).await.map_err(|_| {
            ActionArcError::Process(format!(
                "montage process not ready within {}s",
                self.startup_timeout.as_secs_f32()
            ))
        })??;

        info!(pid = child.id(), "montage process ready");
        Ok(MontageProcess { child, stdin, stdout: lines })
    }
}

#[async_trait]
impl MontageHost for ProcessMontageHost {
    #[instrument(skip(self, action))]
    async fn send(&self, action: &MontageAction) -> Result<ActionResult> {
        let line = serde_json::to_string(action)
            .map_err(|e| ActionArcError::Internal(format!("failed to encode montage action: {e}")))?;

        let mut slot = self.process.lock().await;
        if slot.as_mut().is_some_and(MontageProcess::has_exited) {
            warn!("montage process exited; respawning");
            *slot = None;
        }
        let process = match slot.as_mut() {
            Some(process) => process,
            None => slot.insert(self.spawn().await?),
        };

        let reply = match process.exchange(&line, self.reply_timeout).await {
            Ok(reply) => reply,
            Err(err) => {
                // Protocol state is unknown; start fresh next time.
                *slot = None;
                return Err(err);
            }
        };

        if reply.ok {
            Ok(ActionResult { text: reply.text, data: reply.data })
        } else {
            Err(ActionArcError::Process(
                reply.error.unwrap_or_else(|| "montage action failed".to_string()),
            ))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str, startup: Duration) -> ProcessMontageHost {
        ProcessMontageHost::new("sh", vec!["-c".into(), script.into()], startup)
            .with_reply_timeout(Duration::from_secs(5))
    }

    fn list() -> MontageAction {
        MontageAction::ListMontages {}
    }

    #[tokio::test]
    async fn exchanges_one_line_per_action() {
        let host = shell(
            r#"echo 'starting'; echo '{"ready":true}'; while read line; do echo '{"ok":true,"text":"2 montages","data":{"count":2}}'; done"#,
            Duration::from_secs(5),
        );

        let first = host.send(&list()).await.unwrap();
        assert_eq!(first.text, "2 montages");
        assert_eq!(first.data, Some(serde_json::json!({ "count": 2 })));
        host.send(&list()).await.unwrap();
    }

    #[tokio::test]
    async fn failure_reply_is_an_error() {
        let host = shell(
            r#"echo '{"ready":true}'; while read line; do echo '{"ok":false,"error":"no montage named Trip"}'; done"#,
            Duration::from_secs(5),
        );
        let err = host.send(&MontageAction::ShowMontage { title: "Trip".into() }).await.unwrap_err();
        assert!(matches!(err, ActionArcError::Process(msg) if msg.contains("Trip")));
    }

    #[tokio::test]
    async fn slow_startup_times_out() {
        let host = shell("sleep 5", Duration::from_millis(200));
        let err = host.send(&list()).await.unwrap_err();
        assert!(matches!(err, ActionArcError::Process(msg) if msg.contains("not ready")));
    }

    #[tokio::test]
    async fn exited_child_is_respawned() {
        let host = shell(
            r#"echo '{"ready":true}'; read line; echo '{"ok":true,"text":"once"}'"#,
            Duration::from_secs(5),
        );

        assert_eq!(host.send(&list()).await.unwrap().text, "once");
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(host.send(&list()).await.unwrap().text, "once");
    }

    #[tokio::test]
    async fn missing_command_reports_process_error() {
        let host = ProcessMontageHost::new("/nonexistent/montage-app", vec![], Duration::from_secs(1));
        assert!(matches!(host.send(&list()).await, Err(ActionArcError::Process(_))));
    }
}
