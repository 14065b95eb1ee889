// ── External command transport ──
//
// Delegates the actual session (SSH, NETCONF, a netmiko script) to an
// external program:
//
//   <program> [args..] read    -> topology JSON on stdout
//   <program> [args..] apply   <- one PlanOperation as JSON on stdin
//
// Exit 0 is success, and means the change is committed and saved
// (`commit` on IOS XR, `write memory` on IOS). Exit 75 (EX_TEMPFAIL) means
// the device could not be reached; any other non-zero exit is the device
// refusing the change.
// Connection details travel in the SWITCH_* environment.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace, warn};
use vlanops_core::{DeviceError, PlanOperation, Topology};

use crate::DeviceBackend;

/// Exit status a transport uses to report an unreachable device.
pub const EXIT_UNREACHABLE: i32 = 75;

/// Where the transport should connect, and as whom.
#[derive(Debug)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<SecretString>,
    pub enable_password: Option<SecretString>,
    /// Device type hint for the transport (`cisco_ios`, `cisco_xr`, ...).
    pub platform: String,
}

impl Connection {
    fn export(&self, cmd: &mut Command) {
        cmd.env("SWITCH_IP", &self.host)
            .env("SWITCH_PORT", self.port.to_string())
            .env("SWITCH_USERNAME", &self.username)
            .env("SWITCH_PLATFORM", &self.platform);
        if let Some(password) = &self.password {
            cmd.env("SWITCH_PASSWORD", password.expose_secret());
        }
        if let Some(enable) = &self.enable_password {
            cmd.env("SWITCH_ENABLE_PASSWORD", enable.expose_secret());
        }
    }
}

/// Result of one transport invocation.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stderr if there is any, otherwise stdout.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    fn into_error(self) -> DeviceError {
        let detail = match (self.diagnostic(), self.exit_code) {
            ("", Some(code)) => format!("transport exited with status {code}"),
            ("", None) => "transport killed by signal".to_owned(),
            (text, _) => text.to_owned(),
        };
        match self.exit_code {
            Some(EXIT_UNREACHABLE) => DeviceError::transport(detail),
            _ => DeviceError::rejected(detail),
        }
    }
}

/// A device reached through an external transport program.
#[derive(Debug)]
pub struct CommandDevice {
    program: PathBuf,
    args: Vec<String>,
    connection: Connection,
    timeout: Duration,
}

impl CommandDevice {
    pub fn new(program: impl Into<PathBuf>, connection: Connection) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            connection,
            timeout: Duration::from_secs(30),
        }
    }

    /// Arguments placed before the verb.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Upper bound on one invocation, including the device round trip.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, verb: &str, input: Option<String>) -> Result<ExecResult, DeviceError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(verb)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        self.connection.export(&mut cmd);

        debug!(program = %self.program.display(), verb, host = %self.connection.host, "invoking transport");
        let mut child = cmd.spawn().map_err(|e| {
            DeviceError::transport(format!("cannot start {}: {e}", self.program.display()))
        })?;

        let stdin = child.stdin.take();
        let interaction = async move {
            if let (Some(mut stdin), Some(input)) = (stdin, input) {
                stdin.write_all(input.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            child.wait_with_output().await
        };

        let Ok(output) = tokio::time::timeout(self.timeout, interaction).await else {
            warn!(verb, timeout_secs = self.timeout.as_secs_f64(), "transport timed out");
            return Err(DeviceError::timeout(self.timeout));
        };
        let output = output.map_err(|e| DeviceError::io(format!("transport I/O failed: {e}")))?;

        let result = ExecResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        };
        if result.success() {
            trace!(verb, "transport succeeded");
        } else {
            warn!(verb, exit_code = ?result.exit_code, stderr = %result.stderr, "transport failed");
        }
        Ok(result)
    }
}

impl DeviceBackend for CommandDevice {
    fn describe(&self) -> String {
        format!(
            "{} -> {}@{}:{}",
            self.program.display(),
            self.connection.username,
            self.connection.host,
            self.connection.port
        )
    }

    async fn read_live(&mut self) -> Result<Topology, DeviceError> {
        let result = self.run("read", None).await?;
        if !result.success() {
            return Err(result.into_error());
        }
        Topology::load(&result.stdout)
            .map_err(|e| DeviceError::protocol(format!("transport returned unusable state: {e}")))
    }

    async fn push(&mut self, op: &PlanOperation) -> Result<(), DeviceError> {
        let payload = serde_json::to_string(op)
            .map_err(|e| DeviceError::io(format!("cannot encode operation: {e}")))?;
        let result = self.run("apply", Some(payload)).await?;
        if result.success() {
            Ok(())
        } else {
            Err(result.into_error())
        }
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use vlanops_core::{DeviceErrorKind, VlanDefinition};

    use super::*;

    fn connection() -> Connection {
        Connection {
            host: "192.0.2.10".into(),
            port: 22,
            username: "netops".into(),
            password: Some(SecretString::from("hunter2".to_owned())),
            enable_password: None,
            platform: "cisco_ios".into(),
        }
    }

    /// A transport implemented as an inline shell script; `$1` is the verb.
    fn script(body: &str) -> CommandDevice {
        CommandDevice::new("/bin/sh", connection()).with_args(["-c", body, "transport"])
    }

    #[tokio::test]
    async fn read_parses_stdout_as_topology() {
        let mut device = script(r#"echo "{\"vlans\": [{\"id\": 10, \"name\": \"$SWITCH_USERNAME\"}]}""#);
        let live = device.read_live().await.unwrap();
        assert_eq!(live.vlans(), [VlanDefinition::new(10, "netops")]);
    }

    #[tokio::test]
    async fn credentials_are_exported() {
        let mut device = script(r#"[ "$SWITCH_PASSWORD" = hunter2 ] && [ "$SWITCH_PORT" = 22 ] && echo '{}'"#);
        assert!(device.read_live().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn apply_sends_operation_on_stdin() {
        let mut device = script(r#"grep -q '"target_id":"vlan:10"'"#);
        let op = PlanOperation::create(VlanDefinition::new(10, "Mgmt"));
        device.push(&op).await.unwrap();
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_rejection_with_stderr() {
        let mut device = script("cat >/dev/null; echo '% Invalid input detected' >&2; exit 1");
        let op = PlanOperation::create(VlanDefinition::new(10, "Mgmt"));
        let err = device.push(&op).await.unwrap_err();
        assert_eq!(err.kind(), DeviceErrorKind::Rejected);
        assert_eq!(err.message(), "% Invalid input detected");
    }

    #[tokio::test]
    async fn unreachable_exit_is_a_transport_error() {
        let mut device = script("echo 'connection refused' >&2; exit 75");
        let err = device.read_live().await.unwrap_err();
        assert_eq!(err.kind(), DeviceErrorKind::Transport);
    }

    #[tokio::test]
    async fn slow_transport_times_out() {
        let mut device = script("sleep 5").with_timeout(Duration::from_millis(100));
        let err = device.read_live().await.unwrap_err();
        assert_eq!(err.kind(), DeviceErrorKind::Timeout);
    }

    #[tokio::test]
    async fn garbage_output_is_a_protocol_error() {
        let mut device = script("echo 'Building configuration...'");
        let err = device.read_live().await.unwrap_err();
        assert_eq!(err.kind(), DeviceErrorKind::Protocol);
    }

    #[tokio::test]
    async fn missing_program_is_a_transport_error() {
        let mut device = CommandDevice::new("/nonexistent/vlanops-transport", connection());
        let err = device.read_live().await.unwrap_err();
        assert_eq!(err.kind(), DeviceErrorKind::Transport);
    }
}
