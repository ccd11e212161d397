//! Isolated scenario runs: one child process per scenario

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::result::{ScenarioResult, parse_marker_line};
use super::spec::ScenarioSpec;
use crate::{BenchError, Result};

/// Everything a launcher needs to build one child command.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchContext<'a> {
    pub scenario: &'a ScenarioSpec,
    pub target_host: &'a str,
    pub frame_budget: usize,
    pub timeout: Duration,
}

impl LaunchContext<'_> {
    /// `host:port` the child connects to.
    pub fn target(&self) -> String {
        format!("{}:{}", self.target_host, self.scenario.listen_port)
    }

    /// Environment variables describing the scenario, for server-side wiring.
    pub fn env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("TICK_RATE", self.scenario.tick_rate.to_string()),
            ("SCALE_FACTOR", self.scenario.scale_factor.to_string()),
            ("SQUISH_VERSION", self.scenario.codec_version.clone()),
            ("HOME_PORT", self.scenario.listen_port.to_string()),
        ]
    }
}

/// Builds the child process command for a scenario.
pub trait Launcher: Send + Sync {
    fn command(&self, context: &LaunchContext<'_>) -> Result<Command>;
}

impl<F> Launcher for F
where
    F: Fn(&LaunchContext<'_>) -> Result<Command> + Send + Sync,
{
    fn command(&self, context: &LaunchContext<'_>) -> Result<Command> {
        self(context)
    }
}

/// Launches the benchmark binary's `run` subcommand.
#[derive(Debug, Clone)]
pub struct ExecutableLauncher {
    program: PathBuf,
}

impl ExecutableLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Launch the currently running executable.
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| BenchError::file_error(PathBuf::from("<current executable>"), e))?;
        Ok(Self::new(program))
    }
}

impl Launcher for ExecutableLauncher {
    fn command(&self, context: &LaunchContext<'_>) -> Result<Command> {
        let scenario = context.scenario;
        let mut command = Command::new(&self.program);
        command
            .arg("run")
            .arg("--target")
            .arg(context.target())
            .arg("--tick-rate")
            .arg(scenario.tick_rate.to_string())
            .arg("--codec-version")
            .arg(&scenario.codec_version)
            .arg("--scale-factor")
            .arg(scenario.scale_factor.to_string())
            .arg("--frames")
            .arg(context.frame_budget.to_string())
            .arg("--timeout-ms")
            .arg(child_timeout(context.timeout).as_millis().to_string());
        command.envs(context.env());
        Ok(command)
    }
}

/// The child stops collecting a little before the orchestrator gives up on it,
/// so a slow server still yields a partial result instead of a timeout.
fn child_timeout(timeout: Duration) -> Duration {
    timeout.saturating_sub(timeout / 10).max(Duration::from_millis(1))
}

/// How long a child that has printed its result gets to exit on its own.
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// One scenario executed in a child process, bounded by a timeout.
pub struct IsolatedRun<'a> {
    context: LaunchContext<'a>,
}

impl<'a> IsolatedRun<'a> {
    pub fn new(context: LaunchContext<'a>) -> Self {
        Self { context }
    }

    /// Spawn the child and resolve on the first result line it prints.
    ///
    /// A child that reports a result gets a short grace period to exit and is
    /// killed after it. A child that prints no result before the timeout is
    /// killed and [`BenchError::Timeout`] returned.
    pub async fn execute(&self, launcher: &dyn Launcher) -> Result<ScenarioResult> {
        let name = self.context.scenario.name.as_str();
        let timeout = self.context.timeout;

        let mut command = launcher.command(&self.context)?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(scenario = name, address = %self.context.target(), ?timeout, "Starting scenario");
        let mut child = command
            .spawn()
            .map_err(|source| BenchError::Spawn { scenario: name.to_string(), source })?;

        let read = tokio::time::timeout(timeout, Self::read_result(name, &mut child)).await;
        let Ok(result) = read else {
            warn!(scenario = name, ?timeout, "Scenario timed out, killing child");
            if let Err(e) = child.kill().await {
                debug!(scenario = name, error = %e, "Child already gone");
            }
            return Err(BenchError::timeout(name, timeout));
        };

        let status = Self::reap(name, &mut child).await;
        result?.ok_or_else(|| BenchError::NoResult {
            scenario: name.to_string(),
            status: status.and_then(|s| s.code()),
        })
    }

    /// Read stdout up to the first marker line, or to the end without one.
    async fn read_result(name: &str, child: &mut Child) -> Result<Option<ScenarioResult>> {
        if let Some(stderr) = child.stderr.take() {
            let scenario = name.to_string();
            tokio::spawn(async move { forward_stderr(scenario, stderr).await });
        }
        let Some(stdout) = child.stdout.take() else {
            return Ok(None);
        };

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| BenchError::transport("reading child output", Box::new(e)))?
        {
            let Some(parsed) = parse_marker_line(&line) else {
                info!(scenario = name, "{line}");
                continue;
            };
            let result = parsed?;

            // Keep forwarding whatever the child prints while it shuts down
            let scenario = name.to_string();
            tokio::spawn(async move { forward_stdout(scenario, lines).await });
            return Ok(Some(result));
        }
        Ok(None)
    }

    /// Wait briefly for the child to exit, killing it if it lingers.
    async fn reap(name: &str, child: &mut Child) -> Option<ExitStatus> {
        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(scenario = name, %status, "Child exited");
                Some(status)
            }
            Ok(Err(e)) => {
                warn!(scenario = name, error = %e, "Failed to wait for child");
                None
            }
            Err(_) => {
                warn!(scenario = name, grace = ?EXIT_GRACE, "Child did not exit, killing it");
                if let Err(e) = child.kill().await {
                    debug!(scenario = name, error = %e, "Child already gone");
                }
                None
            }
        }
    }
}

async fn forward_stdout<R>(scenario: String, mut lines: Lines<BufReader<R>>)
where
    R: AsyncRead + Unpin,
{
    while let Ok(Some(line)) = lines.next_line().await {
        if parse_marker_line(&line).is_some() {
            debug!(scenario = %scenario, "Ignoring extra result line");
        } else {
            info!(scenario = %scenario, "{line}");
        }
    }
}

async fn forward_stderr<R>(scenario: String, stderr: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        warn!(scenario = %scenario, "{line}");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &'static str) -> impl Launcher {
        move |_: &LaunchContext<'_>| -> Result<Command> {
            let mut command = Command::new("sh");
            command.arg("-c").arg(script);
            Ok(command)
        }
    }

    fn context(scenario: &ScenarioSpec, timeout: Duration) -> LaunchContext<'_> {
        LaunchContext { scenario, target_host: "127.0.0.1", frame_budget: 10, timeout }
    }

    #[tokio::test]
    async fn marker_line_becomes_the_result() {
        let scenario = ScenarioSpec::new("marker", "1005", 7001);
        let run = IsolatedRun::new(context(&scenario, Duration::from_secs(10)));
        let launcher = shell(concat!(
            r#"echo starting; echo oops >&2; echo 'benchresult:{"performance":{"#,
            r#""100":{"avgFps":95.0,"avgFrameTime":10.0},"#,
            r#""1000":{"avgFps":95.0,"avgFrameTime":10.0},"#,
            r#""all":{"avgFps":95.0,"avgFrameTime":10.0}},"totalFrames":10}'"#,
        ));

        let result = run.execute(&launcher).await.unwrap();
        assert_eq!(result.total_frames, 10);
        assert_eq!(result.performance.all.average_fps, 95.0);
    }

    #[tokio::test]
    async fn lingering_child_still_reports_its_result() {
        let scenario = ScenarioSpec::new("linger", "1005", 7001);
        let run = IsolatedRun::new(context(&scenario, Duration::from_millis(800)));
        let launcher = shell(concat!(
            r#"echo 'benchresult:{"performance":{"#,
            r#""100":{"avgFps":60.0,"avgFrameTime":16.0},"#,
            r#""1000":{"avgFps":60.0,"avgFrameTime":16.0},"#,
            r#""all":{"avgFps":60.0,"avgFrameTime":16.0}},"totalFrames":10}'; sleep 30"#,
        ));

        let started = std::time::Instant::now();
        let result = run.execute(&launcher).await.unwrap();
        assert_eq!(result.total_frames, 10);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn silent_child_times_out() {
        let scenario = ScenarioSpec::new("sleepy", "1005", 7001);
        let run = IsolatedRun::new(context(&scenario, Duration::from_millis(200)));

        let err = run.execute(&shell("sleep 30")).await.unwrap_err();
        assert!(matches!(err, BenchError::Timeout { ref scenario, .. } if scenario == "sleepy"));
    }

    #[tokio::test]
    async fn exit_without_marker_is_no_result() {
        let scenario = ScenarioSpec::new("quiet", "1005", 7001);
        let run = IsolatedRun::new(context(&scenario, Duration::from_secs(10)));

        let err = run.execute(&shell("echo nothing to see; exit 3")).await.unwrap_err();
        assert!(matches!(err, BenchError::NoResult { status: Some(3), .. }));
    }

    #[tokio::test]
    async fn environment_describes_the_scenario() {
        let mut scenario = ScenarioSpec::new("env", "0767", 7123);
        scenario.tick_rate = 30;
        let context = context(&scenario, Duration::from_secs(1));
        let env = context.env();

        assert!(env.contains(&("TICK_RATE", "30".to_string())));
        assert!(env.contains(&("SQUISH_VERSION", "0767".to_string())));
        assert!(env.contains(&("HOME_PORT", "7123".to_string())));
        assert_eq!(context.target(), "127.0.0.1:7123");
    }

    #[test]
    fn executable_launcher_passes_run_flags() {
        let scenario = ScenarioSpec::new("flags", "1004", 7001);
        let launcher = ExecutableLauncher::new("/usr/bin/framebench");
        let command = launcher.command(&context(&scenario, Duration::from_secs(2))).unwrap();
        let args: Vec<_> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "run");
        assert!(args.windows(2).any(|w| w == ["--codec-version", "1004"]));
        assert!(args.windows(2).any(|w| w == ["--frames", "10"]));
        assert!(args.windows(2).any(|w| w == ["--target", "127.0.0.1:7001"]));
        assert!(args.windows(2).any(|w| w == ["--timeout-ms", "1800"]));
    }
}
