//! Observed-process lifecycle.
//!
//! A [`Monitor`] launches the instrumentation command, forwards each stdout
//! line over a channel and logs stderr. All process state lives in the
//! monitor value; there is no global handle.

use crate::error::{Result, RuleError};
use crossbeam_channel::{unbounded, Receiver};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Interval between exit checks while waiting for the process to stop
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A running observed process
#[derive(Debug)]
pub struct Monitor {
    child: Child,
    lines: Receiver<String>,
}

impl Monitor {
    /// Start `program` with `args`, capturing its output.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        tracing::info!("Executing command: {} {}", program, args.join(" "));

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so stop() reaches the observer's children and a
        // terminal Ctrl-C is left to us to handle
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = command
            .spawn()
            .map_err(|e| RuleError::monitor(format!("failed to start {}: {}", program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuleError::monitor("stdout of observed process not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RuleError::monitor("stderr of observed process not captured"))?;

        let (tx, rx) = unbounded::<String>();

        thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
                tracing::trace!("observer: {}", line);
                if tx.send(line).is_err() {
                    break;
                }
            }
            tracing::debug!("Observer stdout closed");
        });

        thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                tracing::warn!("observer error: {}", line.trim());
            }
        });

        tracing::info!("Started monitoring (pid {})", child.id());
        Ok(Self { child, lines: rx })
    }

    /// Lines written by the observed process; disconnects when its stdout closes
    pub fn lines(&self) -> &Receiver<String> {
        &self.lines
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Exit status if the process has already exited
    pub fn try_status(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    /// Ask the process to terminate, wait up to `timeout`, then kill it.
    ///
    /// On unix the whole process group is signalled, so helpers started by
    /// the observer do not outlive it.
    pub fn stop(mut self, timeout: Duration) -> Result<()> {
        let pid = self.id();
        let exited = self.try_status().is_some();
        terminate(&mut self.child);
        if exited {
            return Ok(());
        }
        tracing::info!("Stopping monitoring (pid {})", pid);

        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.try_status().is_some() {
                return Ok(());
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }

        force_kill(&mut self.child)?;
        if let Err(e) = self.child.wait() {
            tracing::warn!("Failed to reap observed process {}: {}", pid, e);
        }
        tracing::warn!("Forcibly terminated observed process {}", pid);
        Ok(())
    }
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: Signal) -> nix::Result<()> {
    match killpg(Pid::from_raw(child.id() as i32), signal) {
        // Nothing left in the group
        Err(Errno::ESRCH) => Ok(()),
        other => other,
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    if let Err(e) = signal_group(child, Signal::SIGTERM) {
        tracing::warn!("Failed to signal observed process {}: {}", child.id(), e);
    }
}

#[cfg(unix)]
fn force_kill(child: &mut Child) -> Result<()> {
    signal_group(child, Signal::SIGKILL)
        .map_err(|e| RuleError::monitor(format!("failed to kill observed process: {}", e)))
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!("Failed to stop observed process {}: {}", child.id(), e);
    }
}

#[cfg(not(unix))]
fn force_kill(child: &mut Child) -> Result<()> {
    child
        .kill()
        .map_err(|e| RuleError::monitor(format!("failed to kill observed process: {}", e)))
}

/// Default instrumentation command: `frida -U -l <script> -f <package>`.
pub fn frida_command(package: &str, script: &Path) -> Result<(String, Vec<String>)> {
    if !script.exists() {
        return Err(RuleError::monitor(format!(
            "Frida script does not exist: {}",
            script.display()
        )));
    }

    Ok((
        "frida".to_string(),
        vec![
            "-U".to_string(),
            "-l".to_string(),
            script.display().to_string(),
            "-f".to_string(),
            package.to_string(),
        ],
    ))
}
