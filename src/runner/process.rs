//! SP-008: Spawn, signal and reap the artifact process.

use crate::core::BuildError;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};

/// How long a stopped process gets to exit after SIGTERM before it is killed.
const STOP_GRACE: Duration = Duration::from_secs(2);

const REAP_POLL: Duration = Duration::from_millis(20);

/// Owner of the currently running artifact process, if any.
#[derive(Debug, Default)]
pub struct Runner {
    child: Option<Child>,
    path: Option<PathBuf>,
    /// Children share the caller's process group and terminal.
    foreground: bool,
}

impl Runner {
    /// Runner whose processes get their own process group. Used by watch
    /// mode, where the process is restarted behind the caller's back.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner whose processes stay in the caller's process group, so a
    /// terminal Ctrl-C reaches them and they may read the terminal.
    pub fn foreground() -> Self {
        Self {
            child: None,
            path: None,
            foreground: true,
        }
    }

    /// Stop any running process, then execute `path`. Returns the new pid.
    pub fn start(&mut self, path: &Path) -> Result<u32, BuildError> {
        if self.stop() {
            tracing::info!("restarting {}", path.display());
        }

        let mut cmd = Command::new(path);
        #[cfg(unix)]
        if !self.foreground {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let child = spawn_retrying(&mut cmd).map_err(|source| BuildError::Spawn {
            path: path.to_path_buf(),
            source,
        })?;

        let pid = child.id();
        tracing::info!(pid, "running {}", path.display());
        self.child = Some(child);
        self.path = Some(path.to_path_buf());
        Ok(pid)
    }

    /// Exit status of the current process once it has exited, releasing the
    /// handle. `None` while it runs or when nothing was started.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, BuildError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                self.path = None;
                Ok(Some(status))
            }
            Ok(None) => Ok(None),
            Err(source) => Err(BuildError::Spawn {
                path: self.path.clone().unwrap_or_default(),
                source,
            }),
        }
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Signal the process (its whole group unless foreground), reap it and
    /// drop the handle. Returns true if a live process was stopped.
    pub fn stop(&mut self) -> bool {
        let Some(mut child) = self.child.take() else {
            return false;
        };
        let path = self.path.take();

        if !matches!(child.try_wait(), Ok(None)) {
            return false;
        }

        if let Some(path) = &path {
            tracing::info!("stopping {}", path.display());
        }
        if !signal_term(child.id(), !self.foreground) {
            let _ = child.kill();
        }

        let deadline = Instant::now() + STOP_GRACE;
        loop {
            match child.try_wait() {
                Ok(Some(_)) | Err(_) => break,
                Ok(None) if Instant::now() >= deadline => {
                    tracing::warn!(pid = child.id(), "process ignored SIGTERM, killing");
                    let _ = child.kill();
                    let _ = child.wait();
                    break;
                }
                Ok(None) => std::thread::sleep(REAP_POLL),
            }
        }
        true
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A freshly written artifact can briefly report ETXTBSY while a concurrent
/// fork still holds its write descriptor.
fn spawn_retrying(cmd: &mut Command) -> std::io::Result<Child> {
    const ETXTBSY: i32 = 26;
    let mut attempts = 0;
    loop {
        match cmd.spawn() {
            Err(e) if e.raw_os_error() == Some(ETXTBSY) && attempts < 5 => {
                attempts += 1;
                std::thread::sleep(REAP_POLL);
            }
            result => return result,
        }
    }
}

/// Send SIGTERM to `pid`, or to the process group it leads.
#[cfg(unix)]
fn signal_term(pid: u32, group: bool) -> bool {
    let target = if group {
        format!("-{}", pid)
    } else {
        pid.to_string()
    };
    Command::new("kill")
        .args(["-TERM", "--", &target])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn signal_term(_pid: u32, _group: bool) -> bool {
    false
}
