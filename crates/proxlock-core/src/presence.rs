//! Key device presence detection.
//!
//! Presence is decided by a single Bluetooth L2CAP echo (`l2ping`). A phone
//! that answers is in range; anything else (no answer, radio hiccup, missing
//! binary, probe that hangs) counts as absent. The controller cannot act
//! differently on those causes, so only the boolean is surfaced; the cause is
//! logged at `debug` level.
//!
//! On Unix each probe runs in its own process group. A probe that outlives
//! its ceiling is stopped as a group, so the `l2ping` that `sudo` forks is
//! torn down along with `sudo` itself.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::device::DeviceAddress;

/// Default probe program.
pub const DEFAULT_L2PING_PROGRAM: &str = "l2ping";

/// Default per-echo timeout handed to `l2ping -t`, in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u32 = 1;

/// Default hard ceiling on a single probe.
pub const DEFAULT_PROBE_CEILING: Duration = Duration::from_secs(5);

/// How often a running probe process is polled for completion.
const POLL_STEP: Duration = Duration::from_millis(20);

/// Time a timed-out probe group gets to exit on `SIGTERM` before `SIGKILL`.
#[cfg(unix)]
const TERM_GRACE: Duration = Duration::from_millis(250);

/// Answers whether the key device is currently reachable.
pub trait PresenceProber {
    /// Probe once. Blocks until the probe finishes or gives up.
    fn probe(&mut self, device: &DeviceAddress) -> bool;
}

impl<P: PresenceProber + ?Sized> PresenceProber for Box<P> {
    fn probe(&mut self, device: &DeviceAddress) -> bool {
        (**self).probe(device)
    }
}

/// Why a probe did not succeed.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe program could not be started.
    #[error("Failed to start '{program}': {source}")]
    SpawnFailed {
        /// Program that was spawned.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The probe ran but the device did not answer.
    #[error("Probe exited unsuccessfully ({0})")]
    NoResponse(ExitStatus),

    /// The probe was still running at the ceiling and was killed.
    #[error("Probe did not finish within {}ms", .0.as_millis())]
    TimedOut(Duration),

    /// Waiting on the probe process failed.
    #[error("Failed to wait for probe: {0}")]
    WaitFailed(#[source] std::io::Error),
}

/// Settings for the `l2ping` prober.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Program to run.
    pub program: String,
    /// Run the program through `sudo` (raw L2CAP sockets need privileges).
    pub use_sudo: bool,
    /// Seconds `l2ping` waits for the echo reply (`-t`).
    pub timeout_secs: u32,
    /// Hard ceiling after which a still-running probe is killed.
    pub ceiling: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_L2PING_PROGRAM.to_string(),
            use_sudo: true,
            timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            ceiling: DEFAULT_PROBE_CEILING,
        }
    }
}

/// Presence prober that shells out to `l2ping`.
#[derive(Debug, Clone)]
pub struct L2pingProber {
    settings: ProbeSettings,
}

impl L2pingProber {
    /// Create a prober with the given settings.
    #[must_use]
    pub const fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    /// Build the command for one echo request to `device`.
    #[must_use]
    pub fn command(&self, device: &DeviceAddress) -> Command {
        let mut command = if self.settings.use_sudo {
            let mut sudo = Command::new("sudo");
            sudo.arg(&self.settings.program);
            sudo
        } else {
            Command::new(&self.settings.program)
        };

        command
            .arg("-c")
            .arg("1")
            .arg("-t")
            .arg(self.settings.timeout_secs.to_string())
            .arg(device.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command
    }

    /// Run one probe and report why it failed, if it did.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] for every outcome other than a reply.
    pub fn try_probe(&self, device: &DeviceAddress) -> Result<(), ProbeError> {
        let mut child = self
            .command(device)
            .spawn()
            .map_err(|source| ProbeError::SpawnFailed {
                program: self.settings.program.clone(),
                source,
            })?;

        // `None` means the ceiling lies beyond what `Instant` can represent.
        let deadline = Instant::now().checked_add(self.settings.ceiling);
        loop {
            match child.try_wait().map_err(ProbeError::WaitFailed)? {
                Some(status) if status.success() => return Ok(()),
                Some(status) => return Err(ProbeError::NoResponse(status)),
                None if deadline.is_some_and(|d| Instant::now() >= d) => {
                    terminate(&mut child);
                    return Err(ProbeError::TimedOut(self.settings.ceiling));
                }
                None => std::thread::sleep(POLL_STEP),
            }
        }
    }
}

/// Stop a probe that outlived its ceiling and reap it.
///
/// `sudo` relays `SIGTERM` to the program it runs but cannot relay `SIGKILL`,
/// so the whole group is asked to terminate first and killed after
/// [`TERM_GRACE`].
#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Ok(pid) = i32::try_from(child.id()) {
        let group = Pid::from_raw(pid);
        if let Err(e) = killpg(group, Signal::SIGTERM) {
            debug!(pgid = pid, error = %e, "SIGTERM to probe group failed");
        }

        let grace_ends = Instant::now() + TERM_GRACE;
        while matches!(child.try_wait(), Ok(None)) && Instant::now() < grace_ends {
            std::thread::sleep(POLL_STEP);
        }

        // The group outlives its leader while any member remains.
        let _ = killpg(group, Signal::SIGKILL);
    }

    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl PresenceProber for L2pingProber {
    fn probe(&mut self, device: &DeviceAddress) -> bool {
        match self.try_probe(device) {
            Ok(()) => true,
            Err(e) => {
                debug!(device = %device, error = %e, "Probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn device() -> DeviceAddress {
        DeviceAddress::parse("ab:cd:ef:12:34:56").unwrap()
    }

    fn direct(program: &str) -> ProbeSettings {
        ProbeSettings {
            program: program.to_string(),
            use_sudo: false,
            ..ProbeSettings::default()
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = ProbeSettings::default();
        assert_eq!(settings.program, "l2ping");
        assert!(settings.use_sudo);
        assert_eq!(settings.timeout_secs, 1);
        assert_eq!(settings.ceiling, Duration::from_secs(5));
    }

    #[test]
    fn test_command_with_sudo() {
        let prober = L2pingProber::new(ProbeSettings::default());
        let command = prober.command(&device());
        assert_eq!(command.get_program(), OsStr::new("sudo"));
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(
            args,
            ["l2ping", "-c", "1", "-t", "1", "AB:CD:EF:12:34:56"]
                .map(OsStr::new)
                .to_vec()
        );
    }

    #[test]
    fn test_command_without_sudo() {
        let prober = L2pingProber::new(ProbeSettings {
            timeout_secs: 3,
            ..direct("/usr/bin/l2ping")
        });
        let command = prober.command(&device());
        assert_eq!(command.get_program(), OsStr::new("/usr/bin/l2ping"));
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(
            args,
            ["-c", "1", "-t", "3", "AB:CD:EF:12:34:56"]
                .map(OsStr::new)
                .to_vec()
        );
    }

    #[test]
    fn test_missing_program_is_absent() {
        let mut prober = L2pingProber::new(direct("/nonexistent/proxlock-l2ping"));
        assert!(matches!(
            prober.try_probe(&device()),
            Err(ProbeError::SpawnFailed { .. })
        ));
        assert!(!prober.probe(&device()));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn script(dir: &Path, name: &str, body: &str) -> String {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[test]
        fn test_reply_is_present() {
            let mut prober = L2pingProber::new(direct("true"));
            assert!(prober.probe(&device()));
        }

        #[test]
        fn test_no_reply_is_absent() {
            let mut prober = L2pingProber::new(direct("false"));
            assert!(matches!(
                prober.try_probe(&device()),
                Err(ProbeError::NoResponse(_))
            ));
            assert!(!prober.probe(&device()));
        }

        /// `true` while `pid` names a live, non-zombie process.
        #[cfg(target_os = "linux")]
        fn alive(pid: &str) -> bool {
            fs::read_to_string(format!("/proc/{pid}/stat"))
                .map(|stat| {
                    let state = stat.rsplit(')').next().unwrap_or("").trim_start();
                    !state.starts_with('Z')
                })
                .unwrap_or(false)
        }

        #[test]
        fn test_hung_check_is_killed_at_ceiling() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "hang", "exec sleep 30");
            let prober = L2pingProber::new(ProbeSettings {
                ceiling: Duration::from_millis(200),
                ..direct(&program)
            });

            let started = Instant::now();
            let result = prober.try_probe(&device());
            assert!(matches!(result, Err(ProbeError::TimedOut(_))));
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn test_ceiling_stops_forked_helper() {
            // Stands in for `sudo l2ping`: a wrapper that forks the real
            // program instead of exec-ing it.
            let dir = tempfile::tempdir().unwrap();
            let pidfile = dir.path().join("helper.pid");
            let body = format!(
                "sleep 31 &\necho $! > '{}'\nwait",
                pidfile.to_string_lossy()
            );
            let program = script(dir.path(), "wrapper", &body);
            let prober = L2pingProber::new(ProbeSettings {
                ceiling: Duration::from_millis(300),
                ..direct(&program)
            });

            let result = prober.try_probe(&device());
            assert!(matches!(result, Err(ProbeError::TimedOut(_))));

            let pid = fs::read_to_string(&pidfile).unwrap();
            let pid = pid.trim();
            let give_up = Instant::now() + Duration::from_secs(5);
            while alive(pid) && Instant::now() < give_up {
                std::thread::sleep(Duration::from_millis(50));
            }
            assert!(!alive(pid), "forked helper {pid} survived the ceiling");
        }

        #[test]
        fn test_unbounded_ceiling_does_not_overflow() {
            let prober = L2pingProber::new(ProbeSettings {
                ceiling: Duration::MAX,
                ..direct("true")
            });
            assert!(prober.try_probe(&device()).is_ok());
        }
    }
}
