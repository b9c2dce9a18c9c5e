//! PID 1 duties: the bootstrap pass, then either the reap loop or exec.
//!
//! ```text
//! bootstrap (best effort)
//!   ├─► identity: load → reconcile → write back
//!   └─► ownership sweep over DEV_CHOWN + home
//! then
//!   ├─► no command: reap loop, all signals swallowed
//!   └─► command:    exec, the workload becomes PID 1
//! ```

use std::convert::Infallible;
use std::ffi::OsString;
use std::fs::DirBuilder;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, info, warn};

use crate::chown::{chown_dirs, ExclusionSet};
use crate::config::BootstrapConfig;
use crate::error::{Error, Result};
use crate::etc::IdentityDatabase;
use crate::timing::Timer;

/// Fallback reap interval when no SIGCHLD arrives.
pub const REAP_INTERVAL: Duration = Duration::from_millis(100);

/// Exit status when the workload command cannot be found.
pub const EXIT_NOT_FOUND: u8 = 127;

/// Exit status when the workload was found but could not be executed.
pub const EXIT_EXEC_FAILED: u8 = 126;

/// Highest classic signal number registered by the init loop.
const LAST_STANDARD_SIGNAL: i32 = 31;

/// Run the identity reconciliation and ownership sweep.
///
/// An error in the identity phase abandons the pass before any ownership
/// is changed.
pub fn bootstrap(config: &BootstrapConfig) -> Result<()> {
    info!(
        user = %config.user,
        uid = config.uid,
        gid = config.gid,
        home = %config.home.display(),
        "bootstrapping container identity"
    );

    let timer = Timer::start("identity");
    DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(&config.home)
        .map_err(|e| Error::io(&config.home, e))?;

    let mut db = IdentityDatabase::load(&config.etc_dir)?;
    db.reconcile(&config.identity());
    db.write_back()?;
    timer.finish();

    let timer = Timer::start("chown");
    let roots = config.chown_roots();
    let excludes = ExclusionSet::new(&config.chown_exclude);
    let report = chown_dirs(&roots, &excludes, config.uid, config.gid)?;
    info!(
        changed = report.changed,
        pruned = report.pruned,
        skipped = report.skipped,
        "ownership sweep complete"
    );
    timer.finish();

    Ok(())
}

/// Collect every terminated child that is ready, returning how many.
pub fn reap_zombies() -> usize {
    let mut reaped = 0;
    loop {
        let mut status: libc::c_int = 0;
        // SAFETY: waitpid with WNOHANG does not block; -1 means any child.
        let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
        if pid <= 0 {
            return reaped;
        }
        let exit_status = if libc::WIFEXITED(status) {
            libc::WEXITSTATUS(status)
        } else if libc::WIFSIGNALED(status) {
            128 + libc::WTERMSIG(status)
        } else {
            1
        };
        debug!(pid, status = exit_status, "reaped child");
        reaped += 1;
    }
}

/// Subscribe to every catchable signal so none keeps its default
/// disposition while running as PID 1.
fn subscribe_all_signals() -> Vec<(i32, Signal)> {
    (1..=LAST_STANDARD_SIGNAL)
        .filter_map(|signum| match signal(SignalKind::from_raw(signum)) {
            Ok(stream) => Some((signum, stream)),
            Err(e) => {
                debug!(signum, error = %e, "signal cannot be handled");
                None
            }
        })
        .collect()
}

/// Reap children forever while swallowing signals.
async fn init_loop() -> io::Result<Infallible> {
    let streams = subscribe_all_signals();
    let count = streams.len();
    for (signum, mut stream) in streams {
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                debug!(signum, "signal received");
            }
        });
    }
    debug!(signals = count, "signal handlers installed");

    let mut sigchld = signal(SignalKind::child())?;
    let mut tick = tokio::time::interval(REAP_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = sigchld.recv() => {}
            _ = tick.tick() => {}
        }
        reap_zombies();
    }
}

/// Enter the steady-state init loop. Only returns if the runtime or the
/// SIGCHLD subscription cannot be set up.
pub fn run_init_loop() -> io::Result<Infallible> {
    if std::process::id() != 1 {
        warn!(pid = std::process::id(), "not PID 1, orphans will not be reparented here");
    }
    info!("entering init loop");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(init_loop())
}

/// Failure to replace the process image.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("no command given")]
    Empty,

    #[error("{command}: command not found: {source}")]
    NotFound {
        command: String,
        #[source]
        source: which::Error,
    },

    #[error("{}: exec failed: {source}", .path.display())]
    Exec {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    /// Process exit status matching shell conventions.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExecError::Empty | ExecError::NotFound { .. } => EXIT_NOT_FOUND,
            ExecError::Exec { .. } => EXIT_EXEC_FAILED,
        }
    }
}

/// Resolve `args[0]` against `PATH`, the way a shell would.
pub fn resolve_command(args: &[OsString]) -> std::result::Result<PathBuf, ExecError> {
    let program = args.first().ok_or(ExecError::Empty)?;
    which::which(program).map_err(|source| ExecError::NotFound {
        command: program.to_string_lossy().into_owned(),
        source,
    })
}

/// Replace this process with `args`, keeping argv[0], open descriptors and
/// the whole environment. Only returns on failure.
pub fn exec_command(args: &[OsString]) -> ExecError {
    let path = match resolve_command(args) {
        Ok(path) => path,
        Err(e) => return e,
    };
    info!(command = %path.display(), "exec");

    let source = Command::new(&path)
        .arg0(&args[0])
        .args(&args[1..])
        .exec();
    ExecError::Exec { path, source }
}

/// True if the current process may change ownership of arbitrary files.
pub fn is_privileged() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

