use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::process;

use nix::sys::stat::{umask, Mode};
use nix::unistd::{chdir, dup2, fork, setsid, ForkResult};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("fork failed: {0}")]
    Fork(nix::Error),
    #[error("setsid failed: {0}")]
    Session(nix::Error),
    #[error("failed to open /dev/null: {0}")]
    DevNull(std::io::Error),
    #[error("failed to redirect stdio: {0}")]
    Redirect(nix::Error),
}

/// Detaches from the controlling session: fork and exit the parent, become
/// session leader, chdir to `/`, point stdio at `/dev/null`, tighten the
/// umask. Must run before any runtime threads exist.
pub fn detach() -> Result<(), DaemonError> {
    // SAFETY: called from a single-threaded process; the tokio runtime is
    // built only after detaching.
    match unsafe { fork() }.map_err(DaemonError::Fork)? {
        ForkResult::Parent { .. } => process::exit(0),
        ForkResult::Child => {}
    }

    setsid().map_err(DaemonError::Session)?;
    let _ = chdir("/");

    let devnull = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(DaemonError::DevNull)?;
    for target in 0..=2 {
        dup2(devnull.as_raw_fd(), target).map_err(DaemonError::Redirect)?;
    }

    umask(Mode::from_bits_truncate(0o027));
    Ok(())
}
