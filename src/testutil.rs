//! Stand-in executables for tests that exercise the process boundary.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

static SPAWN_LOCK: Mutex<()> = Mutex::new(());

/// Hold this while writing or spawning stand-in tools. A script written by one
/// thread can otherwise fail to exec with ETXTBSY if another thread forks while
/// the write handle is open.
pub fn spawn_guard() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Write an executable `/bin/sh` script called `name` into `dir`.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("failed to mark script executable");
    }
    path
}
