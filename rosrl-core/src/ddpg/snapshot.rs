use crate::env::{Env, Snapshot};
use anyhow::Result;
use std::path::Path;

pub const ENV_STATE_FILE: &str = "env_state.pkl";
pub const EVAL_ENV_STATE_FILE: &str = "eval_env_state.pkl";

fn write_snapshot(snapshot: &dyn Snapshot, path: &Path) -> Result<()> {
    let state = snapshot.get_state()?;
    std::fs::write(path, &*state)?;
    Ok(())
}

/// Overwrites `dir/file_name` with the environment's state. Environments without the snapshot
/// capability are skipped. Failures are logged and swallowed, the run goes on without the file.
/// Returns whether a file was written.
pub fn persist_snapshot<E: Env>(env: &E, dir: &Path, file_name: &str) -> bool {
    let Some(snapshot) = env.snapshot() else {
        return false;
    };
    let path = dir.join(file_name);
    match write_snapshot(snapshot, &path) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(path = %path.display(), "could not write environment snapshot: {err:#}");
            false
        }
    }
}
