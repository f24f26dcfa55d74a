//! All-or-nothing output writer.
//!
//! Outputs are staged to temp files next to their destinations. Every target
//! is checked before the first rename; previous files are moved aside and put
//! back if a later rename fails, so a failed run leaves the previous outputs
//! as they were.

use std::io::Write;
use std::path::{Path, PathBuf};

use kfar_recon::emit::RenderedOutput;
use kfar_recon::ReconError;
use tempfile::{NamedTempFile, TempPath};

/// A target already replaced in this run, with the file it replaced.
struct Committed {
    target: PathBuf,
    previous: Option<TempPath>,
}

/// Write every rendered output under `base_dir`. Returns the final paths.
pub fn write_outputs(outputs: &[RenderedOutput], base_dir: &Path) -> Result<Vec<PathBuf>, ReconError> {
    let mut staged: Vec<(NamedTempFile, PathBuf)> = Vec::with_capacity(outputs.len());

    for output in outputs {
        let target = base_dir.join(&output.path);
        if target.exists() && !target.is_file() {
            return Err(ReconError::Io(format!(
                "cannot write {}: exists and is not a regular file",
                target.display()
            )));
        }
        let parent = parent_dir(&target, base_dir);

        std::fs::create_dir_all(&parent)
            .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", parent.display())))?;

        let mut tmp = NamedTempFile::new_in(&parent)
            .map_err(|e| ReconError::Io(format!("cannot stage {}: {e}", target.display())))?;
        tmp.write_all(output.contents.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", target.display())))?;

        staged.push((tmp, target));
    }

    let mut committed: Vec<Committed> = Vec::with_capacity(staged.len());
    for (tmp, target) in staged {
        match commit(tmp, &target, base_dir) {
            Ok(previous) => committed.push(Committed { target, previous }),
            Err(e) => {
                roll_back(committed);
                return Err(e);
            }
        }
    }

    // Dropping the `previous` temp paths deletes the replaced files.
    Ok(committed
        .into_iter()
        .map(|c| {
            log::debug!("wrote {}", c.target.display());
            c.target
        })
        .collect())
}

fn parent_dir(target: &Path, base_dir: &Path) -> PathBuf {
    target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base_dir.to_path_buf())
}

/// Move the current target aside (if any), then rename the staged file over it.
fn commit(tmp: NamedTempFile, target: &Path, base_dir: &Path) -> Result<Option<TempPath>, ReconError> {
    let previous = if target.is_file() {
        let aside = tempfile::Builder::new()
            .prefix(".kfar-previous-")
            .tempfile_in(parent_dir(target, base_dir))
            .map_err(|e| ReconError::Io(format!("cannot back up {}: {e}", target.display())))?
            .into_temp_path();
        std::fs::rename(target, &aside)
            .map_err(|e| ReconError::Io(format!("cannot back up {}: {e}", target.display())))?;
        Some(aside)
    } else {
        None
    };

    if let Err(e) = tmp.persist(target) {
        if let Some(aside) = &previous {
            if let Err(restore) = std::fs::rename(aside, target) {
                log::warn!("could not restore {}: {restore}", target.display());
            }
        }
        return Err(ReconError::Io(format!("cannot write {}: {}", target.display(), e.error)));
    }
    Ok(previous)
}

/// Undo already-committed targets, newest first.
fn roll_back(committed: Vec<Committed>) {
    for c in committed.into_iter().rev() {
        let restored = match &c.previous {
            Some(aside) => std::fs::rename(aside, &c.target),
            None => std::fs::remove_file(&c.target),
        };
        if let Err(e) = restored {
            log::warn!("could not roll back {}: {e}", c.target.display());
        }
    }
}
