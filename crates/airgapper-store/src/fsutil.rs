//! Filesystem helpers shared by the request store and (via `airgapper-config`)
//! the root config record: directory mode 0700, file mode 0600, atomic
//! write-then-rename (spec.md §4.2, §6).

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

#[cfg(unix)]
pub fn ensure_dir_0700(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(dir)?;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
pub fn ensure_dir_0700(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_file_mode_0600(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_file_mode_0600(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Write `contents` to `path` atomically: write to a sibling temp file, set
/// its mode to 0600, then rename over the destination.
pub fn write_atomic_0600(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, contents)?;
    set_file_mode_0600(&tmp_path)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Open (creating if absent) `path` and take an advisory exclusive lock on
/// it for the duration of the returned guard's lifetime. Serializes
/// concurrent mutations of the same record across threads and processes
/// (spec.md §4.2 note, §5).
pub struct RecordLock {
    _file: File,
}

impl RecordLock {
    pub fn acquire(path: &Path) -> io::Result<Self> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { _file: file })
    }
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self._file);
    }
}
