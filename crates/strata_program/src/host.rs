//! File-system access for programs and emitters.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use strata_common::path::normalize_slashes;

/// File-system services a program needs.
///
/// All names are absolute, `/`-separated paths. Writes go through `&self` so
/// one host can be shared by a program and the incremental engine.
pub trait Host: Send + Sync + 'static {
    /// Returns the text of `file_name`, or `None` if it cannot be read.
    fn read_file(&self, file_name: &str) -> Option<String>;

    /// Writes `text` to `file_name`, creating parent directories as needed.
    fn write_file(&self, file_name: &str, text: &str, write_byte_order_mark: bool) -> io::Result<()>;

    /// Returns `true` if `file_name` exists.
    fn file_exists(&self, file_name: &str) -> bool;

    /// The directory relative names are resolved against.
    fn current_directory(&self) -> &str;

    /// Whether file names differing only in case name different files.
    fn use_case_sensitive_file_names(&self) -> bool {
        true
    }
}

/// An in-memory file system.
///
/// Every write is also recorded in a log that tests drain with
/// [`take_written`](Self::take_written) to observe exactly which outputs an
/// emit touched.
pub struct MemoryHost {
    files: Mutex<BTreeMap<String, String>>,
    written: Mutex<Vec<String>>,
    current_directory: String,
    case_sensitive: bool,
    failing_writes: Mutex<Vec<String>>,
}

impl MemoryHost {
    /// Creates an empty host rooted at `current_directory`.
    pub fn new(current_directory: impl Into<String>) -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            written: Mutex::new(Vec::new()),
            current_directory: current_directory.into(),
            case_sensitive: true,
            failing_writes: Mutex::new(Vec::new()),
        }
    }

    /// Creates a host pre-populated with `files`.
    pub fn with_files<'a>(
        current_directory: impl Into<String>,
        files: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let host = Self::new(current_directory);
        for (name, text) in files {
            host.set_file(name, text);
        }
        host
    }

    /// Makes file-name comparison case-insensitive.
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Creates or replaces a file without recording a write.
    pub fn set_file(&self, file_name: &str, text: &str) {
        self.lock_files().insert(file_name.to_string(), text.to_string());
    }

    /// Removes a file.
    pub fn remove_file(&self, file_name: &str) {
        self.lock_files().remove(file_name);
    }

    /// Makes every later write to `file_name` fail.
    pub fn fail_writes_to(&self, file_name: &str) {
        self.failing_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file_name.to_string());
    }

    /// Returns and clears the names written since the last call, in write order.
    pub fn take_written(&self) -> Vec<String> {
        std::mem::take(&mut *self.written.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the names of all files, sorted.
    pub fn file_names(&self) -> Vec<String> {
        self.lock_files().keys().cloned().collect()
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Host for MemoryHost {
    fn read_file(&self, file_name: &str) -> Option<String> {
        self.lock_files().get(file_name).cloned()
    }

    fn write_file(&self, file_name: &str, text: &str, write_byte_order_mark: bool) -> io::Result<()> {
        let failing = self
            .failing_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|name| name == file_name);
        if failing {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "write denied"));
        }
        let text = if write_byte_order_mark {
            format!("\u{feff}{text}")
        } else {
            text.to_string()
        };
        self.lock_files().insert(file_name.to_string(), text);
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file_name.to_string());
        Ok(())
    }

    fn file_exists(&self, file_name: &str) -> bool {
        self.lock_files().contains_key(file_name)
    }

    fn current_directory(&self) -> &str {
        &self.current_directory
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        self.case_sensitive
    }
}

/// The real file system.
pub struct OsHost {
    current_directory: String,
}

impl OsHost {
    /// Creates a host resolving relative names against `current_directory`.
    pub fn new(current_directory: &Path) -> Self {
        Self {
            current_directory: normalize_slashes(&current_directory.to_string_lossy()),
        }
    }
}

impl Host for OsHost {
    fn read_file(&self, file_name: &str) -> Option<String> {
        std::fs::read_to_string(file_name).ok()
    }

    fn write_file(&self, file_name: &str, text: &str, write_byte_order_mark: bool) -> io::Result<()> {
        let path = Path::new(file_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if write_byte_order_mark {
            std::fs::write(path, format!("\u{feff}{text}"))
        } else {
            std::fs::write(path, text)
        }
    }

    fn file_exists(&self, file_name: &str) -> bool {
        Path::new(file_name).is_file()
    }

    fn current_directory(&self) -> &str {
        &self.current_directory
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        !cfg!(any(windows, target_os = "macos"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_host_round_trip() {
        let host = MemoryHost::with_files("/p", [("/p/a.ts", "let a = 1;")]);
        assert!(host.file_exists("/p/a.ts"));
        assert_eq!(host.read_file("/p/a.ts").as_deref(), Some("let a = 1;"));
        host.write_file("/p/out/a.js", "var a = 1;", false).unwrap();
        assert_eq!(host.take_written(), vec!["/p/out/a.js"]);
        assert!(host.take_written().is_empty());
        assert_eq!(host.file_names(), vec!["/p/a.ts", "/p/out/a.js"]);
    }

    #[test]
    fn memory_host_failing_writes() {
        let host = MemoryHost::new("/p");
        host.fail_writes_to("/p/x.js");
        assert!(host.write_file("/p/x.js", "", false).is_err());
        assert!(!host.file_exists("/p/x.js"));
    }

    #[test]
    fn os_host_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let host = OsHost::new(dir.path());
        let target = format!("{}/nested/out.js", host.current_directory());
        host.write_file(&target, "x", false).unwrap();
        assert!(host.file_exists(&target));
        assert_eq!(host.read_file(&target).as_deref(), Some("x"));
    }
}
