//! Fresh output directory allocation.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Default number of suffixed candidates probed before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Hands out output directories that did not exist before.
///
/// `allocate("code")` returns `code` if it is free, otherwise the first
/// free one of `code_1`, `code_2`, ... Each candidate is claimed with a
/// single non-recursive `create_dir`, so an existing directory is never
/// reused or modified.
#[derive(Debug, Clone, Copy)]
pub struct OutputDirectoryAllocator {
    max_attempts: u32,
}

impl Default for OutputDirectoryAllocator {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl OutputDirectoryAllocator {
    /// Create an allocator with the default attempt limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of suffixed candidates to probe.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Create and return a directory that did not exist before this call.
    pub fn allocate<P: AsRef<Path>>(&self, base: P) -> Result<PathBuf> {
        let base = base.as_ref();
        if let Some(parent) = base.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| Error::OutputAllocation {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        for attempt in 0..=self.max_attempts {
            let candidate = if attempt == 0 {
                base.to_path_buf()
            } else {
                suffixed(base, attempt)
            };
            match std::fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(Error::OutputAllocation {
                        path: candidate,
                        source,
                    })
                }
            }
        }

        Err(Error::OutputAllocation {
            path: base.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free name after {} attempts", self.max_attempts),
            ),
        })
    }
}

fn suffixed(base: &Path, n: u32) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!("_{}", n));
    PathBuf::from(name)
}
