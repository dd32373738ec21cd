// ABOUTME: Stores of already processed page identifiers so repeated runs skip finished pages.
// ABOUTME: MemoryIdStore lives for one run; FileIdStore keeps one identifier per line on disk.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// A set of identifiers that survives as long as the backing store does.
pub trait IdStore {
    fn contains(&self, id: &str) -> bool;

    /// Adds `id`; adding an identifier already present is a no-op.
    fn add(&mut self, id: &str) -> Result<()>;

    fn len(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct MemoryIdStore {
    ids: HashSet<String>,
}

impl MemoryIdStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdStore for MemoryIdStore {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn add(&mut self, id: &str) -> Result<()> {
        self.ids.insert(id.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Identifiers kept in a text file, one per line, appended as they are added.
#[derive(Debug)]
pub struct FileIdStore {
    path: PathBuf,
    ids: HashSet<String>,
    file: File,
    // Set when the file ends mid-line; the next append starts a new line first.
    needs_newline: bool,
}

impl FileIdStore {
    /// Opens the store at `path`, loading existing lines and creating the file if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("reading processed ids from {}", path.display()))
            }
        };
        let ids: HashSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        let needs_newline = !content.is_empty() && !content.ends_with('\n');
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening processed ids file {}", path.display()))?;
        tracing::debug!(path = %path.display(), count = ids.len(), "loaded processed ids");
        Ok(Self {
            path,
            ids,
            file,
            needs_newline,
        })
    }
}

impl IdStore for FileIdStore {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn add(&mut self, id: &str) -> Result<()> {
        if !self.ids.insert(id.to_string()) {
            return Ok(());
        }
        if self.needs_newline {
            writeln!(self.file).with_context(|| format!("appending to {}", self.path.display()))?;
            self.needs_newline = false;
        }
        writeln!(self.file, "{}", id)
            .with_context(|| format!("appending to {}", self.path.display()))?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
