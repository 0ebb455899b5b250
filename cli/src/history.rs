use anyhow::Context;
use anyhow::Result;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

pub const HISTORY_FILENAME: &str = "history";

/// Recently typed query texts, one per line, oldest first.
#[derive(Debug, Clone)]
pub struct QueryHistory {
    path: PathBuf,
    max_entries: usize,
}

impl QueryHistory {
    pub fn new(home: &Path, max_entries: usize) -> Self {
        Self {
            path: home.join(HISTORY_FILENAME),
            max_entries,
        }
    }

    /// Appends `text` as the newest entry. An earlier identical entry is
    /// dropped and the oldest entries fall off past the cap. Blank text is
    /// not recorded.
    pub fn record(&self, text: &str) -> Result<()> {
        let entry = single_line(text);
        if entry.is_empty() || self.max_entries == 0 {
            return Ok(());
        }
        let mut entries = self.entries()?;
        entries.retain(|existing| existing != &entry);
        entries.push(entry);
        let overflow = entries.len().saturating_sub(self.max_entries);
        entries.drain(..overflow);
        self.write(&entries)
    }

    pub fn entries(&self) -> Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err).context("read query history"),
        }
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("clear query history"),
        }
    }

    fn write(&self, entries: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("create query history dir")?;
        }
        let mut data = entries.join("\n");
        data.push('\n');
        fs::write(&self.path, data).context("write query history")
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
