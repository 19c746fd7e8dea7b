use crate::MigrationError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_stream::{StreamExt, wrappers::ReadDirStream};

const FILE_PREFIX: &str = "mig_";
const UP_SUFFIX: &str = "_up.sql";
const DOWN_SUFFIX: &str = "_down.sql";
const SQUASH_LABEL: &str = "squashed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One timestamp-identified pair of SQL files. Either side may be missing
/// after a directory scan; both are required before execution or squash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub timestamp: i64,
    pub up: Option<String>,
    pub down: Option<String>,
}

impl MigrationFile {
    pub fn is_complete(&self) -> bool {
        self.up.is_some() && self.down.is_some()
    }

    pub fn name(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Up => self.up.as_deref(),
            Direction::Down => self.down.as_deref(),
        }
    }
}

pub type MigrationFileList = Vec<MigrationFile>;

/// Stateless view of the migration files on disk. Every call re-scans the
/// directory, so the catalog always reflects its current contents.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Entries with `from < timestamp <= to`, ascending.
    async fn between(&self, from: i64, to: i64) -> Result<MigrationFileList, MigrationError>;
    async fn read_content(
        &self,
        file: &MigrationFile,
        direction: Direction,
    ) -> Result<String, MigrationError>;
    async fn create(&self, name: &str) -> Result<(), MigrationError>;
    /// Collapses a non-empty ascending list into one consolidated pair named
    /// after the last timestamp, then removes the originals.
    async fn squash(&self, files: &[MigrationFile]) -> Result<(), MigrationError>;
}

/// Builds the canonical up/down file names for a timestamp. Spaces and
/// underscores in the label are normalized to hyphens.
pub fn file_names(timestamp: i64, label: Option<&str>) -> (String, String) {
    let label = match label.filter(|l| !l.is_empty()) {
        Some(label) => format!("_{}", label.replace([' ', '_'], "-")),
        None => String::new(),
    };

    (
        format!("{FILE_PREFIX}{timestamp}{label}{UP_SUFFIX}"),
        format!("{FILE_PREFIX}{timestamp}{label}{DOWN_SUFFIX}"),
    )
}

/// Matches `mig_<ts>[_<label>]_up.sql` / `_down.sql`. Names outside the
/// convention return `None`; a convention-shaped name with a non-decimal
/// timestamp is an error.
fn parse_file_name(name: &str) -> Result<Option<(i64, Direction)>, MigrationError> {
    let Some(rest) = name.strip_prefix(FILE_PREFIX) else {
        return Ok(None);
    };

    let (stem, direction) = if let Some(stem) = rest.strip_suffix(UP_SUFFIX) {
        (stem, Direction::Up)
    } else if let Some(stem) = rest.strip_suffix(DOWN_SUFFIX) {
        (stem, Direction::Down)
    } else {
        return Ok(None);
    };

    let ts_part = stem.split('_').next().unwrap_or(stem);
    let timestamp = ts_part
        .parse::<i64>()
        .map_err(|_| MigrationError::ParseFileName(name.to_string()))?;

    Ok(Some((timestamp, direction)))
}

fn filter_between(files: MigrationFileList, from: i64, to: i64) -> MigrationFileList {
    files
        .into_iter()
        .filter(|file| from < file.timestamp && file.timestamp <= to)
        .collect()
}

pub struct DirCatalog {
    dir: PathBuf,
}

impl DirCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn io_err(&self, name: impl AsRef<Path>, source: std::io::Error) -> MigrationError {
        MigrationError::Io {
            name: name.as_ref().display().to_string(),
            source,
        }
    }

    /// Scans the directory and pairs up/down files sharing a timestamp.
    pub async fn discover(&self) -> Result<MigrationFileList, MigrationError> {
        let read_dir = fs::read_dir(&self.dir)
            .await
            .map_err(|source| self.io_err(&self.dir, source))?;
        let mut entries = ReadDirStream::new(read_dir);

        let mut found: BTreeMap<i64, MigrationFile> = BTreeMap::new();
        while let Some(entry) = entries.next().await {
            let entry = entry.map_err(|source| self.io_err(&self.dir, source))?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };

            let Some((timestamp, direction)) = parse_file_name(&name)? else {
                continue;
            };

            let file = found.entry(timestamp).or_insert(MigrationFile {
                timestamp,
                up: None,
                down: None,
            });
            match direction {
                Direction::Up => file.up = Some(name),
                Direction::Down => file.down = Some(name),
            }
        }

        Ok(found.into_values().collect())
    }
}

#[async_trait::async_trait]
impl Catalog for DirCatalog {
    async fn between(&self, from: i64, to: i64) -> Result<MigrationFileList, MigrationError> {
        Ok(filter_between(self.discover().await?, from, to))
    }

    async fn read_content(
        &self,
        file: &MigrationFile,
        direction: Direction,
    ) -> Result<String, MigrationError> {
        let name = file
            .name(direction)
            .ok_or(MigrationError::IncompletePair(file.timestamp))?;

        fs::read_to_string(self.dir.join(name))
            .await
            .map_err(|source| self.io_err(name, source))
    }

    async fn create(&self, name: &str) -> Result<(), MigrationError> {
        fs::File::create(self.dir.join(name))
            .await
            .map_err(|source| self.io_err(name, source))?;
        Ok(())
    }

    async fn squash(&self, files: &[MigrationFile]) -> Result<(), MigrationError> {
        let last = files.last().ok_or(MigrationError::EmptySquash)?;

        let mut up_body = String::new();
        for file in files {
            up_body.push_str(&format!("-- migration {} UP\n", file.timestamp));
            up_body.push_str(&self.read_content(file, Direction::Up).await?);
            up_body.push('\n');
        }

        // Down scripts undo in LIFO order, so the merged body reverses.
        let mut down_body = String::new();
        for file in files.iter().rev() {
            down_body.push_str(&format!("-- migration {} DOWN\n", file.timestamp));
            down_body.push_str(&self.read_content(file, Direction::Down).await?);
            down_body.push('\n');
        }

        let (up_name, down_name) = file_names(last.timestamp, Some(SQUASH_LABEL));
        fs::write(self.dir.join(&up_name), up_body)
            .await
            .map_err(|source| self.io_err(&up_name, source))?;
        fs::write(self.dir.join(&down_name), down_body)
            .await
            .map_err(|source| self.io_err(&down_name, source))?;

        for file in files {
            for name in [&file.up, &file.down].into_iter().flatten() {
                if *name == up_name || *name == down_name {
                    continue;
                }
                fs::remove_file(self.dir.join(name))
                    .await
                    .map_err(|source| self.io_err(name, source))?;
            }
        }

        Ok(())
    }
}
