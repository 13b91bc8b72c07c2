//! File and directory utilities: JSON configuration and vendor SDK discovery.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use std::{fs, io};

use serde::de::DeserializeOwned;
use serde_json::from_reader;

/// Reads a JSON-encoded type from a given file `path`.
pub fn read_json<D: DeserializeOwned>(path: impl AsRef<Path>) -> Result<D, io::Error> {
    let file = File::open(path)?;
    Ok(from_reader(BufReader::new(file))?)
}

pub trait ReadJsonFile<D> {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, io::Error>;
}

impl<D: DeserializeOwned> ReadJsonFile<D> for D {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, io::Error> {
        read_json(path)
    }
}

/// Recursively locates all files under `path` accepted by `filter`, appending them to `files`.
/// If `path` is itself a file that passes the filter, it is added to `files`.
pub fn recurse_dir(
    path: PathBuf,
    files: &mut Vec<PathBuf>,
    filter: &mut impl FnMut(&Path) -> bool,
) -> Result<(), io::Error> {
    let md = fs::metadata(&path)?;
    if md.is_dir() {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        for entry in entries {
            recurse_dir(entry, files, filter)?;
        }
    } else if filter(&path) {
        files.push(path);
    }
    Ok(())
}

/// Creation time of a file, falling back to its modification time on platforms that do not
/// record creation.
pub fn created(path: impl AsRef<Path>) -> Result<SystemTime, io::Error> {
    let md = fs::metadata(path)?;
    md.created().or_else(|_| md.modified())
}

/// The most recently created of `files`, if any.
pub fn most_recent(files: &[PathBuf]) -> Result<Option<&PathBuf>, io::Error> {
    let mut newest: Option<(&PathBuf, SystemTime)> = None;
    for file in files {
        let time = created(file)?;
        if newest.map_or(true, |(_, newest_time)| time > newest_time) {
            newest = Some((file, time));
        }
    }
    Ok(newest.map(|(file, _)| file))
}
