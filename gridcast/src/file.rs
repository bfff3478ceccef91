//! JSON file utilities for configuration, reference data and matchup bundles.

use std::fs::File;
use std::io::{BufReader, BufWriter, Error};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{from_reader, to_writer_pretty};

/// Reads a JSON-encoded type from a given file `path`.
pub fn read_json<D: DeserializeOwned>(path: impl AsRef<Path>) -> Result<D, Error> {
    let file = File::open(path)?;
    Ok(from_reader(BufReader::new(file))?)
}

// JSON-encodes the `value` in pretty-printed form and writes it to a given `path`.
pub fn write_json(path: impl AsRef<Path>, value: &impl Serialize) -> Result<(), Error> {
    let file = File::create(path)?;
    Ok(to_writer_pretty(BufWriter::new(file), value)?)
}

pub trait ReadJsonFile<D> {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, Error>;
}

impl<D: DeserializeOwned> ReadJsonFile<D> for D {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, Error> {
        read_json(path)
    }
}

pub trait WriteJsonFile<S: Serialize> {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), Error>;
}

impl<S: Serialize> WriteJsonFile<S> for S {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        write_json(path, self)
    }
}
