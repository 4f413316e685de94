use std::fs;
use std::io::{self, prelude::*};
use std::path;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use log::debug;

use super::{station_key, LookupError, StationLookup};

/**
An offline table mapping `MNEMONIC-<phase initial>` keys to `NET.STA.CHA.LOC` codes.

The text form holds one `KEY = CODE` pair per line:

```text
URVA-P = SE.URVA.HHZ.--
SDMD-S = LD.SDMD.HHE.--
```
*/
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StationDictionary {
    entries: IndexMap<String, String>,
}

impl StationDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a dictionary from any buffered text source
    pub fn load<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut entries = IndexMap::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("No '=' in station dictionary line {}: {line:?}", i + 1),
                )
            })?;
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        debug!("Loaded {} station dictionary entries", entries.len());
        Ok(Self { entries })
    }

    pub fn open_path<P: AsRef<path::Path>>(path: P) -> io::Result<Self> {
        let handle = fs::File::open(path)?;
        Self::load(io::BufReader::new(handle))
    }

    pub fn save<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for (key, value) in self.entries.iter() {
            writeln!(writer, "{key} = {value}")?;
        }
        writer.flush()
    }

    pub fn save_path<P: AsRef<path::Path>>(&self, path: P) -> io::Result<()> {
        let handle = fs::File::create(path)?;
        self.save(io::BufWriter::new(handle))
    }

    pub fn insert<K: ToString, V: ToString>(&mut self, key: K, code: V) -> Option<String> {
        self.entries.insert(key.to_string(), code.to_string())
    }

    /// Look up the code for a station mnemonic and phase name
    pub fn get(&self, mnemonic: &str, phase_type: &str) -> Option<&str> {
        self.entries
            .get(&station_key(mnemonic, phase_type))
            .map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl StationLookup for StationDictionary {
    fn resolve_by_location(
        &mut self,
        mnemonic: &str,
        _latitude: f64,
        _longitude: f64,
        _radius: f64,
    ) -> Result<String, LookupError> {
        Ok(mnemonic.to_string())
    }

    fn resolve_by_name_and_time(
        &mut self,
        mnemonic: &str,
        phase_type: &str,
        _arrival: NaiveDateTime,
    ) -> Result<String, LookupError> {
        self.get(mnemonic, phase_type)
            .map(|s| s.to_string())
            .ok_or_else(|| {
                LookupError::Unavailable(format!(
                    "No dictionary entry for {}",
                    station_key(mnemonic, phase_type)
                ))
            })
    }
}
