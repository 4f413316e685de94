use std::fs;
use std::io::{self, prelude::*};
use std::path;

use flate2::read::MultiGzDecoder;

pub fn is_gzipped(header: &[u8]) -> bool {
    header.starts_with(b"\x1f\x8b")
}

/// Check whether a path ends in `.gz`, returning the path with that extension removed
pub fn is_gzipped_extension(path: path::PathBuf) -> (bool, path::PathBuf) {
    if let Some(ext) = path.extension() {
        if ext.to_ascii_lowercase() == "gz" {
            (true, path.with_extension(""))
        } else {
            (false, path)
        }
    } else {
        (false, path)
    }
}

/// Open a file for reading, transparently decompressing it if it starts with the
/// GZIP magic bytes
pub fn open_maybe_gzipped<P: AsRef<path::Path>>(path: P) -> io::Result<Box<dyn Read + Send>> {
    let mut handle = io::BufReader::new(fs::File::open(path)?);
    let header = handle.fill_buf()?;
    if is_gzipped(header) {
        Ok(Box::new(MultiGzDecoder::new(handle)))
    } else {
        Ok(Box::new(handle))
    }
}
