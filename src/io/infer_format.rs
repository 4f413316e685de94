use std::fmt::Display;
use std::fs;
use std::io::{self, prelude::*};
use std::path;

use flate2::read::MultiGzDecoder;
use log::debug;

use crate::event::Event;
use crate::io::compression::{is_gzipped, is_gzipped_extension, open_maybe_gzipped};
use crate::io::traits::CatalogError;

#[cfg(feature = "iscgem")]
use crate::io::iscgem::{is_iscgem, IscGemReader};
#[cfg(feature = "mloc")]
use crate::io::mloc::{is_mloc, MlocReader};
#[cfg(feature = "ndk")]
use crate::io::ndk::{is_ndk, NdkReader};

/// The number of leading bytes inspected when guessing a format from content
const HEADER_SIZE: u64 = 4096;

/// Earthquake catalog formats that [`quakecat`](crate) can read
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CatalogFormat {
    NDK,
    MLOC,
    ISCGEM,
    Unknown,
}

impl CatalogFormat {
    /// The short tag used to name output files, e.g. `us1234_ndk.xml`
    pub const fn file_type(&self) -> Option<&'static str> {
        match self {
            CatalogFormat::NDK => Some("ndk"),
            CatalogFormat::MLOC => Some("mloc"),
            CatalogFormat::ISCGEM => Some("iscgem"),
            CatalogFormat::Unknown => None,
        }
    }
}

impl Display for CatalogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Given a path, infer the catalog format and whether or not the file at that path is
/// GZIP compressed
pub fn infer_from_path<P: Into<path::PathBuf>>(path: P) -> (CatalogFormat, bool) {
    let (is_gzipped, path) = is_gzipped_extension(path.into());
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let form = match ext.as_deref() {
        Some("ndk") => CatalogFormat::NDK,
        Some("comcat") | Some("mloc") => CatalogFormat::MLOC,
        Some("csv") => CatalogFormat::ISCGEM,
        _ => CatalogFormat::Unknown,
    };
    (form, is_gzipped)
}

/// Given a stream of bytes, infer the catalog format and whether or not the
/// stream is GZIP compressed. The stream is returned to its starting position.
pub fn infer_from_stream<R: Read + Seek>(stream: &mut R) -> io::Result<(CatalogFormat, bool)> {
    let current_pos = stream.stream_position()?;
    let mut buf = Vec::new();
    (&mut *stream).take(HEADER_SIZE).read_to_end(&mut buf)?;
    let is_stream_gzipped = is_gzipped(&buf);
    if is_stream_gzipped {
        stream.seek(io::SeekFrom::Start(current_pos))?;
        let mut decoded = Vec::new();
        let mut decoder = MultiGzDecoder::new(&mut *stream).take(HEADER_SIZE);
        // A short compressed member is still enough to sniff the first lines
        if let Err(e) = decoder.read_to_end(&mut decoded) {
            debug!("Stopped decompressing format header early: {e}");
        }
        buf = decoded;
    }
    stream.seek(io::SeekFrom::Start(current_pos))?;

    let format = match &buf {
        #[cfg(feature = "ndk")]
        _ if is_ndk(&buf) => CatalogFormat::NDK,
        #[cfg(feature = "iscgem")]
        _ if is_iscgem(&buf) => CatalogFormat::ISCGEM,
        #[cfg(feature = "mloc")]
        _ if is_mloc(&buf) => CatalogFormat::MLOC,
        _ => CatalogFormat::Unknown,
    };
    Ok((format, is_stream_gzipped))
}

/// Given a path, infer the catalog format and whether or not the file at that path is
/// GZIP compressed, using both the file name and by trying to open and read the file
/// header
pub fn infer_format<P: Into<path::PathBuf>>(path: P) -> io::Result<(CatalogFormat, bool)> {
    let path: path::PathBuf = path.into();

    let (format, is_gzipped) = infer_from_path(&path);
    match format {
        CatalogFormat::Unknown => {
            let mut handle = io::BufReader::new(fs::File::open(path)?);
            infer_from_stream(&mut handle)
        }
        _ => Ok((format, is_gzipped)),
    }
}

/// A boxed stream of events from any supported catalog
pub type EventIterator = Box<dyn Iterator<Item = Result<Event, CatalogError>>>;

/// Open a catalog file of any supported format, compressed or not, and iterate over its
/// events. Fails if the format cannot be recognized.
pub fn open_file<P: Into<path::PathBuf>>(path: P) -> io::Result<(CatalogFormat, EventIterator)> {
    let path: path::PathBuf = path.into();
    let (format, _) = infer_format(&path)?;
    let handle = open_maybe_gzipped(&path)?;
    debug!("Opening {} as {format}", path.display());
    let events: EventIterator = match format {
        #[cfg(feature = "ndk")]
        CatalogFormat::NDK => Box::new(NdkReader::new(handle).map(|r| r.map_err(CatalogError::from))),
        #[cfg(feature = "mloc")]
        CatalogFormat::MLOC => Box::new(MlocReader::new(handle).map(|r| r.map_err(CatalogError::from))),
        #[cfg(feature = "iscgem")]
        CatalogFormat::ISCGEM => {
            Box::new(IscGemReader::new(handle).map(|r| r.map_err(CatalogError::from)))
        }
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("Could not infer the catalog format of {}", path.display()),
            ))
        }
    };
    Ok((format, events))
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::{write::GzEncoder, Compression};

    #[test]
    fn test_infer_from_path() {
        assert_eq!(infer_from_path("jan76_dec20.ndk"), (CatalogFormat::NDK, false));
        assert_eq!(infer_from_path("jan76_dec20.NDK.gz"), (CatalogFormat::NDK, true));
        assert_eq!(infer_from_path("mineral.comcat"), (CatalogFormat::MLOC, false));
        assert_eq!(infer_from_path("mineral.mloc"), (CatalogFormat::MLOC, false));
        assert_eq!(infer_from_path("isc-gem-cat.csv"), (CatalogFormat::ISCGEM, false));
        assert_eq!(infer_from_path("events.txt"), (CatalogFormat::Unknown, false));
    }

    #[test]
    fn test_infer_from_stream() -> io::Result<()> {
        for (path, expected) in [
            ("./test/data/gcmt.ndk", CatalogFormat::NDK),
            ("./test/data/mloc.comcat", CatalogFormat::MLOC),
            ("./test/data/isc-gem-cat.csv", CatalogFormat::ISCGEM),
        ] {
            let mut handle = io::Cursor::new(fs::read(path)?);
            handle.seek(io::SeekFrom::Start(0))?;
            let (format, gzipped) = infer_from_stream(&mut handle)?;
            assert_eq!(format, expected, "{path}");
            assert!(!gzipped);
            assert_eq!(handle.stream_position()?, 0);
        }
        let mut handle = io::Cursor::new(b"not a catalog\n".to_vec());
        assert_eq!(
            infer_from_stream(&mut handle)?,
            (CatalogFormat::Unknown, false)
        );
        Ok(())
    }

    #[test]
    fn test_open_gzipped_without_extension() -> io::Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let path = tmpdir.path().join("catalog");
        let mut encoder = GzEncoder::new(fs::File::create(&path)?, Compression::default());
        encoder.write_all(&fs::read("./test/data/gcmt.ndk")?)?;
        encoder.finish()?;

        assert_eq!(infer_format(&path)?, (CatalogFormat::NDK, true));
        let (format, events) = open_file(&path)?;
        assert_eq!(format, CatalogFormat::NDK);
        let events: Vec<Event> = events.collect::<Result<_, _>>().map_err(io::Error::from)?;
        assert_eq!(events.len(), 2);
        Ok(())
    }

    #[test]
    fn test_open_file() -> io::Result<()> {
        let (format, events) = open_file("./test/data/isc-gem-cat.csv")?;
        assert_eq!(format, CatalogFormat::ISCGEM);
        assert_eq!(events.count(), 2);

        let tmpdir = tempfile::tempdir()?;
        let path = tmpdir.path().join("notes");
        fs::write(&path, "nothing to see here\n")?;
        let err = open_file(&path).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        Ok(())
    }
}
