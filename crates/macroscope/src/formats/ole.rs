//! Compound File Binary helpers on top of `cfb`.

use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use cfb::CompoundFile;

use super::{FormatError, MAX_STREAM_SIZE};

pub type OleFile<'a> = CompoundFile<Cursor<&'a [u8]>>;

pub fn open(data: &[u8]) -> Result<OleFile<'_>, FormatError> {
    CompoundFile::open(Cursor::new(data)).map_err(FormatError::Ole)
}

/// Reads a whole stream, refusing streams larger than [`MAX_STREAM_SIZE`].
pub fn read_stream<F: Read + Seek>(
    ole: &mut CompoundFile<F>,
    path: &Path,
) -> Result<Vec<u8>, FormatError> {
    let stream = ole.open_stream(path).map_err(FormatError::Ole)?;
    if stream.len() > MAX_STREAM_SIZE {
        return Err(FormatError::TooLarge {
            name: path.display().to_string(),
            limit: MAX_STREAM_SIZE,
        });
    }
    let mut data = Vec::with_capacity(stream.len() as usize);
    stream
        .take(MAX_STREAM_SIZE)
        .read_to_end(&mut data)
        .map_err(FormatError::Ole)?;
    Ok(data)
}

/// Storages named `VBA` (any case) that hold a `dir` stream.
///
/// Word keeps its project under `/Macros/VBA`, Excel under
/// `/_VBA_PROJECT_CUR/VBA`, and a bare `vbaProject.bin` under `/VBA`.
pub fn vba_project_roots<F>(ole: &CompoundFile<F>) -> Vec<PathBuf> {
    ole.walk()
        .filter(|entry| entry.is_storage() && entry.name().eq_ignore_ascii_case("VBA"))
        .map(|entry| entry.path().to_path_buf())
        .filter(|root| ole.is_stream(root.join("dir")))
        .collect()
}

/// Streams holding an OLE1 native embedded object (`\x01Ole10Native`).
pub fn native_object_streams<F>(ole: &CompoundFile<F>) -> Vec<PathBuf> {
    ole.walk()
        .filter(|entry| entry.is_stream() && entry.name().to_lowercase().ends_with("ole10native"))
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

/// Flattens a stream path into a single name: components joined with `_`,
/// control characters removed.
pub fn flatten_stream_path(path: &Path) -> String {
    let joined = path
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_");
    joined.chars().filter(|c| !c.is_control()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build(streams: &[(&str, &[u8])], storages: &[&str]) -> Vec<u8> {
        let mut ole = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        for storage in storages {
            ole.create_storage(storage).unwrap();
        }
        for (path, data) in streams {
            let mut stream = ole.create_stream(path).unwrap();
            stream.write_all(data).unwrap();
        }
        ole.flush().unwrap();
        ole.into_inner().into_inner()
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(open(b"definitely not a compound file").is_err());
        assert!(open(b"").is_err());
    }

    #[test]
    fn test_vba_project_roots_requires_dir_stream() {
        let data = build(
            &[("/Macros/VBA/dir", b"x"), ("/Other/VBA/Module1", b"y")],
            &["/Macros", "/Macros/VBA", "/Other", "/Other/VBA"],
        );
        let ole = open(&data).unwrap();

        assert_eq!(vba_project_roots(&ole), vec![PathBuf::from("/Macros/VBA")]);
    }

    #[test]
    fn test_native_object_streams() {
        let data = build(
            &[
                ("/ObjectPool/_1/\u{1}Ole10Native", b"payload"),
                ("/WordDocument", b"text"),
            ],
            &["/ObjectPool", "/ObjectPool/_1"],
        );
        let mut ole = open(&data).unwrap();

        let streams = native_object_streams(&ole);
        assert_eq!(streams.len(), 1);
        assert_eq!(read_stream(&mut ole, &streams[0]).unwrap(), b"payload");
    }

    #[test]
    fn test_flatten_stream_path() {
        assert_eq!(
            flatten_stream_path(Path::new("/ObjectPool/_1/\u{1}Ole10Native")),
            "ObjectPool__1_Ole10Native"
        );
        assert_eq!(flatten_stream_path(Path::new("/../x")), "x");
    }
}
