//! `.taco` marker packs are plain zip archives. we extract them as is and zip up the converted pack afterwards.

use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use tracing::{debug, info};
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::pack::PackError;

fn io_error(path: &Utf8Path) -> impl FnOnce(std::io::Error) -> PackError {
    let path = path.to_owned();
    move |source| PackError::Io { path, source }
}

/// Reads all the files of a taco archive into memory, keyed by their path inside the archive.
/// directories are skipped. any entry that would escape the archive root, isn't utf-8 or appears twice fails the whole pack.
pub fn read_taco(taco: &[u8]) -> Result<IndexMap<Utf8PathBuf, Vec<u8>>, PackError> {
    let mut zip_file = ZipArchive::new(std::io::Cursor::new(taco))?;
    let mut entries = IndexMap::default();
    for index in 0..zip_file.len() {
        let mut file = zip_file.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let file_path = file
            .enclosed_name()
            .ok_or_else(|| PackError::InvalidName(file.mangled_name()))?
            .to_path_buf();
        let file_path = Utf8PathBuf::from_path_buf(file_path).map_err(PackError::NonUtf8Path)?;
        let mut file_content = vec![];
        file.read_to_end(&mut file_content)
            .map_err(|source| PackError::Io {
                path: file_path.clone(),
                source,
            })?;
        if entries.contains_key(&file_path) {
            return Err(PackError::DuplicateEntry(file_path));
        }
        entries.insert(file_path, file_content);
    }
    Ok(entries)
}

/// extracts the archive at `taco_path` into `dest`, replacing files that already exist. returns the number of files written.
pub fn extract_taco(taco_path: &Utf8Path, dest: &Utf8Path) -> Result<usize, PackError> {
    let taco = std::fs::read(taco_path).map_err(io_error(taco_path))?;
    let entries = read_taco(&taco)?;
    for (relative, content) in entries.iter() {
        let path = dest.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        std::fs::write(&path, content).map_err(|source| PackError::Io { path, source })?;
    }
    info!("extracted {} files from {taco_path} into {dest}", entries.len());
    Ok(entries.len())
}

/// files that only matter for conversion and don't go into the bundle
fn is_source_file(path: &Utf8Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("trl") || ext.eq_ignore_ascii_case("xml"))
        .unwrap_or_default()
}

/// Zips the converted pack into `zip_path`. paths inside the zip are relative to `pack_root`.
/// trl and xml files are left out. returns the number of files in the bundle.
pub fn bundle_pack(pack_root: &Utf8Path, zip_path: &Utf8Path) -> Result<usize, PackError> {
    let file = std::fs::File::create(zip_path).map_err(io_error(zip_path))?;
    let mut zip = ZipWriter::new(std::io::BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;
    for entry in walkdir::WalkDir::new(pack_root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = Utf8Path::from_path(entry.path())
            .ok_or_else(|| PackError::NonUtf8Path(entry.path().to_path_buf()))?;
        // the bundle may be written into the pack itself
        if is_source_file(path) || path == zip_path {
            continue;
        }
        let Ok(relative) = path.strip_prefix(pack_root) else {
            continue;
        };
        let content = std::fs::read(path).map_err(io_error(path))?;
        zip.start_file(relative.as_str().replace('\\', "/"), options)?;
        zip.write_all(&content).map_err(io_error(zip_path))?;
        debug!("bundled {relative}");
        count += 1;
    }
    zip.finish()?;
    info!("bundled {count} files of {pack_root} into {zip_path}");
    Ok(count)
}

#[cfg(test)]
pub(super) mod test {
    use std::io::{Cursor, Read, Write};

    use camino::Utf8PathBuf;
    use similar_asserts::assert_eq;
    use zip::{write::FileOptions, ZipArchive, ZipWriter};

    use super::{bundle_pack, extract_taco, read_taco};
    use crate::pack::PackError;

    pub(in crate::manager) fn build_taco(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(*name, FileOptions::default())
                .expect("failed to start zip entry");
            zip.write_all(content).expect("failed to write zip entry");
        }
        zip.finish().expect("failed to finish zip").into_inner()
    }

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("non utf-8 temp dir");
        (dir, root)
    }

    #[test]
    fn reads_entries_in_archive_order() {
        let taco = build_taco(&[
            ("markers.xml", b"<OverlayData/>"),
            ("Data/trails/a.trl", &[0; 8]),
            ("Data/icon.png", b"png"),
        ]);
        let entries = read_taco(&taco).expect("failed to read taco");
        let names: Vec<&str> = entries.keys().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["markers.xml", "Data/trails/a.trl", "Data/icon.png"]);
        assert_eq!(entries[2], b"png".to_vec());
    }

    #[test]
    fn rejects_escaping_entries() {
        let taco = build_taco(&[("../evil.txt", b"nope")]);
        assert!(matches!(read_taco(&taco), Err(PackError::InvalidName(_))));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            read_taco(b"definitely not a zip"),
            Err(PackError::InvalidZip(_))
        ));
    }

    #[test]
    fn extract_then_bundle() {
        let (_dir, root) = temp_root();
        let taco_path = root.join("pack.taco");
        std::fs::write(
            &taco_path,
            build_taco(&[
                ("markers.xml", b"<OverlayData/>"),
                ("Data/a.trl", &[0; 8]),
                ("Data/icon.png", b"png"),
            ]),
        )
        .expect("write");
        let pack_root = root.join("pack");
        assert_eq!(extract_taco(&taco_path, &pack_root).expect("extract"), 3);
        assert_eq!(
            std::fs::read(pack_root.join("Data/icon.png")).expect("read"),
            b"png".to_vec()
        );
        std::fs::write(pack_root.join("markers.json"), "{}").expect("write");

        let zip_path = pack_root.join("bundle.zip");
        assert_eq!(bundle_pack(&pack_root, &zip_path).expect("bundle"), 2);
        let mut bundle = ZipArchive::new(std::fs::File::open(&zip_path).expect("open"))
            .expect("bundle is not a zip");
        let mut names: Vec<String> = bundle.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["Data/icon.png".to_string(), "markers.json".to_string()]);
        let mut json = String::new();
        bundle
            .by_name("markers.json")
            .expect("missing json")
            .read_to_string(&mut json)
            .expect("read");
        assert_eq!(json, "{}");
    }

    #[test]
    fn missing_archive_is_an_io_error() {
        let (_dir, root) = temp_root();
        let result = extract_taco(&root.join("missing.taco"), &root.join("out"));
        assert!(matches!(result, Err(PackError::Io { .. })));
    }
}
