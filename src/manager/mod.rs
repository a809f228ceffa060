//! Driving the converter over whole packs.
//!
//! A pack on disk is a directory (usually an extracted `.taco` archive) with marker documents at the top level
//! and textures / trl files somewhere below it. Each `<name>.xml` is converted into a `<name>.json` right next to it.
//! Documents are independent of each other, so they are converted in parallel.

mod pack_list;
mod taco;

pub use pack_list::{process_marker_pack, process_pack_list, MarkerPack, PackList, PackOutcome, ProcessedPack};
pub use taco::{bundle_pack, extract_taco, read_taco};

use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::pack::{convert, AssetStager, DocumentError, MarkerDocument, PackDir, PackError, ParseOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub parse: ParseOptions,
    /// two space indented json
    pub pretty_json: bool,
    /// copy placeholder textures into `<pack>/burrito/` when they are referenced
    pub stage_placeholders: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            pretty_json: true,
            stage_placeholders: true,
        }
    }
}

/// what happened to one converted document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub xml_path: Utf8PathBuf,
    pub json_path: Utf8PathBuf,
    pub maps: usize,
    pub icons: usize,
    pub paths: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Default)]
pub struct PackReport {
    pub converted: Vec<DocumentReport>,
    pub failed: Vec<(Utf8PathBuf, DocumentError)>,
}

impl PackReport {
    pub fn documents(&self) -> usize {
        self.converted.len() + self.failed.len()
    }
    pub fn item_errors(&self) -> usize {
        self.converted.iter().map(|doc| doc.errors).sum()
    }
    pub fn item_warnings(&self) -> usize {
        self.converted.iter().map(|doc| doc.warnings).sum()
    }
}

/// reads a marker document from disk. invalid utf-8 is replaced rather than failing the document.
pub fn read_document(xml_path: &Utf8Path, options: &ParseOptions) -> Result<MarkerDocument, DocumentError> {
    let bytes = std::fs::read(xml_path).map_err(|source| DocumentError::Io {
        path: xml_path.to_owned(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    MarkerDocument::from_xml_str(text.trim_start_matches('\u{feff}'), options)
}

/// converts `xml_path` and writes `<stem>.json` next to it. an existing json file is overwritten.
/// trl files and staged placeholders are relative to `pack_root`.
pub fn convert_document_file(
    xml_path: &Utf8Path,
    pack_root: &Utf8Path,
    options: &ConvertOptions,
) -> Result<DocumentReport, DocumentError> {
    let document = read_document(xml_path, &options.parse)?;
    let mut assets = if options.stage_placeholders {
        AssetStager::new(pack_root)
    } else {
        AssetStager::disabled()
    };
    let (maps, failures) = convert(&document, &PackDir::new(pack_root), &mut assets);

    let json_path = xml_path.with_extension("json");
    let json = maps.to_json_string(options.pretty_json)?;
    std::fs::write(&json_path, json).map_err(|source| DocumentError::Write {
        path: json_path.clone(),
        source,
    })?;

    let report = DocumentReport {
        xml_path: xml_path.to_owned(),
        json_path,
        maps: maps.len(),
        icons: maps.iter().map(|(_, map)| map.icons.len()).sum(),
        paths: maps.iter().map(|(_, map)| map.paths.len()).sum(),
        errors: failures.errors.len(),
        warnings: failures.warnings.len(),
    };
    info!(
        "converted {} into {}: {} maps, {} icons, {} paths ({} errors, {} warnings)",
        report.xml_path,
        report.json_path,
        report.maps,
        report.icons,
        report.paths,
        report.errors,
        report.warnings
    );
    Ok(report)
}

fn is_marker_document(path: &Utf8Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("xml"))
        .unwrap_or_default()
}

/// Converts every top level xml document of the pack. a document that fails is logged and recorded in the report,
/// the other documents are still converted.
pub fn convert_pack_dir(pack_root: &Utf8Path, options: &ConvertOptions) -> Result<PackReport, PackError> {
    let mut documents = vec![];
    for entry in walkdir::WalkDir::new(pack_root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = Utf8Path::from_path(entry.path()) else {
            warn!("skipping non utf-8 path {}", entry.path().display());
            continue;
        };
        if is_marker_document(path) {
            documents.push(path.to_owned());
        }
    }
    info!("converting {} marker documents in {pack_root}", documents.len());

    let results: Vec<_> = documents
        .into_par_iter()
        .map(|xml_path| {
            let result = convert_document_file(&xml_path, pack_root, options);
            (xml_path, result)
        })
        .collect();

    let mut report = PackReport::default();
    for (xml_path, result) in results {
        match result {
            Ok(doc) => report.converted.push(doc),
            Err(e) => {
                error!("failed to convert {xml_path}: {e}");
                report.failed.push((xml_path, e));
            }
        }
    }
    info!(
        "finished {pack_root}: {} of {} documents converted",
        report.converted.len(),
        report.documents()
    );
    Ok(report)
}

#[cfg(test)]
mod test {
    use camino::{Utf8Path, Utf8PathBuf};
    use rstest::*;
    use similar_asserts::assert_eq;

    use super::{convert_document_file, convert_pack_dir, ConvertOptions};
    use crate::pack::{BurritoMaps, DocumentError, Placeholder};

    const TEST_XML: &str = include_str!("../pack/xml/test.xml");

    pub(super) fn trl_file(map_id: i32, nodes: &[[f32; 3]]) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&map_id.to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(nodes));
        bytes
    }

    fn read_maps(path: &Utf8Path) -> BurritoMaps {
        serde_json::from_str(&std::fs::read_to_string(path).expect("failed to read json"))
            .expect("invalid burrito json")
    }

    /// test.xml twice (once with an upper case extension), a broken document, and one nested document that is ignored
    #[fixture]
    fn pack() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("non utf-8 temp dir");
        std::fs::write(root.join("markers.xml"), TEST_XML).expect("write");
        std::fs::write(root.join("SHOUTY.XML"), TEST_XML).expect("write");
        std::fs::write(root.join("broken.xml"), "<OverlayData><POIs>").expect("write");
        std::fs::write(root.join("basic.trl"), trl_file(1206, &[[1.0, 2.0, 3.0]])).expect("write");
        std::fs::create_dir_all(root.join("nested")).expect("mkdir");
        std::fs::write(root.join("nested/inner.xml"), TEST_XML).expect("write");
        (dir, root)
    }

    #[rstest]
    fn converts_every_top_level_document(pack: (tempfile::TempDir, Utf8PathBuf)) {
        let (_dir, root) = pack;
        let report = convert_pack_dir(&root, &ConvertOptions::default()).expect("walk failed");
        assert_eq!(report.documents(), 3);
        assert_eq!(report.converted.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, root.join("broken.xml"));
        assert!(matches!(report.failed[0].1, DocumentError::Xml(_)));
        // per document: the missing.trl trail and the unresolved poi
        assert_eq!(report.item_errors(), 2);
        assert_eq!(report.item_warnings(), 2);

        assert!(root.join("markers.json").is_file());
        assert!(root.join("SHOUTY.json").is_file());
        assert!(!root.join("broken.json").exists());
        assert!(!root.join("nested/inner.json").exists());
        assert!(root.join(Placeholder::Poi.texture()).is_file());
        assert!(!root.join(Placeholder::Trail.texture()).exists());

        let maps = read_maps(&root.join("markers.json"));
        assert_eq!(maps.len(), 3);
        assert_eq!(
            maps.get(1206).expect("map from trl").paths[0].points,
            vec![[1.0, 2.0, 3.0]]
        );
    }

    #[rstest]
    fn single_document_overwrites_and_respects_options(pack: (tempfile::TempDir, Utf8PathBuf)) {
        let (_dir, root) = pack;
        let json_path = root.join("markers.json");
        std::fs::write(&json_path, "stale").expect("write");
        let options = ConvertOptions {
            pretty_json: false,
            stage_placeholders: false,
            ..Default::default()
        };
        let report = convert_document_file(&root.join("markers.xml"), &root, &options)
            .expect("failed to convert");
        assert_eq!(report.json_path, json_path);
        assert_eq!((report.maps, report.icons, report.paths), (3, 3, 1));
        let json = std::fs::read_to_string(&json_path).expect("read");
        assert!(!json.contains('\n'));
        assert_eq!(read_maps(&json_path).len(), 3);
        assert!(!root.join("burrito").exists());
    }

    #[test]
    fn missing_document_is_an_io_error() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("non utf-8 temp dir");
        let result = convert_document_file(&root.join("nope.xml"), &root, &ConvertOptions::default());
        assert!(matches!(result, Err(DocumentError::Io { .. })));
    }
}
