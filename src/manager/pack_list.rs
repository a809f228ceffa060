//! The `MarkerPacks.json` list of known packs, and running the whole extract -> convert -> bundle process for each of them.

use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{bundle_pack, convert_pack_dir, extract_taco, ConvertOptions, PackReport};
use crate::pack::PackError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackList {
    pub markerpacks: Vec<MarkerPack>,
}

impl PackList {
    pub fn load(path: &Utf8Path) -> Result<Self, PackError> {
        let json = std::fs::read_to_string(path).map_err(|source| PackError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| PackError::PackList {
            path: path.to_owned(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerPack {
    pub name: String,
    /// name of the extraction directory
    pub id: String,
    /// name of the `.taco` archive
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versionurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versionsearchstring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versionterminator: Option<String>,
    pub downloadurl: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backupurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backupversion: Option<String>,
    #[serde(default)]
    pub enabledbydefault: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forcedversion: Option<String>,
}

impl MarkerPack {
    /// `<filename stem>.zip`
    pub fn bundle_name(&self) -> String {
        let stem = Utf8Path::new(&self.filename)
            .file_stem()
            .unwrap_or(self.id.as_str());
        format!("{stem}.zip")
    }
}

#[derive(Debug)]
pub struct ProcessedPack {
    pub report: PackReport,
    pub bundle: Utf8PathBuf,
    pub bundled_files: usize,
}

#[derive(Debug)]
pub enum PackOutcome {
    Processed(ProcessedPack),
    /// neither the archive nor an extracted directory exist. we don't download packs.
    Unavailable,
    Failed(PackError),
}

/// id and file names come from a downloaded list. they must stay inside the packages directory.
fn single_component(name: &str) -> Result<&str, PackError> {
    let mut components = Utf8Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(camino::Utf8Component::Normal(_)), None) if !name.contains('\\') => Ok(name),
        _ => Err(PackError::InvalidName(name.into())),
    }
}

fn try_process_marker_pack(
    pack: &MarkerPack,
    packages_dir: &Utf8Path,
    options: &ConvertOptions,
) -> Result<Option<ProcessedPack>, PackError> {
    let extract_path = packages_dir.join(single_component(&pack.id)?);
    let taco_path = packages_dir.join(single_component(&pack.filename)?);
    if taco_path.is_file() {
        info!("extracting {} to {extract_path}", pack.filename);
        extract_taco(&taco_path, &extract_path)?;
    } else if extract_path.is_dir() {
        info!("using already extracted {extract_path}");
    } else {
        warn!(
            "{} ({}) is not available. download it from {} into {packages_dir}",
            pack.name, pack.id, pack.downloadurl
        );
        return Ok(None);
    }
    let report = convert_pack_dir(&extract_path, options)?;
    let bundle = packages_dir.join(pack.bundle_name());
    let bundled_files = bundle_pack(&extract_path, &bundle)?;
    Ok(Some(ProcessedPack {
        report,
        bundle,
        bundled_files,
    }))
}

/// Processes a single pack:
/// 1. `<packages_dir>/<filename>` exists: extract it into `<packages_dir>/<id>`.
/// 2. otherwise use an already extracted `<packages_dir>/<id>`.
/// 3. convert the documents of the extracted pack.
/// 4. bundle the result into `<packages_dir>/<filename stem>.zip`.
pub fn process_marker_pack(pack: &MarkerPack, packages_dir: &Utf8Path, options: &ConvertOptions) -> PackOutcome {
    match try_process_marker_pack(pack, packages_dir, options) {
        Ok(Some(processed)) => {
            info!("finished marker pack {} ({})", pack.name, pack.id);
            PackOutcome::Processed(processed)
        }
        Ok(None) => PackOutcome::Unavailable,
        Err(e) => {
            error!("failed to process marker pack {} ({}): {e}", pack.name, pack.id);
            PackOutcome::Failed(e)
        }
    }
}

/// processes every pack of the list in parallel. the outcomes are in list order.
pub fn process_pack_list(
    list: &PackList,
    packages_dir: &Utf8Path,
    options: &ConvertOptions,
) -> Vec<(String, PackOutcome)> {
    info!("processing {} marker packs in {packages_dir}", list.markerpacks.len());
    list.markerpacks
        .par_iter()
        .map(|pack| (pack.id.clone(), process_marker_pack(pack, packages_dir, options)))
        .collect()
}

#[cfg(test)]
mod test {
    use camino::Utf8PathBuf;
    use rstest::*;
    use similar_asserts::assert_eq;

    use super::{process_pack_list, MarkerPack, PackList, PackOutcome};
    use crate::{
        manager::{taco::test::build_taco, test::trl_file, ConvertOptions},
        pack::PackError,
    };

    const PACK_LIST: &str = r#"{
        "markerpacks": [
            { "name": "Archived", "id": "archived", "filename": "archived.taco",
              "downloadurl": "https://example.invalid/archived.taco", "enabledbydefault": true,
              "versionurl": "https://example.invalid/version" },
            { "name": "Extracted", "id": "extracted", "filename": "extracted.taco",
              "downloadurl": "https://example.invalid/extracted.taco", "enabledbydefault": false },
            { "name": "Gone", "id": "gone", "filename": "gone.taco",
              "downloadurl": "https://example.invalid/gone.taco", "enabledbydefault": false },
            { "name": "Sneaky", "id": "../outside", "filename": "sneaky.taco",
              "downloadurl": "https://example.invalid/sneaky.taco", "enabledbydefault": false }
        ]
    }"#;

    const DOC: &str = r#"<OverlayData>
        <MarkerCategory name="a" iconFile="a.png" />
        <POIs>
            <POI MapID="15" xpos="1" ypos="2" zpos="3" type="a" />
            <Trail trailData="Data/t.trl" />
        </POIs>
    </OverlayData>"#;

    #[fixture]
    fn packages() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("non utf-8 temp dir");
        let trl = trl_file(15, &[[0.0, 0.0, 0.0]]);
        std::fs::write(
            root.join("archived.taco"),
            build_taco(&[("markers.xml", DOC.as_bytes()), ("Data/t.trl", trl.as_slice())]),
        )
        .expect("write");
        std::fs::create_dir_all(root.join("extracted/Data")).expect("mkdir");
        std::fs::write(root.join("extracted/markers.xml"), DOC).expect("write");
        std::fs::write(root.join("extracted/Data/t.trl"), &trl).expect("write");
        (dir, root)
    }

    #[test]
    fn reads_marker_pack_list() {
        let list: PackList = serde_json::from_str(PACK_LIST).expect("invalid pack list");
        assert_eq!(list.markerpacks.len(), 4);
        let first = &list.markerpacks[0];
        assert_eq!(first.id, "archived");
        assert!(first.enabledbydefault);
        assert_eq!(first.versionurl.as_deref(), Some("https://example.invalid/version"));
        assert_eq!(first.backupurl, None);
        assert_eq!(first.bundle_name(), "archived.zip");
        let back: PackList =
            serde_json::from_str(&serde_json::to_string(&list).expect("serialize")).expect("deserialize");
        assert_eq!(back, list);
    }

    #[rstest]
    fn every_pack_gets_an_outcome(packages: (tempfile::TempDir, Utf8PathBuf)) {
        let (_dir, root) = packages;
        let list: PackList = serde_json::from_str(PACK_LIST).expect("invalid pack list");
        let outcomes = process_pack_list(&list, &root, &ConvertOptions::default());
        let ids: Vec<&str> = outcomes.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["archived", "extracted", "gone", "../outside"]);

        for (id, outcome) in &outcomes[..2] {
            let PackOutcome::Processed(processed) = outcome else {
                panic!("{id} was not processed: {outcome:?}");
            };
            assert_eq!(processed.report.converted.len(), 1);
            // json + staged trail placeholder
            assert_eq!(processed.bundled_files, 2);
            assert!(processed.bundle.is_file());
            assert!(root.join(id).join("markers.json").is_file());
            assert!(root.join(id).join("burrito/unknown-trail-resize.png").is_file());
        }
        assert!(root.join("archived.zip").is_file());
        assert!(root.join("extracted.zip").is_file());
        assert!(matches!(outcomes[2].1, PackOutcome::Unavailable));
        assert!(matches!(outcomes[3].1, PackOutcome::Failed(PackError::InvalidName(_))));
        assert!(!root.join("gone.zip").exists());
    }

    #[test]
    fn bundle_name_falls_back_to_id() {
        let pack = MarkerPack {
            name: "x".to_string(),
            id: "x-id".to_string(),
            filename: String::new(),
            versionurl: None,
            versionsearchstring: None,
            versionterminator: None,
            downloadurl: String::new(),
            backupurl: None,
            backupversion: None,
            enabledbydefault: false,
            forcedversion: None,
        };
        assert_eq!(pack.bundle_name(), "x-id.zip");
    }
}
