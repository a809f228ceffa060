//! Converting one marker document into burrito maps.
//!
//! 1. POIs
//!     1. skip empty slots and markers without a usable MapID.
//!     2. an `iconFile` on the marker itself wins.
//!     3. otherwise resolve its `type` against the category index of the document (built once per document).
//!     4. if nothing resolves, use the unknown poi placeholder and make sure the placeholder png exists in the bundle.
//! 2. Trails
//!     1. read the trl file that `trailData` points to, relative to the pack root, and decode it.
//!     2. the map comes from the trl file, not from the Trail tag.
//!     3. missing texture means the unknown trail placeholder, staged the same way as for POIs.
//!     4. a missing or broken trl, or a `trailData` pointing outside the pack, only loses that one trail.

use std::{collections::HashSet, io::Write};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tracing::{debug, error, warn};

use super::{
    burrito::{BurritoMaps, BurritoPath, Icon},
    error::{ConvertError, ConvertWarning, Failures, ParseFailure},
    trail::{self, TrailError},
    xml::MarkerDocument,
    Placeholder,
};

/// gives the converter the raw bytes of a trl file referenced by a Trail tag
pub trait TrailSource {
    fn read_trail(&self, relative_path: &str) -> Result<Vec<u8>, TrailError>;
}

impl<F> TrailSource for F
where
    F: Fn(&str) -> Result<Vec<u8>, TrailError>,
{
    fn read_trail(&self, relative_path: &str) -> Result<Vec<u8>, TrailError> {
        self(relative_path)
    }
}

/// an extracted marker pack on disk
#[derive(Debug, Clone)]
pub struct PackDir {
    root: Utf8PathBuf,
}

impl PackDir {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
    /// Joins a `trailData` value onto the pack root. packs made on windows use `\` as separator.
    /// a leading `/` is dropped. `..`, drive letters and roots would leave the pack, so they are rejected.
    pub fn resolve(&self, relative_path: &str) -> Result<Utf8PathBuf, TrailError> {
        let normalized = relative_path.replace('\\', "/");
        let relative = Utf8Path::new(normalized.trim_start_matches('/'));
        let inside = relative.components().all(|c| {
            matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir)
        });
        if !inside {
            return Err(TrailError::OutsidePack {
                trail_data: relative_path.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl TrailSource for PackDir {
    fn read_trail(&self, relative_path: &str) -> Result<Vec<u8>, TrailError> {
        let path = self.resolve(relative_path)?;
        std::fs::read(&path).map_err(|source| TrailError::MissingTrailFile { path, source })
    }
}

/// Copies placeholder pngs into `<bundle>/burrito/` when a texture can't be resolved.
/// each placeholder is staged at most once per stager. use a fresh stager per document.
#[derive(Debug, Default)]
pub struct AssetStager {
    bundle_dir: Option<Utf8PathBuf>,
    staged: HashSet<Placeholder>,
}

impl AssetStager {
    pub fn new(bundle_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            bundle_dir: Some(bundle_dir.into()),
            staged: HashSet::new(),
        }
    }
    /// placeholder textures are still referenced, but no files get written
    pub fn disabled() -> Self {
        Self::default()
    }
    pub fn staged(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.staged.iter().copied()
    }
    pub fn stage(&mut self, placeholder: Placeholder) -> Result<(), ConvertError> {
        if self.staged.contains(&placeholder) {
            return Ok(());
        }
        let Some(bundle_dir) = self.bundle_dir.as_ref() else {
            return Ok(());
        };
        let path = bundle_dir.join(placeholder.texture());
        if stage_file(&path, placeholder.bytes())
            .map_err(|source| ConvertError::Staging {
                path: path.clone(),
                source,
            })?
        {
            debug!("staged placeholder {path}");
        }
        self.staged.insert(placeholder);
        Ok(())
    }
}

/// check then copy. another document (maybe on another thread) staging the same file first is fine.
/// the png is written to a temp file next to it and only moved into place once complete, so a failed
/// write never leaves a truncated placeholder behind. returns whether we wrote the file.
fn stage_file(path: &Utf8Path, bytes: &[u8]) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    match file.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

fn stage_placeholder(assets: &mut AssetStager, failures: &mut Failures, placeholder: Placeholder) {
    if let Err(e) = assets.stage(placeholder) {
        error!("{e}");
        failures.errors.push(e);
    }
}

/// Converts a single document. Never fails as a whole. anything that went wrong with single entries
/// is logged and returned in [`Failures`].
pub fn convert<S: TrailSource + ?Sized>(
    document: &MarkerDocument,
    trail_source: &S,
    assets: &mut AssetStager,
) -> (BurritoMaps, Failures) {
    let mut maps = BurritoMaps::default();
    let mut failures = Failures::default();
    let cat_index = document.categories.index();

    for (poi_index, poi) in document.pois.iter().enumerate() {
        let Some(poi) = poi else {
            let warning = ConvertWarning::SkippedPoi {
                index: poi_index,
                reason: ParseFailure::EmptySlot,
            };
            warn!("{warning}");
            failures.warnings.push(warning);
            continue;
        };
        let Some(map_id) = poi.map_id() else {
            let warning = ConvertWarning::SkippedPoi {
                index: poi_index,
                reason: ParseFailure::MissingMapID,
            };
            warn!("{warning}");
            failures.warnings.push(warning);
            continue;
        };
        let texture = match poi.icon_file() {
            Some(icon_file) => icon_file.into_owned(),
            None => {
                let type_path = poi.type_path().unwrap_or_default();
                match cat_index.resolve_icon(&type_path) {
                    Some(icon_file) => icon_file.into_owned(),
                    None => {
                        let warning = ConvertWarning::UnresolvedIcon {
                            index: poi_index,
                            type_path: type_path.into_owned(),
                        };
                        warn!("{warning}");
                        failures.warnings.push(warning);
                        stage_placeholder(assets, &mut failures, Placeholder::Poi);
                        Placeholder::Poi.texture().to_string()
                    }
                }
            }
        };
        maps.map_entry(map_id).icons.push(Icon {
            position: poi.position(),
            texture,
        });
    }

    for (trail_index, trail) in document.trails.iter().enumerate() {
        let Some(trail) = trail else {
            let warning = ConvertWarning::SkippedTrail {
                index: trail_index,
                reason: ParseFailure::EmptySlot,
            };
            warn!("{warning}");
            failures.warnings.push(warning);
            continue;
        };
        let Some(trail_data) = trail.trail_data() else {
            let warning = ConvertWarning::SkippedTrail {
                index: trail_index,
                reason: ParseFailure::MissingTrailData,
            };
            warn!("{warning}");
            failures.warnings.push(warning);
            continue;
        };
        let trl = match trail_source
            .read_trail(&trail_data)
            .and_then(|bytes| trail::decode(&bytes))
        {
            Ok(trl) => trl,
            Err(source) => {
                let e = ConvertError::Trail {
                    index: trail_index,
                    trail_data: trail_data.into_owned(),
                    source,
                };
                error!("{e}");
                failures.errors.push(e);
                continue;
            }
        };
        let texture = match trail.texture() {
            Some(texture) => texture.into_owned(),
            None => {
                let warning = ConvertWarning::MissingTrailTexture {
                    index: trail_index,
                    trail_data: trail_data.to_string(),
                };
                warn!("{warning}");
                failures.warnings.push(warning);
                stage_placeholder(assets, &mut failures, Placeholder::Trail);
                Placeholder::Trail.texture().to_string()
            }
        };
        maps.map_entry(trl.map_id).paths.push(BurritoPath {
            texture,
            points: trl.points(),
        });
    }
    if document.routes > 0 {
        debug!("ignored {} Route tags", document.routes);
    }
    (maps, failures)
}
