//! When converting a marker document, there's two kinds of failures:
//! 1. Errors: something unexpected happened to one entry. usually io.
//!     a trail whose trl file is missing or too short is skipped, the rest of the document is still converted.
//! 2. Warnings: the document is degraded but we can carry on.
//!     an icon we can't resolve gets a placeholder texture. an entry without a map id gets skipped.
//!
//! Only failures which have no smaller unit to skip (the document itself) bubble up as `Err`.

use camino::Utf8PathBuf;
use roxmltree::TextPos;

use super::trail::TrailError;

#[derive(Debug, Default)]
pub struct Failures {
    pub errors: Vec<ConvertError>,
    pub warnings: Vec<ConvertWarning>,
}

impl Failures {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read marker document {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid xml: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("invalid parsed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document doesn't contain OverlayData tag")]
    NoOverlayData,
    #[error("failed to write burrito json {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("trail number {index} referring to '{trail_data}' failed: {source}")]
    Trail {
        index: usize,
        trail_data: String,
        #[source]
        source: TrailError,
    },
    #[error("failed to stage placeholder asset {path}: {source}")]
    Staging {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertWarning {
    #[error("marker number {index} with type '{type_path}' has no resolvable icon. using placeholder")]
    UnresolvedIcon { index: usize, type_path: String },
    #[error("trail number {index} referring to '{trail_data}' has no texture. using placeholder")]
    MissingTrailTexture { index: usize, trail_data: String },
    #[error("marker number {index} skipped: {reason}")]
    SkippedPoi { index: usize, reason: ParseFailure },
    #[error("trail number {index} skipped: {reason}")]
    SkippedTrail { index: usize, reason: ParseFailure },
}

/// why a single POI / Trail entry couldn't be used
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("empty entry")]
    EmptySlot,
    #[error("missing or invalid MapID")]
    MissingMapID,
    #[error("missing trailData attribute")]
    MissingTrailData,
}

/// issues found while reading the category tree of a document. these never fail the document.
#[derive(Debug, thiserror::Error)]
pub enum CategoryWarning {
    #[error("category at {0} doesn't have a name. skipping it and its children")]
    CategoryNameMissing(TextPos),
    #[error("category number {0} doesn't have a name. skipping it and its children")]
    UnnamedEntry(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("failed to parse bytes into a valid Zip Archive")]
    InvalidZip(#[from] zip::result::ZipError),
    #[error("The name is weird and we cannot get a proper enclosed name *within* the zip file. mangled name: {0}")]
    InvalidName(std::path::PathBuf),
    #[error("non-utf8 path. path: {0}")]
    NonUtf8Path(std::path::PathBuf),
    #[error("we have duplicate entries in zip: {0}")]
    DuplicateEntry(Utf8PathBuf),
    #[error("io error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk pack directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to read pack list {path}: {source}")]
    PackList {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
