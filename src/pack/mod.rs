//! Everything needed to turn a single TacO marker document into burrito json.
//!
//! [`xml`] reads the document, [`category`] resolves icons through the category tree,
//! [`trail`] decodes the trl binaries and [`convert`] ties them together into [`burrito`] maps.

pub mod burrito;
pub mod category;
pub mod convert;
pub mod error;
pub mod trail;
pub mod xml;

pub use burrito::{BurritoMaps, BurritoPath, Icon, MapData};
pub use category::{resolve_icon, Category, CategoryIndex, CategoryTree};
pub use convert::{convert, AssetStager, PackDir, TrailSource};
pub use error::{ConvertError, ConvertWarning, DocumentError, Failures, PackError};
pub use trail::{decode, TrailError, Trl};
pub use xml::{MarkerDocument, OneOrMany, ParseOptions};

const UNKNOWN_POI_PNG: &[u8] = include_bytes!("assets/unknown-poi-resize.png");
const UNKNOWN_TRAIL_PNG: &[u8] = include_bytes!("assets/unknown-trail-resize.png");

/// textures we ship ourselves for entries whose own texture can't be found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Poi,
    Trail,
}

impl Placeholder {
    /// path relative to the bundle root. this is what ends up in the json.
    pub fn texture(self) -> &'static str {
        match self {
            Placeholder::Poi => "burrito/unknown-poi-resize.png",
            Placeholder::Trail => "burrito/unknown-trail-resize.png",
        }
    }
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Placeholder::Poi => UNKNOWN_POI_PNG,
            Placeholder::Trail => UNKNOWN_TRAIL_PNG,
        }
    }
}
