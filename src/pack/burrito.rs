//! The burrito output format.
//! ```json
//! {
//!   "15": {
//!     "icons": [{ "position": [1.0, 2.0, 3.0], "texture": "Data/marker.png" }],
//!     "paths": [{ "texture": "Data/arrow.png", "points": [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]] }]
//!   }
//! }
//! ```
//! map ids are the keys. icons / paths keep the order in which they appear in the source document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BurritoMaps(IndexMap<String, MapData>);

impl BurritoMaps {
    /// the entry for `map_id`, created on first use
    pub fn map_entry(&mut self, map_id: i32) -> &mut MapData {
        self.0.entry(map_id.to_string()).or_default()
    }
    pub fn get(&self, map_id: i32) -> Option<&MapData> {
        self.0.get(&map_id.to_string())
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MapData)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
    pub fn to_json_string(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapData {
    pub icons: Vec<Icon>,
    pub paths: Vec<BurritoPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub position: [f32; 3],
    pub texture: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurritoPath {
    pub texture: String,
    pub points: Vec<[f32; 3]>,
}
