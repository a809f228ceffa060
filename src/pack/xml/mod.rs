//! Reading TacO marker documents.
//!
//! A document looks like this:
//! ```xml
//! <OverlayData>
//!   <MarkerCategory name="zippy" iconFile="Data/zippy.png">
//!     <MarkerCategory name="portals" />
//!   </MarkerCategory>
//!   <POIs>
//!     <POI MapID="15" xpos="1" ypos="2" zpos="3" type="zippy.portals" />
//!     <Trail trailData="Data/route.trl" texture="Data/arrow.png" type="zippy" />
//!     <Route MapID="15" Name="unused" />
//!   </POIs>
//! </OverlayData>
//! ```
//!
//! Documents can come in two shapes:
//! 1. raw xml, parsed with roxmltree.
//! 2. the "parsed object" json shape that generic xml-to-object converters produce. attributes are keys with a
//!     prefix (`@_MapID`), child tags are keys, and a tag which appears once is an object instead of a one element array.
//!
//! Both end up as a [`MarkerDocument`]. the one/many distinction survives as [`OneOrMany`] and is flattened by the converter.

mod attributes;

pub use attributes::{format_number, AttrValue, Attributes};

use std::borrow::Cow;

use indextree::NodeId;
use roxmltree::{Children, Document, Node};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{
    category::{Category, CategoryTree},
    error::{CategoryWarning, DocumentError},
};

/// knobs for the document parser. passed in explicitly instead of living in some global parser instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// prefix that marks a key as an attribute in the parsed object shape
    pub attribute_prefix: String,
    /// turn numeric attribute text into numbers
    pub coerce_numbers: bool,
    /// turn `true` / `false` attribute text into booleans
    pub coerce_booleans: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            attribute_prefix: "@_".to_string(),
            coerce_numbers: true,
            coerce_booleans: true,
        }
    }
}

/// a tag that may appear once (unwrapped) or many times
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(vec![])
    }
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(one) => std::slice::from_ref(one),
            OneOrMany::Many(many) => many.as_slice(),
        }
    }
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<'a, T> IntoIterator for &'a OneOrMany<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Poi {
    pub attrs: Attributes,
}

impl Poi {
    pub fn map_id(&self) -> Option<i32> {
        self.attrs.i32("MapID")
    }
    /// missing or invalid coordinates default to 0.0
    pub fn position(&self) -> [f32; 3] {
        [
            self.attrs.f32("xpos").unwrap_or_default(),
            self.attrs.f32("ypos").unwrap_or_default(),
            self.attrs.f32("zpos").unwrap_or_default(),
        ]
    }
    pub fn type_path(&self) -> Option<Cow<'_, str>> {
        self.attrs.text("type")
    }
    /// an icon set directly on the marker overrides whatever the category would give
    pub fn icon_file(&self) -> Option<Cow<'_, str>> {
        self.attrs.non_empty_text("iconFile")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailEntry {
    pub attrs: Attributes,
}

impl TrailEntry {
    /// path of the trl file, relative to the pack root
    pub fn trail_data(&self) -> Option<Cow<'_, str>> {
        self.attrs.non_empty_text("trailData")
    }
    pub fn texture(&self) -> Option<Cow<'_, str>> {
        self.attrs.non_empty_text("texture")
    }
    pub fn type_path(&self) -> Option<Cow<'_, str>> {
        self.attrs.text("type")
    }
}

/// Everything the converter needs out of a single marker document.
/// `None` slots are entries that failed to parse. they get skipped (with a warning) during conversion.
#[derive(Debug, Default)]
pub struct MarkerDocument {
    pub categories: CategoryTree,
    pub pois: OneOrMany<Option<Poi>>,
    pub trails: OneOrMany<Option<TrailEntry>>,
    /// Route tags are accepted but not converted
    pub routes: usize,
    pub warnings: Vec<CategoryWarning>,
}

impl MarkerDocument {
    pub fn from_xml_str(xml: &str, options: &ParseOptions) -> Result<Self, DocumentError> {
        let doc = Document::parse(xml)?;
        let root_node = doc.root_element();
        if root_node.tag_name().name() != "OverlayData" {
            return Err(DocumentError::NoOverlayData);
        }
        let mut document = MarkerDocument::default();

        recursive_marker_category_parser(
            &doc,
            root_node.children(),
            None,
            options,
            &mut document.categories,
            &mut document.warnings,
        );

        let mut pois = vec![];
        let mut trails = vec![];
        for pois_tag in root_node
            .children()
            .filter(|node| node.is_element() && node.tag_name().name() == "POIs")
        {
            for child in pois_tag.children().filter(Node::is_element) {
                match child.tag_name().name() {
                    "POI" => pois.push(Some(Poi {
                        attrs: attributes_from_node(&child, options),
                    })),
                    "Trail" => trails.push(Some(TrailEntry {
                        attrs: attributes_from_node(&child, options),
                    })),
                    "Route" => document.routes += 1,
                    unknown => {
                        debug!("ignoring unknown tag {unknown} at {}", doc.text_pos_at(child.range().start))
                    }
                }
            }
        }
        document.pois = OneOrMany::Many(pois);
        document.trails = OneOrMany::Many(trails);
        Ok(document)
    }

    pub fn from_json_str(json: &str, options: &ParseOptions) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value, options)
    }

    /// reads the parsed object shape. see module docs.
    pub fn from_json_value(value: &Value, options: &ParseOptions) -> Result<Self, DocumentError> {
        let overlay = value
            .get("OverlayData")
            .and_then(Value::as_object)
            .ok_or(DocumentError::NoOverlayData)?;
        let mut document = MarkerDocument::default();

        recursive_json_category_parser(
            overlay.get("MarkerCategory"),
            None,
            options,
            &mut document.categories,
            &mut document.warnings,
        );

        match overlay.get("POIs") {
            None => {}
            Some(Value::Array(all_pois)) => {
                // multiple POIs tags. no single shape to keep, so everything goes into one list
                let mut pois = vec![];
                let mut trails = vec![];
                for pois_tag in all_pois.iter().filter_map(Value::as_object) {
                    pois.extend(json_entries(pois_tag.get("POI"), options, |attrs| Poi { attrs }));
                    trails.extend(json_entries(pois_tag.get("Trail"), options, |attrs| {
                        TrailEntry { attrs }
                    }));
                    document.routes += json_len(pois_tag.get("Route"));
                }
                document.pois = OneOrMany::Many(pois);
                document.trails = OneOrMany::Many(trails);
            }
            Some(Value::Object(pois_tag)) => {
                document.pois = json_one_or_many(pois_tag.get("POI"), options, |attrs| Poi { attrs });
                document.trails =
                    json_one_or_many(pois_tag.get("Trail"), options, |attrs| TrailEntry { attrs });
                document.routes = json_len(pois_tag.get("Route"));
            }
            // an empty <POIs/> tag
            Some(_) => {}
        }
        Ok(document)
    }
}

fn attributes_from_node(node: &Node, options: &ParseOptions) -> Attributes {
    let mut attrs = Attributes::default();
    for attr in node.attributes() {
        attrs.insert(attr.name(), AttrValue::coerce(attr.value(), options));
    }
    attrs
}

// a recursive function to parse the marker category tree.
fn recursive_marker_category_parser(
    doc: &Document,
    tags: Children,
    parent: Option<NodeId>,
    options: &ParseOptions,
    tree: &mut CategoryTree,
    warnings: &mut Vec<CategoryWarning>,
) {
    for tag in tags.filter(Node::is_element) {
        if tag.tag_name().name() != "MarkerCategory" {
            continue;
        }
        let attrs = attributes_from_node(&tag, options);
        let Some(name) = attrs.non_empty_text("name").map(Cow::into_owned) else {
            let warning = CategoryWarning::CategoryNameMissing(doc.text_pos_at(tag.range().start));
            warn!("{warning}");
            warnings.push(warning);
            continue;
        };
        let node = tree.push(parent, Category::new(name, attrs));
        recursive_marker_category_parser(doc, tag.children(), Some(node), options, tree, warnings);
    }
}

fn recursive_json_category_parser(
    value: Option<&Value>,
    parent: Option<NodeId>,
    options: &ParseOptions,
    tree: &mut CategoryTree,
    warnings: &mut Vec<CategoryWarning>,
) {
    let tags: Vec<&Map<String, Value>> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(Value::Object(one)) => vec![one],
        _ => return,
    };
    for (tag_index, tag) in tags.into_iter().enumerate() {
        let attrs = json_attributes(tag, options);
        let Some(name) = attrs.non_empty_text("name").map(Cow::into_owned) else {
            let warning = CategoryWarning::UnnamedEntry(tag_index);
            warn!("{warning}");
            warnings.push(warning);
            continue;
        };
        let node = tree.push(parent, Category::new(name, attrs));
        recursive_json_category_parser(tag.get("MarkerCategory"), Some(node), options, tree, warnings);
    }
}

fn json_attributes(tag: &Map<String, Value>, options: &ParseOptions) -> Attributes {
    tag.iter()
        .filter_map(|(key, value)| {
            let name = key.strip_prefix(options.attribute_prefix.as_str())?;
            let value = match value {
                Value::String(s) => AttrValue::coerce(s, options),
                Value::Number(n) => AttrValue::Number(n.as_f64()?),
                Value::Bool(b) => AttrValue::Bool(*b),
                _ => return None,
            };
            Some((name.to_string(), value))
        })
        .collect()
}

fn json_entries<T>(
    value: Option<&Value>,
    options: &ParseOptions,
    make: impl Fn(Attributes) -> T,
) -> Vec<Option<T>> {
    match json_one_or_many(value, options, make) {
        OneOrMany::One(one) => vec![one],
        OneOrMany::Many(many) => many,
    }
}

/// keeps the shape of the parsed object. anything that isn't an object (null, an empty tag parsed as "") is an empty slot.
fn json_one_or_many<T>(
    value: Option<&Value>,
    options: &ParseOptions,
    make: impl Fn(Attributes) -> T,
) -> OneOrMany<Option<T>> {
    let entry = |value: &Value| {
        value
            .as_object()
            .map(|tag| make(json_attributes(tag, options)))
    };
    match value {
        None => OneOrMany::Many(vec![]),
        Some(Value::Array(items)) => OneOrMany::Many(items.iter().map(entry).collect()),
        Some(one) => OneOrMany::One(entry(one)),
    }
}

fn json_len(value: Option<&Value>) -> usize {
    match value {
        None => 0,
        Some(Value::Array(items)) => items.len(),
        Some(_) => 1,
    }
}
