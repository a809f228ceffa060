//! MarkerCategory tags form a tree and markers refer to them by a `.` separated path.
//! example:
//! ```xml
//!
//! <MarkerCategory name="zippy" iconFile="zippy.png">
//!   <MarkerCategory name="portals">
//!     <MarkerCategory name="map_ports" iconFile="port.png" />
//!   </MarkerCategory>
//! </MarkerCategory>
//!
//! ```
//! a POI with `type="zippy.portals.map_ports"` uses `port.png`. a POI with `type="zippy.portals"`
//! finds no texture on `portals` and falls back to its parent `zippy.png`.
//!
//! The tree lives in an arena so nodes can be addressed by a stable id and walked upwards
//! without the children owning back references.

use std::{borrow::Cow, collections::HashMap};

use indextree::{Arena, NodeId};

use super::xml::Attributes;

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// unique among siblings only
    pub name: String,
    pub attrs: Attributes,
}

impl Category {
    pub fn new(name: impl Into<String>, attrs: Attributes) -> Self {
        Self {
            name: name.into(),
            attrs,
        }
    }
    pub fn icon_file(&self) -> Option<Cow<'_, str>> {
        self.attrs.non_empty_text("iconFile")
    }
}

/// All the categories of a single document. there's no explicit root node,
/// the top level MarkerCategory tags are the roots.
#[derive(Debug, Default)]
pub struct CategoryTree {
    arena: Arena<Category>,
    roots: Vec<NodeId>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }
    /// adds a category as the last child of `parent`, or as the last root if `parent` is None
    pub fn push(&mut self, parent: Option<NodeId>, category: Category) -> NodeId {
        let node = self.arena.new_node(category);
        match parent {
            Some(parent) => parent.append(node, &mut self.arena),
            None => self.roots.push(node),
        }
        node
    }
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }
    pub fn get(&self, id: NodeId) -> Option<&Category> {
        self.arena.get(id).map(|node| node.get())
    }
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|node| node.parent())
    }
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }
    pub fn len(&self) -> usize {
        self.arena.count()
    }
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
    /// the dotted path of a node, like `zippy.portals.map_ports`
    pub fn full_path(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = id
            .ancestors(&self.arena)
            .filter_map(|ancestor| self.get(ancestor))
            .map(|cat| cat.name.as_str())
            .collect();
        names.reverse();
        names.join(".")
    }
    /// builds the path index for this tree. build it once per document and reuse it for every marker.
    pub fn index(&self) -> CategoryIndex<'_> {
        CategoryIndex::build(self)
    }
}

/// full dotted path -> category node.
pub struct CategoryIndex<'tree> {
    tree: &'tree CategoryTree,
    paths: HashMap<String, NodeId>,
}

impl<'tree> CategoryIndex<'tree> {
    pub fn build(tree: &'tree CategoryTree) -> Self {
        fn recursive_index(
            tree: &CategoryTree,
            nodes: impl Iterator<Item = NodeId>,
            parent_path: &str,
            paths: &mut HashMap<String, NodeId>,
        ) {
            for node in nodes {
                let Some(cat) = tree.get(node) else {
                    continue;
                };
                let full_path = if parent_path.is_empty() {
                    cat.name.clone()
                } else {
                    format!("{}.{}", parent_path, cat.name)
                };
                // a path defined twice: the later definition replaces the earlier one
                paths.insert(full_path.clone(), node);
                recursive_index(tree, tree.children(node), &full_path, paths);
            }
        }
        let mut paths = HashMap::new();
        recursive_index(tree, tree.roots.iter().copied(), "", &mut paths);
        Self { tree, paths }
    }

    pub fn get(&self, path: &str) -> Option<NodeId> {
        self.paths.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Finds the icon for a dotted category path.
    /// starts with the exact path and strips the last segment until a category with an `iconFile` is found.
    /// an empty path or a path without any textured ancestor resolves to None.
    pub fn resolve_icon(&self, dotted_path: &str) -> Option<Cow<'tree, str>> {
        let mut current = dotted_path;
        while !current.is_empty() {
            if let Some(icon) = self
                .get(current)
                .and_then(|node| self.tree.get(node))
                .and_then(Category::icon_file)
            {
                return Some(icon);
            }
            current = match current.rfind('.') {
                Some(end) => &current[..end],
                None => "",
            };
        }
        None
    }
}

/// one shot version of [`CategoryIndex::resolve_icon`]. builds a fresh index on every call.
pub fn resolve_icon(tree: &CategoryTree, dotted_path: &str) -> Option<String> {
    tree.index()
        .resolve_icon(dotted_path)
        .map(|icon| icon.into_owned())
}
