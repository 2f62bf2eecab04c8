//! Offline render tree.
//!
//! A [`RenderSnapshot`] is a recorded render tree: the same information a
//! live browser binding would expose, stored as JSON. Elements are kept in a
//! flat list addressed by index so arbitrarily deep pages load without
//! recursion.
//!
//! ```json
//! {
//!   "page": { "url": "https://example.com/", "viewport": { "width": 1280, "height": 800 } },
//!   "elements": [
//!     { "tag": "body", "style": { "display": "block" },
//!       "rect": { "x": 0, "y": 0, "width": 1280, "height": 800 },
//!       "children": [ { "element": 1 }, { "text": "Hello", "rects": [] } ] },
//!     { "tag": "img", "attributes": { "src": "/a.png" } }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use domframe_core::{Rect, Size, StyleSnapshot};
use serde::{Deserialize, Serialize};

use crate::accessor::{
    ChildItem, ElementId, FontFaceSource, PageInfo, PictureSource, PseudoKind, RenderTreeAccessor, TextRun,
};
use crate::error::{ExtractError, ExtractResult};

/// A recorded pseudo-element box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PseudoBox {
    /// Computed style of the pseudo-element.
    #[serde(default)]
    pub style: StyleSnapshot,
    /// Measured box, when the recorder could measure it.
    #[serde(default)]
    pub rect: Option<Rect>,
}

/// A child reference in a recorded element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotChild {
    /// Index of a child element.
    Element {
        /// Element index.
        element: usize,
    },
    /// A direct text run.
    Text(TextRun),
}

/// One recorded element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotElement {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Computed style.
    #[serde(default)]
    pub style: StyleSnapshot,
    /// Border box, viewport-relative.
    #[serde(default)]
    pub rect: Option<Rect>,
    /// Pseudo-elements.
    #[serde(default)]
    pub pseudo: BTreeMap<PseudoKind, PseudoBox>,
    /// Natural size of replaced content.
    #[serde(default)]
    pub intrinsic_size: Option<Size>,
    /// Scroll extent.
    #[serde(default)]
    pub scroll_size: Option<Size>,
    /// Source selected by the browser.
    #[serde(default)]
    pub current_src: Option<String>,
    /// Serialized outer markup.
    #[serde(default)]
    pub markup: Option<String>,
    /// Children in source order.
    #[serde(default)]
    pub children: Vec<SnapshotChild>,
}

impl SnapshotElement {
    /// Element with a tag, style pairs and a box.
    #[must_use]
    pub fn new<'a>(tag: &str, style: impl IntoIterator<Item = (&'a str, &'a str)>, rect: Rect) -> Self {
        Self {
            tag: tag.to_string(),
            style: StyleSnapshot::from_pairs(style),
            rect: Some(rect),
            ..Self::default()
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a pseudo-element.
    #[must_use]
    pub fn with_pseudo(mut self, kind: PseudoKind, pseudo: PseudoBox) -> Self {
        self.pseudo.insert(kind, pseudo);
        self
    }
}

/// A recorded render tree implementing [`RenderTreeAccessor`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSnapshot {
    /// Page information.
    pub page: Option<PageInfo>,
    /// Index of the root element.
    #[serde(default)]
    pub root: usize,
    /// Elements; child references point into this list.
    #[serde(default)]
    pub elements: Vec<SnapshotElement>,
    /// Declared font faces.
    #[serde(default)]
    pub font_faces: Vec<FontFaceSource>,
    /// External sprite markup by reference (`icons.svg#close`).
    #[serde(default)]
    pub sprites: BTreeMap<String, String>,
    #[serde(skip)]
    styles: Vec<Arc<StyleSnapshot>>,
    #[serde(skip)]
    pseudo_styles: HashMap<(usize, PseudoKind), Arc<StyleSnapshot>>,
    #[serde(skip)]
    parents: Vec<Option<usize>>,
}

impl RenderSnapshot {
    /// Empty snapshot for a page.
    #[must_use]
    pub fn new(page: PageInfo) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// Parse and index a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Snapshot`] if the JSON is malformed or child
    /// references do not form a tree.
    pub fn from_json(json: &str) -> ExtractResult<Self> {
        let mut snapshot: Self =
            serde_json::from_str(json).map_err(|e| ExtractError::Snapshot(e.to_string()))?;
        snapshot.index()?;
        Ok(snapshot)
    }

    /// Read a JSON snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or
    /// [`ExtractError::Snapshot`] if it is not a valid snapshot.
    pub fn from_path(path: &Path) -> ExtractResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Append an element under `parent` (or as the root) and return its id.
    pub fn push_element(&mut self, parent: Option<ElementId>, element: SnapshotElement) -> ElementId {
        let index = self.elements.len();
        self.elements.push(element);
        match parent {
            Some(parent) => {
                if let Some(p) = self.elements.get_mut(parent.0) {
                    p.children.push(SnapshotChild::Element { element: index });
                }
            }
            None => self.root = index,
        }
        self.reindex();
        ElementId(index)
    }

    /// Append a text run under `parent`.
    pub fn push_text(&mut self, parent: ElementId, text: &str, rects: Vec<Rect>) {
        if let Some(p) = self.elements.get_mut(parent.0) {
            p.children.push(SnapshotChild::Text(TextRun {
                text: text.to_string(),
                rects,
            }));
        }
    }

    fn index(&mut self) -> ExtractResult<()> {
        if !self.elements.is_empty() && self.root >= self.elements.len() {
            return Err(ExtractError::Snapshot(format!("root index {} out of range", self.root)));
        }
        let mut parents = vec![None; self.elements.len()];
        for (index, element) in self.elements.iter().enumerate() {
            for child in &element.children {
                let SnapshotChild::Element { element: child } = child else {
                    continue;
                };
                let slot = parents
                    .get_mut(*child)
                    .ok_or_else(|| ExtractError::Snapshot(format!("element {index} references missing child {child}")))?;
                if slot.is_some() || *child == self.root {
                    return Err(ExtractError::Snapshot(format!("element {child} has more than one parent")));
                }
                *slot = Some(index);
            }
        }
        self.parents = parents;
        self.reindex();
        Ok(())
    }

    fn reindex(&mut self) {
        self.styles = self
            .elements
            .iter()
            .map(|e| Arc::new(e.style.clone()))
            .collect();
        self.pseudo_styles = self
            .elements
            .iter()
            .enumerate()
            .flat_map(|(i, e)| {
                e.pseudo
                    .iter()
                    .map(move |(kind, pseudo)| ((i, *kind), Arc::new(pseudo.style.clone())))
            })
            .collect();
        self.parents.resize(self.elements.len(), None);
        for (index, element) in self.elements.iter().enumerate() {
            for child in &element.children {
                if let SnapshotChild::Element { element: child } = child {
                    if let Some(slot) = self.parents.get_mut(*child) {
                        *slot = Some(index);
                    }
                }
            }
        }
    }

    fn element(&self, id: ElementId) -> Option<&SnapshotElement> {
        self.elements.get(id.0)
    }
}

impl RenderTreeAccessor for RenderSnapshot {
    fn page_info(&self) -> PageInfo {
        self.page.clone().unwrap_or(PageInfo {
            url: String::new(),
            title: String::new(),
            viewport: domframe_core::Viewport::default(),
            color_scheme: "light".to_string(),
        })
    }

    fn root(&self) -> Option<ElementId> {
        (self.root < self.elements.len()).then_some(ElementId(self.root))
    }

    fn tag_name(&self, element: ElementId) -> String {
        self.element(element)
            .map(|e| e.tag.to_ascii_lowercase())
            .unwrap_or_default()
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.element(element)?.attributes.get(name).cloned()
    }

    fn computed_style(&self, element: ElementId, pseudo: Option<PseudoKind>) -> Option<Arc<StyleSnapshot>> {
        match pseudo {
            None => self.styles.get(element.0).cloned(),
            Some(kind) => self.pseudo_styles.get(&(element.0, kind)).cloned(),
        }
    }

    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        self.element(element)?.rect
    }

    fn pseudo_rect(&self, element: ElementId, pseudo: PseudoKind) -> Option<Rect> {
        self.element(element)?.pseudo.get(&pseudo)?.rect
    }

    fn children(&self, element: ElementId) -> Vec<ChildItem> {
        self.element(element)
            .map(|e| {
                e.children
                    .iter()
                    .map(|child| match child {
                        SnapshotChild::Element { element } => ChildItem::Element(ElementId(*element)),
                        SnapshotChild::Text(run) => ChildItem::Text(run.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn intrinsic_size(&self, element: ElementId) -> Option<Size> {
        self.element(element)?.intrinsic_size
    }

    fn scroll_size(&self, element: ElementId) -> Option<Size> {
        self.element(element)?.scroll_size
    }

    fn outer_markup(&self, element: ElementId) -> Option<String> {
        self.element(element)?.markup.clone()
    }

    fn sprite_markup(&self, href: &str) -> Option<String> {
        self.sprites.get(href).cloned()
    }

    fn picture_sources(&self, element: ElementId) -> Vec<PictureSource> {
        let Some(parent) = self.parents.get(element.0).copied().flatten() else {
            return Vec::new();
        };
        let Some(picture) = self.elements.get(parent).filter(|p| p.tag.eq_ignore_ascii_case("picture")) else {
            return Vec::new();
        };
        picture
            .children
            .iter()
            .filter_map(|child| match child {
                SnapshotChild::Element { element } => self.elements.get(*element),
                SnapshotChild::Text(_) => None,
            })
            .filter(|e| e.tag.eq_ignore_ascii_case("source"))
            .map(|e| PictureSource {
                srcset: e.attributes.get("srcset").cloned().unwrap_or_default(),
                media: e.attributes.get("media").cloned(),
                mime: e.attributes.get("type").cloned(),
            })
            .collect()
    }

    fn current_src(&self, element: ElementId) -> Option<String> {
        self.element(element)?.current_src.clone()
    }

    fn font_faces(&self) -> Vec<FontFaceSource> {
        self.font_faces.clone()
    }
}
