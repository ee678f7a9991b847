//! Retained SVG surface.
//!
//! Every topic gets one element holding its wrapped label, box geometry and visual state;
//! every parent/child link gets one connector. Structural calls mutate only what changed and
//! then re-run [`layout_tree`] over all elements.

mod style;
mod util;


use crate::layout::{LayoutOptions, TreeShape, layout_tree, shift_nodes_to_positive_bounds};
use crate::model::{Bounds, LayoutEdge, LayoutNode, LayoutPoint};
use crate::surface::{NodeVisualState, ViewSurface};
use crate::text::{DeterministicTextMeasurer, TextMeasurer, TextStyle, wrap_label};
use crate::{Error, Result};
use indexmap::IndexMap;
use mindsprout_core::{MindmapConfig, NodeId, NodeOrigin, TopicNode, TopicTree};
use rustc_hash::FxHashSet;
use std::fmt::Write as _;
use std::sync::Arc;

const ZOOM_STEP: f64 = 1.2;
const MIN_ZOOM: f64 = 0.25;
const MAX_ZOOM: f64 = 4.0;
const VIEWBOX_PADDING: f64 = 10.0;
const EDGE_END_OFFSET: f64 = 15.0;
const DEFAULT_FONT_FAMILY: &str = "\"trebuchet ms\", verdana, arial, sans-serif";

#[derive(Clone)]
pub struct SvgOptions {
    pub diagram_id: String,
    pub layout: LayoutOptions,
    pub text_style: TextStyle,
    pub max_label_width: f64,
    pub node_padding: f64,
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            diagram_id: "mindsprout".to_string(),
            layout: LayoutOptions::default(),
            text_style: TextStyle {
                font_family: Some(DEFAULT_FONT_FAMILY.to_string()),
                font_size: 14.0,
            },
            max_label_width: 150.0,
            node_padding: 10.0,
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

impl std::fmt::Debug for SvgOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgOptions")
            .field("diagram_id", &self.diagram_id)
            .field("layout", &self.layout)
            .field("text_style", &self.text_style)
            .field("max_label_width", &self.max_label_width)
            .field("node_padding", &self.node_padding)
            .finish_non_exhaustive()
    }
}

impl SvgOptions {
    pub fn from_config(config: &MindmapConfig) -> Self {
        let defaults = Self::default();
        Self {
            layout: LayoutOptions::from_config(config),
            text_style: TextStyle {
                font_family: config
                    .get_str("fontFamily")
                    .map(str::to_string)
                    .or(defaults.text_style.font_family.clone()),
                font_size: config
                    .get_f64("fontSize")
                    .unwrap_or(defaults.text_style.font_size)
                    .max(1.0),
            },
            max_label_width: config
                .get_f64("layout.maxLabelWidth")
                .unwrap_or(defaults.max_label_width)
                .max(1.0),
            node_padding: config
                .get_f64("layout.nodePadding")
                .unwrap_or(defaults.node_padding)
                .max(0.0),
            ..defaults
        }
    }
}

/// One drawn topic.
#[derive(Debug, Clone)]
pub struct NodeElement {
    id: NodeId,
    lines: Vec<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    section: Option<usize>,
    origin: NodeOrigin,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    state: NodeVisualState,
    serial: u64,
}

impl NodeElement {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn position(&self) -> LayoutPoint {
        LayoutPoint {
            x: self.x,
            y: self.y,
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn state(&self) -> NodeVisualState {
        self.state
    }

    pub fn origin(&self) -> NodeOrigin {
        self.origin
    }

    /// Creation counter; unchanged for as long as the element is retained.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    fn class(&self) -> String {
        let mut class = String::from("node mindmap-node");
        match self.section {
            None => class.push_str(" section-root"),
            Some(section) => {
                let _ = write!(&mut class, " section-{}", section % style::SECTION_COUNT);
            }
        }
        if self.state.loading {
            class.push_str(" loading");
        }
        if self.state.selected {
            class.push_str(" selected");
        }
        if self.state.dimmed {
            class.push_str(" dimmed");
        }
        class
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Connector {
    start: NodeId,
    end: NodeId,
    section: Option<usize>,
    depth: usize,
}

fn connector_id(start: &NodeId, end: &NodeId) -> String {
    format!("edge_{start}_{end}")
}

#[derive(Debug)]
pub struct SvgSurface {
    options: SvgOptions,
    elements: IndexMap<NodeId, NodeElement>,
    connectors: IndexMap<String, Connector>,
    root: Option<NodeId>,
    zoom: f64,
    layout_runs: usize,
    next_serial: u64,
}

impl Default for SvgSurface {
    fn default() -> Self {
        Self::new(SvgOptions::default())
    }
}

impl SvgSurface {
    pub fn new(options: SvgOptions) -> Self {
        Self {
            options,
            elements: IndexMap::new(),
            connectors: IndexMap::new(),
            root: None,
            zoom: 1.0,
            layout_runs: 0,
            next_serial: 0,
        }
    }

    pub fn from_config(config: &MindmapConfig) -> Self {
        Self::new(SvgOptions::from_config(config))
    }

    pub fn options(&self) -> &SvgOptions {
        &self.options
    }

    pub fn element(&self, id: &NodeId) -> Option<&NodeElement> {
        self.elements.get(id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &NodeElement> {
        self.elements.values()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn connector_ids(&self) -> impl Iterator<Item = &str> {
        self.connectors.keys().map(String::as_str)
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    pub fn has_connector(&self, start: &NodeId, end: &NodeId) -> bool {
        self.connectors.contains_key(&connector_id(start, end))
    }

    /// Number of completed layout passes, see [`ViewSurface`] for when they happen.
    pub fn layout_runs(&self) -> usize {
        self.layout_runs
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
        self.zoom
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
        self.zoom
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }

    pub fn layout_nodes(&self) -> Vec<LayoutNode> {
        self.elements
            .values()
            .map(|e| LayoutNode {
                id: e.id.clone(),
                x: e.x,
                y: e.y,
                width: e.width,
                height: e.height,
            })
            .collect()
    }

    pub fn layout_edges(&self) -> Vec<LayoutEdge> {
        self.connectors
            .iter()
            .filter_map(|(id, c)| {
                let start = self.elements.get(&c.start)?;
                let end = self.elements.get(&c.end)?;
                Some(LayoutEdge {
                    id: id.clone(),
                    from: c.start.clone(),
                    to: c.end.clone(),
                    points: connector_points(start, end).to_vec(),
                })
            })
            .collect()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.elements.values().flat_map(|e| {
            [
                (e.x - e.width / 2.0, e.y - e.height / 2.0),
                (e.x + e.width / 2.0, e.y + e.height / 2.0),
            ]
        }))
    }

    fn new_element(&mut self, node: &TopicNode, at: LayoutPoint) -> NodeElement {
        let lines = self.wrap(node.label());
        let (width, height) = self.box_size(&lines);
        let serial = self.next_serial;
        self.next_serial += 1;
        NodeElement {
            id: node.id().clone(),
            lines,
            parent: node.parent().cloned(),
            children: Vec::new(),
            section: node.section(),
            origin: node.origin(),
            x: at.x,
            y: at.y,
            width,
            height,
            state: NodeVisualState::default(),
            serial,
        }
    }

    fn wrap(&self, label: &str) -> Vec<String> {
        wrap_label(
            self.options.text_measurer.as_ref(),
            label,
            &self.options.text_style,
            self.options.max_label_width,
        )
    }

    fn box_size(&self, lines: &[String]) -> (f64, f64) {
        let measurer = self.options.text_measurer.as_ref();
        let style = &self.options.text_style;
        let text_width = lines
            .iter()
            .map(|l| measurer.measure(l, style).width)
            .fold(0.0, f64::max);
        let text_height = lines.len().max(1) as f64 * measurer.line_height(style);
        let padding = self.options.node_padding;
        (text_width + 4.0 * padding, text_height + padding)
    }

    fn insert_connector(&mut self, parent: &NodeId, child: &NodeElement, depth: usize) {
        self.connectors.insert(
            connector_id(parent, &child.id),
            Connector {
                start: parent.clone(),
                end: child.id.clone(),
                section: child.section,
                depth,
            },
        );
    }

    fn sync_children(&mut self, parent: &NodeId, tree: &TopicTree) {
        let ordered: Vec<NodeId> = tree
            .children_of(parent)
            .iter()
            .filter(|id| self.elements.contains_key(*id))
            .cloned()
            .collect();
        if let Some(element) = self.elements.get_mut(parent) {
            element.children = ordered;
        }
    }

    fn run_layout(&mut self) {
        self.layout_runs += 1;
        let Some(root) = self.root.clone() else {
            return;
        };
        let points = layout_tree(&ElementShape(&self.elements), &root, self.options.layout);

        let mut nodes: Vec<LayoutNode> = points
            .into_iter()
            .filter_map(|(id, p)| {
                let e = self.elements.get(&id)?;
                Some(LayoutNode {
                    id,
                    x: p.x,
                    y: p.y,
                    width: e.width,
                    height: e.height,
                })
            })
            .collect();
        shift_nodes_to_positive_bounds(&mut nodes, 0.0);
        for n in nodes {
            if let Some(e) = self.elements.get_mut(&n.id) {
                e.x = n.x;
                e.y = n.y;
            }
        }
        tracing::debug!(
            elements = self.elements.len(),
            run = self.layout_runs,
            "layout complete"
        );
    }

    /// Serializes the current scene. The zoom factor scales the outer width/height only.
    pub fn to_svg(&self) -> String {
        let id = util::escape_xml(&self.options.diagram_id);
        let (vx, vy, vw, vh) = match self.bounds() {
            Some(b) => (
                b.min_x - VIEWBOX_PADDING,
                b.min_y - VIEWBOX_PADDING,
                b.width() + 2.0 * VIEWBOX_PADDING,
                b.height() + 2.0 * VIEWBOX_PADDING,
            ),
            None => (0.0, 0.0, 100.0, 100.0),
        };

        let mut out = String::new();
        let _ = write!(
            &mut out,
            r#"<svg id="{id}" width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg" class="mindmapDiagram" viewBox="{vx} {vy} {vw} {vh}" role="graphics-document document" aria-roledescription="mindmap">"#,
            w = util::fmt(vw * self.zoom),
            h = util::fmt(vh * self.zoom),
            vx = util::fmt(vx),
            vy = util::fmt(vy),
            vw = util::fmt(vw),
            vh = util::fmt(vh),
        );
        let font_family = self
            .options
            .text_style
            .font_family
            .as_deref()
            .unwrap_or(DEFAULT_FONT_FAMILY);
        let _ = write!(
            &mut out,
            "<style>{}</style>",
            style::mindmap_css(
                &self.options.diagram_id,
                font_family,
                self.options.text_style.font_size
            )
        );

        out.push_str(r#"<g class="edgePaths">"#);
        for (edge_id, c) in &self.connectors {
            let (Some(start), Some(end)) = (self.elements.get(&c.start), self.elements.get(&c.end))
            else {
                continue;
            };
            let d = util::curve_basis_path_d(&connector_points(start, end));
            let mut class = String::from("edge");
            if let Some(section) = c.section {
                let _ = write!(&mut class, " section-edge-{}", section % style::SECTION_COUNT);
            }
            let _ = write!(&mut class, " edge-depth-{}", c.depth);
            if end.state.dimmed {
                class.push_str(" dimmed");
            }
            let _ = write!(
                &mut out,
                r#"<path d="{d}" id="{id}" class="{class}" data-id="{id}"/>"#,
                id = util::escape_xml(edge_id),
                class = util::escape_xml(&class),
            );
        }
        out.push_str("</g>");

        out.push_str(r#"<g class="nodes">"#);
        let line_height = self
            .options
            .text_measurer
            .line_height(&self.options.text_style);
        for e in self.elements.values() {
            let _ = write!(
                &mut out,
                r#"<g class="{class}" id="node_{id}" data-id="{id}" transform="translate({x}, {y})">"#,
                class = util::escape_xml(&e.class()),
                id = util::escape_xml(e.id.as_str()),
                x = util::fmt(e.x),
                y = util::fmt(e.y),
            );
            let _ = write!(
                &mut out,
                r#"<rect class="node-bkg" x="{x}" y="{y}" width="{w}" height="{h}" rx="5" ry="5"/>"#,
                x = util::fmt(-e.width / 2.0),
                y = util::fmt(-e.height / 2.0),
                w = util::fmt(e.width),
                h = util::fmt(e.height),
            );
            out.push_str(r#"<text class="mindmap-node-label">"#);
            let first_y = -(e.lines.len().saturating_sub(1) as f64) * line_height / 2.0;
            for (i, line) in e.lines.iter().enumerate() {
                let _ = write!(
                    &mut out,
                    r#"<tspan x="0" y="{y}">{text}</tspan>"#,
                    y = util::fmt(first_y + i as f64 * line_height),
                    text = util::escape_xml(line),
                );
            }
            out.push_str("</text></g>");
        }
        out.push_str("</g></svg>");
        out
    }
}

/// Connector control points: curve from just inside the parent to just inside the child.
fn connector_points(start: &NodeElement, end: &NodeElement) -> [LayoutPoint; 3] {
    let dx = if end.x >= start.x {
        EDGE_END_OFFSET
    } else {
        -EDGE_END_OFFSET
    };
    let start_x = start.x + dx;
    let end_x = end.x - dx;
    [
        LayoutPoint {
            x: start_x,
            y: start.y,
        },
        LayoutPoint {
            x: (start_x + end_x) / 2.0,
            y: (start.y + end.y) / 2.0,
        },
        LayoutPoint {
            x: end_x,
            y: end.y,
        },
    ]
}

struct ElementShape<'a>(&'a IndexMap<NodeId, NodeElement>);

impl TreeShape for ElementShape<'_> {
    fn children(&self, id: &NodeId) -> &[NodeId] {
        self.0.get(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    fn size(&self, id: &NodeId) -> (f64, f64) {
        self.0.get(id).map(|e| (e.width, e.height)).unwrap_or_default()
    }
}

impl ViewSurface for SvgSurface {
    fn render(&mut self, tree: &TopicTree) -> Result<()> {
        self.elements.clear();
        self.connectors.clear();
        self.root = tree.root_id().cloned();

        let origin = LayoutPoint { x: 0.0, y: 0.0 };
        for node in tree.nodes() {
            let element = self.new_element(node, origin);
            if let Some(parent) = node.parent() {
                self.insert_connector(parent, &element, node.depth());
            }
            self.elements.insert(node.id().clone(), element);
        }
        for node in tree.nodes() {
            self.sync_children(node.id(), tree);
        }

        self.run_layout();
        tracing::debug!(elements = self.elements.len(), "surface rendered");
        Ok(())
    }

    fn apply_delta(&mut self, added: &[NodeId], tree: &TopicTree) -> Result<()> {
        // Validate first so a bad batch leaves the scene untouched.
        let mut incoming: FxHashSet<&NodeId> = FxHashSet::default();
        for id in added {
            let node = tree
                .get(id)
                .ok_or_else(|| Error::UnknownElement { id: id.clone() })?;
            if let Some(parent) = node.parent() {
                if !self.elements.contains_key(parent) && !incoming.contains(parent) {
                    return Err(Error::MissingParent { id: id.clone() });
                }
            }
            incoming.insert(id);
        }

        let mut touched: Vec<NodeId> = Vec::new();
        let mut created = 0usize;
        for id in added {
            if self.elements.contains_key(id) {
                continue;
            }
            let Some(node) = tree.get(id) else {
                continue;
            };
            let element = match node.parent() {
                Some(parent) => {
                    let at = self
                        .elements
                        .get(parent)
                        .map(NodeElement::position)
                        .unwrap_or(LayoutPoint { x: 0.0, y: 0.0 });
                    let element = self.new_element(node, at);
                    self.insert_connector(parent, &element, node.depth());
                    if !touched.contains(parent) {
                        touched.push(parent.clone());
                    }
                    element
                }
                None => {
                    self.root = Some(id.clone());
                    self.new_element(node, LayoutPoint { x: 0.0, y: 0.0 })
                }
            };
            self.elements.insert(id.clone(), element);
            created += 1;
        }
        for parent in &touched {
            self.sync_children(parent, tree);
        }

        self.run_layout();
        tracing::debug!(created, "surface delta applied");
        Ok(())
    }

    fn remove(&mut self, removed: &[NodeId]) -> Result<()> {
        if let Some(id) = removed.iter().find(|id| !self.elements.contains_key(*id)) {
            return Err(Error::UnknownElement { id: id.clone() });
        }

        let doomed: FxHashSet<&NodeId> = removed.iter().collect();
        self.elements.retain(|id, _| !doomed.contains(id));
        self.connectors
            .retain(|_, c| !doomed.contains(&c.start) && !doomed.contains(&c.end));
        for element in self.elements.values_mut() {
            element.children.retain(|c| !doomed.contains(c));
        }
        if self.root.as_ref().is_some_and(|r| doomed.contains(r)) {
            self.root = None;
        }

        self.run_layout();
        tracing::debug!(removed = removed.len(), "surface elements removed");
        Ok(())
    }

    fn set_node_visual_state(&mut self, id: &NodeId, state: NodeVisualState) -> Result<()> {
        let element = self
            .elements
            .get_mut(id)
            .ok_or_else(|| Error::UnknownElement { id: id.clone() })?;
        element.state = state;
        Ok(())
    }

    fn set_label(&mut self, id: &NodeId, label: &str) -> Result<()> {
        if !self.elements.contains_key(id) {
            return Err(Error::UnknownElement { id: id.clone() });
        }
        let lines = self.wrap(label);
        let (width, height) = self.box_size(&lines);
        let mut resized = false;
        if let Some(element) = self.elements.get_mut(id) {
            resized = element.width != width || element.height != height;
            element.lines = lines;
            element.width = width;
            element.height = height;
        }
        if resized {
            tracing::debug!(node = %id, "relabel changed the box size");
            self.run_layout();
        }
        Ok(())
    }
}
