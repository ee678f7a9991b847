//! Horizontal tidy tree layout.
//!
//! The root sits in the left column and each depth gets its own column `level_separation`
//! apart. Leaves are stacked top to bottom in visiting order, a parent is centred on its first
//! and last child, and every column keeps a contour of its next free `y` so boxes in the same
//! column never overlap. When a parent would collide with the contour its whole subtree moves
//! down.

use crate::model::{LayoutNode, LayoutPoint};
use mindsprout_core::{MindmapConfig, NodeId};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub level_separation: f64,
    pub sibling_separation: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            level_separation: 220.0,
            sibling_separation: 24.0,
        }
    }
}

impl LayoutOptions {
    pub fn from_config(config: &MindmapConfig) -> Self {
        let defaults = Self::default();
        Self {
            level_separation: config
                .get_f64("layout.levelSeparation")
                .unwrap_or(defaults.level_separation)
                .max(1.0),
            sibling_separation: config
                .get_f64("layout.siblingSeparation")
                .unwrap_or(defaults.sibling_separation)
                .max(0.0),
        }
    }
}

/// Read-only view of the structure being laid out.
pub trait TreeShape {
    fn children(&self, id: &NodeId) -> &[NodeId];

    /// Box size as `(width, height)`.
    fn size(&self, id: &NodeId) -> (f64, f64);
}

struct Placed {
    depth: usize,
    height: f64,
    y: f64,
}

struct Placer<'a, S: ?Sized> {
    shape: &'a S,
    options: LayoutOptions,
    placed: FxHashMap<NodeId, Placed>,
    contour: Vec<f64>,
}

impl<S: TreeShape + ?Sized> Placer<'_, S> {
    fn next_free(&mut self, depth: usize) -> f64 {
        if self.contour.len() <= depth {
            self.contour.resize(depth + 1, 0.0);
        }
        self.contour[depth]
    }

    fn claim(&mut self, depth: usize, bottom: f64) {
        let sep = self.options.sibling_separation;
        if self.contour.len() <= depth {
            self.contour.resize(depth + 1, 0.0);
        }
        self.contour[depth] = self.contour[depth].max(bottom + sep);
    }

    /// Places `id` and its descendants; returns the subtree in pre-order.
    fn place(&mut self, id: &NodeId, depth: usize) -> Vec<NodeId> {
        let shape = self.shape;
        let (_, height) = shape.size(id);
        let children = shape.children(id);
        let mut subtree = vec![id.clone()];

        let mut y = if children.is_empty() {
            self.next_free(depth) + height / 2.0
        } else {
            let mut first = None;
            let mut last = 0.0;
            for child in children {
                let placed = self.place(child, depth + 1);
                let child_y = self.placed.get(child).map(|p| p.y).unwrap_or_default();
                first.get_or_insert(child_y);
                last = child_y;
                subtree.extend(placed);
            }
            first.map(|first| (first + last) / 2.0).unwrap_or_default()
        };

        let top = self.next_free(depth);
        if y - height / 2.0 < top {
            let delta = top - (y - height / 2.0);
            y += delta;
            for moved in subtree.iter().skip(1) {
                if let Some(p) = self.placed.get_mut(moved) {
                    p.y += delta;
                    let (depth, bottom) = (p.depth, p.y + p.height / 2.0);
                    self.claim(depth, bottom);
                }
            }
        }

        self.placed.insert(id.clone(), Placed { depth, height, y });
        self.claim(depth, y + height / 2.0);
        subtree
    }
}

/// Lays out the tree under `root`. Returns centre points for every reachable node.
pub fn layout_tree<S: TreeShape + ?Sized>(
    shape: &S,
    root: &NodeId,
    options: LayoutOptions,
) -> FxHashMap<NodeId, LayoutPoint> {
    let mut placer = Placer {
        shape,
        options,
        placed: FxHashMap::default(),
        contour: Vec::new(),
    };
    placer.place(root, 0);

    placer
        .placed
        .into_iter()
        .map(|(id, p)| {
            let point = LayoutPoint {
                x: p.depth as f64 * options.level_separation,
                y: p.y,
            };
            (id, point)
        })
        .collect()
}

/// Translates nodes so the top-left corner of their joint box lands on `content_min`.
pub fn shift_nodes_to_positive_bounds(nodes: &mut [LayoutNode], content_min: f64) {
    if nodes.is_empty() {
        return;
    }
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    for n in nodes.iter() {
        min_x = min_x.min(n.x - n.width / 2.0);
        min_y = min_y.min(n.y - n.height / 2.0);
    }
    if !(min_x.is_finite() && min_y.is_finite()) {
        return;
    }
    let dx = content_min - min_x;
    let dy = content_min - min_y;
    for n in nodes.iter_mut() {
        n.x += dx;
        n.y += dy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        children: FxHashMap<NodeId, Vec<NodeId>>,
        sizes: FxHashMap<NodeId, (f64, f64)>,
    }

    impl Fixture {
        fn new(edges: &[(&str, &str)]) -> Self {
            let mut children: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
            let mut sizes = FxHashMap::default();
            for (parent, child) in edges {
                children
                    .entry(NodeId::from(*parent))
                    .or_default()
                    .push(NodeId::from(*child));
                sizes.insert(NodeId::from(*parent), (80.0, 20.0));
                sizes.insert(NodeId::from(*child), (80.0, 20.0));
            }
            Self { children, sizes }
        }
    }

    impl TreeShape for Fixture {
        fn children(&self, id: &NodeId) -> &[NodeId] {
            self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
        }

        fn size(&self, id: &NodeId) -> (f64, f64) {
            self.sizes.get(id).copied().unwrap_or((80.0, 20.0))
        }
    }

    fn y(points: &FxHashMap<NodeId, LayoutPoint>, id: &str) -> f64 {
        points[&NodeId::from(id)].y
    }

    #[test]
    fn leaves_stack_and_parents_centre() {
        let shape = Fixture::new(&[("r", "a"), ("r", "b"), ("r", "c")]);
        let options = LayoutOptions {
            level_separation: 100.0,
            sibling_separation: 10.0,
        };
        let points = layout_tree(&shape, &NodeId::from("r"), options);

        assert_eq!(points.len(), 4);
        assert_eq!(y(&points, "a"), 10.0);
        assert_eq!(y(&points, "b"), 40.0);
        assert_eq!(y(&points, "c"), 70.0);
        assert_eq!(y(&points, "r"), 40.0);
        assert_eq!(points[&NodeId::from("r")].x, 0.0);
        assert_eq!(points[&NodeId::from("c")].x, 100.0);
    }

    #[test]
    fn tall_parent_pushes_its_subtree_down() {
        let mut shape = Fixture::new(&[("r", "a"), ("r", "b"), ("a", "a1"), ("b", "b1")]);
        shape.sizes.insert(NodeId::from("a"), (80.0, 100.0));
        shape.sizes.insert(NodeId::from("b"), (80.0, 100.0));
        let options = LayoutOptions {
            level_separation: 100.0,
            sibling_separation: 10.0,
        };
        let points = layout_tree(&shape, &NodeId::from("r"), options);

        // a spans [0, 100]; b must start at 110 and its child follows it.
        assert_eq!(y(&points, "a"), 50.0);
        assert_eq!(y(&points, "b"), 160.0);
        assert_eq!(y(&points, "b1"), 160.0);
        assert!(y(&points, "b") - 50.0 >= y(&points, "a") + 50.0 + 10.0);
    }

    #[test]
    fn shift_moves_content_to_origin() {
        let mut nodes = vec![
            LayoutNode {
                id: NodeId::from("a"),
                x: -50.0,
                y: -10.0,
                width: 20.0,
                height: 10.0,
            },
            LayoutNode {
                id: NodeId::from("b"),
                x: 30.0,
                y: 40.0,
                width: 20.0,
                height: 10.0,
            },
        ];
        shift_nodes_to_positive_bounds(&mut nodes, 10.0);
        assert_eq!(nodes[0].x, 10.0 + 10.0);
        assert_eq!(nodes[0].y, 10.0 + 5.0);
        assert_eq!(nodes[1].x, 90.0 + 10.0);
    }
}
