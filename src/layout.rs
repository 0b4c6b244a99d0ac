//! Deterministic tree layout.
//!
//! Nodes are placed depth first, one position cursor per depth. A parent
//! starts centered over the span its children are about to take; once the
//! children are placed it is moved to the middle of the first and last child
//! and the cursor of its own level follows it. A last pass gives every level
//! the same depth coordinate, far enough from the previous level to fit its
//! deepest node.
//!
//! With a [`LayoutAxis::Vertical`] axis children fan out along X and levels
//! advance along Y; `Horizontal` is the transpose.

use crate::{
    builder::tree_from_scene,
    error::{EditError, TreeError},
    geometry::{Point, Size},
    graph::{batch, GraphView, LayoutAxis},
    tree::AbstractTree,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between the deepest node of a level and the next level.
    pub level_spacing: f64,
    /// Gap between neighbors on the same level.
    pub node_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            level_spacing: 80.,
            node_spacing: 40.,
        }
    }
}

fn fan_extent(axis: LayoutAxis, size: Size) -> f64 {
    match axis {
        LayoutAxis::Vertical => size.width,
        LayoutAxis::Horizontal => size.height,
    }
}

fn depth_extent(axis: LayoutAxis, size: Size) -> f64 {
    match axis {
        LayoutAxis::Vertical => size.height,
        LayoutAxis::Horizontal => size.width,
    }
}

struct Placement {
    children: Vec<Vec<usize>>,
    fan: Vec<f64>,
    spacing: f64,
    /// Next free fan coordinate per depth.
    cursors: Vec<f64>,
    /// Resulting fan coordinate of each node's leading edge.
    offsets: Vec<f64>,
}

impl Placement {
    fn center(&self, index: usize) -> f64 {
        self.offsets[index] + self.fan[index] / 2.
    }

    fn place(&mut self, index: usize, depth: usize) {
        let u = self.cursors[depth];
        let children = std::mem::take(&mut self.children[index]);

        self.offsets[index] = u;
        if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
            let footprint = children.iter().map(|child| self.fan[*child]).sum::<f64>()
                + self.spacing * (children.len() - 1) as f64;
            let start = u + self.fan[index] / 2. - footprint / 2.;
            match self.cursors.get_mut(depth + 1) {
                Some(next) => *next = next.max(start),
                None => self.cursors.push(start),
            }

            for &child in &children {
                self.place(child, depth + 1);
            }

            // Children may have been pushed aside by earlier subtrees, and a
            // node never moves back over its left neighbor.
            let mid = (self.center(first) + self.center(last)) / 2.;
            let offset = (mid - self.fan[index] / 2. - u).max(0.);
            self.offsets[index] = u + offset;
        }

        self.cursors[depth] = self.offsets[index] + self.fan[index] + self.spacing;
        self.children[index] = children;
    }
}

/// Assigns a position to every node of `tree` from the node sizes alone.
///
/// The result only depends on the tree shape, the sizes, `axis` and
/// `config`. The root's leading edge is at the origin.
pub fn layout_tree(tree: &mut AbstractTree, axis: LayoutAxis, config: &LayoutConfig) -> Result<(), TreeError> {
    if tree.is_empty() {
        return Ok(());
    }
    tree.validate()?;

    let mut placement = Placement {
        children: tree.nodes().iter().map(|node| node.children_index.clone()).collect(),
        fan: tree.nodes().iter().map(|node| fan_extent(axis, node.size)).collect(),
        spacing: config.node_spacing,
        cursors: vec![0.],
        offsets: vec![0.; tree.len()],
    };
    placement.place(0, 0);

    let mut depth_offsets = vec![0.; tree.len()];
    let mut level_start = 0.;
    for level in tree.levels() {
        let deepest = level
            .iter()
            .filter_map(|index| tree.node(*index))
            .map(|node| depth_extent(axis, node.size))
            .fold(0., f64::max);
        for &index in &level {
            depth_offsets[index] = level_start;
        }
        level_start += deepest + config.level_spacing;
    }

    for node in tree.nodes_mut() {
        let fan = placement.offsets[node.index];
        let depth = depth_offsets[node.index];
        node.pos = match axis {
            LayoutAxis::Vertical => Point::new(fan, depth),
            LayoutAxis::Horizontal => Point::new(depth, fan),
        };
    }
    debug!("laid out {} nodes", tree.len());
    Ok(())
}

/// Moves every scene node that `tree` refers to onto its laid out position,
/// as a single change.
pub fn apply_layout<G>(tree: &AbstractTree, scene: &mut G)
where
    G: GraphView + ?Sized,
{
    batch(scene, |scene| {
        for node in tree.nodes() {
            if let Some(id) = node.graphic_node {
                if scene.position(id) != Some(node.pos) {
                    scene.set_position(id, node.pos);
                }
            }
        }
    });
}

/// Lays out the tree shown in `scene` and moves its nodes accordingly.
/// Refused unless the scene holds exactly one tree.
pub fn reorder_scene<G>(scene: &mut G, config: &LayoutConfig) -> Result<AbstractTree, EditError>
where
    G: GraphView + ?Sized,
{
    let mut tree = tree_from_scene(scene, None)?;
    layout_tree(&mut tree, scene.axis(), config)?;
    apply_layout(&tree, scene);
    Ok(tree)
}

#[cfg(test)]
mod test;
