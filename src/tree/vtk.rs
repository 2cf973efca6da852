//! Legacy VTK polyline export
//!
//! ASCII `POLYDATA` files: a `POINTS` block, one polyline per edge under
//! `LINES`, and optionally one scalar per point under `POINT_DATA`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::types::Result;
use crate::tree::{Point, PointKind, Tree, TreeEdge};

/// One file for the whole tree, or one per edge
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputLayout {
    #[default]
    Combined,
    PerEdge,
}

/// Scalar written for each point
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointColor {
    #[default]
    None,
    /// 0 for anchored points, 1 otherwise
    Anchor,
    BranchOrder,
    BranchLabel,
    Component,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VtkOptions {
    pub layout: OutputLayout,
    pub color: PointColor,
    /// RGB colors of the two anchor values, written as a user lookup table
    pub color_table: Option<[[f32; 3]; 2]>,
    /// Second header line
    pub description: String,
}

impl Default for VtkOptions {
    fn default() -> Self {
        Self {
            layout: OutputLayout::Combined,
            color: PointColor::None,
            color_table: None,
            description: "skeleton".to_string(),
        }
    }
}

impl VtkOptions {
    fn user_table(&self) -> Option<&[[f32; 3]; 2]> {
        self.color_table.as_ref().filter(|_| self.color == PointColor::Anchor)
    }
}

fn point_value(p: &Point, color: PointColor) -> f32 {
    match color {
        PointColor::None => 0.0,
        PointColor::Anchor => if p.anchor { 0.0 } else { 1.0 },
        PointColor::BranchOrder => p.branch_order as f32,
        PointColor::BranchLabel => p.branch_label as f32,
        PointColor::Component => p.component as f32,
    }
}

/// Scalars of an edge's points; junctions at the extremities take the
/// value of their inner neighbor
fn edge_values(tree: &Tree, edge: &TreeEdge, color: PointColor) -> Vec<f32> {
    let points: Vec<&Point> = tree.edge_points(edge).collect();
    let n = points.len();
    (0..n)
        .map(|i| {
            let p = points[i];
            let source = if p.kind == PointKind::Junction && n > 1 && i == 0 {
                points[1]
            } else if p.kind == PointKind::Junction && n > 1 && i == n - 1 {
                points[n - 2]
            } else {
                p
            };
            point_value(source, color)
        })
        .collect()
}

fn write_header<W: Write>(w: &mut W, options: &VtkOptions) -> Result<()> {
    writeln!(w, "# vtk DataFile Version 2.0")?;
    writeln!(w, "{}", options.description)?;
    writeln!(w, "ASCII")?;
    writeln!(w, "DATASET POLYDATA")?;
    Ok(())
}

fn write_scalars<W: Write>(w: &mut W, values: &[f32], options: &VtkOptions) -> Result<()> {
    let table = options.user_table();
    writeln!(w, "POINT_DATA {}", values.len())?;
    writeln!(w, "SCALARS volume float")?;
    writeln!(w, "LOOKUP_TABLE {}", if table.is_some() { "userdefined" } else { "default" })?;
    for v in values {
        writeln!(w, "{}", v)?;
    }
    if let Some(table) = table {
        writeln!(w, "LOOKUP_TABLE userdefined 2")?;
        for [r, g, b] in table {
            writeln!(w, "{} {} {} 1.0", r, g, b)?;
        }
    }
    Ok(())
}

/// Write every edge as a polyline in one file. Junction points are repeated
/// in each edge that reaches them.
pub fn write_vtk<W: Write>(w: &mut W, tree: &Tree, options: &VtkOptions) -> Result<()> {
    let total: usize = tree.edges.iter().map(|e| e.points.len()).sum();
    write_header(w, options)?;

    writeln!(w, "POINTS {} float", total)?;
    for edge in &tree.edges {
        for p in tree.edge_points(edge) {
            writeln!(w, "{} {} {}", p.position.x, p.position.y, p.position.z)?;
        }
    }

    writeln!(w, "LINES {} {}", tree.edges.len(), tree.edges.len() + total)?;
    let mut next = 0;
    for edge in &tree.edges {
        let n = edge.points.len();
        let indices: Vec<String> = (next..next + n).map(|i| i.to_string()).collect();
        writeln!(w, "{} {}", n, indices.join(" "))?;
        next += n;
    }

    if options.color != PointColor::None {
        let values: Vec<f32> = tree
            .edges
            .iter()
            .flat_map(|e| edge_values(tree, e, options.color))
            .collect();
        write_scalars(w, &values, options)?;
    }
    Ok(())
}

/// Write a single edge as one polyline
pub fn write_edge_vtk<W: Write>(w: &mut W, tree: &Tree, edge: &TreeEdge, options: &VtkOptions) -> Result<()> {
    let n = edge.points.len();
    write_header(w, options)?;

    writeln!(w, "POINTS {} float", n)?;
    for p in tree.edge_points(edge) {
        writeln!(w, "{} {} {}", p.position.x, p.position.y, p.position.z)?;
    }
    writeln!(w, "LINES 1 {}", n + 1)?;
    let indices: Vec<String> = (0..n).map(|i| i.to_string()).collect();
    writeln!(w, "{} {}", n, indices.join(" "))?;

    if options.color != PointColor::None {
        write_scalars(w, &edge_values(tree, edge, options.color), options)?;
    }
    Ok(())
}

/// Save `tree` under `path` following `options.layout`. Per-edge files are
/// named `<stem>_<n>.vtk`. Returns the written paths.
pub fn save_vtk(path: &Path, tree: &Tree, options: &VtkOptions) -> Result<Vec<PathBuf>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let written = match options.layout {
        OutputLayout::Combined => {
            let mut w = BufWriter::new(File::create(path)?);
            write_vtk(&mut w, tree, options)?;
            w.flush()?;
            vec![path.to_path_buf()]
        }
        OutputLayout::PerEdge => {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("tree");
            let mut written = Vec::with_capacity(tree.edges.len());
            for (n, edge) in tree.edges.iter().enumerate() {
                let edge_path = path.with_file_name(format!("{}_{}.vtk", stem, n));
                let mut w = BufWriter::new(File::create(&edge_path)?);
                write_edge_vtk(&mut w, tree, edge, options)?;
                w.flush()?;
                written.push(edge_path);
            }
            written
        }
    };

    log::info!("Wrote {} VTK file(s) for {} edges", written.len(), tree.edges.len());
    Ok(written)
}
