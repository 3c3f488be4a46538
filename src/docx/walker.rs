//! Traversal of every text container in a document part.
//!
//! Block content (paragraphs, tables, content controls) is visited first,
//! then drawing shapes that carry a text box. Shapes are found by searching
//! the whole part, since they hang off runs deep inside paragraphs.

use super::substitute::{substitute_leaves, substitute_paragraph};
use super::xml::Element;
use crate::placeholders::PlaceholderMap;
use anyhow::{bail, Result};

/// Where a visited paragraph lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Body,
    TableCell,
    /// `wp:inline` drawing with a text frame.
    InlineShape,
    /// `wp:anchor` (floating) drawing with a text box.
    AnchoredShape,
    /// VML text box, the compatibility fallback Word writes next to a shape.
    LegacyShape,
}

impl Container {
    pub fn is_shape(self) -> bool {
        matches!(
            self,
            Container::InlineShape | Container::AnchoredShape | Container::LegacyShape
        )
    }
}

pub trait ParagraphVisitor {
    /// Visit one paragraph. Returns true if the paragraph was modified.
    fn visit(&mut self, container: Container, paragraph: &mut Element) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub paragraphs: usize,
    pub table_cells: usize,
    pub shapes: usize,
    pub skipped_shapes: usize,
    pub modified: usize,
}

impl std::ops::AddAssign for WalkStats {
    fn add_assign(&mut self, other: WalkStats) {
        self.paragraphs += other.paragraphs;
        self.table_cells += other.table_cells;
        self.shapes += other.shapes;
        self.skipped_shapes += other.skipped_shapes;
        self.modified += other.modified;
    }
}

/// Placeholder substitution as a visitor: run rebuilding for body and cell
/// paragraphs, leaf concatenation for text-box paragraphs.
pub struct Substitution<'a> {
    map: &'a PlaceholderMap,
}

impl<'a> Substitution<'a> {
    pub fn new(map: &'a PlaceholderMap) -> Self {
        Substitution { map }
    }
}

impl ParagraphVisitor for Substitution<'_> {
    fn visit(&mut self, container: Container, paragraph: &mut Element) -> Result<bool> {
        Ok(if container.is_shape() {
            substitute_leaves(paragraph, self.map)
        } else {
            substitute_paragraph(paragraph, self.map)
        })
    }
}

/// Walk a part's root container (`w:body`, `w:hdr` or `w:ftr`).
pub fn walk(root: &mut Element, visitor: &mut dyn ParagraphVisitor) -> Result<WalkStats> {
    let mut stats = WalkStats::default();
    visit_blocks(root, Container::Body, visitor, &mut stats)?;
    visit_shapes(root, visitor, &mut stats);
    Ok(stats)
}

fn visit_blocks(
    parent: &mut Element,
    container: Container,
    visitor: &mut dyn ParagraphVisitor,
    stats: &mut WalkStats,
) -> Result<()> {
    for child in parent.elements_mut() {
        match child.name.as_str() {
            "w:p" => {
                if visitor.visit(container, child)? {
                    stats.modified += 1;
                }
                stats.paragraphs += 1;
            }
            "w:tbl" => visit_table(child, container, visitor, stats)?,
            "w:sdt" => {
                if let Some(content) = child.child_mut("w:sdtContent") {
                    visit_blocks(content, container, visitor, stats)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Tables inside text boxes keep the shape's container kind.
fn visit_table(
    table: &mut Element,
    container: Container,
    visitor: &mut dyn ParagraphVisitor,
    stats: &mut WalkStats,
) -> Result<()> {
    let cell_container = if container.is_shape() {
        container
    } else {
        Container::TableCell
    };
    let mut rows: Vec<&mut Element> = Vec::new();
    table.collect_mut("w:tr", &["w:tbl"], &mut rows);
    for row in rows {
        let mut cells: Vec<&mut Element> = Vec::new();
        row.collect_mut("w:tc", &["w:tbl"], &mut cells);
        for cell in cells {
            stats.table_cells += 1;
            visit_blocks(cell, cell_container, visitor, stats)?;
        }
    }
    Ok(())
}

fn visit_shapes(parent: &mut Element, visitor: &mut dyn ParagraphVisitor, stats: &mut WalkStats) {
    for child in parent.elements_mut() {
        if child.name == "w:drawing" || child.name == "w:pict" {
            if !has_text_box(child) {
                continue;
            }
            stats.shapes += 1;
            if let Err(e) = visit_shape(child, visitor, stats) {
                stats.skipped_shapes += 1;
                log::warn!("Skipping shape: {:#}", e);
            }
        } else {
            visit_shapes(child, visitor, stats);
        }
    }
}

fn has_text_box(shape: &Element) -> bool {
    shape.contains("wps:txbx") || shape.contains("v:textbox") || shape.contains("w:txbxContent")
}

fn shape_kind(shape: &Element) -> Container {
    if shape.name == "w:pict" {
        Container::LegacyShape
    } else if shape.contains("wp:anchor") {
        Container::AnchoredShape
    } else {
        Container::InlineShape
    }
}

fn visit_shape(
    shape: &mut Element,
    visitor: &mut dyn ParagraphVisitor,
    stats: &mut WalkStats,
) -> Result<()> {
    let kind = shape_kind(shape);
    let mut boxes: Vec<&mut Element> = Vec::new();
    shape.collect_mut("w:txbxContent", &[], &mut boxes);
    if boxes.is_empty() {
        bail!("{:?} has a text box without w:txbxContent", kind);
    }
    for content in boxes {
        visit_blocks(content, kind, visitor, stats)?;
        // Shapes inside the text box are visited on their own.
        visit_shapes(content, visitor, stats);
    }
    Ok(())
}
