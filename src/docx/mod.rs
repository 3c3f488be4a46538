//! DOCX template filling.
//!
//! - `package`: zip container I/O
//! - `xml`: lenient element tree over the XML parts
//! - `substitute`: run-preserving placeholder substitution
//! - `walker`: traversal of paragraphs, tables and text boxes

pub mod package;
pub mod substitute;
pub mod walker;
pub mod xml;

pub use package::{DocxPackage, MAIN_DOCUMENT};
pub use walker::{Container, ParagraphVisitor, Substitution, WalkStats};

use crate::placeholders::PlaceholderMap;
use anyhow::{Context, Result};
use xml::{Element, XmlDocument};

/// The element whose children are the part's block content.
fn content_root(doc: &mut XmlDocument) -> Option<&mut Element> {
    let root = doc.root_mut()?;
    if root.name == "w:document" {
        root.child_mut("w:body")
    } else {
        Some(root)
    }
}

/// Substitute placeholders in one XML part. Returns the new XML only if
/// something changed.
pub fn fill_part(xml: &str, map: &PlaceholderMap) -> Result<(Option<String>, WalkStats)> {
    let mut doc = XmlDocument::parse(xml)?;
    let Some(root) = content_root(&mut doc) else {
        return Ok((None, WalkStats::default()));
    };
    let stats = walker::walk(root, &mut Substitution::new(map))?;
    let xml = (stats.modified > 0).then(|| doc.to_xml());
    Ok((xml, stats))
}

/// Substitute placeholders in the main document, headers and footers.
pub fn fill_package(package: &mut DocxPackage, map: &PlaceholderMap) -> Result<WalkStats> {
    let mut total = WalkStats::default();
    for name in package.text_parts() {
        let Some(data) = package.part(&name) else {
            continue;
        };
        let xml = String::from_utf8(data.to_vec())
            .with_context(|| format!("{} is not valid UTF-8", name))?;
        let (filled, stats) = fill_part(&xml, map).with_context(|| format!("Failed to fill {}", name))?;
        log::debug!(
            "{}: {} paragraphs, {} cells, {} shapes, {} modified",
            name,
            stats.paragraphs,
            stats.table_cells,
            stats.shapes,
            stats.modified
        );
        if let Some(filled) = filled {
            package.set_part(&name, filled.into_bytes());
        }
        total += stats;
    }
    Ok(total)
}
