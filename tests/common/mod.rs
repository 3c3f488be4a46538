//! Shared fixtures: a small proposal template and a sample project.

#![allow(dead_code)]

use proposal_docs::docx::DocxPackage;
use proposal_docs::project::{Item, MemoryProjectStore, Project};
use std::path::{Path, PathBuf};

const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape""#;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

pub fn document_xml() -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document {}><w:body>"#,
            // Whole token in one run
            r#"<w:p><w:r><w:t xml:space="preserve">Proposal for {{{{Name}}}}</w:t></w:r></w:p>"#,
            // Token split across differently formatted runs
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Total: {{{{Total</w:t></w:r>"#,
            r#"<w:r><w:rPr><w:i/></w:rPr><w:t>Price}}}}</w:t></w:r></w:p>"#,
            // Spaced spelling
            r#"<w:p><w:r><w:t>{{{{ Date }}}}</w:t></w:r></w:p>"#,
            // Contractor fields with loose spacing and case, each in its own run
            r#"<w:p><w:r><w:t xml:space="preserve">Contractor: {{{{ contractorname }}}}</w:t></w:r>"#,
            r#"<w:r><w:rPr><w:u w:val="single"/></w:rPr><w:t>{{{{ContractorEmail}}}}</w:t></w:r></w:p>"#,
            // Table
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>{{{{StreetAdd}}}}</w:t></w:r></w:p></w:tc>"#,
            r#"<w:tc><w:p><w:r><w:t>{{{{CityAdd}}}}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            // Anchored text box
            r#"<w:p><w:r><w:drawing><wp:anchor><a:graphic><a:graphicData><wps:wsp><wps:txbx><w:txbxContent>"#,
            r#"<w:p><w:r><w:t>Contact: {{{{Job</w:t></w:r><w:r><w:t>Contact}}}}</w:t></w:r></w:p>"#,
            r#"</w:txbxContent></wps:txbx></wps:wsp></a:graphicData></a:graphic></wp:anchor></w:drawing></w:r></w:p>"#,
            // No placeholders
            r#"<w:p><w:r><w:t>Thank you for your business.</w:t></w:r></w:p>"#,
            r#"<w:sectPr/></w:body></w:document>"#
        ),
        W_NS
    )
}

pub fn header_xml() -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:hdr {}><w:p><w:r><w:t xml:space="preserve">Attn: {{{{Attn}}}}</w:t></w:r></w:p></w:hdr>"#
        ),
        W_NS
    )
}

/// Write the fixture template to `dir/template.docx`.
pub fn write_template(dir: &Path) -> PathBuf {
    let mut package = DocxPackage::default();
    package.set_part("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec());
    package.set_part("_rels/.rels", ROOT_RELS.as_bytes().to_vec());
    package.set_part("word/document.xml", document_xml().into_bytes());
    package.set_part("word/header1.xml", header_xml().into_bytes());
    package.set_part("word/media/image1.png", vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3]);

    let path = dir.join("template.docx");
    let file = std::fs::File::create(&path).unwrap();
    package.write_to(file).unwrap();
    path
}

pub fn sample_project() -> Project {
    Project {
        id: 7,
        name: "Barn Roof".to_string(),
        date: Some("2024-03-05".to_string()),
        attn: Some("Dana Reyes".to_string()),
        contractor_name: Some("Acme Roofing".to_string()),
        contractor_email: Some("bids@acme.example".to_string()),
        job_contact: Some("Sam Ortiz".to_string()),
        job_contact_phone: Some("555-0100".to_string()),
        address: Some("12 Mill Rd, Springfield, IL 62701, USA".to_string()),
        user_id: Some(1),
        items: vec![
            Item {
                name: "Curbs".to_string(),
                quantity: 2,
                price: 10.0,
            },
            Item {
                name: "Pipes".to_string(),
                quantity: 1,
                price: 5.5,
            },
        ],
    }
}

pub fn sample_store() -> MemoryProjectStore {
    MemoryProjectStore::new([sample_project()])
}

/// Read one XML part of a generated document.
pub fn read_part(path: &Path, name: &str) -> String {
    let package = DocxPackage::open(path).unwrap();
    String::from_utf8(package.part(name).unwrap().to_vec()).unwrap()
}

/// Concatenated `w:t` text of an XML part.
pub fn visible_text(xml: &str) -> String {
    let re = regex::Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").unwrap();
    re.captures_iter(xml).map(|c| c[1].to_string()).collect()
}

/// Names of the generated outputs in `dir`.
pub fn outputs(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|n| n.starts_with("output_"))
        .collect();
    names.sort();
    names
}
