//! Local document formats: plain text, HTML, and DOCX.

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::{ElementRef, Html, Node, Selector};

use super::Extracted;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const SKIPPED_HTML_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "svg"];

const BLOCK_HTML_ELEMENTS: [&str; 18] = [
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "section",
    "article", "blockquote", "pre", "header",
];

/// Decodes bytes as UTF-8 (lossy) and drops a leading byte-order mark.
pub fn extract_plain_text(bytes: &[u8]) -> Extracted {
    let text = String::from_utf8_lossy(bytes);
    Extracted::new(text.trim_start_matches('\u{feff}').to_string())
}

/// Extracts readable text and the `<title>` from an HTML page.
///
/// Text comes from `<article>`, else `<main>`, else `<body>`, else the
/// whole document; script and style content is skipped.
pub fn extract_html(html: &str) -> Extracted {
    let doc = Html::parse_document(html);

    let title = select_first(&doc, "title")
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let root = ["article", "main", "body"]
        .iter()
        .find_map(|sel| select_first(&doc, sel))
        .unwrap_or_else(|| doc.root_element());

    let mut extracted = Extracted::new(element_text(root));
    extracted.title = title;
    extracted
}

fn select_first<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next()
}

fn element_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        match node.value() {
            Node::Element(el) if BLOCK_HTML_ELEMENTS.contains(&el.name()) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Node::Text(text) => {
                let skipped = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .map(|e| SKIPPED_HTML_ELEMENTS.contains(&e.name()))
                        .unwrap_or(false)
                });
                if !skipped {
                    out.push_str(text);
                }
            }
            _ => {}
        }
    }
    out
}

/// Extracts paragraph text from `word/document.xml` and the title from
/// `docProps/core.xml` when present.
pub fn extract_docx(bytes: &[u8]) -> Result<Extracted, String> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;

    let doc_xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?
        .ok_or_else(|| "word/document.xml not found".to_string())?;
    let text = extract_w_t_elements(&doc_xml)?;

    let title = match read_zip_entry_bounded(&mut archive, "docProps/core.xml", MAX_XML_ENTRY_BYTES)
    {
        Ok(Some(core_xml)) => extract_core_title(&core_xml),
        _ => None,
    };

    let mut extracted = Extracted::new(text);
    extracted.title = title;
    Ok(extracted)
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Option<Vec<u8>>, String> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| e.to_string())?;
    if out.len() as u64 >= max_bytes {
        return Err(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        ));
    }
    Ok(Some(out))
}

fn extract_w_t_elements(xml: &[u8]) -> Result<String, String> {
    let mut out = String::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_t = true,
            Ok(Event::Text(te)) if in_t => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn extract_core_title(xml: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_title = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"title" => in_title = true,
            Ok(Event::Text(te)) if in_title => {
                let title = te.unescape().ok()?.trim().to_string();
                return (!title.is_empty()).then_some(title);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"title" => in_title = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}
