//! Event-loop readers over the XML parts of office packages.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};

/// Text content and attributes of a flat property part, keyed by qualified
/// element name (`dc:title`, `Pages`, ...).  Attributes are keyed as
/// `element@attribute`.  Repeated elements are joined with ", ".
pub(crate) fn property_map(xml: &str) -> HashMap<String, String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut props: HashMap<String, String> = HashMap::new();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = qualified(&e);
                collect_attributes(&e, &name, &mut props);
                current = Some(name);
            }
            Ok(Event::Empty(e)) => {
                let name = qualified(&e);
                collect_attributes(&e, &name, &mut props);
            }
            Ok(Event::Text(e)) => {
                if let Some(field) = &current {
                    if let Ok(text) = e.unescape() {
                        let text = text.trim();
                        if !text.is_empty() {
                            props
                                .entry(field.clone())
                                .and_modify(|v| {
                                    v.push_str(", ");
                                    v.push_str(text);
                                })
                                .or_insert_with(|| text.to_string());
                        }
                    }
                }
            }
            Ok(Event::End(_)) => {
                current = None;
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    props
}

fn qualified(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn collect_attributes(e: &BytesStart<'_>, element: &str, props: &mut HashMap<String, String>) {
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if key.starts_with("xmlns") {
            continue;
        }
        if let Ok(value) = attr.unescape_value() {
            props.insert(format!("{element}@{key}"), value.into_owned());
        }
    }
}

/// Non-empty paragraphs: text inside `text_tag` elements, split at the end
/// of each `para_tag` element.  `w:t`/`w:p` for Word, `a:t`/`a:p` for
/// PowerPoint slides.
pub(crate) fn paragraphs(xml: &str, text_tag: &[u8], para_tag: &[u8]) -> Vec<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current_para = String::new();
    let mut in_t = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if name.as_ref() == text_tag {
                    in_t = true;
                } else if name.as_ref() == para_tag {
                    current_para.clear();
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if name.as_ref() == text_tag {
                    in_t = false;
                } else if name.as_ref() == para_tag {
                    let text = current_para.trim().to_string();
                    if !text.is_empty() {
                        paragraphs.push(text);
                    }
                    current_para.clear();
                }
            }
            Ok(Event::Text(e)) => {
                if in_t {
                    if let Ok(text) = e.unescape() {
                        current_para.push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    paragraphs
}

/// What an OpenDocument `content.xml` holds: its paragraphs and headings,
/// plus the number of `draw:page` (slides) and `table:table` (sheets)
/// elements.
#[derive(Debug, Default)]
pub(crate) struct OdfContent {
    pub paragraphs: Vec<String>,
    pub draw_pages: u32,
    pub tables: u32,
}

pub(crate) fn odf_content(xml: &str) -> OdfContent {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut out = OdfContent::default();
    let mut depth_in_para = 0usize;
    let mut current_para = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"text:p" | b"text:h" => depth_in_para += 1,
                b"draw:page" => out.draw_pages += 1,
                b"table:table" => out.tables += 1,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"text:s" if depth_in_para > 0 => current_para.push(' '),
                b"text:tab" if depth_in_para > 0 => current_para.push('\t'),
                b"draw:page" => out.draw_pages += 1,
                _ => {}
            },
            Ok(Event::End(e)) => {
                if matches!(e.name().as_ref(), b"text:p" | b"text:h") {
                    depth_in_para = depth_in_para.saturating_sub(1);
                    if depth_in_para == 0 {
                        let text = current_para.trim().to_string();
                        if !text.is_empty() {
                            out.paragraphs.push(text);
                        }
                        current_para.clear();
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if depth_in_para > 0 {
                    if let Ok(text) = e.unescape() {
                        current_para.push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

/// All character data of an (X)HTML document body, one line per block.
pub(crate) fn markup_text(xml: &str) -> String {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().check_end_names = false;
    let mut out = String::new();
    let mut skip = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if matches!(e.local_name().as_ref(), b"head" | b"script" | b"style") {
                    skip += 1;
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"head" | b"script" | b"style" => skip = skip.saturating_sub(1),
                b"p" | b"div" | b"li" | b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6" | b"tr" => {
                    if !out.ends_with('\n') && !out.is_empty() {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if skip == 0 => {
                if let Ok(text) = e.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        if !out.is_empty() && !out.ends_with('\n') {
                            out.push(' ');
                        }
                        out.push_str(text);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out.trim_end().to_string()
}
