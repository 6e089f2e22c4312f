//! ZIP-based documents: OOXML (Word, Excel, PowerPoint), OpenDocument and
//! EPUB.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use anyhow::{anyhow, Context};
use calamine::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use casefile_extract_types::ExtractorConfig;

use crate::xml::{markup_text, odf_content, paragraphs, property_map};
use crate::{normalize_date, office_type_for_ext, workbook_text, Parsed};

/// Parts larger than this are not read.
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Word,
    Excel,
    PowerPoint,
    OdfText,
    OdfSpreadsheet,
    OdfPresentation,
    Epub,
}

impl Layout {
    fn office_type(self) -> &'static str {
        match self {
            Layout::Word | Layout::OdfText => "word",
            Layout::Excel | Layout::OdfSpreadsheet => "excel",
            Layout::PowerPoint | Layout::OdfPresentation => "powerpoint",
            Layout::Epub => "ebook",
        }
    }
}

pub(crate) fn read(bytes: &[u8], ext: &str, cfg: &ExtractorConfig, parsed: &mut Parsed) {
    let mut zip = match ZipArchive::new(Cursor::new(bytes)) {
        Ok(z) => z,
        Err(e) => {
            parsed.meta.office_type = office_type_for_ext(ext).map(str::to_string);
            parsed.issues.push(format!("unreadable package: {e}"));
            return;
        }
    };
    let names: Vec<String> = zip.file_names().map(str::to_string).collect();

    let Some(layout) = detect_layout(&mut zip, &names) else {
        parsed.meta.office_type = office_type_for_ext(ext).map(str::to_string);
        parsed.issues.push("ZIP package without office document parts".into());
        return;
    };
    parsed.meta.office_type = Some(layout.office_type().to_string());

    let result = match layout {
        Layout::Word | Layout::Excel | Layout::PowerPoint => read_ooxml(&mut zip, &names, layout, bytes, parsed),
        Layout::OdfText | Layout::OdfSpreadsheet | Layout::OdfPresentation => {
            read_odf(&mut zip, &names, layout, parsed)
        }
        Layout::Epub => read_epub(&mut zip, &names, cfg, parsed),
    };
    if let Err(e) = result {
        parsed.issues.push(format!("{e:#}"));
    }
}

fn detect_layout<R: Read + Seek>(zip: &mut ZipArchive<R>, names: &[String]) -> Option<Layout> {
    let has = |n: &str| names.iter().any(|name| name == n);
    if has("word/document.xml") {
        return Some(Layout::Word);
    }
    if has("xl/workbook.xml") {
        return Some(Layout::Excel);
    }
    if has("ppt/presentation.xml") {
        return Some(Layout::PowerPoint);
    }
    let mimetype = read_part(zip, "mimetype").ok().flatten()?;
    match mimetype.trim() {
        "application/vnd.oasis.opendocument.text" => Some(Layout::OdfText),
        "application/vnd.oasis.opendocument.spreadsheet" => Some(Layout::OdfSpreadsheet),
        "application/vnd.oasis.opendocument.presentation" => Some(Layout::OdfPresentation),
        "application/epub+zip" => Some(Layout::Epub),
        _ => None,
    }
}

/// `Ok(None)` when the part does not exist.
fn read_part<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> anyhow::Result<Option<String>> {
    let entry = match zip.by_name(name) {
        Ok(e) => e,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("opening {name}")),
    };
    let mut xml = String::new();
    entry
        .take(MAX_PART_BYTES)
        .read_to_string(&mut xml)
        .with_context(|| format!("reading {name}"))?;
    Ok(Some(xml))
}

fn prop(props: &HashMap<String, String>, key: &str) -> Option<String> {
    props.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn prop_num<T: std::str::FromStr>(props: &HashMap<String, String>, key: &str) -> Option<T> {
    props.get(key).and_then(|v| v.trim().parse().ok())
}

// ── OOXML ─────────────────────────────────────────────────────────────────────

fn read_ooxml<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    names: &[String],
    layout: Layout,
    bytes: &[u8],
    parsed: &mut Parsed,
) -> anyhow::Result<()> {
    let meta = &mut parsed.meta;
    let has_vba = names.iter().any(|n| n.ends_with("vbaProject.bin"));
    meta.has_macros = Some(has_vba);
    parsed.mime = Some(match (layout, has_vba) {
        (Layout::Word, false) => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        (Layout::Word, true) => "application/vnd.ms-word.document.macroEnabled.12",
        (Layout::Excel, false) => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        (Layout::Excel, true) => "application/vnd.ms-excel.sheet.macroEnabled.12",
        (_, false) => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        (_, true) => "application/vnd.ms-powerpoint.presentation.macroEnabled.12",
    });

    if let Some(xml) = read_part(zip, "docProps/core.xml")? {
        let props = property_map(&xml);
        meta.title = prop(&props, "dc:title");
        meta.subject = prop(&props, "dc:subject");
        meta.keywords = prop(&props, "cp:keywords");
        meta.description = prop(&props, "dc:description");
        meta.language = prop(&props, "dc:language");
        meta.author = prop(&props, "dc:creator");
        meta.last_modified_by = prop(&props, "cp:lastModifiedBy");
        meta.created_at = prop(&props, "dcterms:created").and_then(|d| normalize_date(&d));
        meta.modified_at = prop(&props, "dcterms:modified").and_then(|d| normalize_date(&d));
        meta.printed_at = prop(&props, "cp:lastPrinted").and_then(|d| normalize_date(&d));
        meta.revision_number = prop(&props, "cp:revision");
    }

    if let Some(xml) = read_part(zip, "docProps/app.xml")? {
        let props = property_map(&xml);
        meta.page_count = prop_num(&props, "Pages");
        meta.word_count = prop_num(&props, "Words");
        meta.char_count = prop_num(&props, "Characters");
        meta.slide_count = prop_num(&props, "Slides");
        meta.company = prop(&props, "Company");
        meta.template_name = prop(&props, "Template");
        meta.total_editing_time_sec = prop_num::<u64>(&props, "TotalTime").map(|minutes| minutes * 60);
    }

    match layout {
        Layout::Word => {
            if let Some(xml) = read_part(zip, "word/document.xml")? {
                parsed.text = paragraphs(&xml, b"w:t", b"w:p").join("\n");
            }
        }
        Layout::PowerPoint => {
            let slides = slide_names(names);
            if parsed.meta.slide_count.is_none() {
                parsed.meta.slide_count = Some(slides.len() as u32);
            }
            let mut text = Vec::new();
            for slide in &slides {
                if let Some(xml) = read_part(zip, slide)? {
                    text.extend(paragraphs(&xml, b"a:t", b"a:p"));
                }
            }
            parsed.text = text.join("\n");
        }
        _ => {
            let mut wb = calamine::Xlsx::new(Cursor::new(bytes.to_vec()))
                .map_err(|e| anyhow!("opening workbook: {e}"))?;
            let (sheets, text) = workbook_text(&mut wb);
            parsed.meta.sheet_count = Some(sheets);
            parsed.text = text;
        }
    }
    Ok(())
}

/// `ppt/slides/slideN.xml` in slide order.
fn slide_names(names: &[String]) -> Vec<String> {
    let mut slides: Vec<String> = names
        .iter()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .cloned()
        .collect();
    slides.sort_by_key(|n| {
        n.strip_prefix("ppt/slides/slide")
            .and_then(|s| s.strip_suffix(".xml"))
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0)
    });
    slides
}

// ── OpenDocument ──────────────────────────────────────────────────────────────

fn read_odf<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    names: &[String],
    layout: Layout,
    parsed: &mut Parsed,
) -> anyhow::Result<()> {
    parsed.mime = Some(match layout {
        Layout::OdfText => "application/vnd.oasis.opendocument.text",
        Layout::OdfSpreadsheet => "application/vnd.oasis.opendocument.spreadsheet",
        _ => "application/vnd.oasis.opendocument.presentation",
    });
    let meta = &mut parsed.meta;
    meta.has_macros = Some(names.iter().any(|n| {
        n.starts_with("Basic/") && n.ends_with(".xml") && !n.ends_with("-lb.xml") && !n.ends_with("-lc.xml")
    }));

    if let Some(xml) = read_part(zip, "meta.xml")? {
        let props = property_map(&xml);
        meta.title = prop(&props, "dc:title");
        meta.subject = prop(&props, "dc:subject");
        meta.keywords = prop(&props, "meta:keyword");
        meta.description = prop(&props, "dc:description");
        meta.language = prop(&props, "dc:language");
        meta.author = prop(&props, "meta:initial-creator");
        // In OpenDocument dc:creator is whoever saved last.
        meta.last_modified_by = prop(&props, "dc:creator");
        meta.created_at = prop(&props, "meta:creation-date").and_then(|d| normalize_date(&d));
        meta.modified_at = prop(&props, "dc:date").and_then(|d| normalize_date(&d));
        meta.printed_at = prop(&props, "meta:print-date").and_then(|d| normalize_date(&d));
        meta.revision_number = prop(&props, "meta:editing-cycles");
        meta.template_name = prop(&props, "meta:template@xlink:title");
        meta.total_editing_time_sec = prop(&props, "meta:editing-duration").and_then(|d| iso_duration_secs(&d));
        meta.page_count = prop_num(&props, "meta:document-statistic@meta:page-count");
        meta.word_count = prop_num(&props, "meta:document-statistic@meta:word-count");
        meta.char_count = prop_num(&props, "meta:document-statistic@meta:character-count");
    }

    if let Some(xml) = read_part(zip, "content.xml")? {
        let content = odf_content(&xml);
        match layout {
            Layout::OdfSpreadsheet => parsed.meta.sheet_count = Some(content.tables),
            Layout::OdfPresentation => parsed.meta.slide_count = Some(content.draw_pages),
            _ => {}
        }
        parsed.text = content.paragraphs.join("\n");
    }
    Ok(())
}

/// `PnDTnHnMnS` → seconds.  Fractions of a second are dropped.
fn iso_duration_secs(raw: &str) -> Option<u64> {
    let rest = raw.trim().strip_prefix('P')?;
    let mut total = 0u64;
    let mut num = String::new();
    for c in rest.chars() {
        match c {
            '0'..='9' => num.push(c),
            '.' | ',' => num.push('.'),
            'T' => {}
            'D' | 'H' | 'M' | 'S' => {
                let n = num.split('.').next()?.parse::<u64>().ok()?;
                total += n * match c {
                    'D' => 86_400,
                    'H' => 3_600,
                    'M' => 60,
                    _ => 1,
                };
                num.clear();
            }
            _ => return None,
        }
    }
    Some(total)
}

// ── EPUB ──────────────────────────────────────────────────────────────────────

fn read_epub<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    names: &[String],
    cfg: &ExtractorConfig,
    parsed: &mut Parsed,
) -> anyhow::Result<()> {
    parsed.mime = Some("application/epub+zip");

    let rootfile = read_part(zip, "META-INF/container.xml")?
        .and_then(|xml| property_map(&xml).remove("rootfile@full-path"))
        .or_else(|| names.iter().find(|n| n.ends_with(".opf")).cloned());
    match rootfile {
        Some(opf) => {
            if let Some(xml) = read_part(zip, &opf)? {
                let props = property_map(&xml);
                let meta = &mut parsed.meta;
                meta.title = prop(&props, "dc:title");
                meta.author = prop(&props, "dc:creator");
                meta.subject = prop(&props, "dc:subject");
                meta.description = prop(&props, "dc:description");
                meta.language = prop(&props, "dc:language");
                meta.created_at = prop(&props, "dc:date").and_then(|d| normalize_date(&d));
            }
        }
        None => parsed.issues.push("EPUB without a package document".into()),
    }

    let mut chapters: Vec<&String> = names
        .iter()
        .filter(|n| n.ends_with(".xhtml") || n.ends_with(".html") || n.ends_with(".htm"))
        .collect();
    chapters.sort();
    let budget = usize::try_from(cfg.max_text_bytes).unwrap_or(usize::MAX);
    let mut text = String::new();
    for chapter in chapters {
        if text.len() >= budget {
            break;
        }
        if let Some(xml) = read_part(zip, chapter)? {
            let body = markup_text(&xml);
            if !body.is_empty() {
                text.push_str(&body);
                text.push('\n');
            }
        }
    }
    parsed.text = text;
    Ok(())
}
