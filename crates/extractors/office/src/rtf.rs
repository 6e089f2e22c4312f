//! Rich Text Format: the `{\info ...}` group and a plain-text rendering of
//! the body.

use std::sync::OnceLock;

use regex::Regex;

use crate::Parsed;

fn info_string_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\\(title|subject|author|operator|keywords|doccomm|company)\s*([^{}]*)\}")
            .expect("static regex")
    })
}

fn info_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\\(nofpages|nofwords|nofchars|edmins|version)(\d+)")
            .expect("static regex")
    })
}

fn info_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\\(creatim|revtim|printim)((?:\\[a-z]+\d+\s*)+)\}")
            .expect("static regex")
    })
}

pub(crate) fn read(bytes: &[u8], parsed: &mut Parsed) {
    parsed.meta.office_type = Some("rtf".into());
    parsed.mime = Some("application/rtf");
    // RTF is 7-bit; anything above is a code-page byte.
    let src: String = bytes.iter().map(|&b| char::from(b)).collect();

    if let Some(info) = info_group(&src) {
        apply_info(info, parsed);
    }
    parsed.meta.has_macros = Some(false);
    parsed.text = plain_text(&src);
    if parsed.text.is_empty() && !src.trim_end().ends_with('}') {
        parsed.issues.push("truncated RTF document".into());
    }
}

/// The balanced `{\info ...}` group, braces included.
fn info_group(src: &str) -> Option<&str> {
    let start = src.find("{\\info")?;
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in src[start..].char_indices() {
        match c {
            '\\' if !escaped => {
                escaped = true;
                continue;
            }
            '{' if !escaped => depth += 1,
            '}' if !escaped => {
                depth -= 1;
                if depth == 0 {
                    return Some(&src[start..start + i + 1]);
                }
            }
            _ => {}
        }
        escaped = false;
    }
    None
}

fn apply_info(info: &str, parsed: &mut Parsed) {
    let meta = &mut parsed.meta;
    for cap in info_string_re().captures_iter(info) {
        let value = plain_text(&cap[2]);
        if value.is_empty() {
            continue;
        }
        match &cap[1] {
            "title" => meta.title = Some(value),
            "subject" => meta.subject = Some(value),
            "author" => meta.author = Some(value),
            "operator" => meta.last_modified_by = Some(value),
            "keywords" => meta.keywords = Some(value),
            "doccomm" => meta.description = Some(value),
            "company" => meta.company = Some(value),
            _ => {}
        }
    }
    for cap in info_number_re().captures_iter(info) {
        let Ok(n) = cap[2].parse::<u64>() else { continue };
        match &cap[1] {
            "nofpages" => meta.page_count = u32::try_from(n).ok(),
            "nofwords" => meta.word_count = Some(n),
            "nofchars" => meta.char_count = Some(n),
            "edmins" => meta.total_editing_time_sec = Some(n * 60),
            "version" => meta.revision_number = Some(n.to_string()),
            _ => {}
        }
    }
    for cap in info_time_re().captures_iter(info) {
        let when = rtf_time(&cap[2]);
        match &cap[1] {
            "creatim" => meta.created_at = when,
            "revtim" => meta.modified_at = when,
            "printim" => meta.printed_at = when,
            _ => {}
        }
    }
}

/// `\yr2024\mo1\dy15\hr10\min30` → `2024-01-15T10:30:00`.
fn rtf_time(words: &str) -> Option<String> {
    let mut parts = [0u32; 6];
    for word in words.split('\\').filter(|w| !w.is_empty()) {
        let word = word.trim();
        let split = word.find(|c: char| c.is_ascii_digit())?;
        let value: u32 = word[split..].parse().ok()?;
        let slot = match &word[..split] {
            "yr" => 0,
            "mo" => 1,
            "dy" => 2,
            "hr" => 3,
            "min" => 4,
            "sec" => 5,
            _ => continue,
        };
        parts[slot] = value;
    }
    let [yr, mo, dy, hr, min, sec] = parts;
    if yr == 0 || mo == 0 || dy == 0 {
        return None;
    }
    Some(format!("{yr:04}-{mo:02}-{dy:02}T{hr:02}:{min:02}:{sec:02}"))
}

/// Groups that never hold body text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl", "colortbl", "stylesheet", "info", "pict", "header", "footer", "headerl", "headerr",
    "footerl", "footerr", "object", "listtable", "listoverridetable", "rsidtbl", "generator",
    "themedata", "datastore", "latentstyles",
];

/// Body text with control words removed; `\par` and `\line` become newlines.
pub(crate) fn plain_text(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::new();
    let mut stack: Vec<bool> = Vec::new();
    let mut skip = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' => {
                stack.push(skip);
                i += 1;
                if chars.get(i) == Some(&'\\') && chars.get(i + 1) == Some(&'*') {
                    skip = true;
                }
            }
            '}' => {
                skip = stack.pop().unwrap_or(false);
                i += 1;
            }
            '\\' => {
                i += 1;
                match chars.get(i).copied() {
                    Some('\'') => {
                        let hex: String = chars.iter().skip(i + 1).take(2).collect();
                        if let (false, Ok(b)) = (skip, u8::from_str_radix(&hex, 16)) {
                            out.push(char::from(b));
                        }
                        i += 3;
                    }
                    Some(c) if c.is_ascii_alphabetic() => {
                        let start = i;
                        while i < chars.len() && chars[i].is_ascii_alphabetic() {
                            i += 1;
                        }
                        let word: String = chars[start..i].iter().collect();
                        let num_start = i;
                        if chars.get(i) == Some(&'-') {
                            i += 1;
                        }
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                        let param: Option<i32> = chars[num_start..i].iter().collect::<String>().parse().ok();
                        if chars.get(i) == Some(&' ') {
                            i += 1;
                        }
                        match word.as_str() {
                            "par" | "line" | "sect" | "page" if !skip => out.push('\n'),
                            "tab" | "cell" if !skip => out.push('\t'),
                            "row" if !skip => out.push('\n'),
                            "u" => {
                                if let (false, Some(code)) = (skip, param) {
                                    let code = if code < 0 { code + 65_536 } else { code };
                                    if let Some(ch) = u32::try_from(code).ok().and_then(char::from_u32) {
                                        out.push(ch);
                                    }
                                }
                                // One fallback character follows a \u escape.
                                if matches!(chars.get(i), Some(c) if !matches!(c, '\\' | '{' | '}')) {
                                    i += 1;
                                }
                            }
                            w if SKIPPED_DESTINATIONS.contains(&w) => skip = true,
                            _ => {}
                        }
                    }
                    Some(c) => {
                        if !skip {
                            match c {
                                '\\' | '{' | '}' => out.push(c),
                                '~' => out.push(' '),
                                _ => {}
                            }
                        }
                        i += 1;
                    }
                    None => {}
                }
            }
            '\r' | '\n' => i += 1,
            c => {
                if !skip {
                    out.push(c);
                }
                i += 1;
            }
        }
    }

    let lines: Vec<&str> = out.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines.join("\n")
}
