//! Plain text and source code.
//!
//! Both families read the file through the same bounded, encoding-aware
//! decoder and share the URL/e-mail/secret/license scanners; they differ in
//! what they measure.

mod code;
mod decode;
mod scan;
mod text;

use std::path::Path;

use casefile_extract_types::{lower_ext, ExtractOutcome, Extractor, ExtractorConfig, Family};

pub use code::extract_code;
pub use decode::{decode, read_text, Decoded};
pub use scan::{detect_license, has_emails, has_ips, has_secrets, has_urls};
pub use text::extract_text;

pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn family(&self) -> Family {
        Family::Text
    }

    fn accepts(&self, path: &Path) -> bool {
        is_text_ext(&lower_ext(path))
            || matches!(
                file_name_lower(path).as_str(),
                "license" | "licence" | "copying" | "readme" | "notice" | "authors" | "changelog"
            )
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        extract_text(path, cfg)
    }
}

pub struct CodeExtractor;

impl Extractor for CodeExtractor {
    fn family(&self) -> Family {
        Family::Code
    }

    fn accepts(&self, path: &Path) -> bool {
        is_code_ext(&lower_ext(path))
            || matches!(
                file_name_lower(path).as_str(),
                "makefile" | "dockerfile" | "jenkinsfile" | "gemfile" | "vagrantfile" | "pipfile"
            )
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        extract_code(path, cfg)
    }
}

pub fn is_text_ext(ext: &str) -> bool {
    matches!(
        ext,
        "txt" | "md" | "markdown" | "rst" | "json" | "xml" | "yaml" | "yml" | "toml"
            | "ini" | "cfg" | "conf" | "log" | "sample" | "man" | "7" | "apache" | "bsd" | "typed"
    )
}

pub fn is_code_ext(ext: &str) -> bool {
    matches!(
        ext,
        "py" | "pyi" | "pyx" | "js" | "mjs" | "ts" | "html" | "htm" | "css" | "scss"
            | "java" | "c" | "h" | "cpp" | "hpp" | "cs" | "php" | "rb" | "go" | "rs"
            | "sh" | "bash" | "bat" | "pl" | "pm" | "lua" | "sql"
    )
}

pub(crate) fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Degradations common to both families.
pub(crate) fn read_issues(decoded: &Decoded, cfg: &ExtractorConfig) -> Vec<String> {
    let mut issues = Vec::new();
    if decoded.truncated {
        issues.push(format!("only the first {} bytes were read", cfg.max_text_bytes));
    }
    if decoded.looks_binary {
        issues.push("content looks binary".to_string());
    }
    issues
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
