use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use casefile_extract_types::records::CodeMeta;
use casefile_extract_types::{lower_ext, Excerpts, ExtractOutcome, ExtractorConfig, FamilyMeta, TypeRecord};

use crate::decode::read_text;
use crate::{file_name_lower, read_issues, round2, scan};

// ── Language table ────────────────────────────────────────────────────────────

/// Comment syntax and structure patterns for one language.
struct Grammar {
    name: &'static str,
    mime: &'static str,
    line_comments: &'static [&'static str],
    block_comment: Option<(&'static str, &'static str)>,
    functions: Option<&'static str>,
    classes: Option<&'static str>,
    imports: Option<&'static str>,
    entrypoint: Option<&'static str>,
}

const C_FUNCTION: &str = r"(?m)^[\t ]*(?:[\w:<>\*&\[\],]+[\t ]+)+\**(\w+)[\t ]*\([^;{}]*\)[\t ]*(?:const[\t ]*)?\{";

const GRAMMARS: &[Grammar] = &[
    Grammar {
        name: "Python",
        mime: "text/x-python",
        line_comments: &["#"],
        block_comment: Some((r#"""""#, r#"""""#)),
        functions: Some(r"(?m)^\s*(?:async\s+)?def\s+\w+"),
        classes: Some(r"(?m)^\s*class\s+\w+"),
        imports: Some(r"(?m)^\s*(?:import\s+[\w.]+|from\s+[\w.]+\s+import\b)"),
        entrypoint: Some(r#"(?m)^if\s+__name__\s*==\s*['"]__main__['"]"#),
    },
    Grammar {
        name: "JavaScript",
        mime: "application/javascript",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(r"\bfunction\b\s*\*?\s*\w*\s*\(|\b\w+\s*=\s*(?:async\s*)?(?:\([^)]*\)|\w+)\s*=>"),
        classes: Some(r"\bclass\s+\w+"),
        imports: Some(r#"(?m)^\s*import\b|\brequire\(\s*['"]"#),
        entrypoint: Some(r"require\.main\s*===\s*module"),
    },
    Grammar {
        name: "TypeScript",
        mime: "application/typescript",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(r"\bfunction\b\s*\*?\s*\w*\s*\(|\b\w+\s*=\s*(?:async\s*)?\([^)]*\)\s*(?::\s*[\w<>\[\]]+\s*)?=>"),
        classes: Some(r"\b(?:class|interface)\s+\w+"),
        imports: Some(r"(?m)^\s*import\b"),
        entrypoint: None,
    },
    Grammar {
        name: "Rust",
        mime: "text/x-rust",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(r"\bfn\s+\w+"),
        classes: Some(r"\b(?:struct|enum|trait)\s+\w+"),
        imports: Some(r"(?m)^\s*(?:pub\s+)?use\s+"),
        entrypoint: Some(r"\bfn\s+main\s*\("),
    },
    Grammar {
        name: "Go",
        mime: "text/x-go",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(r"(?m)^func\s+"),
        classes: Some(r"\btype\s+\w+\s+(?:struct|interface)\b"),
        imports: Some(r#"(?m)^\s*import\b|^\s+"[\w./-]+"\s*$"#),
        entrypoint: Some(r"\bfunc\s+main\s*\("),
    },
    Grammar {
        name: "Java",
        mime: "text/x-java",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(C_FUNCTION),
        classes: Some(r"\b(?:class|interface|enum)\s+\w+"),
        imports: Some(r"(?m)^\s*import\s+"),
        entrypoint: Some(r"\bstatic\s+void\s+main\s*\("),
    },
    Grammar {
        name: "C#",
        mime: "text/x-csharp",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(C_FUNCTION),
        classes: Some(r"\b(?:class|interface|struct|enum)\s+\w+"),
        imports: Some(r"(?m)^\s*using\s+[\w.]+\s*;"),
        entrypoint: Some(r"\bstatic\s+(?:async\s+)?\w+\s+Main\s*\("),
    },
    Grammar {
        name: "C",
        mime: "text/x-c",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(C_FUNCTION),
        classes: Some(r"\bstruct\s+\w+\s*\{"),
        imports: Some(r"(?m)^\s*#\s*include\b"),
        entrypoint: Some(r"\bint\s+main\s*\("),
    },
    Grammar {
        name: "C++",
        mime: "text/x-c++",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(C_FUNCTION),
        classes: Some(r"\b(?:class|struct)\s+\w+\s*(?::[^{;]*)?\{"),
        imports: Some(r"(?m)^\s*#\s*include\b"),
        entrypoint: Some(r"\bint\s+main\s*\("),
    },
    Grammar {
        name: "PHP",
        mime: "application/x-httpd-php",
        line_comments: &["//", "#"],
        block_comment: Some(("/*", "*/")),
        functions: Some(r"\bfunction\s+\w+\s*\("),
        classes: Some(r"\b(?:class|interface|trait)\s+\w+"),
        imports: Some(r"(?m)^\s*(?:use\s+[\w\\]+|(?:require|include)(?:_once)?\b)"),
        entrypoint: None,
    },
    Grammar {
        name: "Ruby",
        mime: "text/x-ruby",
        line_comments: &["#"],
        block_comment: Some(("=begin", "=end")),
        functions: Some(r"(?m)^\s*def\s+"),
        classes: Some(r"(?m)^\s*(?:class|module)\s+\w+"),
        imports: Some(r"(?m)^\s*require(?:_relative)?\b"),
        entrypoint: Some(r"if\s+__FILE__\s*==\s*\$0"),
    },
    Grammar {
        name: "Shell",
        mime: "application/x-sh",
        line_comments: &["#"],
        block_comment: None,
        functions: Some(r"(?m)^\s*(?:function\s+\w+|\w+\s*\(\)\s*\{)"),
        classes: None,
        imports: Some(r"(?m)^\s*(?:source|\.)\s+\S+"),
        entrypoint: None,
    },
    Grammar {
        name: "Batch",
        mime: "application/x-bat",
        line_comments: &["::", "rem ", "REM ", "@rem ", "@REM "],
        block_comment: None,
        functions: Some(r"(?m)^:\w+"),
        classes: None,
        imports: Some(r"(?im)^\s*call\s+\S+"),
        entrypoint: None,
    },
    Grammar {
        name: "Perl",
        mime: "text/x-perl",
        line_comments: &["#"],
        block_comment: Some(("=pod", "=cut")),
        functions: Some(r"(?m)^\s*sub\s+\w+"),
        classes: Some(r"(?m)^\s*package\s+[\w:]+"),
        imports: Some(r"(?m)^\s*(?:use|require)\s+[\w:]+"),
        entrypoint: None,
    },
    Grammar {
        name: "Lua",
        mime: "text/x-lua",
        line_comments: &["--"],
        block_comment: Some(("--[[", "]]")),
        functions: Some(r"\bfunction\s+[\w.:]+\s*\("),
        classes: None,
        imports: Some(r"\brequire\s*\(?\s*['\x22]"),
        entrypoint: None,
    },
    Grammar {
        name: "SQL",
        mime: "application/sql",
        line_comments: &["--"],
        block_comment: Some(("/*", "*/")),
        functions: Some(r"(?i)\bcreate\s+(?:or\s+replace\s+)?(?:function|procedure)\b"),
        classes: Some(r"(?i)\bcreate\s+table\b"),
        imports: None,
        entrypoint: None,
    },
    Grammar {
        name: "HTML",
        mime: "text/html",
        line_comments: &[],
        block_comment: Some(("<!--", "-->")),
        functions: None,
        classes: None,
        imports: Some(r#"(?i)<script[^>]+src=|<link[^>]+rel=["']?stylesheet"#),
        entrypoint: None,
    },
    Grammar {
        name: "CSS",
        mime: "text/css",
        line_comments: &[],
        block_comment: Some(("/*", "*/")),
        functions: None,
        classes: None,
        imports: Some(r"(?m)^\s*@import\b"),
        entrypoint: None,
    },
    Grammar {
        name: "SCSS",
        mime: "text/x-scss",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(r"(?m)^\s*@(?:mixin|function)\s+[\w-]+"),
        classes: None,
        imports: Some(r"(?m)^\s*@(?:import|use|forward)\b"),
        entrypoint: None,
    },
    Grammar {
        name: "Makefile",
        mime: "text/x-makefile",
        line_comments: &["#"],
        block_comment: None,
        functions: Some(r"(?m)^[\w./%-]+\s*:(?:[^=]|$)"),
        classes: None,
        imports: Some(r"(?m)^-?include\s+"),
        entrypoint: None,
    },
    Grammar {
        name: "Dockerfile",
        mime: "text/x-dockerfile",
        line_comments: &["#"],
        block_comment: None,
        functions: None,
        classes: None,
        imports: Some(r"(?im)^\s*FROM\s+\S+"),
        entrypoint: Some(r"(?im)^\s*(?:ENTRYPOINT|CMD)\b"),
    },
    Grammar {
        name: "Groovy",
        mime: "text/x-groovy",
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        functions: Some(r"\bdef\s+\w+\s*\("),
        classes: Some(r"\bclass\s+\w+"),
        imports: Some(r"(?m)^\s*import\s+"),
        entrypoint: None,
    },
    Grammar {
        name: "Requirements",
        mime: "text/plain",
        line_comments: &["#"],
        block_comment: None,
        functions: None,
        classes: None,
        imports: Some(r"(?m)^\s*[A-Za-z0-9][\w.-]*"),
        entrypoint: None,
    },
];

/// Grammar for a file, by literal name first, then extension, then shebang.
fn grammar_for(name: &str, ext: &str, text: &str) -> Option<&'static Grammar> {
    let lang = match name {
        "makefile" | "gnumakefile" => Some("Makefile"),
        "dockerfile" => Some("Dockerfile"),
        "jenkinsfile" => Some("Groovy"),
        "gemfile" | "vagrantfile" | "rakefile" => Some("Ruby"),
        "requirements.txt" | "pipfile" => Some("Requirements"),
        _ => None,
    }
    .or(match ext {
        "py" | "pyi" | "pyx" | "pyw" => Some("Python"),
        "js" | "mjs" | "cjs" | "jsx" => Some("JavaScript"),
        "ts" | "tsx" => Some("TypeScript"),
        "rs" => Some("Rust"),
        "go" => Some("Go"),
        "java" => Some("Java"),
        "cs" => Some("C#"),
        "c" | "h" => Some("C"),
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => Some("C++"),
        "php" => Some("PHP"),
        "rb" => Some("Ruby"),
        "sh" | "bash" | "zsh" => Some("Shell"),
        "bat" | "cmd" => Some("Batch"),
        "pl" | "pm" => Some("Perl"),
        "lua" => Some("Lua"),
        "sql" => Some("SQL"),
        "html" | "htm" => Some("HTML"),
        "css" => Some("CSS"),
        "scss" => Some("SCSS"),
        "groovy" | "gradle" => Some("Groovy"),
        _ => None,
    })
    .or_else(|| shebang_language(text))?;
    GRAMMARS.iter().find(|g| g.name == lang)
}

fn shebang_language(text: &str) -> Option<&'static str> {
    let first = text.lines().next()?.strip_prefix("#!")?;
    if first.contains("python") {
        Some("Python")
    } else if first.contains("node") {
        Some("JavaScript")
    } else if first.contains("perl") {
        Some("Perl")
    } else if first.contains("ruby") {
        Some("Ruby")
    } else if first.contains("sh") {
        Some("Shell")
    } else {
        None
    }
}

/// Compiled structure patterns, one entry per grammar, built once.
struct Compiled {
    functions: Option<Regex>,
    classes: Option<Regex>,
    imports: Option<Regex>,
    entrypoint: Option<Regex>,
}

fn compiled(lang: &str) -> Option<&'static Compiled> {
    static TABLE: OnceLock<HashMap<&'static str, Compiled>> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let build = |p: Option<&str>| p.map(|p| Regex::new(p).expect("static regex"));
        GRAMMARS
            .iter()
            .map(|g| {
                (
                    g.name,
                    Compiled {
                        functions: build(g.functions),
                        classes: build(g.classes),
                        imports: build(g.imports),
                        entrypoint: build(g.entrypoint),
                    },
                )
            })
            .collect()
    });
    table.get(lang)
}

fn todo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:TODO|FIXME|XXX)\b").expect("static regex"))
}

fn test_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)#\[test\]|#\[cfg\(test\)\]|@Test\b|^\s*def\s+test_\w+|^\s*class\s+Test\w*|\bfunc\s+Test\w+\(|\bimport\s+(?:unittest|pytest)\b|\b(?:describe|it|test)\(\s*['"`]"#,
        )
        .expect("static regex")
    })
}

/// Keywords the generic C-family function pattern must not count.
const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "return", "else", "do", "sizeof"];

// ── Extraction ────────────────────────────────────────────────────────────────

/// Line classification, structure counts and style for one source file.
pub fn extract_code(path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
    let decoded = match read_text(path, cfg.max_text_bytes) {
        Ok(d) => d,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    let issues = read_issues(&decoded, cfg);
    let text = decoded.text.as_str();
    let name = file_name_lower(path);
    let grammar = grammar_for(&name, &lower_ext(path), text);
    if grammar.is_none() {
        debug!("no grammar for {name}; counting lines only");
    }

    let lines = count_lines(text, grammar);
    let (indent_style, indent_size) = indentation(text);
    let mut meta = CodeMeta {
        language: Some(grammar.map_or("Unknown", |g| g.name).to_string()),
        encoding: Some(decoded.encoding.to_string()),
        lines_total: Some(lines.total),
        lines_code: Some(lines.code),
        lines_comment: Some(lines.comment),
        lines_empty: Some(lines.empty),
        comment_ratio: (lines.code + lines.comment > 0)
            .then(|| round2(lines.comment as f64 / (lines.code + lines.comment) as f64)),
        todo_count: Some(todo_re().find_iter(text).count() as u64),
        has_tests: Some(is_test_file(&name) || test_marker_re().is_match(text)),
        license_name: scan::detect_license(text),
        indent_style,
        indent_size,
        has_secrets: Some(scan::has_secrets(text)),
        ..Default::default()
    };

    if let Some(c) = grammar.and_then(|g| compiled(g.name)) {
        let count = |re: &Option<Regex>| re.as_ref().map(|re| re.find_iter(text).count() as u64);
        meta.function_count = match &c.functions {
            Some(re) if grammar.and_then(|g| g.functions) == Some(C_FUNCTION) => Some(
                re.captures_iter(text)
                    .filter(|cap| !CONTROL_KEYWORDS.contains(&&cap[1]))
                    .count() as u64,
            ),
            _ => count(&c.functions),
        };
        meta.class_count = count(&c.classes);
        meta.import_count = count(&c.imports);
        meta.has_main_entrypoint = Some(c.entrypoint.as_ref().is_some_and(|re| re.is_match(text)));
    }

    let mime = grammar.map_or("text/plain", |g| g.mime);
    let record = TypeRecord::new(FamilyMeta::Code(meta))
        .with_mime(mime)
        .with_excerpts(Excerpts::from_text(text));
    ExtractOutcome::from_issues(record, issues)
}

#[derive(Debug, Default, PartialEq)]
struct LineCounts {
    total: u64,
    code: u64,
    comment: u64,
    empty: u64,
}

/// A line is a comment when it starts with a line-comment marker or lies
/// inside a block comment; lines mixing code and a trailing comment count
/// as code.
fn count_lines(text: &str, grammar: Option<&Grammar>) -> LineCounts {
    let mut counts = LineCounts::default();
    let mut in_block: Option<&str> = None;

    for line in text.lines() {
        counts.total += 1;
        let stripped = line.trim();
        if stripped.is_empty() {
            counts.empty += 1;
            continue;
        }
        let Some(g) = grammar else {
            counts.code += 1;
            continue;
        };

        if let Some(end) = in_block {
            counts.comment += 1;
            if stripped.contains(end) {
                in_block = None;
            }
            continue;
        }
        if let Some((start, end)) = g.block_comment {
            if let Some(rest) = stripped.strip_prefix(start) {
                counts.comment += 1;
                if !rest.contains(end) {
                    in_block = Some(end);
                }
                continue;
            }
        }
        if g.line_comments.iter().any(|m| stripped.starts_with(m)) {
            counts.comment += 1;
        } else {
            counts.code += 1;
        }
    }
    counts
}

/// Dominant indentation: "tabs" or "spaces", and for spaces the most
/// common step between successive indent levels.
fn indentation(text: &str) -> (Option<String>, Option<u32>) {
    let mut tabs = 0u32;
    let mut spaces = 0u32;
    let mut steps: HashMap<u32, u32> = HashMap::new();
    let mut prev = 0u32;

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        if line.starts_with('\t') {
            tabs += 1;
            continue;
        }
        let width = line.chars().take_while(|c| *c == ' ').count() as u32;
        if width > 0 {
            spaces += 1;
        }
        if width > prev {
            *steps.entry(width - prev).or_default() += 1;
        }
        prev = width;
    }

    if tabs == 0 && spaces == 0 {
        return (None, None);
    }
    if tabs > spaces {
        return (Some("tabs".into()), None);
    }
    let size = steps
        .into_iter()
        .max_by_key(|(step, n)| (*n, std::cmp::Reverse(*step)))
        .map(|(step, _)| step);
    (Some("spaces".into()), size)
}

fn is_test_file(name: &str) -> bool {
    name.starts_with("test_")
        || name.contains("_test.")
        || name.contains(".test.")
        || name.contains(".spec.")
        || name.ends_with("tests.py")
}
