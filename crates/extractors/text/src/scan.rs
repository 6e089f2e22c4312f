//! Content scanners shared by the text and code extractors.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};

macro_rules! lazy_re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pat).expect("static regex"))
        }
    };
}

lazy_re!(url_re, r#"(?i)\b(?:https?|ftp)://[^\s<>"']+"#);
lazy_re!(email_re, r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b");
lazy_re!(
    ipv4_re,
    r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b"
);
lazy_re!(spdx_re, r"SPDX-License-Identifier:\s*([A-Za-z0-9.+-]+(?:\s+(?:OR|AND|WITH)\s+[A-Za-z0-9.+-]+)*)");

fn secret_set() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            // AWS access key id
            r"\bAKIA[0-9A-Z]{16}\b",
            r"-----BEGIN (?:RSA |EC |DSA |OPENSSH |PGP )?PRIVATE KEY(?: BLOCK)?-----",
            // GitHub tokens
            r"\bgh[pousr]_[A-Za-z0-9]{36,}\b",
            // Slack tokens
            r"\bxox[baprs]-[A-Za-z0-9-]{10,}",
            r"\bsk_live_[0-9a-zA-Z]{24,}",
            r#"(?i)(?:password|passwd|pwd|secret|api[_-]?key|access[_-]?token|auth[_-]?token)\s*[:=]\s*['"]?[^\s'"]{6,}"#,
        ])
        .expect("static regex set")
    })
}

pub fn has_urls(text: &str) -> bool {
    url_re().is_match(text)
}

pub fn has_emails(text: &str) -> bool {
    email_re().is_match(text)
}

pub fn has_ips(text: &str) -> bool {
    ipv4_re().is_match(text)
}

/// Credentials, private keys and well-known token shapes.
pub fn has_secrets(text: &str) -> bool {
    secret_set().is_match(text)
}

/// Short license identifier from an SPDX tag or from the opening text of a
/// well-known license.
pub fn detect_license(text: &str) -> Option<String> {
    if let Some(cap) = spdx_re().captures(text) {
        return Some(cap[1].to_string());
    }
    let head: String = text.chars().take(4096).collect::<String>().to_lowercase();
    let has = |needle: &str| head.contains(needle);

    let name = if has("gnu affero general public license") {
        "AGPL-3.0"
    } else if has("gnu lesser general public license") {
        if has("version 2.1") { "LGPL-2.1" } else { "LGPL-3.0" }
    } else if has("gnu general public license") {
        if has("version 2") { "GPL-2.0" } else { "GPL-3.0" }
    } else if has("apache license") {
        "Apache-2.0"
    } else if has("mozilla public license") {
        "MPL-2.0"
    } else if has("permission is hereby granted, free of charge") || has("mit license") {
        "MIT"
    } else if has("redistribution and use in source and binary forms") {
        if has("neither the name") { "BSD-3-Clause" } else { "BSD-2-Clause" }
    } else if has("isc license") || has("permission to use, copy, modify, and/or distribute") {
        "ISC"
    } else if has("this is free and unencumbered software released into the public domain") {
        "Unlicense"
    } else if has("creative commons") {
        "CC"
    } else {
        return None;
    };
    Some(name.to_string())
}
