//! Routing from a file's resolved type to the extractor for its family.
//!
//! A [`Router`] is built once at startup and is read-only afterwards.
//! [`Router::resolve`] decides in a fixed order:
//!
//!   literal file name → ignore list → true extension → declared extension
//!
//! and [`run_extractor`] runs the chosen extractor so that a panicking
//! parser is reported as a failed file instead of ending the run.

pub mod table;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use casefile_extract_types::{ExtractOutcome, Extractor, ExtractorConfig, Family};
use tracing::{debug, warn};

pub use casefile_extract_pdf::TEXT_EXTRACTION_AVAILABLE as PDF_TEXT_AVAILABLE;

/// Key of the routing table.  Literal names are whole lowercase file names
/// (`license`, `makefile`); extensions carry one leading dot (`.pdf`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutingKey {
    Extension(String),
    LiteralName(String),
}

impl RoutingKey {
    /// `"PDF"`, `".pdf"` and `"..pdf"` all become `.pdf`.
    pub fn extension(raw: &str) -> Self {
        RoutingKey::Extension(normalize_extension(raw))
    }

    pub fn literal(name: &str) -> Self {
        RoutingKey::LiteralName(name.to_lowercase())
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingKey::Extension(e) if e.is_empty() => f.write_str("(no extension)"),
            RoutingKey::Extension(e) => f.write_str(e),
            RoutingKey::LiteralName(n) => write!(f, "name:{n}"),
        }
    }
}

fn normalize_extension(raw: &str) -> String {
    let token = raw.trim().trim_start_matches('.').to_lowercase();
    if token.is_empty() {
        String::new()
    } else {
        format!(".{token}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Ignored,
    NoExtension,
    NoCollector,
}

impl SkipReason {
    /// Wording used in the run log: `SKIPPED (<this>)`.
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Ignored => "Ignored System File",
            SkipReason::NoExtension => "No Extension",
            SkipReason::NoCollector => "No Collector",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub enum Route {
    Dispatch(Arc<dyn Extractor>, RoutingKey),
    Skip(SkipReason),
}

impl Route {
    pub fn family(&self) -> Option<Family> {
        match self {
            Route::Dispatch(ex, _) => Some(ex.family()),
            Route::Skip(_) => None,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Dispatch(ex, key) => f.debug_tuple("Dispatch").field(&ex.family()).field(key).finish(),
            Route::Skip(reason) => f.debug_tuple("Skip").field(reason).finish(),
        }
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RouterBuilder {
    table: HashMap<RoutingKey, Arc<dyn Extractor>>,
    ignored: HashSet<String>,
    generic_executable: Option<Arc<dyn Extractor>>,
}

impl RouterBuilder {
    /// An empty builder: nothing routed, nothing ignored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in extractor under its default extensions and literal
    /// names, plus the default ignore list.
    pub fn with_defaults() -> Self {
        let extractors: Vec<Arc<dyn Extractor>> = vec![
            Arc::new(casefile_extract_media::ImageExtractor),
            Arc::new(casefile_extract_media::AudioExtractor),
            Arc::new(casefile_extract_media::VideoExtractor),
            Arc::new(casefile_extract_office::OfficeExtractor),
            Arc::new(casefile_extract_pdf::PdfExtractor),
            Arc::new(casefile_extract_text::TextExtractor),
            Arc::new(casefile_extract_archive::ArchiveExtractor),
            Arc::new(casefile_extract_exe::ExeExtractor),
            Arc::new(casefile_extract_text::CodeExtractor),
            Arc::new(casefile_extract_data::TabularExtractor),
            Arc::new(casefile_extract_data::DatabaseExtractor),
            Arc::new(casefile_extract_model3d::Model3dExtractor),
            Arc::new(casefile_extract_diskimage::DiskImageExtractor),
        ];

        let mut builder = Self::new();
        for ex in &extractors {
            for ext in table::extensions(ex.family()) {
                builder = builder.register(RoutingKey::extension(ext), Arc::clone(ex));
            }
        }
        for (name, family) in table::LITERAL_NAMES {
            if let Some(ex) = extractors.iter().find(|e| e.family() == *family) {
                builder = builder.register(RoutingKey::literal(name), Arc::clone(ex));
            }
        }
        if let Some(ex) = extractors.iter().find(|e| e.family() == Family::Executable) {
            builder = builder.generic_executable(Arc::clone(ex));
        }
        table::IGNORED.iter().fold(builder, |b, name| b.ignore(name))
    }

    /// Adds or replaces the extractor for `key`.
    pub fn register(mut self, key: RoutingKey, extractor: Arc<dyn Extractor>) -> Self {
        self.table.insert(key, extractor);
        self
    }

    pub fn ignore(mut self, name: &str) -> Self {
        self.ignored.insert(name.to_lowercase());
        self
    }

    /// Extractor for files sniffed as native executables with no
    /// conventional extension (stored as an empty true extension).
    pub fn generic_executable(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.generic_executable = Some(extractor);
        self
    }

    pub fn build(self) -> Router {
        debug!("router built: {} keys, {} ignored names", self.table.len(), self.ignored.len());
        Router { table: self.table, ignored: self.ignored, generic_executable: self.generic_executable }
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

pub struct Router {
    table: HashMap<RoutingKey, Arc<dyn Extractor>>,
    ignored: HashSet<String>,
    generic_executable: Option<Arc<dyn Extractor>>,
}

impl Router {
    /// Picks the extractor for one file.
    ///
    /// `true_extension` is the sniffed type: `None` when not resolved,
    /// `Some("")` for a native executable without a conventional extension.
    /// It always wins over `declared_extension` when present.
    pub fn resolve(&self, filename_lower: &str, true_extension: Option<&str>, declared_extension: Option<&str>) -> Route {
        let literal = RoutingKey::LiteralName(filename_lower.to_string());
        if let Some(ex) = self.table.get(&literal) {
            return Route::Dispatch(Arc::clone(ex), literal);
        }

        let true_ignored = true_extension.is_some_and(|t| !t.is_empty() && self.ignored.contains(&t.to_lowercase()));
        if self.ignored.contains(filename_lower) || true_ignored {
            return Route::Skip(SkipReason::Ignored);
        }

        let token = match true_extension {
            Some("") => {
                return match &self.generic_executable {
                    Some(ex) => Route::Dispatch(Arc::clone(ex), RoutingKey::Extension(String::new())),
                    None => Route::Skip(SkipReason::NoCollector),
                };
            }
            Some(t) if !t.trim().is_empty() => normalize_extension(t),
            _ => declared_extension.map(normalize_extension).unwrap_or_default(),
        };
        if token.is_empty() {
            return Route::Skip(SkipReason::NoExtension);
        }

        let key = RoutingKey::Extension(token);
        match self.table.get(&key) {
            Some(ex) => Route::Dispatch(Arc::clone(ex), key),
            None => Route::Skip(SkipReason::NoCollector),
        }
    }

    /// Routes a path by its name alone, for files that are not in the index.
    pub fn resolve_path(&self, path: &Path) -> Route {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let declared = path.extension().map(|e| e.to_string_lossy().into_owned());
        self.resolve(&name, None, declared.as_deref())
    }

    /// Registered keys in sorted order, for listing the routing table.
    pub fn keys(&self) -> Vec<(String, Family)> {
        let mut keys: Vec<(String, Family)> =
            self.table.iter().map(|(k, ex)| (k.to_string(), ex.family())).collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        keys
    }
}

/// Runs `extractor` on `path`, turning a panic into [`ExtractOutcome::Failure`].
pub fn run_extractor(extractor: &dyn Extractor, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(path, cfg))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("{} extractor panicked on {}: {msg}", extractor.family(), path.display());
            ExtractOutcome::Failure(format!("extractor panicked: {msg}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        RouterBuilder::with_defaults().build()
    }

    fn family_of(route: Route) -> Option<Family> {
        route.family()
    }

    #[test]
    fn test_literal_name_wins() {
        let r = router();
        assert_eq!(family_of(r.resolve("license", None, None)), Some(Family::Text));
        assert_eq!(family_of(r.resolve("makefile", None, None)), Some(Family::Code));
        // requirements.txt would be text by extension
        assert_eq!(family_of(r.resolve("requirements.txt", Some(".txt"), Some(".txt"))), Some(Family::Code));
        match r.resolve("license", None, None) {
            Route::Dispatch(_, key) => assert_eq!(key, RoutingKey::LiteralName("license".into())),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_ignore_list() {
        let r = router();
        assert!(matches!(r.resolve(".ds_store", None, None), Route::Skip(SkipReason::Ignored)));
        assert!(matches!(r.resolve("thumbs.db", Some(".db"), Some(".db")), Route::Skip(SkipReason::Ignored)));
        assert!(matches!(r.resolve("x", Some(".gitignore"), None), Route::Skip(SkipReason::Ignored)));
    }

    #[test]
    fn test_true_extension_beats_declared() {
        let r = router();
        assert_eq!(family_of(r.resolve("report.pdf", Some(".docx"), Some(".pdf"))), Some(Family::Office));
        assert_eq!(family_of(r.resolve("report.pdf", None, Some(".pdf"))), Some(Family::Pdf));
        assert_eq!(family_of(r.resolve("photo.txt", Some(".JPG"), Some(".txt"))), Some(Family::Image));
    }

    #[test]
    fn test_declared_extension_normalized() {
        let r = router();
        assert_eq!(family_of(r.resolve("a.csv", None, Some("CSV"))), Some(Family::Tabular));
        assert_eq!(family_of(r.resolve("a.csv", Some("  "), Some(".Csv"))), Some(Family::Tabular));
    }

    #[test]
    fn test_generic_executable() {
        let r = router();
        match r.resolve("busybox", Some(""), None) {
            Route::Dispatch(ex, key) => {
                assert_eq!(ex.family(), Family::Executable);
                assert_eq!(key, RoutingKey::Extension(String::new()));
            }
            other => panic!("unexpected {other:?}"),
        }
        let bare = RouterBuilder::new().build();
        assert!(matches!(bare.resolve("busybox", Some(""), None), Route::Skip(SkipReason::NoCollector)));
    }

    #[test]
    fn test_skips() {
        let r = router();
        assert!(matches!(r.resolve("noext", None, None), Route::Skip(SkipReason::NoExtension)));
        assert!(matches!(r.resolve("noext", None, Some(".")), Route::Skip(SkipReason::NoExtension)));
        assert!(matches!(r.resolve("font.woff2", Some(".woff2"), None), Route::Skip(SkipReason::NoCollector)));
    }

    #[test]
    fn test_iso_is_disk_image() {
        assert_eq!(family_of(router().resolve("install.iso", None, Some(".iso"))), Some(Family::DiskImage));
    }

    #[test]
    fn test_every_family_routed() {
        let r = router();
        let families: HashSet<Family> = r.keys().into_iter().map(|(_, f)| f).collect();
        assert_eq!(families.len(), Family::ALL.len());
    }

    #[test]
    fn test_routed_extensions_accepted_by_extractor() {
        let r = router();
        for (key, family) in r.keys() {
            if key.starts_with("name:") {
                continue;
            }
            match r.resolve_path(Path::new(&format!("file{key}"))) {
                Route::Dispatch(ex, _) => {
                    assert_eq!(ex.family(), family);
                    assert!(ex.accepts(Path::new(&format!("file{key}"))), "{family} does not accept {key}");
                }
                other => panic!("{key}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_register_overrides_default() {
        let r = RouterBuilder::with_defaults()
            .register(RoutingKey::extension("txt"), Arc::new(casefile_extract_text::CodeExtractor))
            .build();
        assert_eq!(family_of(r.resolve("notes.txt", None, Some(".txt"))), Some(Family::Code));
    }

    struct Exploding;

    impl Extractor for Exploding {
        fn family(&self) -> Family {
            Family::Pdf
        }

        fn accepts(&self, _path: &Path) -> bool {
            true
        }

        fn extract(&self, _path: &Path, _cfg: &ExtractorConfig) -> ExtractOutcome {
            panic!("bad xref table")
        }
    }

    #[test]
    fn test_panic_becomes_failure() {
        let out = run_extractor(&Exploding, Path::new("x.pdf"), &ExtractorConfig::default());
        assert_eq!(out, ExtractOutcome::Failure("extractor panicked: bad xref table".into()));
    }

    #[test]
    fn test_routing_key_display() {
        assert_eq!(RoutingKey::extension("..TAR").to_string(), ".tar");
        assert_eq!(RoutingKey::literal("LICENSE").to_string(), "name:license");
    }
}
