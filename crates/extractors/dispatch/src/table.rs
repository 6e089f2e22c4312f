//! Default routing tables.  Extensions are listed without the dot.

use casefile_extract_types::Family;

pub const IMAGE: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "ico", "svg", "xcf", "heic", "heif",
];

pub const PDF: &[&str] = &["pdf"];

pub const OFFICE: &[&str] = &[
    "docx", "docm", "dotx", "doc", "xlsx", "xlsm", "xls", "pptx", "pptm", "ppt", "odt", "ods", "odp", "epub", "rtf",
];

pub const AUDIO: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a", "aac", "wma", "opus"];

pub const VIDEO: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "flv", "m4v", "wmv", "mpg", "mpeg", "3gp"];

pub const ARCHIVE: &[&str] = &[
    "zip", "rar", "tar", "gz", "7z", "bz2", "xz", "tgz", "tbz2", "txz", "jar", "war", "apk",
];

pub const EXECUTABLE: &[&str] = &[
    "exe", "dll", "sys", "msi", "bin", "elf", "so", "dylib", "pak", "dat", "sav", "scr", "cpl", "ocx", "drv", "efi",
];

pub const CODE: &[&str] = &[
    "py", "pyi", "pyx", "js", "mjs", "ts", "html", "htm", "css", "scss", "java", "c", "h", "cpp", "hpp", "cs",
    "php", "rb", "go", "rs", "sh", "bash", "bat", "pl", "pm", "lua", "sql",
];

pub const TEXT: &[&str] = &[
    "txt", "md", "markdown", "rst", "json", "xml", "yaml", "yml", "toml", "ini", "cfg", "conf", "log", "sample",
    "man", "7", "apache", "bsd", "typed",
];

pub const TABULAR: &[&str] = &["csv", "tsv", "tab", "psv", "parquet", "nc"];

pub const DATABASE: &[&str] = &["sqlite", "sqlite3", "db", "db3", "mdb", "accdb"];

pub const MODEL3D: &[&str] = &["obj", "stl", "fbx", "gltf", "glb", "ply", "step", "stp"];

pub const DISK_IMAGE: &[&str] = &["iso", "img", "vhd", "vhdx", "vmdk", "dmg", "qcow2", "qcow", "vdi"];

/// Whole file names routed regardless of extension, all lowercase.
pub const LITERAL_NAMES: &[(&str, Family)] = &[
    ("makefile", Family::Code),
    ("dockerfile", Family::Code),
    ("jenkinsfile", Family::Code),
    ("gemfile", Family::Code),
    ("vagrantfile", Family::Code),
    ("requirements.txt", Family::Code),
    ("pipfile", Family::Code),
    ("license", Family::Text),
    ("license.txt", Family::Text),
    ("license.md", Family::Text),
    ("copying", Family::Text),
    ("readme", Family::Text),
    ("notice", Family::Text),
    ("authors", Family::Text),
    ("changelog", Family::Text),
];

/// OS metadata and package-manager scratch files.
pub const IGNORED: &[&str] = &[
    ".ds_store",
    ".localized",
    "thumbs.db",
    "desktop.ini",
    ".metadata",
    ".recommenders",
    "pkginfo",
    ".gitignore",
    ".gitattributes",
    "record",
    "wheel",
    "metadata",
    "installer",
    "requested",
    "description",
    "exclude",
];

pub fn extensions(family: Family) -> &'static [&'static str] {
    match family {
        Family::Image => IMAGE,
        Family::Audio => AUDIO,
        Family::Video => VIDEO,
        Family::Office => OFFICE,
        Family::Pdf => PDF,
        Family::Text => TEXT,
        Family::Archive => ARCHIVE,
        Family::Executable => EXECUTABLE,
        Family::Code => CODE,
        Family::Tabular => TABULAR,
        Family::Database => DATABASE,
        Family::Model3d => MODEL3D,
        Family::DiskImage => DISK_IMAGE,
    }
}
