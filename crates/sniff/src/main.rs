use std::io::{self, BufRead};
use std::path::Path;

use casefile_extract_types::Capabilities;

/// Reads file paths from stdin, one per line, and prints one JSON detection
/// result per path.
fn main() -> anyhow::Result<()> {
    let caps = Capabilities { content_sniffing: casefile_sniff::CONTENT_SNIFFING_AVAILABLE, ..Capabilities::none() };
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let path_str = line?;
        let path = Path::new(&path_str);

        match casefile_sniff::sniff_path(path, &caps) {
            Ok(found) => {
                let out = serde_json::json!({
                    "path": path_str,
                    "true_extension": found.extension,
                    "description": found.description,
                });
                println!("{out}");
            }
            Err(e) => eprintln!("Error reading {}: {}", path_str, e),
        }
    }
    Ok(())
}
