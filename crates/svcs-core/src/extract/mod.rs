//! Structural extraction: source text -> [`Snapshot`].

pub mod declarations;
pub mod fingerprint;
pub mod parser;

use tracing::debug;

use crate::errors::{SvcsError, SvcsResult};
use crate::models::Snapshot;

pub use parser::is_supported_source;

/// Extract the top-level declarations of `source`.
///
/// Statements without a recognized declaration shape are skipped.
pub fn extract(source: &str) -> SvcsResult<Snapshot> {
    extract_with(source, false)
}

/// Like [`extract`], but fails on the first unrecognized top-level statement.
pub fn extract_strict(source: &str) -> SvcsResult<Snapshot> {
    extract_with(source, true)
}

fn extract_with(source: &str, strict: bool) -> SvcsResult<Snapshot> {
    let unit = parser::parse_python(source)?;
    let root = unit.root();
    let mut snapshot = Snapshot::new();

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        if node.is_extra() {
            continue;
        }
        match declarations::classify(&unit, node) {
            Ok(found) => {
                for declaration in found {
                    let category = declaration.category();
                    let key = declaration.key().to_string();
                    if snapshot.insert(declaration) {
                        debug!(
                            "{} `{}` redefined at line {}; keeping the later definition",
                            category,
                            key,
                            node.start_position().row + 1
                        );
                    }
                }
            }
            Err(SvcsError::UnsupportedCategory { kind, line }) if !strict => {
                debug!("Skipping unsupported top-level `{kind}` at line {line}");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(snapshot)
}
