//! Doxygen XML input.
//!
//! Reads the `xml/` output directory Doxygen produces (`GENERATE_XML = YES`)
//! into [`EntityRecord`]s: `index.xml` lists every compound, and each
//! compound's own `<refid>.xml` carries its members, bases and nesting.

mod parser;

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use doxymark_shared::{DoxymarkError, EntityRecord, Result};

pub use parser::{IndexEntry, parse_compound, parse_index};

/// Name of Doxygen's index file inside the XML directory.
pub const INDEX_FILE: &str = "index.xml";

/// Load every documented compound from a Doxygen XML directory.
///
/// Records come back in index order. File, directory, page and example
/// compounds are skipped. A compound whose file is missing is reconstructed
/// from its index entry alone.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn load_directory(dir: &Path) -> Result<Vec<EntityRecord>> {
    let index_path = dir.join(INDEX_FILE);
    debug!(path = %index_path.display(), "parsing index");
    let index_xml = tokio::fs::read_to_string(&index_path)
        .await
        .map_err(|e| DoxymarkError::io(&index_path, e))?;
    let entries = parse_index(&index_xml)?;

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries.iter().filter(|e| e.is_structural()) {
        let path = dir.join(format!("{}.xml", entry.refid));
        let record = match tokio::fs::read_to_string(&path).await {
            Ok(xml) => parse_compound(&xml).map_err(|e| {
                DoxymarkError::parse(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(refid = %entry.refid, "compound file missing, using index entry");
                entry.to_record()
            }
            Err(e) => return Err(DoxymarkError::io(&path, e)),
        };
        records.push(record);
    }

    info!(
        indexed = entries.len(),
        loaded = records.len(),
        "doxygen input loaded"
    );
    Ok(records)
}
