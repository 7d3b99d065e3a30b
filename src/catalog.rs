//! Resolves the list of published versions from `maven-metadata.xml`.
//!
//! This is deliberately a tolerant line scanner rather than a real XML
//! parser: we only care about the `<version>` elements nested inside
//! `versioning > versions`, and anything else in the document is ignored.

use failure_derive::Fail;

#[derive(Debug, Fail)]
#[fail(display = "Version catalog has no <versioning> block")]
pub struct CatalogParseError;

/// Where the scanner currently is in the document.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ScanState {
    Outside,
    InVersioning,
    InVersions,
}

/// Extract every version identifier from the repository metadata,
/// in document order.
///
/// An empty version list is valid and yields no work. The only fatal
/// condition is a document with no `<versioning>` block at all, since
/// then we have nothing to enumerate.
pub fn resolve_versions(metadata: &str) -> Result<Vec<String>, CatalogParseError> {
    let mut state = ScanState::Outside;
    let mut seen_versioning = false;
    let mut versions = Vec::new();
    /*
     * Markers are checked in document order within each line, so a line
     * carrying both an opening and a closing tag enters and leaves the
     * block on that same line.
     */
    for line in metadata.lines() {
        if state == ScanState::Outside && line.contains("<versioning>") {
            state = ScanState::InVersioning;
            seen_versioning = true;
        }
        if state != ScanState::Outside && line.contains("</versioning>") {
            // Also tolerates a versions block that was never closed
            state = ScanState::Outside;
        }
        if state == ScanState::InVersioning && line.contains("<versions>") {
            state = ScanState::InVersions;
        }
        if state == ScanState::InVersions && line.contains("</versions>") {
            state = ScanState::InVersioning;
        }
        if state == ScanState::InVersions {
            if let Some(version) = element_text(line, "version") {
                versions.push(version.into());
            }
        }
    }
    if !seen_versioning {
        return Err(CatalogParseError);
    }
    Ok(versions)
}

/// The text between `<tag>` and `</tag>` if both appear on this line.
fn element_text<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = line.find(&open)? + open.len();
    let end = line[start..].find(&close)? + start;
    Some(&line[start..end])
}
