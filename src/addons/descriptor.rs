//! Descriptor (`.toc`) parsing and indexing.
//!
//! A descriptor file marks a directory as an addon root. It is valid when it
//! declares both a `## Title:` and a `## Interface:` line.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::types::{AddonError, CLIENT_SUFFIXES, DESCRIPTOR_EXTENSION};

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*##\s*Title:\s*(.*)$").expect("valid title regex"));
static INTERFACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*##\s*Interface:.*$").expect("valid interface regex"));
static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|cff[a-zA-Z0-9]{3,6}").expect("valid color regex"));
static COLOR_RESET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|r").expect("valid color reset regex"));

/// Byte-order mark some editors prepend to descriptor files.
const BOM: char = '\u{feff}';

/// Fields extracted from a descriptor before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorFields {
    /// Sanitized title, from the first title line.
    pub title: Option<String>,
    /// Whether an interface line was seen.
    pub has_interface: bool,
}

impl DescriptorFields {
    /// Returns the title if the descriptor is valid.
    #[must_use]
    pub fn valid_title(&self) -> Option<&str> {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() && self.has_interface => Some(title),
            _ => None,
        }
    }
}

/// One valid descriptor file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRecord {
    path: PathBuf,
    dir: PathBuf,
    dir_basename: String,
    basename: String,
    depth: usize,
    title: String,
}

impl DescriptorRecord {
    /// Builds a record for the descriptor at `path`.
    #[must_use]
    pub fn new(path: PathBuf, title: String) -> Self {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let dir_basename = file_name_lossy(&dir);
        let basename = file_name_lossy(&path);
        let depth = dir.components().count();

        Self {
            path,
            dir,
            dir_basename,
            basename,
            depth,
            title,
        }
    }

    /// Absolute path of the descriptor file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the descriptor.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Basename of the containing directory.
    #[must_use]
    pub fn dir_basename(&self) -> &str {
        &self.dir_basename
    }

    /// File name of the descriptor.
    #[must_use]
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Number of path components of the containing directory.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Sanitized title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// File name without its extension.
    #[must_use]
    pub fn name(&self) -> &str {
        match self.basename.rfind('.') {
            Some(idx) if idx > 0 => &self.basename[..idx],
            _ => &self.basename,
        }
    }

    /// Name with any known client-version suffix removed.
    #[must_use]
    pub fn name_without_client_suffix(&self) -> &str {
        let name = self.name();
        CLIENT_SUFFIXES
            .iter()
            .find_map(|suffix| name.strip_suffix(suffix))
            .unwrap_or(name)
    }
}

/// Removes color escapes (`|cffRRGGBB`) and reset tokens (`|r`) from a title.
///
/// Applied until nothing changes, so the result is stable under re-application.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let mut current = title.trim().to_string();
    loop {
        let stripped = COLOR_RE.replace_all(&current, "");
        let stripped = COLOR_RESET_RE.replace_all(&stripped, "");
        let next = stripped.trim();
        if next == current {
            return current;
        }
        current = next.to_string();
    }
}

/// Scans descriptor content line by line.
///
/// Stops once both a title and an interface line have been seen.
pub fn scan_descriptor<R: BufRead>(mut reader: R) -> io::Result<DescriptorFields> {
    let mut fields = DescriptorFields::default();
    let mut buf = Vec::new();

    loop {
        if fields.title.is_some() && fields.has_interface {
            break;
        }

        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        let raw = String::from_utf8_lossy(&buf);
        let line = raw.trim_end_matches(['\n', '\r']).replace(BOM, "");

        if fields.title.is_none() {
            if let Some(caps) = TITLE_RE.captures(&line) {
                let value = caps.get(1).map_or("", |m| m.as_str());
                fields.title = Some(sanitize_title(value));
            }
        }

        if !fields.has_interface && INTERFACE_RE.is_match(&line) {
            fields.has_interface = true;
        }
    }

    Ok(fields)
}

/// Parses the descriptor at `path`.
///
/// Returns `Ok(None)` when the file lacks a title or an interface line.
pub fn parse_descriptor(path: &Path) -> io::Result<Option<DescriptorRecord>> {
    let file = File::open(path)?;
    let fields = scan_descriptor(BufReader::new(file))?;

    let Some(title) = fields.valid_title() else {
        if fields.title.as_deref().is_none_or(str::is_empty) {
            debug!("[ADDON-TOC] Could not parse title for {}", path.display());
        } else {
            warn!(
                "[ADDON-TOC] Invalid descriptor, no interface line: {}",
                path.display()
            );
        }
        return Ok(None);
    };

    let record = DescriptorRecord::new(path.to_path_buf(), title.to_string());
    debug!("[ADDON-TOC] Read valid descriptor {:?}", record);
    Ok(Some(record))
}

/// Returns true if `name` has the descriptor file extension.
#[must_use]
pub fn is_descriptor_file_name(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|n| n.ends_with(DESCRIPTOR_EXTENSION))
}

/// Walks `root` and collects every valid descriptor.
///
/// Unreadable descriptors are skipped with a warning; a failing walk aborts.
pub fn index_descriptors(root: &Path) -> Result<Vec<DescriptorRecord>, AddonError> {
    let mut records = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| AddonError::Walk {
            root: root.to_path_buf(),
            message: e.to_string(),
        })?;

        if !entry.file_type().is_file() || !is_descriptor_file_name(entry.file_name()) {
            continue;
        }

        match parse_descriptor(entry.path()) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => warn!(
                "[ADDON-TOC] Could not read {}: {}",
                entry.path().display(),
                e
            ),
        }
    }

    if records.is_empty() {
        return Err(AddonError::NoDescriptorsFound(root.to_path_buf()));
    }

    info!(
        "[ADDON-TOC] Found {} valid descriptor(s) under {}",
        records.len(),
        root.display()
    );
    Ok(records)
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn scan(content: &str) -> DescriptorFields {
        scan_descriptor(content.as_bytes()).expect("scan")
    }

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, content).expect("write");
        path
    }

    #[test]
    fn test_scan_valid_descriptor() {
        let fields = scan("## Interface: 30300\n## Title: Bagnon\n## Author: Tuller\n");
        assert_eq!(fields.valid_title(), Some("Bagnon"));
    }

    #[test]
    fn test_scan_first_title_wins() {
        let fields = scan("## Title: First\n## Title: Second\n## Interface: 11200\n");
        assert_eq!(fields.title.as_deref(), Some("First"));
    }

    #[test]
    fn test_scan_strips_bom_and_crlf() {
        let fields = scan("\u{feff}## Title: |cff33ffccpf|cffffffffUI\r\n## Interface: 11200\r\n");
        assert_eq!(fields.valid_title(), Some("pfUI"));
    }

    #[test]
    fn test_scan_tolerates_leading_whitespace_and_invalid_utf8() {
        let mut content = b"  ##   Title:   Atlas Loot  \n".to_vec();
        content.extend_from_slice(&[0xff, 0xfe, b'\n']);
        content.extend_from_slice(b"\t## Interface: 30300\n");
        let fields = scan_descriptor(content.as_slice()).expect("scan");
        assert_eq!(fields.valid_title(), Some("Atlas Loot"));
    }

    #[test]
    fn test_missing_interface_is_invalid() {
        let fields = scan("## Title: Foo\n## Version: 1\n");
        assert_eq!(fields.valid_title(), None);
    }

    #[test]
    fn test_missing_title_is_invalid() {
        assert_eq!(scan("## Interface: 30300\n").valid_title(), None);
    }

    #[test]
    fn test_empty_title_is_invalid() {
        assert_eq!(scan("## Title: |cff00ff00|r\n## Interface: 1\n").valid_title(), None);
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("|cffff8000WOW-HC.com|r"), "WOW-HC.com");
        assert_eq!(sanitize_title("|cff33ffccpf|cffffffffUI"), "pfUI");
        assert_eq!(sanitize_title("Plain Title"), "Plain Title");
        assert_eq!(sanitize_title("|c|cff123456ff00aaName"), "Name");
    }

    #[test]
    fn test_record_derived_fields() {
        let record = DescriptorRecord::new(
            PathBuf::from("/dl/id/Bagnon/Bagnon_Wrath.toc"),
            "Bagnon".to_string(),
        );
        assert_eq!(record.dir(), Path::new("/dl/id/Bagnon"));
        assert_eq!(record.dir_basename(), "Bagnon");
        assert_eq!(record.basename(), "Bagnon_Wrath.toc");
        assert_eq!(record.depth(), 4);
        assert_eq!(record.name(), "Bagnon_Wrath");
        assert_eq!(record.name_without_client_suffix(), "Bagnon");
    }

    #[test]
    fn test_client_suffixes() {
        for (file, expected) in [
            ("/a/Foo_TBC.toc", "Foo"),
            ("/a/Foo-tbc.toc", "Foo"),
            ("/a/Foo-Classic.toc", "Foo"),
            ("/a/Foo_Mainline.toc", "Foo"),
            ("/a/Foo.toc", "Foo"),
            ("/a/Foo_Wrath_Extra.toc", "Foo_Wrath_Extra"),
        ] {
            let record = DescriptorRecord::new(PathBuf::from(file), "t".to_string());
            assert_eq!(record.name_without_client_suffix(), expected, "{}", file);
        }
    }

    #[test]
    fn test_parse_descriptor_file() {
        let tmp = TempDir::new().expect("temp dir");
        let valid = write(tmp.path(), "Foo/Foo.toc", "## Title: Foo\n## Interface: 1\n");
        let invalid = write(tmp.path(), "Bar/Bar.toc", "## Title: Bar\n");

        let record = parse_descriptor(&valid).expect("parse").expect("valid");
        assert_eq!(record.title(), "Foo");
        assert_eq!(record.path(), valid.as_path());
        assert!(parse_descriptor(&invalid).expect("parse").is_none());
        assert!(parse_descriptor(&tmp.path().join("missing.toc")).is_err());
    }

    #[test]
    fn test_index_descriptors() {
        let tmp = TempDir::new().expect("temp dir");
        write(tmp.path(), "Root/Sub/Foo.toc", "## Title: Foo\n## Interface: 1\n");
        write(tmp.path(), "Root/Sub/Lib/Lib.toc", "## Title: Lib\n## Interface: 1\n");
        write(tmp.path(), "Root/Sub/notes.txt", "## Title: Nope\n## Interface: 1\n");
        write(tmp.path(), "Root/Broken/Broken.toc", "no headers here\n");
        fs::create_dir_all(tmp.path().join("Root/Dir.toc")).expect("mkdir");

        let records = index_descriptors(tmp.path()).expect("index");
        let names: Vec<&str> = records.iter().map(DescriptorRecord::name).collect();
        assert_eq!(names, vec!["Foo", "Lib"]);
    }

    #[test]
    fn test_index_without_descriptors() {
        let tmp = TempDir::new().expect("temp dir");
        write(tmp.path(), "readme.md", "nothing");

        let err = index_descriptors(tmp.path()).unwrap_err();
        assert!(matches!(err, AddonError::NoDescriptorsFound(_)));
    }

    #[test]
    fn test_index_missing_root_is_walk_error() {
        let tmp = TempDir::new().expect("temp dir");
        let err = index_descriptors(&tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, AddonError::Walk { .. }));
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(title in r"[a-zA-Z0-9 |]{0,40}") {
            let once = sanitize_title(&title);
            prop_assert_eq!(sanitize_title(&once), once);
        }

        #[test]
        fn prop_title_and_interface_are_required(
            title in proptest::option::of("[A-Za-z][A-Za-z0-9 ]{0,20}"),
            interface in proptest::bool::ANY,
            filler in proptest::collection::vec("[a-z ]{0,20}", 0..5),
        ) {
            let mut lines: Vec<String> = filler.clone();
            if let Some(ref t) = title {
                lines.push(format!("## Title: {}", t));
            }
            if interface {
                lines.push("## Interface: 30300".to_string());
            }
            let fields = scan(&lines.join("\n"));
            prop_assert_eq!(fields.valid_title().is_some(), title.is_some() && interface);
        }
    }
}
