//! Export directory access and attachment resolution.
//!
//! An extracted WhatsApp export is a directory with one transcript and the
//! media files next to it. [`ExportArchive`] finds the transcript and
//! indexes every file once; [`AttachmentResolver`] answers by-name lookups
//! from that index with a tolerance ladder: exact match first, then
//! Unicode-normalized, then case-insensitive. Transcripts and filesystems
//! disagree about both more often than not (macOS stores NFD, transcripts
//! carry NFC).

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

use crate::error::{ReportError, Result};
use crate::message::{AttachmentKind, AttachmentRef};

/// The transcript filename iOS exports use.
const IOS_CHAT_FILE: &str = "_chat.txt";

/// How a by-name attachment lookup ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The file exists and passed the cheap integrity checks.
    Found(PathBuf),
    /// No file in the export matches the name.
    Missing,
    /// A file matched but is unusable (empty, or wrong magic bytes).
    Unreadable {
        /// The path that matched.
        path: PathBuf,
        /// Short human-readable reason.
        reason: String,
    },
}

/// An opened export: transcript location plus a normalized file index.
///
/// # Example
///
/// ```rust,no_run
/// use chatreport::archive::ExportArchive;
///
/// let archive = ExportArchive::open("my chat export".as_ref())?;
/// let text = archive.transcript()?;
/// # Ok::<(), chatreport::ReportError>(())
/// ```
#[derive(Debug)]
pub struct ExportArchive {
    root: PathBuf,
    chat_file: PathBuf,
    index: FileIndex,
}

/// Base-name index with an exact / NFC / case-insensitive lookup ladder.
///
/// One map per rung, so two files differing only in case both stay
/// reachable by their exact names.
#[derive(Debug, Default)]
struct FileIndex {
    exact: HashMap<String, PathBuf>,
    nfc: HashMap<String, PathBuf>,
    folded: HashMap<String, PathBuf>,
}

impl FileIndex {
    fn insert(&mut self, name: &str, path: PathBuf) {
        self.nfc
            .entry(name.nfc().collect())
            .or_insert_with(|| path.clone());
        self.folded
            .entry(normalize_name(name))
            .or_insert_with(|| path.clone());
        self.exact.entry(name.to_string()).or_insert(path);
    }

    fn lookup(&self, name: &str) -> Option<&PathBuf> {
        if let Some(path) = self.exact.get(name) {
            return Some(path);
        }
        let nfc: String = name.nfc().collect();
        if let Some(path) = self.nfc.get(&nfc) {
            return Some(path);
        }
        self.folded.get(&nfc.to_lowercase())
    }

    fn len(&self) -> usize {
        self.exact.len()
    }
}

impl ExportArchive {
    /// Opens an export directory, or a bare transcript file.
    ///
    /// For directories the transcript is discovered in order: `_chat.txt`
    /// (iOS), then `<directory name>.txt` (Android). A bare `.txt` path is
    /// accepted directly, with its parent as media root.
    pub fn open(path: &Path) -> Result<Self> {
        let (root, chat_file) = if path.is_file() {
            let root = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            (root, path.to_path_buf())
        } else {
            let chat = discover_chat_file(path)
                .ok_or_else(|| ReportError::no_transcript(path))?;
            (path.to_path_buf(), chat)
        };

        let mut index = FileIndex::default();
        build_index(&root, &mut index)?;
        tracing::debug!(files = index.len(), root = %root.display(), "indexed export");

        Ok(Self {
            root,
            chat_file,
            index,
        })
    }

    /// Returns the export root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the transcript path.
    pub fn chat_file(&self) -> &Path {
        &self.chat_file
    }

    /// Reads the transcript as UTF-8, stripping a leading BOM.
    pub fn transcript(&self) -> Result<String> {
        let bytes = fs::read(&self.chat_file)?;
        let text = String::from_utf8(bytes)?;
        Ok(text.strip_prefix('\u{FEFF}').unwrap_or(&text).to_string())
    }

    /// Number of indexed files (transcript included).
    pub fn file_count(&self) -> usize {
        self.index.len()
    }

    fn lookup(&self, filename: &str) -> Option<&PathBuf> {
        self.index.lookup(filename)
    }
}

/// By-name lookups against one opened export.
pub struct AttachmentResolver<'a> {
    archive: &'a ExportArchive,
}

impl<'a> AttachmentResolver<'a> {
    /// Creates a resolver over an opened export.
    pub fn new(archive: &'a ExportArchive) -> Self {
        Self { archive }
    }

    /// Resolves one attachment reference.
    ///
    /// A resolved file is additionally checked for basic usability: empty
    /// files and image files whose magic bytes contradict their extension
    /// come back as [`Resolution::Unreadable`].
    pub fn resolve(&self, att: &AttachmentRef) -> Resolution {
        let Some(path) = self.archive.lookup(&att.filename) else {
            tracing::debug!(file = %att.filename, "attachment not present in export");
            return Resolution::Missing;
        };

        match fs::metadata(path) {
            Ok(meta) if meta.len() == 0 => {
                return Resolution::Unreadable {
                    path: path.clone(),
                    reason: "file is empty".to_string(),
                };
            }
            Ok(_) => {}
            Err(err) => {
                return Resolution::Unreadable {
                    path: path.clone(),
                    reason: err.to_string(),
                };
            }
        }

        if matches!(att.kind, AttachmentKind::Image | AttachmentKind::Sticker) {
            match read_magic(path) {
                Ok(magic) if !magic_matches_raster(&magic) => {
                    return Resolution::Unreadable {
                        path: path.clone(),
                        reason: "not a recognized image format".to_string(),
                    };
                }
                Ok(_) => {}
                Err(err) => {
                    return Resolution::Unreadable {
                        path: path.clone(),
                        reason: err.to_string(),
                    };
                }
            }
        }

        Resolution::Found(path.clone())
    }
}

/// Finds the transcript inside an export directory.
fn discover_chat_file(dir: &Path) -> Option<PathBuf> {
    let ios = dir.join(IOS_CHAT_FILE);
    if ios.is_file() {
        return Some(ios);
    }
    if let Some(stem) = dir.file_name().and_then(|n| n.to_str()) {
        let android = dir.join(format!("{stem}.txt"));
        if android.is_file() {
            return Some(android);
        }
    }
    None
}

/// Recursively indexes regular files by base name.
///
/// On duplicate names the shallower entry wins, matching how transcripts
/// reference files: always by base name at the top level.
fn build_index(dir: &Path, index: &mut FileIndex) -> Result<()> {
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let name = name.to_string();
            index.insert(&name, path);
        }
    }
    for sub in subdirs {
        build_index(&sub, index)?;
    }
    Ok(())
}

/// NFC-normalized, lowercased lookup key.
fn normalize_name(name: &str) -> String {
    name.nfc().collect::<String>().to_lowercase()
}

fn read_magic(path: &Path) -> std::io::Result<[u8; 12]> {
    let mut magic = [0u8; 12];
    let mut file = fs::File::open(path)?;
    // attachments are never under 12 bytes after the empty-file check,
    // but tolerate short reads anyway
    let mut filled = 0;
    while filled < magic.len() {
        let n = file.read(&mut magic[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(magic)
}

/// Checks the magic bytes of the raster formats exports actually contain.
fn magic_matches_raster(magic: &[u8; 12]) -> bool {
    magic.starts_with(&[0xFF, 0xD8, 0xFF]) // JPEG
        || magic.starts_with(&[0x89, b'P', b'N', b'G']) // PNG
        || magic.starts_with(b"GIF8") // GIF
        || magic.starts_with(b"BM") // BMP
        || (magic.starts_with(b"RIFF") && &magic[8..12] == b"WEBP") // WebP
        || &magic[4..8] == b"ftyp" // HEIC/HEIF
}
