//! Plain-text transform log.
//!
//! A 3-line header followed by fixed 10-line entries:
//!
//! ```text
//! AFFINE
//! Source img: 4 Target img: 2
//! 64.0	32.0
//! 32.0	96.0
//! 96.0	96.0
//!
//! 64.5	31.0
//! 33.0	95.5
//! 97.0	96.5
//!
//! ```
//!
//! Families with fewer than three anchors are padded with zero rows. The
//! format is not self-describing: entry `n` starts at line `3 + 10n`.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::correspondence::{AnchorPair, Correspondence, CorrespondenceRequest};
use super::TransformChain;
use crate::error::RegistrationError;
use crate::transform::{AnchorSet, TransformFamily};
use crate::Result;

pub const HEADER_LINES: usize = 3;
pub const ENTRY_LINES: usize = 10;
const POINT_ROWS: usize = 3;

/// One registered step as recorded in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformLogEntry {
    pub family: TransformFamily,
    pub source_index: usize,
    pub target_index: usize,
    pub source: AnchorSet,
    pub target: AnchorSet,
}

/// The entry's 10 lines, each terminated by `\n`.
impl fmt::Display for TransformLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.family.log_tag())?;
        writeln!(
            f,
            "Source img: {} Target img: {}",
            self.source_index, self.target_index
        )?;
        for block in [&self.source, &self.target] {
            for [x, y] in block.padded(POINT_ROWS) {
                writeln!(f, "{x:?}\t{y:?}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl TransformLogEntry {

    /// Parses the entry whose first line is `lines[0]`; `first_line` is its
    /// 1-based position in the file, for error messages.
    fn parse(lines: &[String], first_line: usize) -> Result<Self> {
        if lines.len() < ENTRY_LINES - 1 {
            return Err(RegistrationError::malformed_log(
                first_line + lines.len(),
                "log ends inside an entry",
            ));
        }
        let family: TransformFamily = lines[0].trim().parse().map_err(|_| {
            RegistrationError::malformed_log(first_line, format!("unknown family {:?}", lines[0]))
        })?;
        let (source_index, target_index) = parse_indices(&lines[1], first_line + 1)?;

        let count = family.anchor_count();
        let source = parse_points(&lines[2..2 + count], first_line + 2)?;
        let target = parse_points(&lines[6..6 + count], first_line + 6)?;
        Ok(Self {
            family,
            source_index,
            target_index,
            source,
            target,
        })
    }
}

fn parse_indices(line: &str, line_no: usize) -> Result<(usize, usize)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        ["Source", "img:", source, "Target", "img:", target] => {
            let parse = |s: &str| {
                s.parse::<usize>().map_err(|e| {
                    RegistrationError::malformed_log(line_no, format!("bad slice index {s:?}: {e}"))
                })
            };
            Ok((parse(*source)?, parse(*target)?))
        }
        _ => Err(RegistrationError::malformed_log(
            line_no,
            format!("expected slice indices, got {line:?}"),
        )),
    }
}

fn parse_points(lines: &[String], first_line: usize) -> Result<AnchorSet> {
    let mut points = Vec::with_capacity(lines.len());
    for (offset, line) in lines.iter().enumerate() {
        let line_no = first_line + offset;
        let (x, y) = line.trim().split_once('\t').ok_or_else(|| {
            RegistrationError::malformed_log(line_no, "expected tab-separated point")
        })?;
        let coord = |s: &str| {
            s.trim().parse::<f64>().map_err(|e| {
                RegistrationError::malformed_log(line_no, format!("bad coordinate {s:?}: {e}"))
            })
        };
        points.push([coord(x)?, coord(y)?]);
    }
    Ok(AnchorSet::new(points))
}

/// Creates a log and appends entries to it.
#[derive(Debug, Clone)]
pub struct TransformLogWriter {
    path: PathBuf,
}

impl TransformLogWriter {
    /// Creates or truncates `path` and writes the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let header = format!(
            "{} v{} Transformation File\nCreated: {}\n\
             Entries of {ENTRY_LINES} lines: family, slice indices, source points, target points\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            chrono::Local::now().to_rfc3339(),
        );
        fs::write(&path, header)?;
        tracing::info!(path = %path.display(), "transform log created");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &TransformLogEntry) -> Result<()> {
        self.append_all(std::slice::from_ref(entry))
    }

    /// Appends every entry of a completed chain, in traversal order.
    pub fn append_chain(&self, chain: &TransformChain) -> Result<()> {
        self.append_all(chain.entries())
    }

    fn append_all(&self, entries: &[TransformLogEntry]) -> Result<()> {
        let text: String = entries.iter().map(TransformLogEntry::to_string).collect();
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        tracing::debug!(
            entries = entries.len(),
            path = %self.path.display(),
            "appended transform log entries"
        );
        Ok(())
    }
}

/// Reads a log back and replays it as a [`Correspondence`].
///
/// Entries are consumed strictly in order; call [`reset`](Self::reset) before
/// replaying the log over another channel.
#[derive(Debug, Clone)]
pub struct LogReplay {
    lines: Vec<String>,
    cursor: usize,
}

impl LogReplay {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            RegistrationError::malformed_log(0, format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_text(&text)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        if lines.len() < HEADER_LINES {
            return Err(RegistrationError::malformed_log(lines.len(), "log header is incomplete"));
        }
        Ok(Self { lines, cursor: 0 })
    }

    /// Number of complete entries after the header.
    ///
    /// The trailing blank line of the last entry may be missing.
    pub fn len(&self) -> usize {
        (self.lines.len() - HEADER_LINES + 1) / ENTRY_LINES
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Moves the cursor to entry `n`.
    pub fn seek(&mut self, n: usize) {
        self.cursor = n;
    }

    /// Entry `n`, found by skipping the header and `10n` lines.
    pub fn entry(&self, n: usize) -> Result<TransformLogEntry> {
        let start = HEADER_LINES + ENTRY_LINES * n;
        if start >= self.lines.len() {
            return Err(RegistrationError::malformed_log(
                self.lines.len(),
                format!("log has no entry {n}"),
            ));
        }
        let end = (start + ENTRY_LINES).min(self.lines.len());
        TransformLogEntry::parse(&self.lines[start..end], start + 1)
    }

    pub fn entries(&self) -> Result<Vec<TransformLogEntry>> {
        (0..self.len()).map(|n| self.entry(n)).collect()
    }

    /// Next entry in write order.
    pub fn next_entry(&mut self) -> Result<TransformLogEntry> {
        let entry = self.entry(self.cursor)?;
        self.cursor += 1;
        Ok(entry)
    }
}

impl<I> Correspondence<I> for LogReplay {
    fn refine(&mut self, request: CorrespondenceRequest<'_, I>) -> Result<AnchorPair> {
        let line = HEADER_LINES + ENTRY_LINES * self.cursor + 1;
        let entry = self.next_entry()?;
        if entry.family != request.family {
            return Err(RegistrationError::malformed_log(
                line,
                format!("entry is {} but the chain uses {}", entry.family, request.family),
            ));
        }
        if entry.source_index != request.source_index {
            return Err(RegistrationError::malformed_log(
                line + 1,
                format!(
                    "entry is for slice {} but slice {} is being registered",
                    entry.source_index, request.source_index
                ),
            ));
        }
        Ok(AnchorPair {
            source: entry.source,
            target: entry.target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(family: TransformFamily, source_index: usize) -> TransformLogEntry {
        let source = family.canonical_anchors(100, 80);
        let target = source.warped(&crate::numeric::Matrix3::translation(0.5, -1.25));
        TransformLogEntry {
            family,
            source_index,
            target_index: 2,
            source,
            target,
        }
    }

    #[test]
    fn test_entry_layout_pads_to_three_rows() {
        let text = entry(TransformFamily::Translation, 3).to_string();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(
            &lines[..ENTRY_LINES],
            &[
                "TRANSLATION",
                "Source img: 3 Target img: 2",
                "50.0\t40.0",
                "0.0\t0.0",
                "0.0\t0.0",
                "",
                "50.5\t38.75",
                "0.0\t0.0",
                "0.0\t0.0",
                "",
            ]
        );
    }

    #[test]
    fn test_entries_are_addressed_by_fixed_offset() {
        let mut text = String::from("h1\nh2\nh3\n");
        let written = [
            entry(TransformFamily::Affine, 1),
            entry(TransformFamily::Affine, 0),
            entry(TransformFamily::Affine, 3),
        ];
        for e in &written {
            text.push_str(&e.to_string());
        }
        let replay = LogReplay::from_text(&text).unwrap();
        assert_eq!(replay.len(), 3);
        assert_eq!(replay.entry(2).unwrap(), written[2]);
        assert_eq!(replay.entries().unwrap(), written.to_vec());
    }

    #[test]
    fn test_short_log_is_malformed() {
        let mut text = String::from("h1\nh2\nh3\n");
        text.push_str(&entry(TransformFamily::RigidBody, 1).to_string());
        text.truncate(text.len() - 20);
        let replay = LogReplay::from_text(&text).unwrap();
        assert!(matches!(replay.entry(0), Err(RegistrationError::MalformedLog { .. })));
        assert!(matches!(replay.entry(1), Err(RegistrationError::MalformedLog { .. })));
        assert!(matches!(
            LogReplay::from_text("only one line"),
            Err(RegistrationError::MalformedLog { .. })
        ));
    }

    #[test]
    fn test_unparsable_coordinate_names_its_line() {
        let text = format!(
            "h1\nh2\nh3\n{}",
            entry(TransformFamily::Translation, 0)
                .to_string()
                .replace("50.0\t40.0", "fifty\t40.0")
        );
        let err = LogReplay::from_text(&text).unwrap().entry(0).unwrap_err();
        assert!(matches!(err, RegistrationError::MalformedLog { line: 6, .. }), "{err}");
    }
}
