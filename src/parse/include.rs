use super::parser::strip_comment;
use crate::{Error, ErrorType, Source, SrcFile};
use log::debug;
use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

/// One item of the logical line stream produced by [`Includer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// The following lines start at this position.
    Marker(Source),
    /// A line of ledger text, without its line terminator.
    Line(String),
}

/// Expands `include` directives into a single stream of lines.
///
/// An `Includer` tracks the files currently being expanded, so a file that
/// includes itself, directly or transitively, is reported instead of being
/// followed forever. Use one `Includer` per top-level file.
#[derive(Debug, Default)]
pub struct Includer {
    open: HashSet<PathBuf>,
}

fn io_error(path: &Path, error: io::Error, src: &Source) -> Error {
    if error.kind() == io::ErrorKind::NotFound {
        Error {
            msg: format!("Couldn't find {}.", path.display()),
            src: src.clone(),
            r#type: ErrorType::FileNotFound,
        }
    } else {
        Error {
            msg: format!("Couldn't read {}: {}", path.display(), error),
            src: src.clone(),
            r#type: ErrorType::FileRead,
        }
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Returns the argument of an `include` line, or `None` for other lines.
fn include_argument(line: &str, src: &Source) -> Result<Option<String>, Error> {
    let (content, _) = strip_comment(line);
    let fields = content.split_whitespace().collect::<Vec<_>>();
    match fields.as_slice() {
        ["include", path] => Ok(Some(path.to_string())),
        ["include", ..] => Err(Error {
            msg: format!(
                "Expected one path after include, found {}.",
                fields.len() - 1
            ),
            src: src.clone(),
            r#type: ErrorType::MalformedInclude,
        }),
        _ => Ok(None),
    }
}

impl Includer {
    pub fn new() -> Self {
        Includer::default()
    }

    /// Reads `path` and every file it includes.
    pub fn include<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<Record>, Error> {
        let path = path.as_ref();
        let refer_src = Source::new(Arc::new(path.display().to_string()), 1);
        let mut records = Vec::new();
        self.expand(path, &refer_src, &mut records)?;
        Ok(records)
    }

    fn expand(&mut self, path: &Path, refer_src: &Source, records: &mut Vec<Record>) -> Result<(), Error> {
        let canonical = fs::canonicalize(path).map_err(|e| io_error(path, e, refer_src))?;
        if !self.open.insert(canonical.clone()) {
            return Err(Error {
                msg: format!("{} includes itself.", canonical.display()),
                src: refer_src.clone(),
                r#type: ErrorType::IncludeCycle,
            });
        }
        let result = self.expand_open(&canonical, refer_src, records);
        self.open.remove(&canonical);
        result
    }

    fn expand_open(&mut self, path: &Path, refer_src: &Source, records: &mut Vec<Record>) -> Result<(), Error> {
        let data = fs::read_to_string(path).map_err(|e| io_error(path, e, refer_src))?;
        let file: SrcFile = Arc::new(path.display().to_string());
        debug!("reading {}", file);
        records.push(Record::Marker(Source::new(file.clone(), 1)));
        for (index, line) in data.lines().enumerate() {
            let src = Source::new(file.clone(), index + 1);
            match include_argument(line, &src)? {
                Some(pattern) => {
                    self.include_pattern(&pattern, path, &src, records)?;
                    records.push(Record::Marker(src.next_line()));
                }
                None => records.push(Record::Line(line.to_string())),
            }
        }
        Ok(())
    }

    fn include_pattern(
        &mut self,
        pattern: &str,
        including: &Path,
        src: &Source,
        records: &mut Vec<Record>,
    ) -> Result<(), Error> {
        let full_path = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            including
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(pattern)
        };
        if !is_glob(pattern) {
            return self.expand(&full_path, src, records);
        }

        let full_pattern = full_path.to_string_lossy();
        let entries = glob::glob(&full_pattern).map_err(|e| Error {
            msg: format!("Invalid pattern {}: {}.", pattern, e.msg),
            src: src.clone(),
            r#type: ErrorType::MalformedInclude,
        })?;
        let mut matches = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error {
                msg: format!("Couldn't read {}: {}", e.path().display(), e.error()),
                src: src.clone(),
                r#type: ErrorType::FileRead,
            })?;
            if path.is_file() {
                matches.push(path);
            }
        }
        matches.sort();
        if matches.is_empty() {
            debug!("{}: {} matches no files", src, pattern);
        }
        for path in matches {
            let canonical = fs::canonicalize(&path).map_err(|e| io_error(&path, e, src))?;
            if self.open.contains(&canonical) {
                debug!("{}: skipping {}, already being read", src, path.display());
                continue;
            }
            self.expand(&path, src, records)?;
        }
        Ok(())
    }
}
