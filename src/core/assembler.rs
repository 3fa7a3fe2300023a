//! SP-003: Recursive directive assembly.
//!
//! Expands `#:section` includes and `#:if`/`#:else`/`#:endif` blocks into one
//! text. Include paths resolve against the build root, not the including
//! file. Every canonical path may be entered once per build: re-entering one
//! is reported as a circular include.

use super::error::BuildError;
use super::manifest::{self, Manifest};
use super::types::{Assembly, DEFAULT_MAX_DEPTH, ELSE, ENDIF, IF, SECTION};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Resolution inputs for one top-level build. Immutable once built.
#[derive(Debug, Clone)]
pub struct BuildContext {
    root: PathBuf,
    defines: HashSet<String>,
    max_depth: usize,
}

impl BuildContext {
    pub fn new<I, S>(root: impl Into<PathBuf>, defines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.into(),
            defines: defines.into_iter().map(Into::into).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Cap include nesting. The entry file counts as depth 1.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defines.contains(name)
    }

    /// Read and parse the manifest of `entry` without assembling it.
    pub fn load_manifest(&self, entry: impl AsRef<Path>) -> Result<Manifest, BuildError> {
        let path = self.root.join(entry);
        let text = std::fs::read_to_string(&path).map_err(|source| BuildError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(Manifest::parse(&text))
    }

    /// Assemble `entry` and return it with its manifest.
    ///
    /// Each call starts from an empty visited set, so repeated calls on an
    /// unchanged tree return identical output.
    pub fn assemble(&self, entry: impl AsRef<Path>) -> Result<Assembly, BuildError> {
        let entry = entry.as_ref();
        let manifest = self.load_manifest(entry)?;
        let mut resolution = Resolution {
            ctx: self,
            visited: HashSet::new(),
            depth: 0,
        };
        let text = resolution.build(entry)?;
        tracing::debug!(
            entry = %entry.display(),
            files = resolution.visited.len(),
            bytes = text.len(),
            "assembled"
        );
        Ok(Assembly { manifest, text })
    }
}

/// Assemble `entry` under `root` with the given defined symbols.
pub fn assemble<I, S>(
    root: impl Into<PathBuf>,
    entry: impl AsRef<Path>,
    defines: I,
) -> Result<Assembly, BuildError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    BuildContext::new(root, defines).assemble(entry)
}

/// A classified directive line. Arguments are `None` when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive<'a> {
    Section(Option<&'a str>),
    If(Option<&'a str>),
    Else,
    Endif,
}

/// Classify a trimmed line by its leading token.
fn classify(trimmed: &str) -> Option<Directive<'_>> {
    if trimmed.starts_with(SECTION) {
        Some(Directive::Section(argument(trimmed)))
    } else if trimmed.starts_with(IF) {
        Some(Directive::If(argument(trimmed)))
    } else if trimmed.starts_with(ELSE) {
        Some(Directive::Else)
    } else if trimmed.starts_with(ENDIF) {
        Some(Directive::Endif)
    } else {
        None
    }
}

/// Everything after the first run of whitespace.
fn argument(trimmed: &str) -> Option<&str> {
    trimmed
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim_start())
        .filter(|rest| !rest.is_empty())
}

/// Mutable state of one in-flight build.
struct Resolution<'a> {
    ctx: &'a BuildContext,
    visited: HashSet<PathBuf>,
    depth: usize,
}

impl Resolution<'_> {
    fn build(&mut self, file: &Path) -> Result<String, BuildError> {
        let joined = self.ctx.root.join(file);
        let path = joined
            .canonicalize()
            .map_err(|source| BuildError::Read { path: joined, source })?;

        if self.visited.contains(&path) {
            return Err(BuildError::CircularInclude { path });
        }
        if self.depth >= self.ctx.max_depth {
            return Err(BuildError::DepthExceeded {
                path,
                limit: self.ctx.max_depth,
            });
        }
        self.visited.insert(path.clone());

        let text = std::fs::read_to_string(&path).map_err(|source| BuildError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(file = %path.display(), depth = self.depth + 1, "entering");

        self.depth += 1;
        let result = self.expand(&path, &text);
        self.depth -= 1;
        result
    }

    fn expand(&mut self, path: &Path, text: &str) -> Result<String, BuildError> {
        let mut output = String::with_capacity(text.len());
        let mut skip_stack: Vec<bool> = Vec::new();

        for (line_no, line) in manifest::body_lines(text) {
            let skipping = skip_stack.iter().any(|&s| s);

            match classify(line.trim()) {
                Some(Directive::Section(target)) => {
                    if skipping {
                        continue;
                    }
                    let target = target.ok_or_else(|| BuildError::MissingArgument {
                        directive: SECTION,
                        file: path.to_path_buf(),
                        line: line_no,
                    })?;
                    output.push_str(&self.build(Path::new(target))?);
                }
                Some(Directive::If(name)) => {
                    let name = name.ok_or_else(|| BuildError::MissingArgument {
                        directive: IF,
                        file: path.to_path_buf(),
                        line: line_no,
                    })?;
                    skip_stack.push(!self.ctx.is_defined(name));
                }
                Some(Directive::Else) => {
                    let Some((top, enclosing)) = skip_stack.split_last_mut() else {
                        return Err(BuildError::UnmatchedElse {
                            file: path.to_path_buf(),
                            line: line_no,
                        });
                    };
                    if !enclosing.iter().any(|&s| s) {
                        *top = !*top;
                    }
                }
                Some(Directive::Endif) => {
                    if skip_stack.pop().is_none() {
                        return Err(BuildError::UnmatchedEndif {
                            file: path.to_path_buf(),
                            line: line_no,
                        });
                    }
                }
                None => {
                    if !skipping {
                        output.push_str(line);
                    }
                }
            }
        }

        if !skip_stack.is_empty() {
            return Err(BuildError::UnterminatedConditional {
                file: path.to_path_buf(),
                open: skip_stack.len(),
            });
        }

        Ok(output)
    }
}
