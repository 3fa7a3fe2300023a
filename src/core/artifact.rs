//! SP-004: Artifact settings — entry resolution, output naming, rendering, writing.
//!
//! Settings come from three layers, highest first: command-line overrides,
//! the entry file's manifest, built-in defaults.

use super::error::BuildError;
use super::manifest::Manifest;
use super::types::{BuildMode, DEFAULT_ARTIFACT, DEFAULT_ENTRY};
use std::path::{Path, PathBuf};

/// Command-line values that take precedence over the manifest.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output: Option<String>,
    pub build_mode: Option<BuildMode>,
}

/// Effective settings for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSettings {
    /// Artifact file name.
    pub output: String,
    pub mode: BuildMode,
    /// Interpreter path for the `#!` line.
    pub shebang: Option<String>,
    /// The output name came from the command line.
    pub explicit_output: bool,
}

impl ArtifactSettings {
    pub fn resolve(manifest: &Manifest, overrides: &Overrides) -> Self {
        let output = overrides
            .output
            .clone()
            .or_else(|| manifest.artifact_name().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ARTIFACT.to_string());
        let mode = overrides
            .build_mode
            .or_else(|| manifest.build_mode())
            .unwrap_or_default();
        Self {
            output,
            mode,
            shebang: manifest.shebang().map(str::to_string),
            explicit_output: overrides.output.is_some(),
        }
    }

    /// Run mode only executes when no output file was requested explicitly.
    pub fn executes(&self) -> bool {
        self.mode == BuildMode::Run && !self.explicit_output
    }

    /// Where the artifact lands: the temp dir when executed, else `root`.
    pub fn target_path(&self, root: &Path) -> PathBuf {
        if self.executes() {
            std::env::temp_dir().join(&self.output)
        } else {
            root.join(&self.output)
        }
    }

    /// Prefix the shebang line, if any.
    pub fn render(&self, text: &str) -> String {
        match &self.shebang {
            Some(interpreter) => format!("#!{}\n{}", interpreter, text),
            None => text.to_string(),
        }
    }
}

/// Resolve the command-line input to `(root, entry file name)`.
///
/// A directory means its `index.splice`. The root is the canonical parent
/// of the entry file.
pub fn resolve_input(input: &Path) -> Result<(PathBuf, String), BuildError> {
    let entry = if input.is_dir() {
        input.join(DEFAULT_ENTRY)
    } else {
        input.to_path_buf()
    };

    if !entry.is_file() {
        return Err(BuildError::Read {
            path: entry,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "entry file not found"),
        });
    }

    let parent = match entry.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let root = parent.canonicalize().map_err(|source| BuildError::Read {
        path: parent.to_path_buf(),
        source,
    })?;
    let name = entry
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_ENTRY.to_string());

    Ok((root, name))
}

/// Write an artifact atomically (temp file + rename), optionally marking it
/// executable.
pub fn write_artifact(path: &Path, content: &str, executable: bool) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err(parent))?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));
    std::fs::write(&tmp_path, content).map_err(write_err(&tmp_path))?;

    #[cfg(unix)]
    if executable {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o755))
            .map_err(write_err(&tmp_path))?;
    }
    #[cfg(not(unix))]
    let _ = executable;

    std::fs::rename(&tmp_path, path).map_err(write_err(path))?;
    Ok(())
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError {
    let path = path.to_path_buf();
    move |source| BuildError::Write { path, source }
}
