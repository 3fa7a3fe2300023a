//! SP-001: Shared types — directive tokens, manifest sentinels, build modes.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::manifest::Manifest;

// ============================================================================
// Directive tokens
// ============================================================================

/// Include and recursively assemble another file.
pub const SECTION: &str = "#:section";

/// Open a conditional block, skipped unless the symbol is defined.
pub const IF: &str = "#:if";

/// Invert the innermost block's skip state.
pub const ELSE: &str = "#:else";

/// Close the innermost conditional block.
pub const ENDIF: &str = "#:endif";

// ============================================================================
// Manifest sentinels
// ============================================================================

pub const MANIFEST_START: &str = "0o ---";
pub const MANIFEST_END: &str = "--- o0";

/// Manifest keys read by the orchestrator.
pub const KEY_SHEBANG: &str = "shebang";
pub const KEY_ARTIFACT_NAME: &str = "artifact-name";
pub const KEY_BUILD_MODE: &str = "build-mode";

/// Entry file looked up when the input is a directory.
pub const DEFAULT_ENTRY: &str = "index.splice";

/// Artifact name when neither the CLI nor the manifest names one.
pub const DEFAULT_ARTIFACT: &str = "dist.py";

/// Include nesting limit for a single build.
pub const DEFAULT_MAX_DEPTH: usize = 64;

// ============================================================================
// Build mode
// ============================================================================

/// What happens to the assembled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Write to the temp dir and execute it.
    Run,
    /// Write next to the entry file.
    #[default]
    Prod,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Run => write!(f, "run"),
            BuildMode::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(BuildMode::Run),
            "prod" => Ok(BuildMode::Prod),
            other => Err(format!("unknown build mode '{}' (expected run or prod)", other)),
        }
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Result of a top-level build: the entry manifest and the assembled text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub manifest: Manifest,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sp001_build_mode_parse() {
        assert_eq!("run".parse::<BuildMode>().unwrap(), BuildMode::Run);
        assert_eq!("prod".parse::<BuildMode>().unwrap(), BuildMode::Prod);
        assert!("debug".parse::<BuildMode>().is_err());
        assert!("RUN".parse::<BuildMode>().is_err());
    }

    #[test]
    fn test_sp001_build_mode_display_roundtrip() {
        for mode in [BuildMode::Run, BuildMode::Prod] {
            assert_eq!(mode.to_string().parse::<BuildMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_sp001_build_mode_default() {
        assert_eq!(BuildMode::default(), BuildMode::Prod);
    }

    #[test]
    fn test_sp001_build_mode_serde() {
        let json = serde_json::to_string(&BuildMode::Run).unwrap();
        assert_eq!(json, "\"run\"");
    }

    #[test]
    fn test_sp001_else_not_prefixed_by_if() {
        // Classification checks `#:if` before `#:else`/`#:endif`; neither may
        // start with it or they would be misread as conditionals.
        assert!(!ELSE.starts_with(IF));
        assert!(!ENDIF.starts_with(IF));
    }
}
