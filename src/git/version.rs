use crate::error::{EngineError, EngineResult};
use std::path::Path;
use std::process::Command;

/// Oldest git the engine's command formats are known to work with.
const MIN_GIT_VERSION: (u32, u32) = (2, 20);

/// Version of the external git binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Detect the version of the binary on PATH.
    pub fn detect() -> EngineResult<Self> {
        Self::detect_binary("git")
    }

    /// Detect the version of a specific binary.
    pub fn detect_binary<P: AsRef<Path>>(binary: P) -> EngineResult<Self> {
        let output = Command::new(binary.as_ref()).arg("--version").output()?;

        if !output.status.success() {
            return Err(EngineError::Parse(crate::error::ParseError::Malformed(
                "git --version failed".to_string(),
            )));
        }

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse output like `git version 2.39.2` (or `2.39.2.windows.1`).
    pub fn parse(text: &str) -> EngineResult<Self> {
        let malformed =
            || crate::error::ParseError::Malformed(format!("unexpected version output: {text}"));

        let number = text
            .split_whitespace()
            .nth(2)
            .ok_or_else(malformed)?;
        let mut nums = number.split('.');

        let major = nums
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(malformed)?;
        let minor = nums
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(malformed)?;
        // Trailing platform suffixes make the patch level best-effort.
        let patch = nums.next().and_then(|n| n.parse().ok()).unwrap_or(0);

        Ok(GitVersion {
            major,
            minor,
            patch,
        })
    }

    pub fn is_supported(&self) -> bool {
        (self.major, self.minor) >= MIN_GIT_VERSION
    }

    /// Detect and require a supported version.
    pub fn validate<P: AsRef<Path>>(binary: P) -> EngineResult<Self> {
        let version = Self::detect_binary(binary)?;
        if version.is_supported() {
            Ok(version)
        } else {
            Err(EngineError::UnsupportedGitVersion(
                version.to_string(),
                format!("{}.{}", MIN_GIT_VERSION.0, MIN_GIT_VERSION.1),
            ))
        }
    }
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_output() {
        let v = GitVersion::parse("git version 2.39.2\n").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (2, 39, 2));
    }

    #[test]
    fn test_parse_platform_suffix() {
        let v = GitVersion::parse("git version 2.41.0.windows.1").unwrap();
        assert_eq!((v.major, v.minor), (2, 41));
    }

    #[test]
    fn test_parse_two_component_version() {
        let v = GitVersion::parse("git version 3.0").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (3, 0, 0));
    }

    #[test]
    fn test_parse_garbage_rejected() {
        assert!(GitVersion::parse("not a version").is_err());
        assert!(GitVersion::parse("git version x.y").is_err());
    }

    #[test]
    fn test_support_boundary() {
        assert!(!GitVersion::parse("git version 2.19.1").unwrap().is_supported());
        assert!(GitVersion::parse("git version 2.20.0").unwrap().is_supported());
        assert!(GitVersion::parse("git version 3.1.0").unwrap().is_supported());
    }

    #[test]
    fn test_detect_real_git() {
        let version = GitVersion::detect().unwrap();
        assert!(version.major >= 2);
    }
}
