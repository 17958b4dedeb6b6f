//! Filesystem discovery (§6 "File formats", §9 "Shared mutable process state
//! in the CLI"): the concrete [`Discovery`] the core's resolver consumes.
//!
//! Search roots are walked with `walkdir`, matching the `crypto-key*` /
//! `crypto-lic*` glob patterns and skipping editor backup files (`*~`).
//! Write-order for newly persisted material defaults to the reverse of the
//! read order (most general search root first) unless `--reverse` flips it.

use crate::error::CliError;
use licensing_core::resolver::{Discovery, RawCandidate};
use licensing_core::{LicenseError, Result as LicenseResult};
use std::path::{Path, PathBuf};

pub struct FsDiscovery {
    basename: String,
    search_paths: Vec<PathBuf>,
    reverse: bool,
}

impl FsDiscovery {
    #[must_use]
    pub fn new(basename: impl Into<String>, mut search_paths: Vec<PathBuf>, reverse: bool) -> Self {
        if search_paths.is_empty() {
            search_paths.push(PathBuf::from("."));
        }
        Self { basename: basename.into(), search_paths, reverse }
    }

    fn candidates(&self, prefix: &str) -> LicenseResult<Vec<RawCandidate>> {
        let mut out = Vec::new();
        for root in &self.search_paths {
            for entry in walkdir::WalkDir::new(root).into_iter().filter_map(std::result::Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                if !matches_pattern(entry.path(), &self.basename, prefix) {
                    continue;
                }
                let content = std::fs::read_to_string(entry.path()).map_err(|source| {
                    CliError::Read {
                        path: entry.path().display().to_string().into(),
                        source,
                        context: None,
                    }
                })?;
                out.push((entry.path().display().to_string(), content));
            }
        }
        Ok(out)
    }
}

/// `<basename>.crypto-key*` / `<basename>.crypto-lic*`, skipping `*~` backups.
fn matches_pattern(path: &Path, basename: &str, prefix: &str) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { return false };
    if file_name.ends_with('~') {
        return false;
    }
    let Some(rest) = file_name.strip_prefix(basename) else { return false };
    rest.strip_prefix('.').is_some_and(|rest| rest.starts_with(prefix))
}

impl Discovery for FsDiscovery {
    fn keypair_candidates(&self) -> LicenseResult<Vec<RawCandidate>> {
        self.candidates("crypto-key")
    }

    fn license_candidates(&self) -> LicenseResult<Vec<RawCandidate>> {
        self.candidates("crypto-lic")
    }

    fn persist_keypair(&self, content: &str) -> LicenseResult<String> {
        let mut roots = self.search_paths.clone();
        if !self.reverse {
            roots.reverse();
        }
        let root = roots.first().ok_or_else(|| {
            LicenseError::from(CliError::NoWritablePath { context: None })
        })?;

        let path = root.join(format!("{}.crypto-keypair", self.basename));
        let tmp_path = path.with_extension("crypto-keypair.tmp");
        std::fs::write(&tmp_path, content).map_err(|source| {
            LicenseError::from(CliError::Write { path: tmp_path.display().to_string().into(), source, context: None })
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|source| {
            LicenseError::from(CliError::Write { path: path.display().to_string().into(), source, context: None })
        })?;

        Ok(path.display().to_string())
    }
}
