//! File-system side of `relgen`: finding annotated headers, computing the
//! include path the generated code uses, and writing the generated units.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use relgen_compiler::{compile_header, error::RelgenError, GenOptions, GeneratedUnit};
use tracing::{debug, error, info};
use walkdir::{DirEntry, WalkDir};

const HEADER_EXTENSIONS: [&str; 3] = ["h", "hpp", "hh"];

/// Outcome of a `generate` run. Failed files do not stop the others.
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub written: Vec<PathBuf>,
    pub failed:  Vec<(PathBuf, RelgenError)>,
}

fn is_generated_output(path: &Path) -> bool {
    path.to_string_lossy().contains("generated")
        || path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains("Wrapper"))
}

/// A header that may carry annotations: right extension, not a previous output.
pub fn is_candidate(path: &Path) -> bool {
    let is_header = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| HEADER_EXTENSIONS.contains(&ext));
    is_header && !is_generated_output(path)
}

/// Expands files and directories into the list of headers to scan.
/// Directories are walked recursively in file-name order.
pub fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>, RelgenError> {
    let mut sources = Vec::new();
    for path in paths {
        if path.is_file() {
            sources.push(path.clone());
        } else if path.is_dir() {
            // Filters look at the path below the walk root only.
            let relative = |entry: &DirEntry| -> PathBuf {
                entry.path().strip_prefix(path).unwrap_or(entry.path()).to_path_buf()
            };
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !e.file_type().is_dir() || !is_generated_output(&relative(e)))
            {
                let entry = entry.map_err(|e| RelgenError::InvalidSource {
                    path: path.clone(),
                    msg:  e.to_string(),
                })?;
                if entry.file_type().is_file() && is_candidate(&relative(&entry)) {
                    sources.push(entry.into_path());
                }
            }
        } else {
            return Err(RelgenError::InvalidSource {
                path: path.clone(),
                msg:  "not a file or directory".to_string(),
            });
        }
    }
    Ok(sources)
}

/// `target` relative to `base`, with `/` separators. Both are made absolute first.
pub fn relative_include(target: &Path, base: &Path) -> Result<String, RelgenError> {
    let target = fs::canonicalize(target)?;
    let base = fs::canonicalize(base)?;

    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); base_parts.len() - common];
    parts.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    Ok(parts.join("/"))
}

/// Compiles one header. `output_dir` must exist; it anchors the include path.
pub fn compile_file(source: &Path, output_dir: &Path) -> Result<Vec<GeneratedUnit>, RelgenError> {
    let text = fs::read_to_string(source)?;
    let source_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let options = GenOptions {
        source_include: relative_include(source, output_dir)?,
        source_name,
    };
    compile_header(&text, &source.to_string_lossy(), &options)
}

/// Scans `sources`, writes one header per entity into `output_dir`.
pub fn run_generate(sources: &[PathBuf], output_dir: &Path) -> Result<GenerateReport, RelgenError> {
    fs::create_dir_all(output_dir)?;
    let mut report = GenerateReport::default();

    for source in collect_sources(sources)? {
        debug!("scanning {}", source.display());
        let units = match compile_file(&source, output_dir) {
            Ok(units) => units,
            Err(e) => {
                error!("{}: {}", source.display(), e);
                report.failed.push((source, e));
                continue;
            }
        };
        for unit in units {
            let out_path = output_dir.join(&unit.file_name);
            fs::write(&out_path, &unit.text)?;
            info!("Generated {} from {}", out_path.display(), source.display());
            report.written.push(out_path);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_candidate() {
        assert!(is_candidate(Path::new("models/User.h")));
        assert!(is_candidate(Path::new("models/User.hpp")));
        assert!(!is_candidate(Path::new("models/User.cpp")));
        assert!(!is_candidate(Path::new("models/UserWrapper.h")));
        assert!(!is_candidate(Path::new("generated/User.h")));
    }
}
