use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use glob::{Pattern, glob};
use log::{debug, info};

use mitoqc_core::utils::basename_without_suffix;

use crate::table::SampleTable;

/// A kind of per-sample file, e.g. `stats=_mtanalysis_diagnostic_statistics.tsv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileKind {
    pub name: String,
    pub suffix: String,
}

impl FromStr for FileKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, suffix) = s
            .split_once('=')
            .with_context(|| format!("Expected kind=suffix, got '{}'", s))?;
        if name.is_empty() || suffix.is_empty() {
            anyhow::bail!("Expected kind=suffix with both parts set, got '{}'", s);
        }
        Ok(FileKind {
            name: name.to_string(),
            suffix: suffix.to_string(),
        })
    }
}

///
/// Files under `folder` whose name ends with `suffix`. With `recursive`
/// every depth is searched, otherwise only the folder itself.
///
pub fn find_files(folder: &Path, suffix: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let base = Pattern::escape(&folder.to_string_lossy());
    let name = format!("*{}", Pattern::escape(suffix));
    let pattern = match recursive {
        true => format!("{}/**/{}", base, name),
        false => format!("{}/{}", base, name),
    };
    debug!("Searching {}", pattern);

    let files = glob(&pattern).with_context(|| format!("Invalid search pattern {}", pattern))?;
    let mut files = files
        .map(|f| match f {
            Ok(path) => Ok(path),
            Err(e) => anyhow::bail!(format!("Error reading file entry: {:?}", e)),
        })
        .collect::<Result<Vec<_>>>()?;
    files.retain(|p| p.is_file());
    files.sort();
    Ok(files)
}

/// One column table `kind.name` of paths, keyed by the sample id in each file name.
fn listing(kind: &FileKind, files: Vec<PathBuf>) -> Result<SampleTable> {
    let mut table = SampleTable::new(vec![kind.name.clone()]);
    for path in files {
        let sample = basename_without_suffix(&path, &kind.suffix)
            .with_context(|| format!("Cannot derive a sample id from {:?}", path))?;
        table
            .push_row(&sample, vec![Some(path.to_string_lossy().into_owned())])
            .with_context(|| format!("Two {} files for sample {}", kind.name, sample))?;
    }
    Ok(table)
}

///
/// Discover per-sample files of every kind under `folders` and outer-merge
/// the listings on sample id. With `enforce_nonmissing`, a sample lacking
/// any kind of file is an error.
///
pub fn discover(
    folders: &[PathBuf],
    kinds: &[FileKind],
    recursive: bool,
    enforce_nonmissing: bool,
) -> Result<SampleTable> {
    if kinds.is_empty() {
        anyhow::bail!("At least one kind=suffix pair is required");
    }

    let mut merged: Option<SampleTable> = None;
    for kind in kinds {
        let mut files = Vec::new();
        for folder in folders {
            files.extend(find_files(folder, &kind.suffix, recursive)?);
        }
        info!("Found {} {} files", files.len(), kind.name);

        let table = listing(kind, files)?;
        merged = Some(match merged {
            Some(m) => m.outer_merge(&table)?,
            None => table,
        });
    }

    let merged = merged.unwrap_or_default();
    if enforce_nonmissing && merged.has_missing() {
        let incomplete: Vec<&str> = merged
            .rows()
            .filter(|(_, v)| v.iter().any(Option::is_none))
            .map(|(s, _)| s.as_str())
            .collect();
        anyhow::bail!(
            "{} samples are missing at least one file kind: {}",
            incomplete.len(),
            incomplete.join(", ")
        );
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::TempDir;

    #[fixture]
    fn outputs() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (sub, name) in [
            ("run1", "a_stats.tsv"),
            ("run1", "a.cov.tsv"),
            ("run2", "b_stats.tsv"),
            ("run2", "b.cov.tsv"),
            ("run2", "c_stats.tsv"),
        ] {
            let folder = dir.path().join(sub);
            std::fs::create_dir_all(&folder).unwrap();
            std::fs::write(folder.join(name), "").unwrap();
        }
        dir
    }

    fn kinds() -> Vec<FileKind> {
        vec![
            "stats=_stats.tsv".parse().unwrap(),
            "coverage=.cov.tsv".parse().unwrap(),
        ]
    }

    #[rstest]
    #[case("stats=_stats.tsv", true)]
    #[case("stats", false)]
    #[case("=_stats.tsv", false)]
    #[case("stats=", false)]
    fn test_parse_file_kind(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(raw.parse::<FileKind>().is_ok(), ok);
    }

    #[rstest]
    fn test_find_files_depth(outputs: TempDir) {
        assert!(find_files(outputs.path(), "_stats.tsv", false).unwrap().is_empty());
        assert_eq!(find_files(outputs.path(), "_stats.tsv", true).unwrap().len(), 3);
    }

    #[rstest]
    fn test_discover_outer_merges_kinds(outputs: TempDir) {
        let table = discover(&[outputs.path().to_path_buf()], &kinds(), true, false).unwrap();
        assert_eq!(table.sample_ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(table.get("a", "coverage").unwrap().ends_with("a.cov.tsv"));
        assert_eq!(table.get("c", "coverage"), None);
    }

    #[rstest]
    fn test_discover_enforces_nonmissing(outputs: TempDir) {
        let err = discover(&[outputs.path().to_path_buf()], &kinds(), true, true).unwrap_err();
        assert!(err.to_string().contains("c"));
    }

    #[rstest]
    fn test_discover_over_several_folders(outputs: TempDir) {
        let folders = vec![outputs.path().join("run1"), outputs.path().join("run2")];
        let table = discover(&folders, &kinds(), false, false).unwrap();
        assert_eq!(table.len(), 3);
    }
}
