use anyhow::{Context, Result};
use log::{info, warn};

use crate::table::SampleTable;

pub const KEEP_COL: &str = "keep";
pub const MT_OVERLAPS_COL: &str = "num_mt_overlaps";
pub const HAPLOGROUP_COL: &str = "major_haplogroup";
pub const MEAN_COVERAGE_COL: &str = "mean_coverage";
pub const MEDIAN_COVERAGE_COL: &str = "median_coverage";
pub const NUC_MEAN_COVERAGE_COL: &str = "nuc_mean_coverage";

pub const HAP_GROUP_COL: &str = "hap_group";
pub const MTCN_COL: &str = "mtcn";
pub const MTCN_MEDIAN_COL: &str = "mtcn_median";

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => anyhow::bail!("Expected a boolean, got '{}'", other),
    }
}

fn parse_f64(sample: &str, column: &str, raw: Option<&str>) -> Result<Option<f64>> {
    raw.map(|v| {
        v.parse::<f64>()
            .with_context(|| format!("Sample {}: '{}' in {} is not a number", sample, v, column))
    })
    .transpose()
}

///
/// Coarse haplogroup: the first two characters for `HV*` and `L*`
/// haplogroups, otherwise the first character.
///
pub fn hap_group(major_haplogroup: &str) -> String {
    let n = match major_haplogroup.starts_with("HV") || major_haplogroup.starts_with('L') {
        true => 2,
        false => 1,
    };
    major_haplogroup.chars().take(n).collect()
}

/// `2 * coverage / nuclear_coverage`, or `None` without a usable nuclear coverage.
pub fn mt_copy_number(coverage: Option<f64>, nuc_mean_coverage: Option<f64>) -> Option<f64> {
    match (coverage, nuc_mean_coverage) {
        (Some(cov), Some(nuc)) if nuc > 0.0 => Some(2.0 * cov / nuc),
        _ => None,
    }
}

fn samples_to_keep(contamination: &SampleTable) -> Result<Vec<String>> {
    let keep_idx = contamination.require_column(KEEP_COL)?;
    let mut keep = Vec::new();
    for (s, values) in contamination.rows() {
        let Some(raw) = values[keep_idx].as_deref() else {
            continue;
        };
        if parse_bool(raw).with_context(|| format!("Invalid {} for sample {}", KEEP_COL, s))? {
            keep.push(s.clone());
        }
    }
    Ok(keep)
}

///
/// Filter sample stats and add derived columns.
///
/// Samples are kept when the contamination table marks them `keep` and
/// `num_mt_overlaps` is 0; a sample missing from the contamination table or
/// without an overlap count is dropped. Added columns are `hap_group`,
/// `mtcn` and `mtcn_median`.
pub fn filter_and_annotate(stats: &SampleTable, contamination: &SampleTable) -> Result<SampleTable> {
    let keep = samples_to_keep(contamination)?;
    let overlaps_idx = stats.require_column(MT_OVERLAPS_COL)?;

    let mut out = stats.clone();
    let n_before = out.len();
    out.retain(|s, _| keep.binary_search_by(|k| k.as_str().cmp(s)).is_ok());
    let n_clean = out.len();

    let mut bad_overlaps = Vec::new();
    out.retain(|s, values| match values[overlaps_idx].as_deref() {
        Some(raw) => match raw.parse::<f64>() {
            Ok(n) => n == 0.0,
            Err(_) => {
                bad_overlaps.push(s.to_string());
                false
            }
        },
        None => false,
    });
    if !bad_overlaps.is_empty() {
        anyhow::bail!(
            "Non-numeric {} for samples: {}",
            MT_OVERLAPS_COL,
            bad_overlaps.join(", ")
        );
    }
    info!(
        "Kept {} of {} samples ({} removed as contaminated, {} with mtDNA overlaps)",
        out.len(),
        n_before,
        n_before - n_clean,
        n_clean - out.len()
    );

    let hap_idx = out.require_column(HAPLOGROUP_COL)?;
    let mean_idx = out.require_column(MEAN_COVERAGE_COL)?;
    let median_idx = out.require_column(MEDIAN_COVERAGE_COL)?;
    let nuc_idx = out.require_column(NUC_MEAN_COVERAGE_COL)?;

    let mut hap_groups = Vec::with_capacity(out.len());
    let mut mtcn = Vec::with_capacity(out.len());
    let mut mtcn_median = Vec::with_capacity(out.len());
    for (s, values) in out.rows() {
        let cell = |idx: usize| values[idx].as_deref();
        let nuc = parse_f64(s, NUC_MEAN_COVERAGE_COL, cell(nuc_idx))?;
        if nuc == Some(0.0) {
            warn!("Sample {} has zero nuclear coverage; mtCN left missing", s);
        }
        let mean = parse_f64(s, MEAN_COVERAGE_COL, cell(mean_idx))?;
        let median = parse_f64(s, MEDIAN_COVERAGE_COL, cell(median_idx))?;

        hap_groups.push(cell(hap_idx).map(hap_group));
        mtcn.push(mt_copy_number(mean, nuc).map(|v| v.to_string()));
        mtcn_median.push(mt_copy_number(median, nuc).map(|v| v.to_string()));
    }

    out.push_column(HAP_GROUP_COL, hap_groups)?;
    out.push_column(MTCN_COL, mtcn)?;
    out.push_column(MTCN_MEDIAN_COL, mtcn_median)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn write(dir: &std::path::Path, name: &str, contents: &str) -> SampleTable {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        SampleTable::read_tsv(&path, "s").unwrap()
    }

    #[rstest]
    #[case("HV0a", "HV")]
    #[case("L3e", "L3")]
    #[case("H1", "H")]
    #[case("U5a", "U")]
    #[case("L", "L")]
    fn test_hap_group(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(hap_group(raw), expected);
    }

    #[rstest]
    #[case(Some(100.0), Some(40.0), Some(5.0))]
    #[case(Some(100.0), Some(0.0), None)]
    #[case(None, Some(40.0), None)]
    fn test_mt_copy_number(
        #[case] cov: Option<f64>,
        #[case] nuc: Option<f64>,
        #[case] expected: Option<f64>,
    ) {
        assert_eq!(mt_copy_number(cov, nuc), expected);
    }

    #[rstest]
    fn test_filter_and_annotate() {
        let dir = tempfile::tempdir().unwrap();
        let stats = write(
            dir.path(),
            "stats.tsv",
            "s\tnum_mt_overlaps\tmajor_haplogroup\tmean_coverage\tmedian_coverage\tnuc_mean_coverage\n\
             a\t0\tHV1\t3000\t2700\t30\n\
             b\t2\tH1\t3000\t2900\t30\n\
             c\t0\tL2\t3000\t2900\t30\n\
             d\t0\tU5\t4000\t4000\tNA\n\
             e\t0\tK1\t100\t100\t30\n",
        );
        let contamination = write(
            dir.path(),
            "contamination.tsv",
            "s\tkeep\na\ttrue\nb\ttrue\nc\tfalse\nd\tTrue\n",
        );

        let out = filter_and_annotate(&stats, &contamination).unwrap();
        assert_eq!(out.sample_ids().collect::<Vec<_>>(), vec!["a", "d"]);
        assert_eq!(out.get("a", "hap_group"), Some("HV"));
        assert_eq!(out.get("a", "mtcn"), Some("200"));
        assert_eq!(out.get("a", "mtcn_median"), Some("180"));
        assert_eq!(out.get("d", "mtcn"), None);
    }

    #[rstest]
    fn test_filter_requires_keep_column() {
        let dir = tempfile::tempdir().unwrap();
        let stats = write(dir.path(), "stats.tsv", "s\tnum_mt_overlaps\na\t0\n");
        let contamination = write(dir.path(), "c.tsv", "s\tdrop\na\tfalse\n");
        assert!(filter_and_annotate(&stats, &contamination).is_err());
    }
}
