pub const TABLE_FILE_EXT: &str = "kt";

pub const CHROM_COL: &str = "chrom";
pub const POS_COL: &str = "pos";
pub const TARGET_COL: &str = "target";
pub const SAMPLE_COL: &str = "s";
pub const MEAN_COVERAGE_COL: &str = "mean_coverage";

/// Entry field of wide matrices and long region tables.
pub const COVERAGE_FIELD: &str = "coverage";

pub const COVERAGE_ORIGINAL: &str = "coverage_original";
pub const COVERAGE_REMAPPED_SELF: &str = "coverage_remapped_self";
pub const COVERAGE_REMAPPED_SELF_SHIFTED: &str = "coverage_remapped_self_shifted";

pub const MANIFEST_PARTICIPANT_COL: &str = "participant_id";
pub const MANIFEST_PATH_COL: &str = "base_level_coverage_metrics";
pub const MANIFEST_SAMPLE_COL: &str = "sample";
pub const BATCH_COL: &str = "batch";
pub const BATCH_PATH_COL: &str = "coverage";
