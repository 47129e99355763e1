use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Whether rows are keyed by locus alone or by locus and target label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowKeyKind {
    Locus,
    LocusTarget,
}

///
/// Row key of a coverage table: a locus, optionally qualified by the target
/// region it was counted in. Ordering is (chrom, pos, target), so the rows
/// of one target on one contig come out in position order.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    pub chrom: String,
    pub pos: i32,
    pub target: Option<String>,
}

impl RowKey {
    pub fn locus(chrom: &str, pos: i32) -> Self {
        RowKey {
            chrom: chrom.to_string(),
            pos,
            target: None,
        }
    }

    pub fn with_target(chrom: &str, pos: i32, target: &str) -> Self {
        RowKey {
            chrom: chrom.to_string(),
            pos,
            target: Some(target.to_string()),
        }
    }

    pub fn kind(&self) -> RowKeyKind {
        match self.target {
            Some(_) => RowKeyKind::LocusTarget,
            None => RowKeyKind::Locus,
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

impl Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}:{} ({})", self.chrom, self.pos, target),
            None => write!(f, "{}:{}", self.chrom, self.pos),
        }
    }
}
