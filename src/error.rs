//! Fatal invariant violations.
//!
//! Almost every malformed value in an annotation table is tolerated by
//! treating it as "no evidence". The two conditions below are different:
//! they can only arise from a defect in the grouping/ordering logic that
//! feeds a component, never from bad data, so they abort the run and carry
//! enough context to locate the offending rows upstream.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CazLociError {
    /// An isoform merge key resolved to an empty group. Grouping always
    /// inserts at least one record per key, so this cannot be triggered by
    /// input data.
    #[error("isoform merge key `{key}` resolved to an empty group")]
    GroupingInvariant { key: String },

    /// A cluster or secondary-metabolite group was asked for its single
    /// chromosome label but its member genes report more than one contig.
    #[error("expected genes from a single contig, found {contigs:?}")]
    ContigHomogeneity { contigs: Vec<String> },
}
