//! Cazloci turns a genome-wide functional-annotation table (gene calls
//! annotated with domain signatures, ontology terms, secondary-metabolite
//! tags and carbohydrate-active-enzyme calls) into a genomic track of gene
//! clusters.  Transcript rows are first collapsed into one interval per
//! gene with unioned annotation evidence; a single windowed scan over the
//! genes of each contig then decides cluster boundaries and acceptance.
//! The resulting track carries secondary-metabolite regions, CAZyme gene
//! clusters and per-gene CAZyme annotations.

pub mod cazloci_info;
pub mod cazloci_utils;
pub mod cluster;
pub mod error;
pub mod merge;
pub mod options;
pub mod reader;
pub use cazloci_info::{CazLoci, SmCluster, SmClusterId};
pub use cluster::{ClassCounts, ClusterScan, GeneClass, GeneCluster, SignatureGene};
pub use error::CazLociError;
pub use merge::{merge_isoforms, MergedGene};
pub use options::ClusterOptions;
