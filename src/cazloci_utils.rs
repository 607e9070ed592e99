use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::io::BufRead;

lazy_static! {
    static ref CONTIG_TAIL_DIGITS: Regex = Regex::new(r"\d+$").unwrap();
    static ref EMBEDDED_DIGITS: Regex = Regex::new(r"\d+").unwrap();
}

/// The canonical column names of the annotation table, in the order they
/// appear in the data frame.
pub static ANNOTCOLUMNS: [&str; 10] = [
    "gene_id",
    "transcript_id",
    "seqname",
    "start",
    "end",
    "strand",
    "interpro",
    "go_terms",
    "cazyme",
    "antismash",
];

/// Tests if the stream underlying the [BufReader](std::io::BufReader) `reader` is gzipped or not by examining the
/// first 2 bytes for the magic header.  This function *requires*, but does not check, that
/// none of the stream has yet been consumed (i.e. that no read calls have yet been issued
/// to `reader`). It will fill the buffer to examine the first two bytes, but will not consume
/// them.
///
/// If the first 2 bytes could be succesfully read, this returns
/// [Ok]`(true)` if the file is a gzipped file
/// [Ok]`(false)` if it is not a gzipped file
///
/// If the first 2 bytes could not be succesfully read, then this
/// returns the relevant [std::io::Error].
pub fn is_gzipped<T: BufRead>(reader: &mut T) -> std::io::Result<bool> {
    const GZIP_MAGIC_NUMBER: [u8; 2] = [0x1f, 0x8b];

    let src = reader.fill_buf()?;
    if src.get(..2) == Some(&GZIP_MAGIC_NUMBER) {
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Derives the chromosome label of a contig identifier.
///
/// Track lines report a compact chromosome label rather than the full
/// contig name: the trailing run of digits of the identifier if there is
/// one (`"scaffold_7"` becomes `"7"`), otherwise the identifier verbatim.
///
/// # Examples
///
/// ```rust
/// use cazloci::cazloci_utils::chromosome_label;
///
/// assert_eq!(chromosome_label("scaffold_7"), "7");
/// assert_eq!(chromosome_label("mito"), "mito");
/// ```
pub fn chromosome_label<T: AsRef<str>>(contig: T) -> String {
    let contig = contig.as_ref();
    match CONTIG_TAIL_DIGITS.find(contig) {
        Some(m) => m.as_str().to_string(),
        None => contig.to_string(),
    }
}

/// Extracts the embedded numeric cluster id of a secondary-metabolite tag,
/// i.e. the first run of digits anywhere in the tag. Returns [None] when
/// the tag carries no digits at all.
pub fn sm_cluster_id(tag: &str) -> Option<&str> {
    EMBEDDED_DIGITS.find(tag).map(|m| m.as_str())
}

/// Derives the single chromosome label a group of genes reports.
///
/// Every gene of a cluster or secondary-metabolite group must come from
/// the same contig; the upstream sort guarantees it. Finding more than one
/// contig here is a data-integrity violation
/// ([ContigHomogeneity](crate::error::CazLociError::ContigHomogeneity))
/// and aborts the run with the full offending contig set.
pub fn group_label<'a, I>(contigs: I) -> Result<String, crate::error::CazLociError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut contigs = contigs.into_iter();
    let Some(first) = contigs.next() else {
        return Err(crate::error::CazLociError::ContigHomogeneity {
            contigs: Vec::new(),
        });
    };

    let mut offending: Vec<String> = Vec::new();
    for contig in contigs {
        if contig != first && !offending.iter().any(|c| c == contig) {
            offending.push(contig.to_string());
        }
    }
    if !offending.is_empty() {
        let mut all = vec![first.to_string()];
        all.extend(offending);
        return Err(crate::error::CazLociError::ContigHomogeneity { contigs: all });
    }

    Ok(chromosome_label(first))
}

/// Returns the distinct, non-empty values of `values` in order of first
/// appearance. This is the union rule for every annotation field of a
/// merged gene: duplicates collapse, empty strings vanish, and the input
/// order is preserved so the result is deterministic.
pub fn distinct_not_empty<'a, I>(values: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for v in values {
        if !v.is_empty() && seen.insert(v) {
            out.push(v);
        }
    }
    out
}
