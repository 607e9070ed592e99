//! Isoform collapsing.
//!
//! Annotation tables carry one row per transcript, so a gene with several
//! isoforms appears several times. The cluster scan works on genes, not
//! transcripts, so all rows sharing a `(gene_id, seqname)` identity are
//! collapsed into a single genomic interval whose annotation evidence is
//! the union of its isoforms'.

use crate::cazloci_utils::distinct_not_empty;
use crate::error::CazLociError;
use crate::reader::GeneRecord;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// One biological gene after isoform collapse.
///
/// `start`/`end` are the min/max envelope over the corrected coordinates of
/// all isoforms; `transcript_id`, `interpro`, `go_terms` and `cazyme` hold
/// the distinct, non-empty, `;`-joined union of the per-isoform values.
pub struct MergedGene {
    pub gene_id: String,
    pub transcript_id: String,
    pub seqname: String,
    pub start: i64,
    pub end: i64,
    pub strand: Option<String>,
    pub interpro: String,
    pub go_terms: String,
    pub cazyme: String,
    pub antismash: String,
}

impl From<GeneRecord> for MergedGene {
    fn from(rec: GeneRecord) -> MergedGene {
        MergedGene {
            gene_id: rec.gene_id,
            transcript_id: rec.transcript_id,
            seqname: rec.seqname,
            start: rec.start,
            end: rec.end,
            strand: rec.strand,
            interpro: rec.interpro,
            go_terms: rec.go_terms,
            cazyme: rec.cazyme,
            antismash: rec.antismash,
        }
    }
}

/// Collapses a flat record list into one [MergedGene] per distinct
/// `(gene_id, seqname)` pair.
///
/// The steps, in order:
///
/// 1. Reversed coordinates (`start > end`) are swapped per record.
/// 2. The records are stable-sorted by `(seqname, start, end)` ascending.
/// 3. Records are grouped by `(gene_id, seqname)`, preserving the order in
///    which each key first appears in the sorted sequence.
/// 4. A singleton group passes through unchanged; a larger group takes the
///    min/max coordinate envelope and, for each annotation field, the
///    distinct non-empty union of the isoform values joined with `;`.
///    The remaining fields come from the group's first record.
///
/// An empty group cannot arise from input data, only from a grouping
/// defect, and aborts with [CazLociError::GroupingInvariant].
pub fn merge_isoforms(mut records: Vec<GeneRecord>) -> anyhow::Result<Vec<MergedGene>> {
    let n_records = records.len();

    for rec in records.iter_mut() {
        if rec.start > rec.end {
            std::mem::swap(&mut rec.start, &mut rec.end);
        }
    }

    records.sort_by(|a, b| {
        (a.seqname.as_str(), a.start, a.end).cmp(&(b.seqname.as_str(), b.start, b.end))
    });

    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<GeneRecord>> = HashMap::new();
    for rec in records {
        let key = (rec.gene_id.clone(), rec.seqname.clone());
        let isoforms = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        isoforms.push(rec);
    }

    let mut merged = Vec::with_capacity(order.len());
    for key in order {
        let isoforms = groups.remove(&key).filter(|g| !g.is_empty());
        let Some(mut isoforms) = isoforms else {
            return Err(CazLociError::GroupingInvariant {
                key: format!("{}_{}", key.0, key.1),
            }
            .into());
        };

        if isoforms.len() == 1 {
            merged.push(MergedGene::from(isoforms.pop().unwrap()));
            continue;
        }

        let start = isoforms.iter().map(|r| r.start).min().unwrap();
        let end = isoforms.iter().map(|r| r.end).max().unwrap();
        let join = |field: fn(&GeneRecord) -> &str| {
            distinct_not_empty(isoforms.iter().map(|r| field(r))).join(";")
        };

        let first = &isoforms[0];
        merged.push(MergedGene {
            gene_id: first.gene_id.clone(),
            seqname: first.seqname.clone(),
            strand: first.strand.clone(),
            start,
            end,
            transcript_id: join(|r| &r.transcript_id),
            interpro: join(|r| &r.interpro),
            go_terms: join(|r| &r.go_terms),
            cazyme: join(|r| &r.cazyme),
            antismash: join(|r| &r.antismash),
        });
    }

    info!(
        "collapsed {} annotation rows into {} genes",
        n_records,
        merged.len()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(gene_id: &str, transcript_id: &str, seqname: &str, start: i64, end: i64) -> GeneRecord {
        GeneRecord {
            gene_id: gene_id.to_string(),
            transcript_id: transcript_id.to_string(),
            seqname: seqname.to_string(),
            start,
            end,
            ..GeneRecord::default()
        }
    }

    #[test]
    fn test_single_isoform_passes_through() {
        let mut one = rec("g1", "t1", "chr1", 100, 200);
        one.interpro = String::from("IPR000001");
        one.cazyme = String::from("GH5");
        let merged = merge_isoforms(vec![one.clone()]).unwrap();
        assert_eq!(merged, vec![MergedGene::from(one)]);
    }

    #[test]
    fn test_single_isoform_coordinates_corrected() {
        let merged = merge_isoforms(vec![rec("g1", "t1", "chr1", 200, 100)]).unwrap();
        assert_eq!(merged[0].start, 100);
        assert_eq!(merged[0].end, 200);
    }

    #[test]
    fn test_envelope() {
        let merged = merge_isoforms(vec![
            rec("g1", "t1", "chr1", 150, 300),
            rec("g1", "t2", "chr1", 100, 250),
            // reversed isoform still contributes its corrected interval
            rec("g1", "t3", "chr1", 400, 120),
        ])
        .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, 100);
        assert_eq!(merged[0].end, 400);
        assert_eq!(merged[0].transcript_id, "t2;t3;t1");
    }

    #[test]
    fn test_annotation_union_is_order_independent() {
        let mut a = rec("g1", "t1", "chr1", 100, 200);
        a.interpro = String::from("IPR000001");
        a.go_terms = String::from("GO:0005215");
        let mut b = rec("g1", "t2", "chr1", 100, 200);
        b.interpro = String::from("IPR000002");
        let mut c = rec("g1", "t3", "chr1", 100, 200);
        c.interpro = String::from("IPR000001");

        let m1 = merge_isoforms(vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let m2 = merge_isoforms(vec![c, b, a]).unwrap();

        for m in [&m1[0], &m2[0]] {
            let mut terms: Vec<&str> = m.interpro.split(';').collect();
            terms.sort_unstable();
            assert_eq!(terms, vec!["IPR000001", "IPR000002"]);
            assert_eq!(m.go_terms, "GO:0005215");
        }
    }

    #[test]
    fn test_empty_values_excluded_from_union() {
        let mut a = rec("g1", "t1", "chr1", 100, 200);
        a.cazyme = String::from("GH5");
        let b = rec("g1", "t2", "chr1", 150, 250);
        let merged = merge_isoforms(vec![a, b]).unwrap();
        assert_eq!(merged[0].cazyme, "GH5");
    }

    #[test]
    fn test_same_gene_id_on_two_contigs_stays_separate() {
        let merged = merge_isoforms(vec![
            rec("g1", "t1", "chr1", 100, 200),
            rec("g1", "t2", "chr2", 100, 200),
        ])
        .unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_output_sorted_by_position() {
        let merged = merge_isoforms(vec![
            rec("g2", "t2", "chr1", 500, 600),
            rec("g1", "t1", "chr1", 100, 200),
            rec("g3", "t3", "chr0", 50, 80),
        ])
        .unwrap();
        let ids: Vec<&str> = merged.iter().map(|m| m.gene_id.as_str()).collect();
        assert_eq!(ids, vec!["g3", "g1", "g2"]);
    }
}
