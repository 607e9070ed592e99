//! Gene classification and the cluster scan.
//!
//! The scan walks the merged gene list in genomic order, one contig after
//! another, and grows a candidate cluster gene by gene. Signature genes
//! (CAZymes, transcription factors, transporters) extend the candidate;
//! non-signature genes consume an interruption budget, and once the budget
//! is exhausted the candidate is closed and judged against the cluster
//! definition. Only accepted candidates survive.

use crate::cazloci_utils::group_label;
use crate::error::CazLociError;
use crate::merge::MergedGene;
use crate::options::ClusterOptions;
use crate::reader::TfList;
use tracing::debug;

/// The substring that marks a transporter annotation, matched against both
/// the InterPro and the GO term fields.
pub const TRANSPORTER_KEYWORD: &str = "transporter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The classification of a gene inside the scan.
///
/// A gene can textually match several categories at once; it is filed
/// under the highest-priority one (the declaration order here, top to
/// bottom).
pub enum GeneClass {
    Cazyme,
    TranscriptionFactor,
    Transporter,
    NonSignature,
}

impl std::fmt::Display for GeneClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneClass::Cazyme => write!(f, "CAZyme"),
            GeneClass::TranscriptionFactor => write!(f, "TF"),
            GeneClass::Transporter => write!(f, "TC"),
            GeneClass::NonSignature => write!(f, "NS"),
        }
    }
}

/// Classifies a merged gene.
///
/// The rules form an ordered list and are evaluated top to bottom; the
/// first match wins:
///
/// 1. CAZyme - the gene carries a CAZyme family assignment.
/// 2. Transcription factor - the InterPro annotation contains any entry of
///    the signature list.
/// 3. Transporter - the InterPro or GO annotation contains
///    [TRANSPORTER_KEYWORD].
///
/// A gene matching none of the rules is a non-signature gene.
pub fn classify(gene: &MergedGene, tf_list: &TfList) -> GeneClass {
    let is_cazyme = |g: &MergedGene| !g.cazyme.is_empty();
    let is_tf = |g: &MergedGene| tf_list.matches(&g.interpro);
    let is_tc = |g: &MergedGene| {
        g.interpro.contains(TRANSPORTER_KEYWORD) || g.go_terms.contains(TRANSPORTER_KEYWORD)
    };
    let rules: [(GeneClass, &dyn Fn(&MergedGene) -> bool); 3] = [
        (GeneClass::Cazyme, &is_cazyme),
        (GeneClass::TranscriptionFactor, &is_tf),
        (GeneClass::Transporter, &is_tc),
    ];

    rules
        .iter()
        .find(|(_, rule)| rule(gene))
        .map(|(class, _)| *class)
        .unwrap_or(GeneClass::NonSignature)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Per-class tallies of the open candidate cluster.
pub struct ClassCounts {
    pub cazyme: u32,
    pub transcription_factor: u32,
    pub transporter: u32,
    pub non_signature: u32,
}

impl ClassCounts {
    /// Records one gene of the given class. A signature gene also pays one
    /// unit of the interruption budget back: the non-signature tally drops
    /// by one, never below zero.
    pub fn record(&mut self, class: GeneClass) {
        match class {
            GeneClass::Cazyme => {
                self.cazyme += 1;
                self.non_signature = self.non_signature.saturating_sub(1);
            }
            GeneClass::TranscriptionFactor => {
                self.transcription_factor += 1;
                self.non_signature = self.non_signature.saturating_sub(1);
            }
            GeneClass::Transporter => {
                self.transporter += 1;
                self.non_signature = self.non_signature.saturating_sub(1);
            }
            GeneClass::NonSignature => self.non_signature += 1,
        }
    }
}

/// The cluster definition: decides whether a closed candidate with the
/// given tallies is a CAZyme gene cluster.
///
/// A candidate is accepted if either
///
/// * it holds at least `min_caz` CAZyme genes and no transcription factor
///   or transporter at all (a pure CAZyme cluster), or
/// * it holds at least `min_caz - 1` CAZyme genes and at least one
///   transcription factor or transporter (a near-threshold cluster rescued
///   by a regulatory/transport gene).
///
/// Pure function of the tallies; the non-signature count never enters the
/// verdict.
pub fn cluster_definition(counts: &ClassCounts, min_caz: u32) -> bool {
    let pure = counts.cazyme >= min_caz
        && counts.transcription_factor == 0
        && counts.transporter == 0;
    let rescued =
        counts.cazyme + 1 >= min_caz && counts.transcription_factor + counts.transporter >= 1;
    pure || rescued
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One gene as it appears inside a cluster: the classified, coordinate-only
/// view of a [MergedGene].
///
/// `id` prefers the transcript id (the `;`-joined union for a merged
/// multi-isoform gene) and falls back to the gene id.
pub struct SignatureGene {
    pub id: String,
    pub seqname: String,
    pub start: i64,
    pub end: i64,
    pub class: GeneClass,
}

impl SignatureGene {
    fn from_gene(gene: &MergedGene, class: GeneClass) -> SignatureGene {
        let id = if gene.transcript_id.is_empty() {
            gene.gene_id.clone()
        } else {
            gene.transcript_id.clone()
        };
        SignatureGene {
            id,
            seqname: gene.seqname.clone(),
            start: gene.start,
            end: gene.end,
            class,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An accepted cluster: a contiguous run of genes on one contig together
/// with the tallies it was judged on.
pub struct GeneCluster {
    pub genes: Vec<SignatureGene>,
    pub counts: ClassCounts,
}

impl GeneCluster {
    /// The chromosome label all member genes report.
    ///
    /// The scan only ever builds clusters from one contig, so finding more
    /// than one here means the input ordering this component relies on was
    /// violated upstream; that is a fatal
    /// [ContigHomogeneity](CazLociError::ContigHomogeneity) error, not a
    /// recoverable condition.
    pub fn chromosome_label(&self) -> Result<String, CazLociError> {
        group_label(self.genes.iter().map(|g| g.seqname.as_str()))
    }

    /// The min start / max end envelope over the member genes.
    pub fn span(&self) -> (i64, i64) {
        let start = self.genes.iter().map(|g| g.start).min().unwrap_or_default();
        let end = self.genes.iter().map(|g| g.end).max().unwrap_or_default();
        (start, end)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// The scan accumulator.
///
/// Feed genes in genomic order (sorted by contig, then start position) via
/// [step](ClusterScan::step); retrieve the accepted clusters with
/// [finish](ClusterScan::finish), which also closes a candidate still open
/// after the last gene. The accumulator owns its candidate state
/// exclusively; nothing else observes it mid-scan.
///
/// # Examples
///
/// ```rust
/// use cazloci::cluster::ClusterScan;
/// use cazloci::merge::MergedGene;
/// use cazloci::options::ClusterOptions;
/// use cazloci::reader::TfList;
///
/// let tf_list = TfList::from_signatures(["IPR001138"]);
/// let mut scan = ClusterScan::new(&tf_list, ClusterOptions::default());
/// let gene = MergedGene {
///     gene_id: String::from("g1"),
///     seqname: String::from("scaffold_1"),
///     cazyme: String::from("GH5"),
///     ..MergedGene::default()
/// };
/// scan.step(&gene);
/// let clusters = scan.finish();
/// // a single CAZyme gene does not satisfy the default cluster definition
/// assert!(clusters.is_empty());
/// ```
pub struct ClusterScan<'a> {
    tf_list: &'a TfList,
    options: ClusterOptions,
    current: Vec<SignatureGene>,
    counts: ClassCounts,
    accepted: Vec<GeneCluster>,
}

impl<'a> ClusterScan<'a> {
    pub fn new(tf_list: &'a TfList, options: ClusterOptions) -> ClusterScan<'a> {
        ClusterScan {
            tf_list,
            options,
            current: Vec::new(),
            counts: ClassCounts::default(),
            accepted: Vec::new(),
        }
    }

    /// Processes the next gene of the sorted sequence.
    ///
    /// A gene on a different contig than the open candidate closes the
    /// candidate first; clusters never span contigs. A signature gene then
    /// extends the candidate (opening one if necessary). A non-signature
    /// gene is absorbed into an already-open candidate while the
    /// interruption budget lasts; otherwise it closes the candidate. A run
    /// of non-signature genes before any signature gene never opens a
    /// candidate.
    pub fn step(&mut self, gene: &MergedGene) {
        if let Some(last) = self.current.last() {
            if last.seqname != gene.seqname {
                self.close();
            }
        }

        let class = classify(gene, self.tf_list);
        self.counts.record(class);

        if class == GeneClass::NonSignature {
            if self.counts.non_signature <= self.options.max_non_signature
                && !self.current.is_empty()
            {
                self.current.push(SignatureGene::from_gene(gene, class));
            } else {
                self.close();
            }
        } else {
            self.current.push(SignatureGene::from_gene(gene, class));
        }
    }

    /// Closes the open candidate, if any.
    ///
    /// Trailing non-signature genes are removed first - a cluster may not
    /// end on an interruption. The trimmed candidate is then judged by
    /// [cluster_definition] and kept only if it passes. Candidate state and
    /// tallies are reset either way.
    pub fn close(&mut self) {
        while matches!(
            self.current.last(),
            Some(g) if g.class == GeneClass::NonSignature
        ) {
            self.current.pop();
        }

        if !self.current.is_empty() && cluster_definition(&self.counts, self.options.min_caz) {
            let genes = std::mem::take(&mut self.current);
            debug!(
                "accepted a {}-gene cluster on {} ({} CAZyme, {} TF, {} TC)",
                genes.len(),
                genes[0].seqname,
                self.counts.cazyme,
                self.counts.transcription_factor,
                self.counts.transporter,
            );
            self.accepted.push(GeneCluster {
                genes,
                counts: self.counts,
            });
        } else {
            self.current.clear();
        }
        self.counts = ClassCounts::default();
    }

    /// Closes any candidate still open and returns the accepted clusters
    /// in scan order.
    pub fn finish(mut self) -> Vec<GeneCluster> {
        self.close();
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TF_SIG: &str = "IPR001138";

    fn tf_list() -> TfList {
        TfList::from_signatures([TF_SIG])
    }

    fn gene(id: &str, seqname: &str, start: i64, end: i64) -> MergedGene {
        MergedGene {
            gene_id: id.to_string(),
            transcript_id: format!("{id}.t1"),
            seqname: seqname.to_string(),
            start,
            end,
            ..MergedGene::default()
        }
    }

    fn caz(id: &str, seqname: &str, start: i64, end: i64) -> MergedGene {
        let mut g = gene(id, seqname, start, end);
        g.cazyme = String::from("GH5");
        g
    }

    fn tf(id: &str, seqname: &str, start: i64, end: i64) -> MergedGene {
        let mut g = gene(id, seqname, start, end);
        g.interpro = format!("{TF_SIG}; fungal TF domain");
        g
    }

    fn tc(id: &str, seqname: &str, start: i64, end: i64) -> MergedGene {
        let mut g = gene(id, seqname, start, end);
        g.go_terms = String::from("GO:0005215 sugar transporter activity");
        g
    }

    fn run_scan(genes: &[MergedGene], min_caz: u32, max_non_signature: u32) -> Vec<GeneCluster> {
        let tfs = tf_list();
        let mut scan = ClusterScan::new(&tfs, ClusterOptions::new(min_caz, max_non_signature));
        for g in genes {
            scan.step(g);
        }
        scan.finish()
    }

    #[test]
    fn test_classification_priority() {
        let tfs = tf_list();

        // a CAZyme call outranks a TF and a transporter match
        let mut g = caz("g1", "chr1", 1, 2);
        g.interpro = format!("{TF_SIG}; membrane transporter");
        assert_eq!(classify(&g, &tfs), GeneClass::Cazyme);

        // a TF match outranks a transporter match
        let mut g = tf("g2", "chr1", 1, 2);
        g.go_terms = String::from("transporter");
        assert_eq!(classify(&g, &tfs), GeneClass::TranscriptionFactor);

        // the transporter keyword matches in either annotation field
        assert_eq!(classify(&tc("g3", "chr1", 1, 2), &tfs), GeneClass::Transporter);
        let mut g = gene("g4", "chr1", 1, 2);
        g.interpro = String::from("ABC transporter-like");
        assert_eq!(classify(&g, &tfs), GeneClass::Transporter);

        assert_eq!(classify(&gene("g5", "chr1", 1, 2), &tfs), GeneClass::NonSignature);
    }

    #[test]
    fn test_cluster_definition_boundaries() {
        let counts = |cazyme, transcription_factor, transporter| ClassCounts {
            cazyme,
            transcription_factor,
            transporter,
            non_signature: 0,
        };

        // pure clusters at and around the threshold
        assert!(cluster_definition(&counts(3, 0, 0), 3));
        assert!(cluster_definition(&counts(4, 0, 0), 3));
        assert!(!cluster_definition(&counts(2, 0, 0), 3));
        assert!(!cluster_definition(&counts(1, 0, 0), 3));

        // one regulatory/transport gene rescues min_caz - 1
        assert!(cluster_definition(&counts(2, 1, 0), 3));
        assert!(cluster_definition(&counts(2, 0, 1), 3));
        assert!(!cluster_definition(&counts(1, 1, 1), 3));

        // a TF or TC next to a full-threshold cluster is also fine
        assert!(cluster_definition(&counts(3, 1, 0), 3));
        assert!(cluster_definition(&counts(5, 2, 3), 3));

        // the non-signature tally never enters the verdict
        let mut c = counts(3, 0, 0);
        c.non_signature = 99;
        assert!(cluster_definition(&c, 3));
    }

    #[test]
    fn test_budget_exhaustion_closes_before_next_signature_gene() {
        // the sixth gene would push the candidate over min_caz, but the
        // third interruption already forced closure
        let genes = vec![
            caz("g1", "chr1", 100, 200),
            caz("g2", "chr1", 300, 400),
            gene("g3", "chr1", 500, 600),
            gene("g4", "chr1", 700, 800),
            gene("g5", "chr1", 900, 1000),
            caz("g6", "chr1", 1100, 1200),
        ];
        assert!(run_scan(&genes, 3, 2).is_empty());
    }

    #[test]
    fn test_three_cazymes_then_interruptions() {
        let genes = vec![
            caz("g1", "scaffold_7", 100, 200),
            caz("g2", "scaffold_7", 300, 400),
            caz("g3", "scaffold_7", 500, 600),
            gene("g4", "scaffold_7", 700, 800),
            gene("g5", "scaffold_7", 900, 1000),
            gene("g6", "scaffold_7", 1100, 1200),
        ];
        let clusters = run_scan(&genes, 3, 2);
        assert_eq!(clusters.len(), 1);

        let cluster = &clusters[0];
        assert_eq!(cluster.len(), 3);
        assert!(cluster.genes.iter().all(|g| g.class == GeneClass::Cazyme));
        assert_eq!(cluster.counts.cazyme, 3);
        assert_eq!(cluster.span(), (100, 600));
        assert_eq!(cluster.chromosome_label().unwrap(), "7");
        // no accepted cluster ends on an interruption
        assert_ne!(cluster.genes.last().unwrap().class, GeneClass::NonSignature);
    }

    #[test]
    fn test_rescued_cluster() {
        let genes = vec![
            caz("g1", "chr1", 100, 200),
            caz("g2", "chr1", 300, 400),
            tc("g3", "chr1", 500, 600),
        ];
        let clusters = run_scan(&genes, 3, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].counts.cazyme, 2);
        assert_eq!(clusters[0].counts.transporter, 1);

        // one CAZyme short of the rescue threshold is rejected
        let genes = vec![caz("g1", "chr1", 100, 200), tc("g2", "chr1", 300, 400)];
        assert!(run_scan(&genes, 3, 2).is_empty());
    }

    #[test]
    fn test_sliding_interruption_budget() {
        // four interruptions in total, but signature genes in between keep
        // paying the budget back, so the candidate never exceeds it
        let genes = vec![
            caz("g1", "chr1", 100, 200),
            gene("g2", "chr1", 300, 400),
            gene("g3", "chr1", 500, 600),
            caz("g4", "chr1", 700, 800),
            gene("g5", "chr1", 900, 1000),
            caz("g6", "chr1", 1100, 1200),
            gene("g7", "chr1", 1300, 1400),
            caz("g8", "chr1", 1500, 1600),
        ];
        let clusters = run_scan(&genes, 3, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 8);
        assert_eq!(clusters[0].counts.cazyme, 4);
        assert_eq!(clusters[0].counts.non_signature, 1);
    }

    #[test]
    fn test_leading_interruptions_never_open_a_candidate() {
        let genes = vec![
            gene("g1", "chr1", 100, 200),
            gene("g2", "chr1", 300, 400),
            gene("g3", "chr1", 500, 600),
            gene("g4", "chr1", 700, 800),
            caz("g5", "chr1", 900, 1000),
            caz("g6", "chr1", 1100, 1200),
            caz("g7", "chr1", 1300, 1400),
        ];
        let clusters = run_scan(&genes, 3, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
        assert_eq!(clusters[0].genes[0].id, "g5.t1");
    }

    #[test]
    fn test_clusters_never_span_contigs() {
        let genes = vec![
            caz("g1", "chr1", 100, 200),
            caz("g2", "chr1", 300, 400),
            caz("g3", "chr1", 500, 600),
            caz("g4", "chr2", 100, 200),
            caz("g5", "chr2", 300, 400),
            caz("g6", "chr2", 500, 600),
        ];
        let clusters = run_scan(&genes, 3, 2);
        assert_eq!(clusters.len(), 2);
        for cluster in &clusters {
            let seqname = &cluster.genes[0].seqname;
            assert!(cluster.genes.iter().all(|g| &g.seqname == seqname));
        }
        assert_eq!(clusters[0].chromosome_label().unwrap(), "1");
        assert_eq!(clusters[1].chromosome_label().unwrap(), "2");
    }

    #[test]
    fn test_contig_boundary_trims_trailing_interruptions() {
        // both absorbed interruptions sit at the tail when the contig
        // changes; the close removes them all
        let genes = vec![
            caz("g1", "chr1", 100, 200),
            caz("g2", "chr1", 300, 400),
            caz("g3", "chr1", 500, 600),
            gene("g4", "chr1", 700, 800),
            gene("g5", "chr1", 900, 1000),
            caz("g6", "chr2", 100, 200),
        ];
        let clusters = run_scan(&genes, 3, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
        assert_ne!(clusters[0].genes.last().unwrap().class, GeneClass::NonSignature);
    }

    #[test]
    fn test_open_candidate_closed_at_end_of_input() {
        let genes = vec![
            caz("g1", "chr1", 100, 200),
            caz("g2", "chr1", 300, 400),
            caz("g3", "chr1", 500, 600),
        ];
        let clusters = run_scan(&genes, 3, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn test_signature_gene_id_falls_back_to_gene_id() {
        let mut g = caz("g1", "chr1", 100, 200);
        g.transcript_id = String::new();
        let sig = SignatureGene::from_gene(&g, GeneClass::Cazyme);
        assert_eq!(sig.id, "g1");

        let g = caz("g2", "chr1", 100, 200);
        let sig = SignatureGene::from_gene(&g, GeneClass::Cazyme);
        assert_eq!(sig.id, "g2.t1");
    }

    #[test]
    fn test_chromosome_label_rejects_mixed_contigs() {
        let cluster = GeneCluster {
            genes: vec![
                SignatureGene::from_gene(&caz("g1", "chr1", 1, 2), GeneClass::Cazyme),
                SignatureGene::from_gene(&caz("g2", "chr2", 3, 4), GeneClass::Cazyme),
            ],
            counts: ClassCounts::default(),
        };
        match cluster.chromosome_label() {
            Err(CazLociError::ContigHomogeneity { contigs }) => {
                assert_eq!(contigs, vec![String::from("chr1"), String::from("chr2")]);
            }
            other => panic!("expected a contig-homogeneity violation, got {other:?}"),
        }
    }
}
