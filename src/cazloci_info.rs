use crate::cazloci_utils::{chromosome_label, group_label, sm_cluster_id, ANNOTCOLUMNS};
use crate::cluster::{ClusterScan, GeneCluster};
use crate::error::CazLociError;
use crate::merge::{merge_isoforms, MergedGene};
use crate::options::ClusterOptions;
use crate::reader::{AnnotStruct, HeaderMap, TfList};
use anyhow::{bail, Context};
use nutype::nutype;
use polars::{frame::DataFrame, lazy::prelude::*, prelude::*, series::Series};
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

// track line colors, one pair per section
const SM_CLUSTER_COLOR: &str = "#FF0000";
const CAZ_CLUSTER_COLOR: &str = "#00EEFF";
const CAZ_CLUSTER_LABEL_COLOR: &str = "#0000FF";
const CAZ_GENE_COLOR: &str = "#7F7F7F";
const CAZ_GENE_LABEL_COLOR: &str = "#000000";

#[nutype(derive(Debug, Clone, PartialEq, Eq, Hash, Display))]
/// The numeric identifier of a secondary-metabolite cluster, as embedded
/// in the antiSMASH tags of its member genes.
pub struct SmClusterId(String);

#[derive(Debug, Clone)]
/// A secondary-metabolite cluster: all merged genes whose antiSMASH tags
/// carry the same embedded cluster id, together with that id.
pub struct SmCluster {
    pub id: SmClusterId,
    pub genes: Vec<MergedGene>,
}

impl SmCluster {
    /// The chromosome label all member genes report; more than one contig
    /// in the group is a fatal
    /// [ContigHomogeneity](CazLociError::ContigHomogeneity) violation.
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

/// The central table type: one merged gene per row, held as a polars
/// [DataFrame] sorted by `(seqname, start, end)`.
///
/// A [CazLoci] is usually built straight from an annotation table via
/// [CazLoci::from_annotation_table], which chains the reader, the isoform
/// merge and the construction of the sorted data frame. The downstream
/// passes (cluster scan, secondary-metabolite grouping, track writing) all
/// consume the rows of this table in its sorted order.
pub struct CazLoci {
    df: DataFrame,
}

impl CazLoci {
    /// Creates a [CazLoci] from a data frame that already carries the
    /// canonical columns.
    ///
    /// The data frame is re-sorted by `(seqname, start, end)` here, whether
    /// or not the caller believes it is sorted already; every consumer of
    /// this type relies on that order, so it is established exactly once,
    /// at the boundary.
    ///
    /// # Errors
    ///
    /// Fails if any canonical column is missing.
    pub fn new(df: DataFrame) -> anyhow::Result<CazLoci> {
        for name in ANNOTCOLUMNS {
            if df.column(name).is_err() {
                bail!("the gene table is missing the required column `{}`", name);
            }
        }

        let df = df
            .lazy()
            .sort_by_exprs(
                vec![col("seqname"), col("start"), col("end")],
                vec![false, false, false],
                false, /*nulls last*/
                true,  /*force stable sort*/
            )
            .collect()?;

        Ok(CazLoci { df })
    }

    /// Creates a [CazLoci] from merged genes, one row per gene.
    pub fn from_records(records: Vec<MergedGene>) -> anyhow::Result<CazLoci> {
        let df = DataFrame::new(vec![
            Series::new(
                "gene_id",
                records.iter().map(|r| r.gene_id.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                "transcript_id",
                records
                    .iter()
                    .map(|r| r.transcript_id.as_str())
                    .collect::<Vec<_>>(),
            ),
            Series::new(
                "seqname",
                records.iter().map(|r| r.seqname.as_str()).collect::<Vec<_>>(),
            ),
            Series::new("start", records.iter().map(|r| r.start).collect::<Vec<i64>>()),
            Series::new("end", records.iter().map(|r| r.end).collect::<Vec<i64>>()),
            Series::new(
                "strand",
                records.iter().map(|r| r.strand.clone()).collect::<Vec<Option<String>>>(),
            ),
            Series::new(
                "interpro",
                records.iter().map(|r| r.interpro.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                "go_terms",
                records.iter().map(|r| r.go_terms.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                "cazyme",
                records.iter().map(|r| r.cazyme.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                "antismash",
                records.iter().map(|r| r.antismash.as_str()).collect::<Vec<_>>(),
            ),
        ])?;

        CazLoci::new(df)
    }

    /// Builds the gene table straight from an annotation table on disk:
    /// read (plain or gzipped), normalize headers, collapse isoforms, sort.
    ///
    /// # Arguments
    ///
    /// * `file_path`: The annotation table to read.
    /// * `header_map`: The raw-header translation to apply (see
    ///   [HeaderMap]).
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use cazloci::reader::HeaderMap;
    /// use cazloci::CazLoci;
    ///
    /// let header_map = HeaderMap::default().with_cazyme_column("CAZy");
    /// let loci = CazLoci::from_annotation_table("annotations.txt", &header_map).unwrap();
    /// println!("{} genes", loci.df().height());
    /// ```
    pub fn from_annotation_table<T: AsRef<Path>>(
        file_path: T,
        header_map: &HeaderMap,
    ) -> anyhow::Result<CazLoci> {
        let annot = AnnotStruct::from_table(file_path, header_map)?;
        let merged = merge_isoforms(annot.to_records())?;
        CazLoci::from_records(merged)
    }

    /// Returns a reference to the underlying [DataFrame].
    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    /// Returns a mutable reference to the underlying [DataFrame].
    pub fn df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }

    /// Returns the contig column.
    pub fn seqname(&self) -> anyhow::Result<&Series> {
        self.df.column("seqname").context("could not get the seqname column")
    }

    /// Returns the start-coordinate column.
    pub fn start(&self) -> anyhow::Result<&Series> {
        self.df.column("start").context("could not get the start column")
    }

    /// Returns the end-coordinate column.
    pub fn end(&self) -> anyhow::Result<&Series> {
        self.df.column("end").context("could not get the end column")
    }

    /// Returns the gene-identifier column.
    pub fn gene_id(&self) -> anyhow::Result<&Series> {
        self.df.column("gene_id").context("could not get the gene_id column")
    }

    /// Materializes the table rows as merged genes, in the table's sorted
    /// order. The sequential passes (cluster scan, grouping, serialization)
    /// all run over this row view.
    pub fn genes(&self) -> anyhow::Result<Vec<MergedGene>> {
        let gene_id = self.df.column("gene_id")?.utf8()?;
        let transcript_id = self.df.column("transcript_id")?.utf8()?;
        let seqname = self.df.column("seqname")?.utf8()?;
        let start = self.df.column("start")?.i64()?;
        let end = self.df.column("end")?.i64()?;
        let strand = self.df.column("strand")?.utf8()?;
        let interpro = self.df.column("interpro")?.utf8()?;
        let go_terms = self.df.column("go_terms")?.utf8()?;
        let cazyme = self.df.column("cazyme")?.utf8()?;
        let antismash = self.df.column("antismash")?.utf8()?;

        let mut genes = Vec::with_capacity(self.df.height());
        for i in 0..self.df.height() {
            genes.push(MergedGene {
                gene_id: gene_id.get(i).unwrap_or_default().to_string(),
                transcript_id: transcript_id.get(i).unwrap_or_default().to_string(),
                seqname: seqname.get(i).unwrap_or_default().to_string(),
                start: start.get(i).unwrap_or_default(),
                end: end.get(i).unwrap_or_default(),
                strand: strand.get(i).map(String::from),
                interpro: interpro.get(i).unwrap_or_default().to_string(),
                go_terms: go_terms.get(i).unwrap_or_default().to_string(),
                cazyme: cazyme.get(i).unwrap_or_default().to_string(),
                antismash: antismash.get(i).unwrap_or_default().to_string(),
            });
        }
        Ok(genes)
    }

    /// Groups the genes carrying an antiSMASH tag into secondary-metabolite
    /// clusters, keyed by the embedded numeric cluster id, and returns the
    /// groups in ascending numeric id order.
    ///
    /// A non-empty tag without any digit carries no usable id; such genes
    /// are skipped with a warning rather than aborting the run.
    pub fn sm_clusters(&self) -> anyhow::Result<Vec<SmCluster>> {
        let mut groups: HashMap<SmClusterId, Vec<MergedGene>> = HashMap::new();
        for gene in self.genes()? {
            if gene.antismash.is_empty() {
                continue;
            }
            match sm_cluster_id(&gene.antismash) {
                Some(id) => {
                    groups
                        .entry(SmClusterId::new(id.to_string()))
                        .or_default()
                        .push(gene);
                }
                None => warn!(
                    "the antiSMASH tag `{}` of gene {} carries no cluster id - skipping it",
                    gene.antismash, gene.gene_id
                ),
            }
        }

        let mut clusters: Vec<SmCluster> = groups
            .into_iter()
            .map(|(id, genes)| SmCluster { id, genes })
            .collect();
        // ids are digit runs, so (length, lexicographic) is numeric order
        clusters.sort_by(|a, b| {
            let (a, b) = (a.id.to_string(), b.id.to_string());
            (a.len(), a).cmp(&(b.len(), b))
        });

        info!("grouped {} secondary-metabolite clusters", clusters.len());
        Ok(clusters)
    }

    /// Runs the cluster scan over the sorted gene rows and returns the
    /// accepted CAZyme gene clusters in genomic order.
    pub fn caz_clusters(
        &self,
        tf_list: &TfList,
        options: ClusterOptions,
    ) -> anyhow::Result<Vec<GeneCluster>> {
        let genes = self.genes()?;
        let mut scan = ClusterScan::new(tf_list, options);
        for gene in &genes {
            scan.step(gene);
        }
        let clusters = scan.finish();
        info!("found {} CAZyme gene clusters", clusters.len());
        Ok(clusters)
    }

    /// Writes the genomic track for this table to `file_path`.
    ///
    /// The track is tab-separated with three sections, in order:
    ///
    /// 1. one `cluster` line per secondary-metabolite cluster,
    /// 2. one `CAZyme-cluster` line per accepted cluster of the scan,
    ///    numbered per chromosome label starting at 1,
    /// 3. one `gene` line per merged gene with a CAZyme call, regardless of
    ///    cluster membership.
    ///
    /// Empty sections are omitted. The writer is flushed before returning
    /// on the normal exit path.
    pub fn write_track<T: AsRef<Path>>(
        &self,
        file_path: T,
        tf_list: &TfList,
        options: ClusterOptions,
    ) -> anyhow::Result<()> {
        let file_path = file_path.as_ref();

        // create the folder if it doesn't exist
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "could not create the parent directory of the output file {:?}",
                        file_path.as_os_str()
                    )
                })?;
            }
        }

        let file = std::fs::File::create(file_path)?;
        let mut writer = BufWriter::with_capacity(4194304, file);

        for sm in self.sm_clusters()? {
            let label = sm.chromosome_label()?;
            let (start, end) = sm.span();
            let gene_ids = sm
                .genes
                .iter()
                .map(|g| g.gene_id.as_str())
                .collect::<Vec<_>>()
                .join(";");
            writeln!(
                writer,
                "cluster\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                label,
                sm.id,
                start,
                end,
                SM_CLUSTER_COLOR,
                sm.len(),
                SM_CLUSTER_COLOR,
                gene_ids,
            )?;
        }

        let mut last_serial: HashMap<String, u32> = HashMap::new();
        for cluster in self.caz_clusters(tf_list, options)? {
            let label = cluster.chromosome_label()?;
            let (start, end) = cluster.span();
            let serial = last_serial.entry(label.clone()).or_insert(0);
            *serial += 1;
            let member_ids = cluster
                .genes
                .iter()
                .map(|g| g.id.as_str())
                .collect::<Vec<_>>()
                .join(";");
            writeln!(
                writer,
                "CAZyme-cluster\t{}\t{}.{}\t{}\t{}\t{}\t{}\t{}\t{}",
                label,
                label,
                serial,
                start,
                end,
                CAZ_CLUSTER_COLOR,
                cluster.len(),
                CAZ_CLUSTER_LABEL_COLOR,
                member_ids,
            )?;
        }

        for gene in self.genes()? {
            if gene.cazyme.is_empty() {
                continue;
            }
            writeln!(
                writer,
                "gene\t{}\t{}\t{}\t{}\t{}\t\t{}",
                chromosome_label(&gene.seqname),
                gene.cazyme,
                gene.start,
                gene.end,
                CAZ_GENE_COLOR,
                CAZ_GENE_LABEL_COLOR,
            )?;
        }

        writer.flush()?;
        info!("wrote the gene-cluster track to {:?}", file_path);
        Ok(())
    }
}
