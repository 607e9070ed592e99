use crate::cazloci_utils::is_gzipped;
use anyhow::Context;
use flate2::bufread::MultiGzDecoder;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// The raw header name under which the CAZyme family assignment is expected
/// when no other name is configured.
pub const DEFAULT_CAZYME_COLUMN: &str = "dbCAN";

#[derive(Debug, Clone)]
/// Maps raw annotation-table headers to canonical field names.
///
/// Annotation tables arrive in whatever header dialect the upstream
/// annotation pipeline produced. This structure translates the recognized
/// raw headers into the canonical field names used throughout the crate;
/// headers it does not recognize are ignored entirely, and column order is
/// irrelevant.
///
/// The default mapping recognizes `GeneID`, `TranscriptID`, `Contig`,
/// `Start`, `Stop`, `Strand`, `InterPro`, `GO Terms`, `antiSMASH` and the
/// CAZyme column under its default raw name ([DEFAULT_CAZYME_COLUMN]). The
/// raw name of the CAZyme column varies between annotation pipelines, so it
/// is configurable via [HeaderMap::with_cazyme_column].
///
/// # Examples
///
/// ```rust
/// use cazloci::reader::HeaderMap;
///
/// let hm = HeaderMap::default().with_cazyme_column("CAZy");
/// assert_eq!(hm.canonical("CAZy"), Some("cazyme"));
/// assert_eq!(hm.canonical("dbCAN"), None);
/// assert_eq!(hm.canonical("GO Terms"), Some("go_terms"));
/// assert_eq!(hm.canonical("Notes"), None);
/// ```
pub struct HeaderMap {
    mapping: HashMap<String, &'static str>,
}

impl Default for HeaderMap {
    fn default() -> HeaderMap {
        let mapping = HashMap::from_iter(
            [
                ("GeneID", "gene_id"),
                ("TranscriptID", "transcript_id"),
                ("Contig", "seqname"),
                ("Start", "start"),
                ("Stop", "end"),
                ("Strand", "strand"),
                ("InterPro", "interpro"),
                ("GO Terms", "go_terms"),
                ("antiSMASH", "antismash"),
                (DEFAULT_CAZYME_COLUMN, "cazyme"),
            ]
            .into_iter()
            .map(|(raw, canonical)| (raw.to_string(), canonical)),
        );
        HeaderMap { mapping }
    }
}

impl HeaderMap {
    /// Replaces the raw header name that maps to the canonical `cazyme`
    /// field. Any previously configured CAZyme header is forgotten.
    pub fn with_cazyme_column<T: AsRef<str>>(mut self, raw: T) -> HeaderMap {
        self.mapping.retain(|_, canonical| *canonical != "cazyme");
        self.mapping.insert(raw.as_ref().to_string(), "cazyme");
        self
    }

    /// Returns the canonical field name for a raw header, or [None] if the
    /// header is not recognized.
    pub fn canonical(&self, raw: &str) -> Option<&'static str> {
        self.mapping.get(raw).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// One annotation row after header normalization: a single
/// transcript/isoform of a gene together with its annotation evidence.
///
/// Missing optional fields default to the empty string (or zero for
/// coordinates) and are treated as "no evidence" downstream; `start` and
/// `end` are carried exactly as parsed and may arrive reversed.
pub struct GeneRecord {
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

#[derive(Debug, Clone, Default)]
/// This struct contains all rows of an annotation table, one vector per
/// canonical field. It is populated row by row while parsing and feeds the
/// isoform merge.
pub struct AnnotStruct {
    pub gene_id: Vec<String>,
    pub transcript_id: Vec<String>,
    pub seqname: Vec<String>,
    pub start: Vec<i64>,
    pub end: Vec<i64>,
    pub strand: Vec<Option<String>>,
    pub interpro: Vec<String>,
    pub go_terms: Vec<String>,
    pub cazyme: Vec<String>,
    pub antismash: Vec<String>,
}

impl AnnotStruct {
    pub fn new() -> AnnotStruct {
        AnnotStruct::default()
    }

    /// Reads an annotation table from `file_path` and returns the parsed
    /// rows.
    ///
    /// The table is tab-separated with a header line; cells may be quoted
    /// and surrounding whitespace is trimmed. Both plain text and gzipped
    /// files are supported, detected automatically from the magic bytes.
    /// Headers are translated through `header_map`; unrecognized columns
    /// are ignored, and when a recognized raw header appears more than
    /// once, the first occurrence wins.
    ///
    /// # Arguments
    ///
    /// * `file_path`: The annotation table to read, plain or gzipped.
    /// * `header_map`: The raw-header translation to apply.
    ///
    /// # Returns
    ///
    /// Returns an `anyhow::Result<AnnotStruct>` with one entry per data
    /// row. Rows shorter than the header are padded with empty values;
    /// non-numeric coordinates become zero. Neither condition is an error.
    pub fn from_table<T: AsRef<Path>>(
        file_path: T,
        header_map: &HeaderMap,
    ) -> anyhow::Result<AnnotStruct> {
        let file_path = file_path.as_ref();
        let file = File::open(file_path)
            .with_context(|| format!("could not open the annotation table {:?}", file_path))?;
        let mut inner_rdr = BufReader::new(file);

        let annot = if is_gzipped(&mut inner_rdr)? {
            info!("auto-detected gzipped file - reading via decompression");
            AnnotStruct::read_from(MultiGzDecoder::new(inner_rdr), header_map)?
        } else {
            AnnotStruct::read_from(inner_rdr, header_map)?
        };

        info!(
            "parsed {} annotation rows from {:?}",
            annot.len(),
            file_path
        );
        Ok(annot)
    }

    fn read_from<R: Read>(rdr: R, header_map: &HeaderMap) -> anyhow::Result<AnnotStruct> {
        let mut csv_rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);

        // resolve each column index to a canonical field once, up front;
        // a duplicated raw header keeps its first occurrence only
        let mut claimed: HashSet<&'static str> = HashSet::new();
        let columns: Vec<Option<&'static str>> = csv_rdr
            .headers()
            .context("could not read the annotation table header")?
            .iter()
            .map(|raw| {
                header_map
                    .canonical(raw)
                    .filter(|canonical| claimed.insert(*canonical))
            })
            .collect();
        debug!(
            "recognized {} of {} annotation columns",
            columns.iter().flatten().count(),
            columns.len()
        );

        let mut annot = AnnotStruct::new();
        for row in csv_rdr.records() {
            let row = row.context("could not parse an annotation table row")?;
            let mut rec = GeneRecord::default();
            for (idx, value) in row.iter().enumerate() {
                let Some(Some(canonical)) = columns.get(idx) else {
                    continue;
                };
                match *canonical {
                    "gene_id" => rec.gene_id = value.to_string(),
                    "transcript_id" => rec.transcript_id = value.to_string(),
                    "seqname" => rec.seqname = value.to_string(),
                    "start" => rec.start = value.parse().unwrap_or_default(),
                    "end" => rec.end = value.parse().unwrap_or_default(),
                    "strand" => {
                        rec.strand = (!value.is_empty()).then(|| value.to_string());
                    }
                    "interpro" => rec.interpro = value.to_string(),
                    "go_terms" => rec.go_terms = value.to_string(),
                    "cazyme" => rec.cazyme = value.to_string(),
                    "antismash" => rec.antismash = value.to_string(),
                    _ => {}
                }
            }
            annot.push_record(rec);
        }

        Ok(annot)
    }

    pub fn push_record(&mut self, rec: GeneRecord) {
        self.gene_id.push(rec.gene_id);
        self.transcript_id.push(rec.transcript_id);
        self.seqname.push(rec.seqname);
        self.start.push(rec.start);
        self.end.push(rec.end);
        self.strand.push(rec.strand);
        self.interpro.push(rec.interpro);
        self.go_terms.push(rec.go_terms);
        self.cazyme.push(rec.cazyme);
        self.antismash.push(rec.antismash);
    }

    /// Materializes the parsed rows as a flat record list for the isoform
    /// merge.
    pub fn to_records(&self) -> Vec<GeneRecord> {
        (0..self.len())
            .map(|i| GeneRecord {
                gene_id: self.gene_id[i].clone(),
                transcript_id: self.transcript_id[i].clone(),
                seqname: self.seqname[i].clone(),
                start: self.start[i],
                end: self.end[i],
                strand: self.strand[i].clone(),
                interpro: self.interpro[i].clone(),
                go_terms: self.go_terms[i].clone(),
                cazyme: self.cazyme[i].clone(),
                antismash: self.antismash[i].clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.gene_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gene_id.is_empty()
    }
}
