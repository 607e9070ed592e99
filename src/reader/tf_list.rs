use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
/// The transcription-factor signature list.
///
/// A line-oriented list of domain identifiers (e.g. InterPro accessions)
/// whose presence in a gene's InterPro annotation marks the gene as a
/// transcription factor. Only the first tab-separated field of each line is
/// used; blank lines are skipped. The list is loaded once at startup and
/// never changes for the rest of the run.
///
/// Matching is substring containment, not exact equality: an entry matches
/// if it occurs anywhere inside the InterPro annotation string.
pub struct TfList {
    signatures: Vec<String>,
}

impl TfList {
    /// Loads the signature list from a line-oriented file.
    pub fn from_path<T: AsRef<Path>>(file_path: T) -> anyhow::Result<TfList> {
        let file_path = file_path.as_ref();
        let rdr = BufReader::new(File::open(file_path).with_context(|| {
            format!(
                "could not open the transcription-factor list {:?}",
                file_path
            )
        })?);

        let mut signatures = Vec::new();
        for l in rdr.lines() {
            let line = l?;
            let sig = line.split('\t').next().unwrap_or("").trim();
            if !sig.is_empty() {
                signatures.push(sig.to_string());
            }
        }

        if signatures.is_empty() {
            warn!(
                "the transcription-factor list {:?} is empty - no gene will classify as a transcription factor",
                file_path
            );
        } else {
            info!(
                "loaded {} transcription-factor signatures from {:?}",
                signatures.len(),
                file_path
            );
        }
        Ok(TfList { signatures })
    }

    /// Builds a list directly from signature strings.
    pub fn from_signatures<I, T>(signatures: I) -> TfList
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        TfList {
            signatures: signatures
                .into_iter()
                .map(|s| s.as_ref().to_string())
                .collect(),
        }
    }

    /// Returns `true` if any signature occurs inside `interpro`.
    pub fn matches(&self, interpro: &str) -> bool {
        self.signatures
            .iter()
            .any(|sig| interpro.contains(sig.as_str()))
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
