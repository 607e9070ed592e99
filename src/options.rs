use tracing::warn;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Configuration options for the cluster scan.
///
/// This structure carries the two tunables of the cluster definition: the
/// minimum number of CAZyme genes a candidate must accumulate, and the
/// interruption budget, i.e. how many non-signature genes the open
/// candidate may currently carry before it is forced closed.
///
/// # Fields
///
/// * `min_caz`: The minimum CAZyme-gene count required for a candidate
///   cluster to be accepted (see [`cluster_definition`](crate::cluster::cluster_definition)).
/// * `max_non_signature`: The interruption budget. The budget slides:
///   every signature gene pays one unit of it back (never below zero), so a
///   cluster can survive more than `max_non_signature` interruptions in
///   total as long as signature genes are interspersed.
///
/// # Default
///
/// * `min_caz`: 3
/// * `max_non_signature`: 2
///
/// # Examples
///
/// Creating custom scan options:
///
/// ```rust
/// use cazloci::options::ClusterOptions;
///
/// let options = ClusterOptions::new(4, 1);
/// assert_eq!(options.min_caz, 4);
/// assert_eq!(options.max_non_signature, 1);
/// ```
pub struct ClusterOptions {
    pub min_caz: u32,
    pub max_non_signature: u32,
}

impl Default for ClusterOptions {
    fn default() -> ClusterOptions {
        ClusterOptions {
            min_caz: 3,
            max_non_signature: 2,
        }
    }
}

impl ClusterOptions {
    /// Creates a new [ClusterOptions] with the given minimum CAZyme count
    /// and non-signature budget.
    ///
    /// A `min_caz` of zero accepts every candidate that contains at least
    /// one signature gene, which is rarely what is wanted; a warning is
    /// emitted but the value is kept.
    pub fn new(min_caz: u32, max_non_signature: u32) -> ClusterOptions {
        if min_caz == 0 {
            warn!("min_caz is zero - every candidate cluster will be accepted")
        }
        ClusterOptions {
            min_caz,
            max_non_signature,
        }
    }
}
