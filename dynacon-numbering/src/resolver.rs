//! Transfer of generic numbers from reference receptors onto local residues.
//!
//! For every chain of a structure the resolver aligns the chain's one letter
//! sequence, fetches the reference records of the hit and walks the
//! alignment segments pairing local residues with reference records. Chains
//! are resolved in parallel and merged afterwards.
//!
//! Conditions that skip a chain or a residue never fail the request; they are
//! reported as [`Diagnostic`]s next to the resulting [`NumberingMap`].

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::{Arc, LazyLock};

use dynacon_core::files::TrajectoryFiles;
use dynacon_core::models::{
    AlignmentResult, ChainSequence, NumberingMap, ReferenceResidueRecord, ResidueKey,
};
use log::{debug, info, warn};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;

use crate::aligner::SequenceAligner;
use crate::cache::ReferenceNumberingCache;
use crate::errors::{NumberingError, Result};
use crate::sequence::{TrajectoryLoader, extract_chain_sequences};

// `1.50x50` -> `1x50`
static SEQUENCE_BASED_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\d*").expect("valid regex"));

/// Something the resolver skipped or flagged while building a map.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The chain's sequence matched nothing in the reference database.
    NoHit { chain: String },
    /// The reference records of the hit could not be fetched.
    ReferenceLookupFailed {
        chain: String,
        accession: String,
        reason: String,
    },
    /// An aligned residue whose reference position has no record.
    MissingReferenceRecord {
        key: ResidueKey,
        sequence_number: u32,
    },
    /// Aligned residues with different amino acids. The mapping is kept.
    AminoAcidMismatch {
        key: ResidueKey,
        local: char,
        reference: char,
    },
    /// A residue of an aligned chain that received no label.
    Unmapped { key: ResidueKey },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoHit { chain } => write!(f, "chain {}: no alignment hit", chain),
            Diagnostic::ReferenceLookupFailed {
                chain,
                accession,
                reason,
            } => write!(
                f,
                "chain {}: reference lookup for {} failed: {}",
                chain, accession, reason
            ),
            Diagnostic::MissingReferenceRecord {
                key,
                sequence_number,
            } => write!(
                f,
                "{}: no reference record with sequence number {}",
                key, sequence_number
            ),
            Diagnostic::AminoAcidMismatch {
                key,
                local,
                reference,
            } => write!(
                f,
                "{}: local residue {} aligned to reference residue {}",
                key, local, reference
            ),
            Diagnostic::Unmapped { key } => write!(f, "{}: unmapped", key),
        }
    }
}

/// Result of one numbering request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NumberingReport {
    pub map: NumberingMap,
    pub diagnostics: Vec<Diagnostic>,
}

impl NumberingReport {
    pub fn mismatches(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::AminoAcidMismatch { .. }))
    }

    pub fn unmapped(&self) -> impl Iterator<Item = &ResidueKey> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::Unmapped { key } => Some(key),
            _ => None,
        })
    }
}

///
/// Label shown for a reference record: the generic number without its
/// sequence based part, or the protein segment when there is none.
///
pub fn display_label(record: &ReferenceResidueRecord) -> String {
    match record.generic_number.as_deref() {
        Some(label) if !label.is_empty() => SEQUENCE_BASED_PART.replace_all(label, "").into_owned(),
        _ => record.segment_label.clone(),
    }
}

///
/// Walk the segments of `alignment` and label every aligned residue of `chain`.
///
/// Reference records are matched by their own `sequence_number` (target
/// position + 1), not by position in `records`, because the registry may skip
/// sequence numbers.
///
pub fn transfer_labels(
    chain: &ChainSequence,
    alignment: &AlignmentResult,
    records: &[ReferenceResidueRecord],
) -> (NumberingMap, Vec<Diagnostic>) {
    let keys = chain.residue_keys();
    let by_number: HashMap<u32, &ReferenceResidueRecord> =
        records.iter().map(|r| (r.sequence_number, r)).collect();

    let mut map = NumberingMap::new();
    let mut diagnostics = Vec::new();

    for segment in alignment.segments() {
        for (q, t) in segment.pairs() {
            let Some(key) = keys.get(q) else {
                warn!(
                    "Alignment of chain {} reaches past its {} residues",
                    chain.chain(),
                    keys.len()
                );
                break;
            };
            let sequence_number = (t + 1) as u32;
            let Some(record) = by_number.get(&sequence_number) else {
                diagnostics.push(Diagnostic::MissingReferenceRecord {
                    key: key.clone(),
                    sequence_number,
                });
                continue;
            };

            let local = key.one_letter();
            if local != record.amino_acid {
                diagnostics.push(Diagnostic::AminoAcidMismatch {
                    key: key.clone(),
                    local,
                    reference: record.amino_acid,
                });
            }
            map.insert(key.clone(), display_label(record));
        }
    }

    for key in keys.into_iter().filter(|k| !map.contains(k)) {
        diagnostics.push(Diagnostic::Unmapped { key });
    }

    (map, diagnostics)
}

/// Resolves numbering maps; cheap to clone and safe to share between workers.
#[derive(Clone)]
pub struct NumberingResolver {
    aligner: Arc<dyn SequenceAligner>,
    cache: Arc<ReferenceNumberingCache>,
}

impl NumberingResolver {
    pub fn new(aligner: Arc<dyn SequenceAligner>, cache: Arc<ReferenceNumberingCache>) -> Self {
        NumberingResolver { aligner, cache }
    }

    ///
    /// Load a structure and resolve the numbering of all its protein chains.
    ///
    /// A structure that cannot be loaded fails the whole request.
    ///
    pub fn resolve(
        &self,
        loader: &dyn TrajectoryLoader,
        files: &TrajectoryFiles,
    ) -> Result<NumberingReport> {
        let chains = extract_chain_sequences(loader, files)?;
        info!(
            "Resolving numbering of {} chain(s) from {}",
            chains.len(),
            files.topology.display()
        );
        self.resolve_chains(&chains)
    }

    ///
    /// Resolve already extracted chains.
    ///
    /// Chains run in parallel; their partial maps are merged in chain order
    /// once all of them are done.
    ///
    pub fn resolve_chains(&self, chains: &[ChainSequence]) -> Result<NumberingReport> {
        let partials: Vec<(NumberingMap, Vec<Diagnostic>)> = chains
            .par_iter()
            .map(|chain| self.resolve_chain(chain))
            .collect::<Result<Vec<_>>>()?;

        let mut report = NumberingReport::default();
        for (map, diagnostics) in partials {
            report.map.merge(map);
            report.diagnostics.extend(diagnostics);
        }
        Ok(report)
    }

    fn resolve_chain(&self, chain: &ChainSequence) -> Result<(NumberingMap, Vec<Diagnostic>)> {
        let sequence = chain.one_letter_sequence();

        let Some(alignment) = self.aligner.align(&sequence)? else {
            warn!("No alignment hit for chain {}, skipping", chain.chain());
            return Ok((
                NumberingMap::new(),
                vec![Diagnostic::NoHit {
                    chain: chain.chain().to_string(),
                }],
            ));
        };
        debug!(
            "Chain {} aligned to {} over {} residues",
            chain.chain(),
            alignment.accession,
            alignment.aligned_length()
        );

        let records = match self.cache.get(&alignment.accession) {
            Ok(records) => records,
            Err(NumberingError::ReferenceLookupFailed { accession, reason }) => {
                warn!(
                    "Reference lookup for {} failed, skipping chain {}: {}",
                    accession,
                    chain.chain(),
                    reason
                );
                return Ok((
                    NumberingMap::new(),
                    vec![Diagnostic::ReferenceLookupFailed {
                        chain: chain.chain().to_string(),
                        accession,
                        reason,
                    }],
                ));
            }
            Err(e) => return Err(e),
        };

        let (map, diagnostics) = transfer_labels(chain, &alignment, &records);

        let mut unmapped = 0;
        for diagnostic in &diagnostics {
            match diagnostic {
                Diagnostic::Unmapped { .. } => unmapped += 1,
                other => warn!("{}", other),
            }
        }
        if unmapped > 0 {
            warn!(
                "{} of {} residues of chain {} left unmapped",
                unmapped,
                chain.len(),
                chain.chain()
            );
        }
        info!(
            "Chain {}: {} residues numbered from {}",
            chain.chain(),
            map.len(),
            alignment.accession
        );

        Ok((map, diagnostics))
    }
}
