use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dynacon_core::files::TrajectoryFiles;
use dynacon_core::models::{AlignmentResult, AlignmentSegment, ChainSequence, ResidueKey};
use dynacon_numbering::cache::{ReferenceNumberingCache, ResidueRegistry};
use dynacon_numbering::errors::{NumberingError, Result};
use dynacon_numbering::pdb::PdbTopologyLoader;
use dynacon_numbering::{Diagnostic, NumberingResolver, SequenceAligner};
use pretty_assertions::assert_eq;
use rstest::*;

const OPRD: &str = r#"[
    {"sequence_number": 1, "amino_acid": "M", "display_generic_number": "1.50x50", "protein_segment": "TM1"},
    {"sequence_number": 2, "amino_acid": "V", "display_generic_number": "1.51x51", "protein_segment": "TM1"},
    {"sequence_number": 3, "amino_acid": "L", "display_generic_number": "1.52x52", "protein_segment": "TM1"},
    {"sequence_number": 4, "amino_acid": "L", "display_generic_number": null, "protein_segment": "ICL1"},
    {"sequence_number": 5, "amino_acid": "S", "display_generic_number": "2.37x37", "protein_segment": "TM2"}
]"#;

/// Aligner answering from a table of query -> hit.
struct TableAligner(HashMap<String, Option<AlignmentResult>>);

impl SequenceAligner for TableAligner {
    fn align(&self, query: &str) -> Result<Option<AlignmentResult>> {
        match self.0.get(query) {
            Some(hit) => Ok(hit.clone()),
            None => Err(NumberingError::HitDescription(query.to_string())),
        }
    }
}

struct CountingRegistry {
    calls: Arc<AtomicUsize>,
    bodies: HashMap<&'static str, &'static str>,
}

impl ResidueRegistry for CountingRegistry {
    fn fetch(&self, accession: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(accession)
            .map(|b| b.as_bytes().to_vec())
            .ok_or_else(|| NumberingError::ReferenceLookupFailed {
                accession: accession.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }
}

fn full_hit(accession: &str, len: usize) -> Option<AlignmentResult> {
    Some(AlignmentResult::new(accession, vec![AlignmentSegment::new(0..len, 0..len).unwrap()]).unwrap())
}

fn resolver(
    cache_folder: &Path,
    hits: Vec<(&str, Option<AlignmentResult>)>,
) -> (NumberingResolver, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = CountingRegistry {
        calls: Arc::clone(&calls),
        bodies: HashMap::from([("P41143", OPRD)]),
    };
    let cache = ReferenceNumberingCache::builder()
        .with_cache_folder(cache_folder.to_path_buf())
        .with_registry(Box::new(registry))
        .finish()
        .unwrap();
    let aligner = TableAligner(
        hits.into_iter()
            .map(|(query, hit)| (query.to_string(), hit))
            .collect(),
    );
    (NumberingResolver::new(Arc::new(aligner), Arc::new(cache)), calls)
}

#[fixture]
fn receptor() -> TrajectoryFiles {
    let pdb = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/receptor.pdb");
    TrajectoryFiles::new(pdb.clone(), pdb)
}

#[rstest]
fn test_resolve_structure(receptor: TrajectoryFiles) {
    let dir = tempfile::tempdir().unwrap();
    let (resolver, _) = resolver(dir.path(), vec![("MVLLS", full_hit("P41143", 5))]);

    let report = resolver.resolve(&PdbTopologyLoader::new(), &receptor).unwrap();

    let labels: Vec<(String, &str)> = report.map.iter().map(|(k, v)| (k.to_string(), v)).collect();
    assert_eq!(
        labels,
        vec![
            ("A:MET:1".to_string(), "1x50"),
            ("A:VAL:2".to_string(), "1x51"),
            ("A:LEU:3".to_string(), "1x52"),
            ("A:LEU:4".to_string(), "ICL1"),
            ("A:SER:5".to_string(), "2x37"),
        ]
    );
    assert!(report.diagnostics.is_empty());
}

#[rstest]
fn test_no_hit_chain_does_not_affect_others() {
    let dir = tempfile::tempdir().unwrap();
    let (resolver, _) = resolver(
        dir.path(),
        vec![("MVLLS", full_hit("P41143", 5)), ("GGGG", None)],
    );
    let chains = vec![
        ChainSequence::from_named("A", [(1, "MET"), (2, "VAL"), (3, "LEU"), (4, "LEU"), (5, "SER")]),
        ChainSequence::from_named("B", [(1, "GLY"), (2, "GLY"), (3, "GLY"), (4, "GLY")]),
    ];

    let report = resolver.resolve_chains(&chains).unwrap();

    assert_eq!(report.map.len(), 5);
    assert_eq!(report.map.chain_keys("B").count(), 0);
    assert_eq!(
        report.diagnostics,
        vec![Diagnostic::NoHit {
            chain: "B".to_string()
        }]
    );
}

#[rstest]
fn test_failed_lookup_skips_chain() {
    let dir = tempfile::tempdir().unwrap();
    let (resolver, calls) = resolver(
        dir.path(),
        vec![("MVLLS", full_hit("P41143", 5)), ("GGGG", full_hit("Q99999", 4))],
    );
    let chains = vec![
        ChainSequence::from_named("A", [(1, "MET"), (2, "VAL"), (3, "LEU"), (4, "LEU"), (5, "SER")]),
        ChainSequence::from_named("R", [(1, "GLY"), (2, "GLY"), (3, "GLY"), (4, "GLY")]),
    ];

    let report = resolver.resolve_chains(&chains).unwrap();
    assert_eq!(report.map.len(), 5);
    assert!(matches!(
        &report.diagnostics[..],
        [Diagnostic::ReferenceLookupFailed { chain, accession, .. }] if chain == "R" && accession == "Q99999"
    ));

    // failures are retried, successes are not
    resolver.resolve_chains(&chains).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[rstest]
fn test_malformed_hit_aborts_request() {
    let dir = tempfile::tempdir().unwrap();
    let (resolver, _) = resolver(dir.path(), vec![("MVLLS", full_hit("P41143", 5))]);
    let chains = vec![
        ChainSequence::from_named("A", [(1, "MET"), (2, "VAL"), (3, "LEU"), (4, "LEU"), (5, "SER")]),
        ChainSequence::from_named("B", [(1, "TRP")]),
    ];

    assert!(matches!(
        resolver.resolve_chains(&chains),
        Err(NumberingError::HitDescription(_))
    ));
}

#[rstest]
fn test_warm_cache_is_idempotent(receptor: TrajectoryFiles) {
    let dir = tempfile::tempdir().unwrap();
    let (resolver, calls) = resolver(dir.path(), vec![("MVLLS", full_hit("P41143", 5))]);
    let loader = PdbTopologyLoader::new();

    let first = resolver.resolve(&loader, &receptor).unwrap();
    let second = resolver.resolve(&loader, &receptor).unwrap();

    assert_eq!(
        serde_json::to_vec(&first.map).unwrap(),
        serde_json::to_vec(&second.map).unwrap()
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_exact_match_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (resolver, _) = resolver(dir.path(), vec![("MVLLS", full_hit("P41143", 5))]);
    // non contiguous residue indices still map positionally
    let chain = ChainSequence::from_named(
        "A",
        [(10, "MET"), (11, "VAL"), (15, "LEU"), (16, "LEU"), (30, "SER")],
    );

    let report = resolver.resolve_chains(&[chain.clone()]).unwrap();

    let labels: Vec<&str> = chain
        .residue_keys()
        .iter()
        .map(|k| report.map.get(k).unwrap())
        .collect();
    assert_eq!(labels, vec!["1x50", "1x51", "1x52", "ICL1", "2x37"]);
}

#[rstest]
fn test_mapped_keys_are_covered_by_segments() {
    let dir = tempfile::tempdir().unwrap();
    let hit = AlignmentResult::new(
        "P41143",
        vec![
            AlignmentSegment::new(1..3, 0..2).unwrap(),
            AlignmentSegment::new(4..6, 3..5).unwrap(),
        ],
    )
    .unwrap();
    let (resolver, _) = resolver(dir.path(), vec![("AMVALS", Some(hit.clone()))]);
    let chain = ChainSequence::from_named(
        "A",
        [(1, "ALA"), (2, "MET"), (3, "VAL"), (4, "ALA"), (5, "LEU"), (6, "SER")],
    );

    let report = resolver.resolve_chains(&[chain.clone()]).unwrap();

    let keys = chain.residue_keys();
    let covered: Vec<&ResidueKey> = hit
        .segments()
        .iter()
        .flat_map(|s| s.query.clone())
        .map(|q| &keys[q])
        .collect();
    assert_eq!(report.map.len(), 4);
    assert!(report.map.iter().all(|(k, _)| covered.contains(&k)));
    assert_eq!(report.unmapped().count(), 2);
}
