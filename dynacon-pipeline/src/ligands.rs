//! Ligands seen across the frames of one run.
//!
//! Per frame reports are JSON files `frame_<n>.json`:
//!
//! ```json
//! { "frame": 12, "ligands": [{ "inchikey": "...", "residue_name": "LIG", "smiles": "..." }] }
//! ```
//!
//! Ligands are keyed by InChIKey, or by residue name for reports that carry
//! no InChIKey (those derived from a contacts file). Only ligands present in
//! at least [`DETECTION_THRESHOLD`] of all frames are reported, enriched
//! with names and ChEBI ids from offline tables.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use dynacon_core::consts::{INCHIKEY_TO_CHEBI_FILE, INCHIKEY_TO_NAME_FILE};
use dynacon_core::models::ResidueKey;
use dynacon_core::utils::{UNKNOWN_RESIDUE, three_to_one};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::contacts::{Contact, read_contacts_tsv, read_total_frames};
use crate::errors::Result;

/// Fraction of frames a ligand must be seen in to be reported.
pub const DETECTION_THRESHOLD: f64 = 0.7;

/// One ligand found in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLigand {
    #[serde(default)]
    pub inchikey: Option<String>,
    pub residue_name: String,
    #[serde(default)]
    pub smiles: Option<String>,
}

impl DetectedLigand {
    /// Key ligands are counted under.
    pub fn identity(&self) -> &str {
        self.inchikey.as_deref().unwrap_or(&self.residue_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame: u64,
    #[serde(default)]
    pub ligands: Vec<DetectedLigand>,
}

/// Read every `*.json` frame report of a folder, ordered by frame.
///
/// A missing folder has no reports; unreadable files are skipped.
pub fn read_frame_reports(dir: &Path) -> Result<Vec<FrameReport>> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut reports = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match fs::read(&path).map(|raw| serde_json::from_slice::<FrameReport>(&raw)) {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(e)) => warn!("Skipping malformed frame report {}: {}", path.display(), e),
            Err(e) => warn!("Can't read frame report {}: {}", path.display(), e),
        }
    }
    reports.sort_by_key(|r| r.frame);
    Ok(reports)
}

const WATER_RESIDUES: [&str; 6] = ["HOH", "WAT", "SOL", "TIP3", "TIP4", "SPC"];

/// Residues that are neither amino acids nor water.
fn is_ligand_residue(key: &ResidueKey) -> bool {
    three_to_one(&key.residue_name) == UNKNOWN_RESIDUE
        && !WATER_RESIDUES.contains(&key.residue_name.to_ascii_uppercase().as_str())
}

///
/// One report per frame, listing the ligand residues that take part in a
/// contact of that frame. Frames without contacts get an empty report.
///
pub fn frame_reports_from_contacts(contacts: &[Contact], total_frames: u64) -> Vec<FrameReport> {
    let mut per_frame: BTreeMap<u64, BTreeSet<String>> =
        (0..total_frames).map(|frame| (frame, BTreeSet::new())).collect();
    for contact in contacts {
        let names = per_frame.entry(contact.frame).or_default();
        for atom in &contact.atoms {
            if let Ok(key) = atom.parse::<ResidueKey>()
                && is_ligand_residue(&key)
            {
                names.insert(key.residue_name);
            }
        }
    }

    per_frame
        .into_iter()
        .map(|(frame, names)| FrameReport {
            frame,
            ligands: names
                .into_iter()
                .map(|residue_name| DetectedLigand {
                    inchikey: None,
                    residue_name,
                    smiles: None,
                })
                .collect(),
        })
        .collect()
}

/// Write each report to `dir` as `frame_<n>.json`.
pub fn write_frame_reports(dir: &Path, reports: &[FrameReport]) -> Result<()> {
    fs::create_dir_all(dir)?;
    for report in reports {
        let path = dir.join(format!("frame_{}.json", report.frame));
        fs::write(&path, serde_json::to_vec(report)?)?;
    }
    Ok(())
}

///
/// Derive frame reports from a GetContacts file and write them to `dir`.
///
/// The frame total comes from the `# total_frames:` header, or from the
/// last frame with a contact when the header has none. Returns the number
/// of reports written.
///
pub fn write_contacts_frame_reports(contacts_file: &Path, dir: &Path) -> Result<usize> {
    let contacts = read_contacts_tsv(contacts_file)?;
    let last_frame = contacts.iter().map(|c| c.frame + 1).max().unwrap_or(0);
    let total = read_total_frames(contacts_file)?.unwrap_or(last_frame);
    let reports = frame_reports_from_contacts(&contacts, total);
    write_frame_reports(dir, &reports)?;
    debug!("Wrote {} frame reports to {}", reports.len(), dir.display());
    Ok(reports.len())
}

/// InChIKey -> name and InChIKey -> ChEBI id tables.
///
/// Loaded once at startup and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct LigandTables {
    names: HashMap<String, String>,
    chebi_ids: HashMap<String, String>,
}

impl LigandTables {
    pub fn new(names: HashMap<String, String>, chebi_ids: HashMap<String, String>) -> Self {
        LigandTables { names, chebi_ids }
    }

    ///
    /// Load both tables from `folder`. A missing or unreadable table is
    /// replaced by an empty one.
    ///
    pub fn load(folder: &Path) -> Self {
        LigandTables {
            names: read_table(&folder.join(INCHIKEY_TO_NAME_FILE)),
            chebi_ids: read_table(&folder.join(INCHIKEY_TO_CHEBI_FILE)),
        }
    }

    pub fn name(&self, inchikey: &str) -> Option<&str> {
        self.names.get(inchikey).map(String::as_str)
    }

    pub fn chebi_id(&self, inchikey: &str) -> Option<&str> {
        self.chebi_ids.get(inchikey).map(String::as_str)
    }
}

fn read_table(path: &Path) -> HashMap<String, String> {
    let parsed = fs::read(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_slice(&raw).map_err(|e| e.to_string()));
    match parsed {
        Ok(table) => table,
        Err(e) => {
            warn!("Ligand table {} unavailable, using an empty one: {}", path.display(), e);
            HashMap::new()
        }
    }
}

/// A ligand that passed the detection threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LigandSummary {
    pub inchikey: Option<String>,
    pub residue_name: String,
    pub smiles: Option<String>,
    pub frames_seen: usize,
    pub ratio: f64,
    pub name: Option<String>,
    pub chebi_id: Option<String>,
}

#[derive(Debug, Clone)]
struct Seen {
    ligand: DetectedLigand,
    frames_seen: usize,
}

/// Accumulates distinct ligands over the frames of one run.
#[derive(Debug, Default)]
pub struct LigandDetectionAggregator {
    // first detection order
    seen: Vec<Seen>,
    index: HashMap<String, usize>,
}

impl LigandDetectionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every ligand of a frame once.
    pub fn add_frame(&mut self, report: &FrameReport) {
        let mut in_frame = HashSet::new();
        for ligand in &report.ligands {
            if !in_frame.insert(ligand.identity()) {
                continue;
            }
            match self.index.get(ligand.identity()) {
                Some(&i) => self.seen[i].frames_seen += 1,
                None => {
                    self.index.insert(ligand.identity().to_string(), self.seen.len());
                    self.seen.push(Seen {
                        ligand: ligand.clone(),
                        frames_seen: 1,
                    });
                }
            }
        }
    }

    pub fn distinct(&self) -> usize {
        self.seen.len()
    }

    ///
    /// Ligands seen in at least [`DETECTION_THRESHOLD`] of `total_frames`,
    /// in first detection order.
    ///
    pub fn summarize(&self, total_frames: usize, tables: &LigandTables) -> Vec<LigandSummary> {
        if total_frames == 0 {
            return vec![];
        }
        self.seen
            .iter()
            .filter_map(|s| {
                let ratio = s.frames_seen as f64 / total_frames as f64;
                if ratio < DETECTION_THRESHOLD {
                    debug!(
                        "Dropping ligand {} seen in {} / {} frames",
                        s.ligand.identity(),
                        s.frames_seen,
                        total_frames
                    );
                    return None;
                }
                let inchikey = s.ligand.inchikey.as_deref();
                Some(LigandSummary {
                    inchikey: inchikey.map(String::from),
                    residue_name: s.ligand.residue_name.clone(),
                    smiles: s.ligand.smiles.clone(),
                    frames_seen: s.frames_seen,
                    ratio,
                    name: inchikey.and_then(|k| tables.name(k)).map(String::from),
                    chebi_id: inchikey.and_then(|k| tables.chebi_id(k)).map(String::from),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const NALTRINDOLE: &str = "WIYUZYBFCWCCQJ-IFKAHUTRSA-N";
    const SODIUM: &str = "FKNQFGJONOIPTF-UHFFFAOYSA-N";

    fn ligand(inchikey: &str) -> DetectedLigand {
        DetectedLigand {
            inchikey: Some(inchikey.to_string()),
            residue_name: "LIG".to_string(),
            smiles: None,
        }
    }

    fn run(frames: u64, hits: &[(&str, u64)]) -> LigandDetectionAggregator {
        let mut aggregator = LigandDetectionAggregator::new();
        for frame in 0..frames {
            let ligands = hits
                .iter()
                .filter(|(_, seen)| frame < *seen)
                .map(|(key, _)| ligand(key))
                .collect();
            aggregator.add_frame(&FrameReport { frame, ligands });
        }
        aggregator
    }

    #[rstest]
    fn test_threshold() {
        let aggregator = run(100, &[(SODIUM, 65), (NALTRINDOLE, 71)]);
        let tables = LigandTables::new(
            HashMap::from([(NALTRINDOLE.to_string(), "naltrindole".to_string())]),
            HashMap::new(),
        );

        let summary = aggregator.summarize(100, &tables);

        assert_eq!(aggregator.distinct(), 2);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].inchikey.as_deref(), Some(NALTRINDOLE));
        assert_eq!(summary[0].frames_seen, 71);
        assert_eq!(summary[0].name.as_deref(), Some("naltrindole"));
        assert_eq!(summary[0].chebi_id, None);
    }

    #[rstest]
    fn test_exact_threshold_is_included() {
        let aggregator = run(10, &[(NALTRINDOLE, 7)]);
        assert_eq!(aggregator.summarize(10, &LigandTables::default()).len(), 1);
    }

    #[rstest]
    fn test_repeat_in_one_frame_counts_once() {
        let mut aggregator = LigandDetectionAggregator::new();
        aggregator.add_frame(&FrameReport {
            frame: 0,
            ligands: vec![ligand(SODIUM), ligand(SODIUM)],
        });
        aggregator.add_frame(&FrameReport {
            frame: 1,
            ligands: vec![],
        });
        // 1 / 2 frames
        assert!(aggregator.summarize(2, &LigandTables::default()).is_empty());
    }

    #[rstest]
    fn test_missing_tables_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tables = LigandTables::load(dir.path());
        assert_eq!(tables.name(NALTRINDOLE), None);
    }

    #[rstest]
    fn test_tables_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(INCHIKEY_TO_CHEBI_FILE),
            format!(r#"{{"{}": "CHEBI:7460"}}"#, NALTRINDOLE),
        )
        .unwrap();
        let tables = LigandTables::load(dir.path());
        assert_eq!(tables.chebi_id(NALTRINDOLE), Some("CHEBI:7460"));
    }

    #[rstest]
    fn test_reports_from_contacts_file() {
        let dir = tempfile::tempdir().unwrap();
        let contacts = dir.path().join("result1.tsv");
        fs::write(
            &contacts,
            "# total_frames:4 beg:0 end:3 stride:1 interaction_types:all\n\
             # Columns: frame, interaction_type, atom_1, atom_2[, atom_3[, atom_4]]\n\
             0\tsb\tA:ASP:128:OD1\tX:NTI:900:N1\n\
             0\tlwb\tX:NTI:900:O1\tW:HOH:1201:OH2\n\
             2\tvdw\tA:LEU:3:CD1\tX:NTI:900:C4\n\
             2\tvdw\tA:LEU:3:CD2\tX:NA:901:NA\n",
        )
        .unwrap();
        let frames = dir.path().join("frames/1");

        assert_eq!(write_contacts_frame_reports(&contacts, &frames).unwrap(), 4);

        let reports = read_frame_reports(&frames).unwrap();
        let names: Vec<Vec<&str>> = reports
            .iter()
            .map(|r| r.ligands.iter().map(|l| l.residue_name.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["NTI"], vec![], vec!["NA", "NTI"], vec![]]);

        let mut aggregator = LigandDetectionAggregator::new();
        for report in &reports {
            aggregator.add_frame(report);
        }
        // at most 2 / 4 frames
        assert_eq!(aggregator.distinct(), 2);
        assert!(aggregator.summarize(4, &LigandTables::default()).is_empty());
    }

    #[rstest]
    fn test_reports_without_total_header() {
        let contacts = vec![Contact {
            frame: 2,
            interaction: "van der Waals".to_string(),
            atoms: vec!["A:LEU:3:CD1".to_string(), "X:LIG:900:C4".to_string()],
            pdb_numbering: None,
            blast_numbering: None,
        }];
        let reports = frame_reports_from_contacts(&contacts, 0);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].frame, 2);
        assert_eq!(reports[0].ligands[0].identity(), "LIG");
    }

    #[rstest]
    fn test_read_frame_reports() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("frame_1.json"),
            format!(r#"{{"frame": 1, "ligands": [{{"inchikey": "{}", "residue_name": "NTI"}}]}}"#, NALTRINDOLE),
        )
        .unwrap();
        fs::write(dir.path().join("frame_0.json"), r#"{"frame": 0}"#).unwrap();
        fs::write(dir.path().join("frame_2.json"), "{").unwrap();

        let reports = read_frame_reports(dir.path()).unwrap();
        assert_eq!(reports.iter().map(|r| r.frame).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(reports[1].ligands[0].residue_name, "NTI");
        assert!(read_frame_reports(&dir.path().join("missing")).unwrap().is_empty());
    }
}
