//! Reading GetContacts output.
//!
//! A dynamic contacts file starts with two header lines, followed by one
//! tab separated line per contact:
//!
//! ```text
//! frame  itype  atom_1  atom_2  [atom_3  [atom_4]]
//! ```
//!
//! Atoms are written `chain:resname:resid:atom`.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use dynacon_core::models::ResidueKey;
use dynacon_core::utils::get_dynamic_reader;
use serde::Serialize;

use crate::errors::{PipelineError, Result};

const HEADER_LINES: usize = 2;

/// Interaction type abbreviations and their display names.
pub const INTERACTION_TYPES: [(&str, &str); 14] = [
    ("sb", "Salt bridges"),
    ("pc", "Pi-cation"),
    ("ps", "Pi-stacking"),
    ("ts", "T-stacking"),
    ("vdw", "van der Waals"),
    ("hbbb", "BB–BB H-bond"),
    ("hbsb", "BB–SC H-bond"),
    ("hbss", "SC–SC H-bond"),
    ("wb", "Water-med. H-bond"),
    ("wb2", "Ext. water-med. H-bond"),
    ("hblb", "Lig.–BB H-bond"),
    ("hbls", "Lig.–SC H-bond"),
    ("lwb", "Lig.–water H-bond"),
    ("lwb2", "Lig.–ext. water H-bond"),
];

/// Display name of an interaction type; unknown abbreviations come back as-is.
pub fn interaction_long_name(abbreviation: &str) -> &str {
    INTERACTION_TYPES
        .iter()
        .find(|(short, _)| *short == abbreviation)
        .map(|(_, long)| *long)
        .unwrap_or(abbreviation)
}

/// One line of a contacts file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub frame: u64,
    pub interaction: String,
    pub atoms: Vec<String>,
    /// Generic number read from the numbered structure, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdb_numbering: Option<String>,
    /// Generic number transferred through the alignment, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blast_numbering: Option<String>,
}

impl Contact {
    /// Residues of the first two atoms, the ones numbering columns look at.
    pub fn residue_keys(&self) -> Vec<ResidueKey> {
        self.atoms
            .iter()
            .take(2)
            .filter_map(|atom| atom.parse::<ResidueKey>().ok())
            .collect()
    }
}

fn parse_contact_line(line: &str) -> Option<Contact> {
    let mut fields = line.split('\t').map(str::trim);
    let frame = fields.next()?.parse::<u64>().ok()?;
    let interaction = fields.next()?;
    let atoms: Vec<String> = fields.filter(|f| !f.is_empty()).map(String::from).collect();
    if atoms.len() < 2 {
        return None;
    }
    Some(Contact {
        frame,
        interaction: interaction_long_name(interaction).to_string(),
        atoms,
        pdb_numbering: None,
        blast_numbering: None,
    })
}

///
/// Read a contacts file, translating interaction types to their display names.
///
pub fn read_contacts_tsv(path: &Path) -> Result<Vec<Contact>> {
    let reader = get_dynamic_reader(path).map_err(|e| PipelineError::ContactsParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut contacts = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if n < HEADER_LINES || line.trim().is_empty() {
            continue;
        }
        let contact = parse_contact_line(&line).ok_or_else(|| PipelineError::ContactsParse {
            path: path.display().to_string(),
            reason: format!("line {}: {:?}", n + 1, line),
        })?;
        contacts.push(contact);
    }
    Ok(contacts)
}

///
/// Frame total from the first header line (`# total_frames:37 beg:0 ...`),
/// `None` when the header does not carry one.
///
pub fn read_total_frames(path: &Path) -> Result<Option<u64>> {
    let reader = get_dynamic_reader(path).map_err(|e| PipelineError::ContactsParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let Some(header) = reader.lines().next().transpose()? else {
        return Ok(None);
    };
    Ok(header
        .trim_start_matches('#')
        .split_whitespace()
        .find_map(|field| field.strip_prefix("total_frames:"))
        .and_then(|n| n.parse().ok()))
}

/// Number of contacts per frame and interaction type.
pub fn interaction_counts(contacts: &[Contact]) -> BTreeMap<u64, BTreeMap<String, usize>> {
    let mut counts: BTreeMap<u64, BTreeMap<String, usize>> = BTreeMap::new();
    for contact in contacts {
        *counts
            .entry(contact.frame)
            .or_default()
            .entry(contact.interaction.clone())
            .or_default() += 1;
    }
    counts
}
