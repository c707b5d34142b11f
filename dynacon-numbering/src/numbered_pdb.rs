//! Reading structures annotated by the generic number assignment service.
//!
//! The service returns the submitted PDB with generic numbers written into
//! the B-factor column: the `N` atom of a residue carries its
//! Ballesteros–Weinstein number, the `CA` atom its registry number.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use anyhow::Result;
use dynacon_core::models::ResidueKey;
use dynacon_core::utils::get_dynamic_reader;

use crate::pdb::parse_atom_record;

/// Generic numbers read from one residue of a numbered structure.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct PdbNumbering {
    pub ballesteros_weinstein: Option<String>,
    pub generic_number: Option<String>,
}

fn bfactor(line: &str) -> Option<(&str, f64)> {
    let raw = line.get(60..66)?.trim();
    raw.parse::<f64>().ok().map(|v| (raw, v))
}

///
/// Render a `CA` B-factor as a generic number label.
///
/// Positive values are written as-is with the decimal point replaced by `x`.
/// Negative values mark three digit positions: `-1.51` becomes `1x511`.
///
fn generic_label(raw: &str, value: f64) -> String {
    if value > 0.0 {
        raw.replace('.', "x")
    } else {
        let shifted = format!("{:.3}", (-value + 0.001).abs());
        let trimmed = shifted.trim_end_matches('0').trim_end_matches('.');
        trimmed.replace('.', "x")
    }
}

///
/// Read a numbered PDB file into a residue -> numbering table.
///
/// Values outside the ranges the service uses for real labels (zero, or
/// beyond helix 8) are skipped.
///
pub fn read_numbered_pdb(path: &Path) -> Result<HashMap<ResidueKey, PdbNumbering>> {
    let reader = get_dynamic_reader(path)?;
    let mut table: HashMap<ResidueKey, PdbNumbering> = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        if !line.starts_with("ATOM") {
            continue;
        }
        let Some((chain, residue_name, residue_index, atom_name)) = parse_atom_record(&line) else {
            continue;
        };
        let Some((raw, value)) = bfactor(&line) else {
            continue;
        };
        let key = ResidueKey::new(&chain, &residue_name, residue_index);

        match atom_name.as_str() {
            "N" => {
                if value <= 0.0 || value >= 8.1 {
                    continue;
                }
                table.entry(key).or_default().ballesteros_weinstein = Some(raw.to_string());
            }
            "CA" => {
                if value <= -8.1 || value >= 8.1 || value == 0.0 {
                    continue;
                }
                table.entry(key).or_default().generic_number = Some(generic_label(raw, value));
            }
            _ => {}
        }
    }

    Ok(table)
}
