//! Building the BLAST database of reference receptors.
//!
//! The registry's receptor list is written as FASTA with
//! `>sp|<accession>|<entry_name>` headers, the form [`crate::blast_xml`]
//! extracts accessions from, and handed to `makeblastdb`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::info;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECEPTOR_LIST_API: &str = "https://gpcrdb.org/services/receptorlist/";

/// One reference receptor of the registry's receptor list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptorEntry {
    pub accession: String,
    #[serde(default)]
    pub entry_name: String,
    pub sequence: String,
}

pub fn fetch_receptor_list(api: &str, timeout: Duration) -> Result<Vec<ReceptorEntry>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?;
    let response = client
        .get(api)
        .header("accept", "application/json")
        .send()
        .with_context(|| format!("Failed to fetch receptor list from {}", api))?;
    if !response.status().is_success() {
        bail!("Receptor list request failed: HTTP {}", response.status());
    }
    let body = response.bytes()?;
    serde_json::from_slice(&body).context("Receptor list is not a list of receptors")
}

/// Read a receptor list saved by a previous run.
pub fn read_receptor_list(path: &Path) -> Result<Vec<ReceptorEntry>> {
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

///
/// Write receptors as FASTA, one sequence line per record.
///
/// # Returns
/// - number of records written; entries without a sequence are skipped
///
pub fn write_reference_fasta<W: Write>(entries: &[ReceptorEntry], writer: &mut W) -> Result<usize> {
    let mut written = 0;
    for entry in entries {
        if entry.sequence.is_empty() || entry.accession.is_empty() {
            continue;
        }
        writeln!(writer, ">sp|{}|{}", entry.accession, entry.entry_name)?;
        writeln!(writer, "{}", entry.sequence)?;
        written += 1;
    }
    Ok(written)
}

///
/// Write `receptors.fasta` into `out_dir` and build `<out_dir>/<db_name>` from it.
///
pub fn build_blast_db(
    entries: &[ReceptorEntry],
    makeblastdb: &Path,
    out_dir: &Path,
    db_name: &str,
) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    let fasta = out_dir.join("receptors.fasta");
    let mut writer = BufWriter::new(File::create(&fasta)?);
    let written = write_reference_fasta(entries, &mut writer)?;
    writer.flush()?;
    info!("Wrote {} reference sequences to {}", written, fasta.display());

    let status = Command::new(makeblastdb)
        .arg("-in")
        .arg(&fasta)
        .arg("-dbtype")
        .arg("prot")
        .arg("-out")
        .arg(out_dir.join(db_name))
        .status()
        .with_context(|| format!("Failed to run {}", makeblastdb.display()))?;
    if !status.success() {
        bail!("{} exited with {}", makeblastdb.display(), status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blast_xml::extract_accession;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_fasta_headers_carry_accession() {
        let entries: Vec<ReceptorEntry> = serde_json::from_str(
            r#"[
                {"entry_name": "oprd_human", "accession": "P41143", "sequence": "MEPAPSAGAEL", "family": "001_002"},
                {"entry_name": "empty_human", "accession": "Q00000", "sequence": ""}
            ]"#,
        )
        .unwrap();

        let mut out = Vec::new();
        let written = write_reference_fasta(&entries, &mut out).unwrap();
        let fasta = String::from_utf8(out).unwrap();

        assert_eq!(written, 1);
        assert_eq!(fasta, ">sp|P41143|oprd_human\nMEPAPSAGAEL\n");
        let header = fasta.lines().next().unwrap().trim_start_matches('>');
        assert_eq!(extract_accession(header).unwrap(), "P41143");
    }
}
