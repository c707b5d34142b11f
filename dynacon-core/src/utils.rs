use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;

/// Code used for residues whose three letter name is not recognised.
pub const UNKNOWN_RESIDUE: char = 'X';

///
/// Convert a three letter residue name to its one letter code.
///
/// Force field protonation variants (AMBER `HIE`, `ASH`, `CYX`, ...) map to
/// their parent amino acid. Anything unrecognised maps to [`UNKNOWN_RESIDUE`].
///
pub fn three_to_one(residue_name: &str) -> char {
    match residue_name.trim().to_ascii_uppercase().as_str() {
        "ALA" => 'A',
        "ARG" | "ARN" => 'R',
        "ASN" => 'N',
        "ASP" | "ASH" => 'D',
        "CYS" | "CYX" | "CYM" => 'C',
        "GLU" | "GLH" => 'E',
        "GLN" => 'Q',
        "GLY" => 'G',
        "HIS" | "HIE" | "HID" | "HIP" | "HSD" | "HSE" | "HSP" => 'H',
        "ILE" => 'I',
        "LEU" => 'L',
        "LYS" | "LYN" => 'K',
        "MET" => 'M',
        "PHE" => 'F',
        "PRO" => 'P',
        "SER" => 'S',
        "THR" => 'T',
        "TRP" => 'W',
        "TYR" => 'Y',
        "VAL" => 'V',
        _ => UNKNOWN_RESIDUE,
    }
}

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use rstest::*;
    use std::io::{BufRead, Write};

    #[rstest]
    #[case("ALA", 'A')]
    #[case("hie", 'H')]
    #[case("ASH", 'D')]
    #[case("HOH", 'X')]
    #[case("UNK", 'X')]
    fn test_three_to_one(#[case] name: &str, #[case] code: char) {
        assert_eq!(three_to_one(name), code);
    }

    #[rstest]
    fn test_dynamic_reader_reads_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts.tsv.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        writeln!(encoder, "0\tvdw\tA:ARG:1:N\tX:LIG:900:C1").unwrap();
        encoder.finish().unwrap();

        let lines: Vec<String> = get_dynamic_reader(&path)
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["0\tvdw\tA:ARG:1:N\tX:LIG:900:C1".to_string()]);
    }
}
