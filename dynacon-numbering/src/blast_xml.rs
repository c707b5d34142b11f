//! Reading the best hit out of a BLAST XML report (`-outfmt 5`).
//!
//! # Coordinate System
//!
//! | Field | Basis | Notes |
//! |-------|-------|-------|
//! | `Hsp_query-from` / `Hsp_query-to` | 1-based | Inclusive |
//! | `Hsp_hit-from` / `Hsp_hit-to` | 1-based | Inclusive |
//! | [`AlignmentSegment`] ranges | 0-based | Half-open `[start, end)` |
//!
//! An HSP with gaps is split into its gap free blocks, each becoming one
//! segment.

use dynacon_core::models::{AlignmentResult, AlignmentSegment};
use serde::Deserialize;

use crate::errors::{NumberingError, Result};

const BLAST_ORDINAL_ID_PREFIX: &str = "gnl|BL_ORD_ID|";

#[derive(Deserialize, Debug)]
struct BlastOutput {
    #[serde(rename = "BlastOutput_iterations", default)]
    iterations: Iterations,
}

#[derive(Deserialize, Debug, Default)]
struct Iterations {
    #[serde(rename = "Iteration", default)]
    iteration: Vec<Iteration>,
}

#[derive(Deserialize, Debug)]
struct Iteration {
    #[serde(rename = "Iteration_hits", default)]
    hits: IterationHits,
}

#[derive(Deserialize, Debug, Default)]
struct IterationHits {
    #[serde(rename = "Hit", default)]
    hit: Vec<Hit>,
}

#[derive(Deserialize, Debug)]
struct Hit {
    #[serde(rename = "Hit_id")]
    id: String,
    #[serde(rename = "Hit_def", default)]
    def: String,
    #[serde(rename = "Hit_hsps", default)]
    hsps: HitHsps,
}

#[derive(Deserialize, Debug, Default)]
struct HitHsps {
    #[serde(rename = "Hsp", default)]
    hsp: Vec<Hsp>,
}

#[derive(Deserialize, Debug)]
struct Hsp {
    #[serde(rename = "Hsp_query-from")]
    query_from: usize,
    #[serde(rename = "Hsp_query-to")]
    query_to: usize,
    #[serde(rename = "Hsp_hit-from")]
    hit_from: usize,
    #[serde(rename = "Hsp_hit-to")]
    hit_to: usize,
    #[serde(rename = "Hsp_qseq", default)]
    qseq: String,
    #[serde(rename = "Hsp_hseq", default)]
    hseq: String,
}

///
/// Description of a hit as used for the accession lookup.
///
/// Databases built without `-parse_seqids` report an ordinal id
/// (`gnl|BL_ORD_ID|0`); the real identifier is then the first word of the
/// definition line.
///
fn hit_description(hit: &Hit) -> &str {
    if hit.id.starts_with(BLAST_ORDINAL_ID_PREFIX) {
        hit.def.split_whitespace().next().unwrap_or("")
    } else {
        hit.id.as_str()
    }
}

///
/// Extract the accession from a `db|ACCESSION|ENTRY_NAME` description.
///
pub fn extract_accession(description: &str) -> Result<String> {
    match description.split('|').nth(1).map(str::trim) {
        Some(accession) if !accession.is_empty() => Ok(accession.to_string()),
        _ => Err(NumberingError::HitDescription(description.to_string())),
    }
}

///
/// Split an HSP into gap free segments, 0-based half-open.
///
fn hsp_segments(hsp: &Hsp) -> Option<Vec<AlignmentSegment>> {
    if hsp.query_from == 0 || hsp.hit_from == 0 || hsp.query_to < hsp.query_from || hsp.hit_to < hsp.hit_from {
        return None;
    }
    let query_start = hsp.query_from - 1;
    let target_start = hsp.hit_from - 1;

    // without the aligned strings the HSP can only be trusted when ungapped
    if hsp.qseq.is_empty() || hsp.hseq.is_empty() {
        return AlignmentSegment::new(query_start..hsp.query_to, target_start..hsp.hit_to)
            .ok()
            .map(|s| vec![s]);
    }
    if hsp.qseq.len() != hsp.hseq.len() {
        return None;
    }

    let mut segments = Vec::new();
    let mut q = query_start;
    let mut t = target_start;
    let mut block: Option<(usize, usize)> = None;

    for (qc, tc) in hsp.qseq.bytes().zip(hsp.hseq.bytes()) {
        let q_gap = qc == b'-';
        let t_gap = tc == b'-';
        if q_gap || t_gap {
            if let Some((qs, ts)) = block.take() {
                segments.push(AlignmentSegment::new(qs..q, ts..t).ok()?);
            }
        } else if block.is_none() {
            block = Some((q, t));
        }
        if !q_gap {
            q += 1;
        }
        if !t_gap {
            t += 1;
        }
    }
    if let Some((qs, ts)) = block {
        segments.push(AlignmentSegment::new(qs..q, ts..t).ok()?);
    }

    if q != hsp.query_to || t != hsp.hit_to {
        return None;
    }
    Some(segments)
}

///
/// Parse a BLAST XML report and return its best hit.
///
/// `Ok(None)` means there is no usable hit: an empty report, a report that
/// is not valid XML, or an HSP whose coordinates don't add up. A hit whose
/// description carries no accession is an error.
///
pub fn parse_best_hit(xml: &str) -> Result<Option<AlignmentResult>> {
    let output: BlastOutput = match quick_xml::de::from_str(xml) {
        Ok(output) => output,
        Err(e) => {
            log::warn!("Unparseable aligner report: {}", e);
            return Ok(None);
        }
    };

    let Some(hit) = output
        .iterations
        .iteration
        .into_iter()
        .flat_map(|it| it.hits.hit)
        .next()
    else {
        return Ok(None);
    };

    let accession = extract_accession(hit_description(&hit))?;

    let Some(hsp) = hit.hsps.hsp.first() else {
        return Ok(None);
    };
    let Some(segments) = hsp_segments(hsp) else {
        log::warn!("Inconsistent HSP coordinates for hit {}", hit.id);
        return Ok(None);
    };

    Ok(Some(AlignmentResult::new(&accession, segments)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::path::PathBuf;

    fn report(name: &str) -> String {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/data")
            .join(name);
        std::fs::read_to_string(path).unwrap()
    }

    fn hsp(query: (usize, usize), hit: (usize, usize), qseq: &str, hseq: &str) -> Hsp {
        Hsp {
            query_from: query.0,
            query_to: query.1,
            hit_from: hit.0,
            hit_to: hit.1,
            qseq: qseq.to_string(),
            hseq: hseq.to_string(),
        }
    }

    #[rstest]
    #[case("sp|P41143|OPRD_HUMAN", "P41143")]
    #[case("tr|A0A000|", "A0A000")]
    fn test_extract_accession(#[case] description: &str, #[case] expected: &str) {
        assert_eq!(extract_accession(description).unwrap(), expected);
    }

    #[rstest]
    #[case("P41143")]
    #[case("sp||OPRD_HUMAN")]
    fn test_extract_accession_malformed(#[case] description: &str) {
        assert!(matches!(
            extract_accession(description),
            Err(NumberingError::HitDescription(_))
        ));
    }

    #[rstest]
    fn test_ungapped_hsp_is_one_segment() {
        let segments = hsp_segments(&hsp((1, 5), (1, 5), "MVLLS", "MVLLS")).unwrap();
        assert_eq!(segments, vec![AlignmentSegment::new(0..5, 0..5).unwrap()]);
    }

    #[rstest]
    fn test_gapped_hsp_splits_into_blocks() {
        // query has an insertion (target gap) after 3 residues,
        // target has an insertion (query gap) later on
        let segments = hsp_segments(&hsp((2, 9), (10, 18), "ABCXDE--FG", "ABC-DEHIFG")).unwrap();
        assert_eq!(
            segments,
            vec![
                AlignmentSegment::new(1..4, 9..12).unwrap(),
                AlignmentSegment::new(5..7, 12..14).unwrap(),
                AlignmentSegment::new(7..9, 16..18).unwrap(),
            ]
        );
    }

    #[rstest]
    fn test_inconsistent_hsp_is_rejected() {
        assert!(hsp_segments(&hsp((1, 9), (1, 5), "MVLLS", "MVLLS")).is_none());
        assert!(hsp_segments(&hsp((0, 4), (1, 5), "MVLLS", "MVLLS")).is_none());
    }

    #[rstest]
    fn test_parse_report_with_hit() {
        let result = parse_best_hit(&report("blast_hit.xml")).unwrap().unwrap();
        assert_eq!(result.accession, "P41143");
        assert_eq!(
            result.segments(),
            &[
                AlignmentSegment::new(0..3, 0..3).unwrap(),
                AlignmentSegment::new(3..5, 5..7).unwrap(),
            ]
        );
    }

    #[rstest]
    fn test_parse_report_without_hits() {
        assert!(parse_best_hit(&report("blast_nohit.xml")).unwrap().is_none());
    }

    #[rstest]
    fn test_parse_garbage_is_no_hit() {
        assert!(parse_best_hit("this is not xml <<<").unwrap().is_none());
    }
}
