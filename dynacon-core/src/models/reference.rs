use serde::{Deserialize, Serialize};

///
/// One residue of a reference receptor as served by the numbering registry.
///
/// The registry payload names the label fields `display_generic_number` and
/// `protein_segment`; every other field of the payload is ignored.
///
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceResidueRecord {
    /// 1-based position in the reference sequence
    pub sequence_number: u32,
    pub amino_acid: char,
    #[serde(rename = "display_generic_number", default)]
    pub generic_number: Option<String>,
    #[serde(rename = "protein_segment")]
    pub segment_label: String,
}

impl ReferenceResidueRecord {
    pub fn new(
        sequence_number: u32,
        amino_acid: char,
        generic_number: Option<&str>,
        segment_label: &str,
    ) -> Self {
        ReferenceResidueRecord {
            sequence_number,
            amino_acid,
            generic_number: generic_number.map(|s| s.to_string()),
            segment_label: segment_label.to_string(),
        }
    }
}

///
/// Parse a registry response body into records.
///
/// Required fields are checked here so that a malformed payload fails with a
/// descriptive message instead of somewhere inside the resolver.
///
pub fn parse_reference_records(body: &[u8]) -> Result<Vec<ReferenceResidueRecord>, serde_json::Error> {
    serde_json::from_slice(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_parse_registry_payload() {
        let body = br#"[
            {"sequence_number": 1, "amino_acid": "M", "protein_segment": "N-term", "display_generic_number": null, "alternative_generic_numbers": []},
            {"sequence_number": 2, "amino_acid": "V", "protein_segment": "TM1", "display_generic_number": "1.50x50"}
        ]"#;
        let records = parse_reference_records(body).unwrap();
        assert_eq!(
            records,
            vec![
                ReferenceResidueRecord::new(1, 'M', None, "N-term"),
                ReferenceResidueRecord::new(2, 'V', Some("1.50x50"), "TM1"),
            ]
        );
    }

    #[rstest]
    fn test_parse_registry_payload_missing_field() {
        let body = br#"[{"sequence_number": 1, "protein_segment": "TM1"}]"#;
        let err = parse_reference_records(body).unwrap_err();
        assert!(err.to_string().contains("amino_acid"));
    }
}
