use std::ops::Range;

use serde::Serialize;

use crate::errors::CoreError;

///
/// One gap free block of a local alignment.
///
/// Both ranges are 0-based and half-open and have the same length. The query
/// range indexes into the chain's one letter sequence, the target range into
/// the reference sequence.
///
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct AlignmentSegment {
    pub query: Range<usize>,
    pub target: Range<usize>,
}

impl AlignmentSegment {
    pub fn new(query: Range<usize>, target: Range<usize>) -> Result<Self, CoreError> {
        if query.start > query.end || target.start > target.end || query.len() != target.len() {
            return Err(CoreError::SegmentLengthMismatch { query, target });
        }
        Ok(AlignmentSegment { query, target })
    }

    pub fn len(&self) -> usize {
        self.query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// `(query_position, target_position)` pairs covered by this segment.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.query.clone().zip(self.target.clone())
    }
}

///
/// Best hit of one alignment: the reference accession and its segments,
/// ordered by query start and never overlapping in query coordinates.
///
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct AlignmentResult {
    pub accession: String,
    segments: Vec<AlignmentSegment>,
}

impl AlignmentResult {
    pub fn new(accession: &str, segments: Vec<AlignmentSegment>) -> Result<Self, CoreError> {
        let mut last_end = 0;
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 && segment.query.start < last_end {
                return Err(CoreError::SegmentOrder(segment.query.start));
            }
            last_end = segment.query.end;
        }
        Ok(AlignmentResult {
            accession: accession.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[AlignmentSegment] {
        &self.segments
    }

    /// Number of query positions covered by any segment.
    pub fn aligned_length(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_segment_requires_equal_lengths() {
        assert!(AlignmentSegment::new(0..5, 0..5).is_ok());
        assert!(AlignmentSegment::new(0..5, 2..6).is_err());
    }

    #[rstest]
    fn test_segment_pairs() {
        let segment = AlignmentSegment::new(2..5, 10..13).unwrap();
        let pairs: Vec<_> = segment.pairs().collect();
        assert_eq!(pairs, vec![(2, 10), (3, 11), (4, 12)]);
    }

    #[rstest]
    fn test_result_rejects_overlapping_segments() {
        let segments = vec![
            AlignmentSegment::new(0..4, 0..4).unwrap(),
            AlignmentSegment::new(3..6, 6..9).unwrap(),
        ];
        assert!(AlignmentResult::new("P41143", segments).is_err());
    }

    #[rstest]
    fn test_result_aligned_length() {
        let segments = vec![
            AlignmentSegment::new(0..4, 0..4).unwrap(),
            AlignmentSegment::new(4..6, 7..9).unwrap(),
        ];
        let result = AlignmentResult::new("P41143", segments).unwrap();
        assert_eq!(result.aligned_length(), 6);
        assert_eq!(result.segments().len(), 2);
    }
}
