use crate::DocId;

/// Occurrences of one term inside one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub document_id: DocId,
    pub term: String,
    /// Word offsets, strictly increasing. Empty when read without positions.
    pub positions: Vec<u32>,
    /// Term frequency in the document; equals `positions.len()` whenever positions are loaded.
    pub tftd: u32,
    pub wdt: f64,
}

impl Posting {
    pub fn new(document_id: DocId, term: impl Into<String>) -> Self {
        Self { document_id, term: term.into(), positions: Vec::new(), tftd: 0, wdt: 0.0 }
    }

    pub fn with_position(document_id: DocId, term: impl Into<String>, position: u32) -> Self {
        let mut posting = Self::new(document_id, term);
        posting.add_position(position);
        posting
    }

    pub fn add_position(&mut self, position: u32) {
        self.positions.push(position);
        self.tftd += 1;
    }

    pub fn frequency(&self) -> u32 { self.tftd }

    /// Document-term weight `1 + ln(tftd)`.
    pub fn calculate_wdt(&self) -> f64 {
        if self.tftd == 0 { 0.0 } else { 1.0 + (self.tftd as f64).ln() }
    }
}

/// Replace each position by its distance to the previous one (the first keeps its value).
pub fn encode_gaps(positions: &[u32]) -> Vec<u32> {
    let mut last = 0u32;
    positions
        .iter()
        .map(|&p| {
            let gap = p - last;
            last = p;
            gap
        })
        .collect()
}

/// Rebuild absolute positions from gaps by running sum.
///
/// Returns `None` when the gaps cannot come from a strictly increasing sequence
/// (a zero gap after the first one, or a sum past `u32::MAX`).
pub fn decode_gaps(gaps: &[u32]) -> Option<Vec<u32>> {
    let mut positions = Vec::with_capacity(gaps.len());
    let mut last = 0u32;
    for (i, &gap) in gaps.iter().enumerate() {
        if i > 0 && gap == 0 {
            return None;
        }
        last = last.checked_add(gap)?;
        positions.push(last);
    }
    Some(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_are_reversible() {
        let positions = vec![0, 4, 5, 62, 74, 212];
        let gaps = encode_gaps(&positions);
        assert_eq!(gaps, vec![0, 4, 1, 57, 12, 138]);
        assert_eq!(decode_gaps(&gaps), Some(positions));
        assert!(encode_gaps(&[]).is_empty());
        assert_eq!(decode_gaps(&[]), Some(vec![]));
    }

    #[test]
    fn decode_rejects_impossible_gaps() {
        assert_eq!(decode_gaps(&[3, 0]), None);
        assert_eq!(decode_gaps(&[u32::MAX, 1]), None);
    }

    #[test]
    fn wdt_uses_log_frequency() {
        let mut p = Posting::with_position(3, "whale", 7);
        assert_eq!(p.calculate_wdt(), 1.0);
        p.add_position(9);
        p.add_position(11);
        assert!((p.calculate_wdt() - (1.0 + 3f64.ln())).abs() < 1e-12);
        assert_eq!(p.frequency(), 3);
    }
}
