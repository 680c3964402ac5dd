use std::collections::BTreeMap;

use ahash::AHashMap;

/// A codon key: usually three bases, shorter for partial deletions, longer
/// when insertions stretch the reading frame.
pub type Codon = Vec<u8>;

/// Per-amino-acid-position codon counters of one derived fragment.
///
/// The quality counter mirrors the count counter key-for-key so that codon
/// re-alignment can move both masses together.
#[derive(Debug, Clone, Default)]
pub struct CodonTable {
    counts: BTreeMap<u64, AHashMap<Codon, u64>>,
    qualities: BTreeMap<u64, AHashMap<Codon, f64>>,
}

impl CodonTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` observations of `codon` at `aapos`, carrying
    /// `quality` total quality mass.
    pub fn observe(&mut self, aapos: u64, codon: Codon, count: u64, quality: f64) {
        *self
            .counts
            .entry(aapos)
            .or_default()
            .entry(codon.clone())
            .or_insert(0) += count;
        *self
            .qualities
            .entry(aapos)
            .or_default()
            .entry(codon)
            .or_insert(0.0) += quality;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    #[must_use]
    pub fn codons(&self, aapos: u64) -> Option<&AHashMap<Codon, u64>> {
        self.counts.get(&aapos)
    }

    /// Iterate positions in ascending order.
    pub fn positions(&self) -> impl Iterator<Item = u64> + '_ {
        self.counts.keys().copied()
    }

    #[must_use]
    pub fn total(&self, aapos: u64) -> u64 {
        self.counts
            .get(&aapos)
            .map_or(0, |codons| codons.values().sum())
    }

    #[must_use]
    pub fn quality(&self, aapos: u64, codon: &[u8]) -> f64 {
        self.qualities
            .get(&aapos)
            .and_then(|codons| codons.get(codon))
            .copied()
            .unwrap_or(0.0)
    }

    /// The most observed codon at `aapos`. Count ties break toward the
    /// lexicographically smallest codon so repeated queries agree.
    #[must_use]
    pub fn most_common(&self, aapos: u64) -> Option<(Codon, u64)> {
        let codons = self.counts.get(&aapos)?;
        codons
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(codon, count)| (codon.clone(), *count))
    }

    /// Move the whole count and quality mass of `old` onto `new`,
    /// accumulating into `new` when it already exists.
    pub fn transfer(&mut self, aapos: u64, old: &[u8], new: Codon) {
        if old == new.as_slice() {
            return;
        }
        if let Some(codons) = self.counts.get_mut(&aapos) {
            if let Some(count) = codons.remove(old) {
                *codons.entry(new.clone()).or_insert(0) += count;
            }
        }
        if let Some(codons) = self.qualities.get_mut(&aapos) {
            if let Some(quality) = codons.remove(old) {
                *codons.entry(new).or_insert(0.0) += quality;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_common_breaks_ties_deterministically() {
        let mut table = CodonTable::new();
        table.observe(1, b"TTT".to_vec(), 5, 0.0);
        table.observe(1, b"AAA".to_vec(), 5, 0.0);
        let (codon, count) = table.most_common(1).unwrap();
        assert_eq!(codon, b"AAA".to_vec());
        assert_eq!(count, 5);
    }

    #[test]
    fn transfer_preserves_total_mass() {
        let mut table = CodonTable::new();
        table.observe(3, b"ATG".to_vec(), 100, 3000.0);
        table.observe(3, b"ATA".to_vec(), 7, 200.0);
        let before = table.total(3);

        table.transfer(3, b"ATG", b"ATA".to_vec());
        assert_eq!(table.total(3), before);
        assert_eq!(table.codons(3).unwrap()[&b"ATA".to_vec()], 107);
        assert!(table.codons(3).unwrap().get(&b"ATG".to_vec()).is_none());
        assert!((table.quality(3, b"ATA") - 3200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn transfer_to_same_key_is_noop() {
        let mut table = CodonTable::new();
        table.observe(1, b"ATG".to_vec(), 9, 90.0);
        table.transfer(1, b"ATG", b"ATG".to_vec());
        assert_eq!(table.codons(1).unwrap()[&b"ATG".to_vec()], 9);
    }
}
