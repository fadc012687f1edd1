//! Genome representation and random operators for evolutionary search.
//!
//! Provides bit-packed genomes plus random generation, crossover, and mutation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::prelude::*;

use crate::schema::{GenomeFamily, MutationConfig};

const WORD_BITS: usize = 64;

/// Fixed-length bit vector encoding a cellular automaton rule.
///
/// Bits are packed LSB-first into `u64` words; padding bits past `len` are
/// always zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Genome {
    words: Vec<u64>,
    len: usize,
}

impl Genome {
    /// All-zero genome of `len` bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Build from one byte per bit (non-zero = live).
    pub fn from_bits(bits: &[u8]) -> Self {
        let mut genome = Self::zeros(bits.len());
        for (i, &b) in bits.iter().enumerate() {
            if b != 0 {
                genome.set(i, true);
            }
        }
        genome
    }

    /// Parse a `'0'/'1'` rule string into a genome of exactly `len` bits.
    ///
    /// Any character other than `'1'` reads as 0. Longer input is truncated,
    /// shorter input is zero-padded.
    pub fn parse_rule_str(text: &str, len: usize) -> Self {
        let mut genome = Self::zeros(len);
        for (i, c) in text.chars().take(len).enumerate() {
            if c == '1' {
                genome.set(i, true);
            }
        }
        genome
    }

    /// Render as a `'0'/'1'` string.
    pub fn to_rule_string(&self) -> String {
        self.iter().map(|b| if b { '1' } else { '0' }).collect()
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the genome has zero bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read bit `i`.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    /// Read bit `i` as 0 or 1.
    #[inline]
    pub fn bit(&self, i: usize) -> u8 {
        self.get(i) as u8
    }

    /// Write bit `i`.
    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        debug_assert!(i < self.len);
        let mask = 1u64 << (i % WORD_BITS);
        if value {
            self.words[i / WORD_BITS] |= mask;
        } else {
            self.words[i / WORD_BITS] &= !mask;
        }
    }

    /// Invert bit `i`.
    #[inline]
    pub fn flip(&mut self, i: usize) {
        debug_assert!(i < self.len);
        self.words[i / WORD_BITS] ^= 1u64 << (i % WORD_BITS);
    }

    /// Number of live bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate bits in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Packed bytes, 8 bits per byte, LSB first.
    pub fn to_packed_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.words.iter().flat_map(|w| w.to_le_bytes()).collect();
        bytes.truncate(self.len.div_ceil(8));
        bytes
    }

    /// Unpack `len` bits from LSB-first bytes.
    pub fn from_packed_bytes(bytes: &[u8], len: usize) -> Result<Self, GenomeError> {
        let expected = len.div_ceil(8);
        if bytes.len() != expected {
            return Err(GenomeError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let mut genome = Self::zeros(len);
        for (word, chunk) in genome.words.iter_mut().zip(bytes.chunks(8)) {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }
        if genome.len % WORD_BITS != 0
            && let Some(last) = genome.words.last_mut()
        {
            *last &= (1u64 << (genome.len % WORD_BITS)) - 1;
        }
        Ok(genome)
    }

    /// Packed bits as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_packed_bytes())
    }

    /// Decode packed base64 bits into a genome of `len` bits.
    pub fn from_base64(encoded: &str, len: usize) -> Result<Self, GenomeError> {
        let bytes = STANDARD.decode(encoded)?;
        Self::from_packed_bytes(&bytes, len)
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }
}

/// Genome decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum GenomeError {
    #[error("Packed genome holds {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Invalid base64 genome: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Live-bit count {k} exceeds genome half of {half} bits")]
    InvalidCase { k: usize, half: usize },
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create from an optional seed.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::random, Self::new)
    }

    /// Underlying generator, for seeding lattices from the same stream.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Genome whose bits are independently live with probability `density`.
    pub fn random_genome(&mut self, len: usize, density: f64) -> Genome {
        let p = density.clamp(0.0, 1.0);
        let mut genome = Genome::zeros(len);
        for i in 0..len {
            if self.rng.gen_bool(p) {
                genome.set(i, true);
            }
        }
        genome
    }

    /// Genome with exactly `k` live bits at uniformly random positions.
    pub fn random_with_k(&mut self, len: usize, k: usize) -> Genome {
        let mut genome = Genome::zeros(len);
        for i in rand::seq::index::sample(&mut self.rng, len, k.min(len)) {
            genome.set(i, true);
        }
        genome
    }

    /// Compact genome with `dead_k` live totals in the dead-center half and
    /// `alive_k` in the live-center half.
    pub fn case_genome(
        &mut self,
        family: GenomeFamily,
        dead_k: usize,
        alive_k: usize,
    ) -> Result<Genome, GenomeError> {
        let len = family.genome_len();
        let half = len / 2;
        for k in [dead_k, alive_k] {
            if k > half {
                return Err(GenomeError::InvalidCase { k, half });
            }
        }

        let mut genome = Genome::zeros(len);
        for i in rand::seq::index::sample(&mut self.rng, half, dead_k) {
            genome.set(i, true);
        }
        for i in rand::seq::index::sample(&mut self.rng, half, alive_k) {
            genome.set(half + i, true);
        }
        Ok(genome)
    }

    /// Uniform crossover producing two complementary children.
    ///
    /// At each position one child takes `parent1`'s bit and the other takes
    /// `parent2`'s, chosen by an independent fair coin.
    pub fn crossover_pair(&mut self, parent1: &Genome, parent2: &Genome) -> (Genome, Genome) {
        debug_assert_eq!(parent1.len, parent2.len);

        let mut child1 = Genome::zeros(parent1.len);
        let mut child2 = Genome::zeros(parent1.len);
        for (i, (&a, &b)) in parent1.words.iter().zip(&parent2.words).enumerate() {
            let mask: u64 = self.rng.r#gen();
            child1.words[i] = (a & mask) | (b & !mask);
            child2.words[i] = (b & mask) | (a & !mask);
        }
        (child1, child2)
    }

    /// Maybe mutate a genome in place. Returns the number of flips applied.
    ///
    /// Positions are drawn with replacement, so a repeated position flips back.
    pub fn mutate(&mut self, genome: &mut Genome, config: &MutationConfig) -> usize {
        if genome.is_empty() || !self.rng.gen_bool(config.trigger_probability().clamp(0.0, 1.0)) {
            return 0;
        }

        let flips = self.rng.gen_range(1..=config.max_genes.max(1));
        for _ in 0..flips {
            let pos = self.rng.gen_range(0..genome.len);
            genome.flip(pos);
        }
        flips
    }

    /// Uniform index in `0..n`.
    pub fn index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

/// Fraction of positions at which two genomes differ.
pub fn genome_distance(g1: &Genome, g2: &Genome) -> f32 {
    if g1.len != g2.len {
        return 1.0;
    }
    if g1.is_empty() {
        return 0.0;
    }
    let differing: u32 = g1
        .words
        .iter()
        .zip(&g2.words)
        .map(|(a, b)| (a ^ b).count_ones())
        .sum();
    differing as f32 / g1.len as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_flip() {
        let mut genome = Genome::zeros(70);
        genome.set(0, true);
        genome.set(69, true);
        genome.flip(64);
        assert!(genome.get(0) && genome.get(64) && genome.get(69));
        assert_eq!(genome.count_ones(), 3);
        genome.flip(64);
        assert!(!genome.get(64));
    }

    #[test]
    fn test_rule_string_normalization() {
        let genome = Genome::parse_rule_str("1x01", 6);
        assert_eq!(genome.to_rule_string(), "100100");
        let truncated = Genome::parse_rule_str("1111111", 3);
        assert_eq!(truncated.to_rule_string(), "111");
    }

    #[test]
    fn test_packed_bytes_lsb_first() {
        let genome = Genome::parse_rule_str("1000000001", 10);
        assert_eq!(genome.to_packed_bytes(), vec![0b0000_0001, 0b0000_0010]);
        let back = Genome::from_packed_bytes(&[0b0000_0001, 0b0000_0010], 10).unwrap();
        assert_eq!(back, genome);
    }

    #[test]
    fn test_from_packed_bytes_clears_padding() {
        let genome = Genome::from_packed_bytes(&[0xFF], 3).unwrap();
        assert_eq!(genome.count_ones(), 3);
        assert!(matches!(
            Genome::from_packed_bytes(&[0xFF, 0xFF], 3),
            Err(GenomeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_base64_roundtrip() {
        let mut rng = GenomeRng::new(42);
        let genome = rng.random_genome(38, 0.5);
        let decoded = Genome::from_base64(&genome.to_base64(), 38).unwrap();
        assert_eq!(decoded, genome);
    }

    #[test]
    fn test_random_with_k_exact() {
        let mut rng = GenomeRng::new(1);
        for k in [0, 1, 17, 100] {
            assert_eq!(rng.random_with_k(100, k).count_ones(), k);
        }
    }

    #[test]
    fn test_case_genome_halves() {
        let mut rng = GenomeRng::new(9);
        let genome = rng.case_genome(GenomeFamily::CompactMoore, 4, 7).unwrap();
        let dead: usize = (0..19).map(|i| genome.bit(i) as usize).sum();
        let alive: usize = (19..38).map(|i| genome.bit(i) as usize).sum();
        assert_eq!((dead, alive), (4, 7));
        assert!(rng.case_genome(GenomeFamily::CompactVonNeumann, 8, 0).is_err());
    }

    #[test]
    fn test_crossover_children_are_complementary() {
        let mut rng = GenomeRng::new(3);
        let p1 = rng.random_genome(130, 0.5);
        let p2 = rng.random_genome(130, 0.5);
        let (c1, c2) = rng.crossover_pair(&p1, &p2);

        for i in 0..130 {
            let from_p1 = c1.get(i) == p1.get(i) && c2.get(i) == p2.get(i);
            let from_p2 = c1.get(i) == p2.get(i) && c2.get(i) == p1.get(i);
            assert!(from_p1 || from_p2, "bit {} not inherited", i);
        }
        assert_eq!(c1.count_ones() + c2.count_ones(), p1.count_ones() + p2.count_ones());
    }

    #[test]
    fn test_mutation_never_and_always() {
        let mut rng = GenomeRng::new(5);
        let mut genome = Genome::zeros(38);

        assert_eq!(rng.mutate(&mut genome, &MutationConfig::new(0.0, 5)), 0);
        assert_eq!(genome.count_ones(), 0);

        let flips = rng.mutate(&mut genome, &MutationConfig::new(100.0, 1));
        assert_eq!(flips, 1);
        assert_eq!(genome.count_ones(), 1);
    }

    #[test]
    fn test_genome_distance() {
        let a = Genome::parse_rule_str("1100", 4);
        let b = Genome::parse_rule_str("1001", 4);
        assert!((genome_distance(&a, &a)).abs() < 1e-6);
        assert!((genome_distance(&a, &b) - 0.5).abs() < 1e-6);
    }
}
