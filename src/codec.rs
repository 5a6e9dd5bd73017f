// src/codec.rs
// CODEC DRIVER: orders the transforms, frames the suffixes, and mirrors
// the whole pipeline on decode.
//
// Encode: bits -> symbols -> differential -> runlength-coded -> integrated
// back to the physical domain -> prefix-flipped -> glue + index suffix ->
// glue + VT suffix -> nucleotides. Every junction gets a glue symbol that
// breaks incipient runs and nudges the GC count toward half.
//
// All suffix widths derive from the total length: the framed length is
// strictly increasing in the body length, so the decoder solves for it and
// needs no side channel. Under error detection, a total length off by one
// is itself the report of an insertion or deletion.

use crate::alphabet;
use crate::balance::{self, GcBalancer};
use crate::differential;
use crate::error::{CodecError, EditKind, Result};
use crate::rll::RunlengthCoder;
use crate::vt;

pub struct Codec {
    ell: usize,
    epsilon: f64,
    use_ec: bool,
}

/// Glue symbol for a concatenation seam: never equal to either neighbor,
/// and of the GC parity that moves the running count toward half when that
/// parity is still available. Deterministic (ascending candidate scan), so
/// the decoder re-derives and verifies every glue symbol.
fn glue(prev: u8, next: u8, gc_sofar: usize, len_sofar: usize) -> u8 {
    let want_gc = 2 * gc_sofar < len_sofar;
    let mut fallback = None;
    for cand in 0..4u8 {
        if cand == prev || cand == next {
            continue;
        }
        if (cand >= 2) == want_gc {
            return cand;
        }
        if fallback.is_none() {
            fallback = Some(cand);
        }
    }
    // at most two symbols are excluded, so a candidate always remains
    fallback.unwrap_or(0)
}

impl Codec {
    pub fn new(ell: usize, epsilon: f64, use_ec: bool) -> Result<Self> {
        if ell < 2 {
            return Err(CodecError::ParamError(format!(
                "runlength bound must be at least 2, got {ell}"
            )));
        }
        if !(epsilon > 0.0 && epsilon < 0.5) || !epsilon.is_finite() {
            return Err(CodecError::ParamError(format!(
                "gc tolerance must lie in (0, 0.5), got {epsilon}"
            )));
        }
        Ok(Self { ell, epsilon, use_ec })
    }

    pub fn ell(&self) -> usize {
        self.ell
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn use_ec(&self) -> bool {
        self.use_ec
    }

    /// Encodes a 0/1 slice into a constraint-satisfying nucleotide string.
    pub fn encode(&self, bits: &[u8]) -> Result<String> {
        let x0 = alphabet::bits_to_quat(bits)?;
        if x0.is_empty() {
            return Ok(String::new());
        }

        let y = differential::diff(&x0);
        let z = RunlengthCoder::new(self.ell).encode(&y);
        let w = differential::undiff(&z);
        let n = w.len();

        let (mut body, t) = GcBalancer::new(self.ell, self.epsilon).balance(&w)?;
        let suffix = balance::build_index_suffix(t, n);
        let g1 = glue(body[n - 1], suffix[0], balance::gc_count(&body), n);
        body.push(g1);
        body.extend_from_slice(&suffix);

        if self.use_ec {
            let pair = vt::vt_pair(&body);
            let tail = vt::build_suffix(&pair, body.len());
            let g2 = glue(
                body[body.len() - 1],
                tail[0],
                balance::gc_count(&body),
                body.len(),
            );
            body.push(g2);
            body.extend_from_slice(&tail);
        }

        alphabet::quat_to_dna(&body)
    }

    /// Decodes a nucleotide string back to its bits, verifying the VT pair,
    /// both glue symbols, and every suffix pairing along the way.
    pub fn decode(&self, dna: &str) -> Result<Vec<u8>> {
        let sym = alphabet::dna_to_quat(dna)?;
        let total = sym.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let n = self.solve_body_len(total)?;
        let k = balance::index_width(n);
        let body_len = n + 1 + 2 * k;

        let body = if self.use_ec {
            let body = &sym[..body_len];
            let g2 = sym[body_len];
            let tail = &sym[body_len + 1..];
            let stored = vt::parse_suffix(tail, body_len)
                .map_err(|_| CodecError::ErrorDetected { kind: Some(EditKind::Substitution) })?;
            let computed = vt::vt_pair(body);
            if computed != stored {
                return Err(CodecError::ErrorDetected { kind: Some(EditKind::Substitution) });
            }
            if g2 != glue(body[body_len - 1], tail[0], balance::gc_count(body), body_len) {
                return Err(CodecError::ErrorDetected { kind: Some(EditKind::Substitution) });
            }
            body
        } else {
            &sym[..]
        };

        let flipped = &body[..n];
        let g1 = body[n];
        let suffix = &body[n + 1..];
        let t = balance::parse_index_suffix(suffix, n)?;
        if g1 != glue(flipped[n - 1], suffix[0], balance::gc_count(flipped), n) {
            return Err(CodecError::BadSuffix("glue symbol mismatch at index suffix"));
        }

        let w = balance::flip_prefix(flipped, t);
        let z = differential::diff(&w);
        let y = RunlengthCoder::new(self.ell).decode(&z)?;
        let x0 = differential::undiff(&y);
        Ok(alphabet::quat_to_bits(&x0))
    }

    /// Byte conveniences for the streaming layer: MSB-first widening.
    pub fn encode_bytes(&self, data: &[u8]) -> Result<String> {
        self.encode(&alphabet::bytes_to_bits(data))
    }

    pub fn decode_bytes(&self, dna: &str) -> Result<Vec<u8>> {
        alphabet::bits_to_bytes(&self.decode(dna)?)
    }

    /// Total framed length for a body of n symbols.
    fn frame_len(&self, n: usize) -> usize {
        let core = n + 1 + 2 * balance::index_width(n);
        if self.use_ec {
            core + 1 + vt::suffix_len(core)
        } else {
            core
        }
    }

    /// Recovers the body length from the received total. The frame length
    /// is strictly increasing in n, so the solution is unique; with error
    /// detection on, a total off by exactly one symbol is reported as the
    /// corresponding indel.
    fn solve_body_len(&self, total: usize) -> Result<usize> {
        if let Some(n) = self.try_solve(total) {
            return Ok(n);
        }
        if self.use_ec {
            if total > 0 && self.try_solve(total - 1).is_some() {
                return Err(CodecError::ErrorDetected { kind: Some(EditKind::Insertion) });
            }
            if self.try_solve(total + 1).is_some() {
                return Err(CodecError::ErrorDetected { kind: Some(EditKind::Deletion) });
            }
        }
        Err(CodecError::BadSuffix("total length does not frame"))
    }

    fn try_solve(&self, total: usize) -> Option<usize> {
        let mut n = 1;
        loop {
            let framed = self.frame_len(n);
            if framed == total {
                return Some(n);
            }
            if framed > total {
                return None;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> Vec<u8> {
        s.bytes().map(|b| b - b'0').collect()
    }

    #[test]
    fn parameters_are_validated() {
        assert!(Codec::new(2, 0.1, true).is_ok());
        assert!(matches!(Codec::new(1, 0.1, true), Err(CodecError::ParamError(_))));
        assert!(matches!(Codec::new(3, 0.0, true), Err(CodecError::ParamError(_))));
        assert!(matches!(Codec::new(3, 0.5, true), Err(CodecError::ParamError(_))));
        assert!(matches!(Codec::new(3, f64::NAN, true), Err(CodecError::ParamError(_))));
    }

    #[test]
    fn glue_breaks_runs_and_nudges_gc() {
        for prev in 0..4u8 {
            for next in 0..4u8 {
                for (gc, len) in [(0usize, 10usize), (5, 10), (9, 10)] {
                    let g = glue(prev, next, gc, len);
                    assert_ne!(g, prev);
                    assert_ne!(g, next);
                    // the nudge holds whenever the preferred parity survives
                    let want_gc = 2 * gc < len;
                    let parity_open = (0..4u8)
                        .any(|c| c != prev && c != next && (c >= 2) == want_gc);
                    if parity_open {
                        assert_eq!(g >= 2, want_gc);
                    }
                }
            }
        }
    }

    #[test]
    fn empty_payload_maps_to_empty_dna() {
        let codec = Codec::new(3, 0.05, true).unwrap();
        assert_eq!(codec.encode(&[]).unwrap(), "");
        assert_eq!(codec.decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn odd_bitstrings_are_rejected() {
        let codec = Codec::new(3, 0.05, true).unwrap();
        assert!(matches!(
            codec.encode(&bits("101")),
            Err(CodecError::BadLength(3))
        ));
    }

    #[test]
    fn known_codeword_with_error_detection() {
        let codec = Codec::new(3, 0.05, true).unwrap();
        let dna = codec.encode(&bits("11010011")).unwrap();
        assert_eq!(dna, "GTAGGTACACACAGTACGT");
        assert_eq!(codec.decode(&dna).unwrap(), bits("11010011"));
    }

    #[test]
    fn known_codeword_with_tight_runlength() {
        let codec = Codec::new(2, 0.1, true).unwrap();
        let dna = codec.encode(&bits("11110000")).unwrap();
        assert_eq!(dna, "GGAGTGTCACACAGTGTACAC");
        assert_eq!(codec.decode(&dna).unwrap(), bits("11110000"));
    }

    #[test]
    fn all_zero_payload_roundtrips_through_pointer_replacement() {
        let codec = Codec::new(3, 0.05, true).unwrap();
        let dna = codec.encode(&bits("00000000")).unwrap();
        assert_eq!(dna, "AAGACGACACATGGTACAC");
        assert_eq!(codec.decode(&dna).unwrap(), bits("00000000"));
    }

    #[test]
    fn alternating_bits_collapse_and_rebalance() {
        // 16 copies of "01" collapse to one long symbol run, whose
        // differential is a long zero run; pointer replacement and a
        // nonzero flip index both fire on this input.
        let payload = "01".repeat(16);
        let codec = Codec::new(3, 0.05, true).unwrap();
        let dna = codec.encode(&bits(&payload)).unwrap();
        assert_eq!(codec.decode(&dna).unwrap(), bits(&payload));
        let sym = alphabet::dna_to_quat(&dna).unwrap();
        assert!(crate::analyze::max_runlength(&sym) <= 3);
        assert!(crate::analyze::constraint_valid(&sym, 3, 0.05));
        // the first symbol only reads 3 because the flip touched it
        assert_eq!(sym[0], 3);
    }

    #[test]
    fn decoding_without_ec_uses_the_shorter_frame() {
        let codec = Codec::new(3, 0.05, false).unwrap();
        let dna = codec.encode(&bits("11010011")).unwrap();
        assert_eq!(dna, "GTAGGTACAC");
        assert_eq!(codec.decode(&dna).unwrap(), bits("11010011"));
    }

    #[test]
    fn every_substitution_is_detected() {
        let codec = Codec::new(3, 0.05, true).unwrap();
        let dna = codec.encode(&bits("11010011")).unwrap();
        for i in 0..dna.len() {
            for base in ['A', 'T', 'C', 'G'] {
                if dna.as_bytes()[i] as char == base {
                    continue;
                }
                let mut mutated: Vec<char> = dna.chars().collect();
                mutated[i] = base;
                let mutated: String = mutated.into_iter().collect();
                assert!(
                    matches!(
                        codec.decode(&mutated),
                        Err(CodecError::ErrorDetected { .. })
                    ),
                    "substitution {base} at {i} slipped through"
                );
            }
        }
    }

    #[test]
    fn every_indel_is_detected() {
        let codec = Codec::new(3, 0.05, true).unwrap();
        let dna = codec.encode(&bits("11010011")).unwrap();
        for i in 0..dna.len() {
            let mut deleted: Vec<char> = dna.chars().collect();
            deleted.remove(i);
            let deleted: String = deleted.into_iter().collect();
            assert!(codec.decode(&deleted).is_err(), "deletion at {i} slipped through");
        }
        for i in 0..=dna.len() {
            for base in ['A', 'T', 'C', 'G'] {
                let mut inserted: Vec<char> = dna.chars().collect();
                inserted.insert(i, base);
                let inserted: String = inserted.into_iter().collect();
                assert!(
                    codec.decode(&inserted).is_err(),
                    "insertion {base} at {i} slipped through"
                );
            }
        }
    }

    #[test]
    fn truncation_without_ec_fails_to_frame() {
        let codec = Codec::new(3, 0.05, false).unwrap();
        let dna = codec.encode(&bits("11010011")).unwrap();
        assert!(matches!(
            codec.decode(&dna[..dna.len() - 1]),
            Err(CodecError::BadSuffix(_))
        ));
    }

    #[test]
    fn foreign_characters_are_bad_alphabet() {
        let codec = Codec::new(3, 0.05, true).unwrap();
        assert!(matches!(
            codec.decode("ACGU"),
            Err(CodecError::BadAlphabet('U'))
        ));
    }

    #[test]
    fn byte_payloads_roundtrip() {
        let codec = Codec::new(3, 0.05, true).unwrap();
        let data = b"helix stores bytes too";
        let dna = codec.encode_bytes(data).unwrap();
        assert_eq!(codec.decode_bytes(&dna).unwrap(), data.to_vec());
    }
}
