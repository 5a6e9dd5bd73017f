// src/parallel.rs
// PARALLEL PROCESSING ENGINE
// Fans independent blocks out over Rayon. The codec holds only parameters,
// so sharing one instance across the pool is free; blocks never share
// state, which makes pack/restore embarrassingly parallel.

use rayon::prelude::*;
use crc32fast::Hasher;
use rand::{seq::SliceRandom, thread_rng, Rng};

use crate::analyze;
use crate::codec::Codec;
use crate::error::{CodecError, Result};
use crate::stream::FastaRecord;

pub struct ParallelProcessor;

/// One encoded block, ready to append to the archive.
pub struct BlockResult {
    pub block_id: u64,
    pub fasta_entry: String,
    pub report: analyze::SequenceReport,
}

impl ParallelProcessor {
    /// PACK: encodes a batch of payload blocks into FASTA records.
    /// Each record header carries the block id, the payload size, and a
    /// CRC32 of the payload so restoration can verify end to end.
    pub fn encode_batch(
        codec: &Codec,
        first_id: u64,
        blocks: Vec<Vec<u8>>,
    ) -> Result<Vec<BlockResult>> {
        blocks
            .into_par_iter()
            .enumerate()
            .map(|(i, payload)| {
                let block_id = first_id + i as u64;

                let mut hasher = Hasher::new();
                hasher.update(&payload);
                let crc = hasher.finalize();

                let dna = codec.encode_bytes(&payload)?;
                let report = analyze::report(&dna, codec.ell(), codec.epsilon())?;

                let fasta_entry = format!(
                    ">blk{} bytes={} crc32={:08x}\n{}\n",
                    block_id,
                    payload.len(),
                    crc,
                    dna
                );
                Ok(BlockResult { block_id, fasta_entry, report })
            })
            .collect()
    }

    /// RESTORE: decodes a batch of records. Records whose headers do not
    /// carry this archive's shape are skipped; decode and integrity
    /// failures are surfaced per block so the caller can report the id.
    pub fn decode_batch(
        codec: &Codec,
        batch: &[FastaRecord],
    ) -> Vec<(u64, Result<Vec<u8>>)> {
        batch
            .par_iter()
            .filter_map(|record| {
                let (block_id, expected_len, expected_crc) =
                    Self::parse_header(&record.header)?;
                Some((
                    block_id,
                    Self::decode_one(codec, &record.sequence, expected_len, expected_crc),
                ))
            })
            .collect()
    }

    fn decode_one(
        codec: &Codec,
        dna: &str,
        expected_len: usize,
        expected_crc: u32,
    ) -> Result<Vec<u8>> {
        let payload = codec.decode_bytes(dna)?;
        if payload.len() != expected_len {
            return Err(CodecError::BadSuffix("block payload length mismatch"));
        }

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        if hasher.finalize() != expected_crc {
            // the codeword framed but the content is not what was packed
            return Err(CodecError::ErrorDetected { kind: None });
        }
        Ok(payload)
    }

    /// Parses ">blk<ID> bytes=<N> crc32=<HEX>"; anything else is foreign.
    fn parse_header(header: &str) -> Option<(u64, usize, u32)> {
        let mut fields = header.trim_start_matches('>').split_whitespace();
        let block_id = fields.next()?.strip_prefix("blk")?.parse().ok()?;
        let bytes = fields.next()?.strip_prefix("bytes=")?.parse().ok()?;
        let crc = u32::from_str_radix(fields.next()?.strip_prefix("crc32=")?, 16).ok()?;
        Some((block_id, bytes, crc))
    }

    /// MUTATE: random strand dropout plus per-base substitution, streamed
    /// batch by batch. Survivors keep their headers.
    pub fn decay_batch(
        batch: Vec<FastaRecord>,
        dropout_rate: f64,
        substitution_rate: f32,
    ) -> Vec<String> {
        batch
            .into_par_iter()
            .filter_map(|record| {
                let mut rng = thread_rng();

                if dropout_rate > 0.0 && rng.gen_bool(dropout_rate) {
                    return None;
                }

                let sequence = if substitution_rate > 0.0 {
                    let bases = ['A', 'T', 'C', 'G'];
                    record
                        .sequence
                        .chars()
                        .map(|c| {
                            if rng.gen::<f32>() < substitution_rate {
                                *bases.choose(&mut rng).unwrap_or(&c)
                            } else {
                                c
                            }
                        })
                        .collect()
                } else {
                    record.sequence
                };

                Some(format!("{}\n{}\n", record.header, sequence))
            })
            .collect()
    }
}
