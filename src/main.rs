// src/main.rs
// HELIX: Constrained-Code DNA Channel Codec
// Entry point for the Command Line Interface.
// Handles Streaming I/O, Thread Pool Setup, and Pipeline Orchestration.

mod cli;

use helix::analyze;
use helix::codec::Codec;
use helix::error::CodecError;
use helix::parallel::ParallelProcessor;
use helix::stream::FastaBatchIterator;
use crate::cli::{Cli, Commands};

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("[✘] {err:#}");
        let code = err
            .downcast_ref::<CodecError>()
            .map(CodecError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // CONCURRENCY CONFIGURATION
    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.jobs)
        .build_global()
        .map_err(|e| anyhow::anyhow!("Failed to configure thread pool: {}", e))?;

    let codec = Codec::new(cli.ell, cli.epsilon, !cli.no_ec)?;

    match &cli.command {
        Commands::Encode { bits } => {
            let payload = parse_bits(bits)?;
            let dna = codec.encode(&payload)?;
            println!("{dna}");
        }

        Commands::Decode { dna } => {
            let payload = codec.decode(dna.trim())?;
            let rendered: String = payload
                .iter()
                .map(|&b| if b == 0 { '0' } else { '1' })
                .collect();
            println!("{rendered}");
        }

        Commands::Analyze { dna } => {
            let report = analyze::report(dna.trim(), cli.ell, cli.epsilon)?;
            println!("[*] Sequence Analysis");
            println!("--------------------------------------------------");
            println!("    Length:        {} nt", report.length);
            println!("    GC Content:    {:.2}%", report.gc_ratio * 100.0);
            println!("    Max Run:       {}", report.max_run);
            let runs: Vec<String> = report
                .run_histogram
                .iter()
                .map(|(len, count)| format!("{len}x{count}"))
                .collect();
            println!("    Run Histogram: {}", runs.join(" "));
            println!(
                "    Constraints:   {} (ell={}, epsilon={})",
                if report.valid { "SATISFIED" } else { "VIOLATED" },
                cli.ell,
                cli.epsilon
            );
            println!("--------------------------------------------------");
        }

        Commands::Pack { input, output, block_size } => {
            pack(&codec, input, output, *block_size)?;
        }

        Commands::Restore { input, output } => {
            restore(&codec, input, output)?;
        }

        Commands::Mutate { input, output, dropout, substitution } => {
            mutate(input, output, *dropout, *substitution)?;
        }
    }
    Ok(())
}

/// Parses a textual bit string ("0101..."), rejecting anything else.
fn parse_bits(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let mut bits = Vec::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '0' => bits.push(0),
            '1' => bits.push(1),
            _ => return Err(CodecError::BadAlphabet(c).into()),
        }
    }
    Ok(bits)
}

// Blocks handed to one rayon batch at a time.
const BLOCKS_PER_BATCH: usize = 256;

fn pack(codec: &Codec, input: &str, output: &str, block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(CodecError::ParamError("block size must be positive".into()).into());
    }

    println!("[*] Initializing Streaming Pack...");
    println!(
        "[i] Block Size: {} bytes | ell={} epsilon={} ec={}",
        block_size,
        codec.ell(),
        codec.epsilon(),
        codec.use_ec()
    );

    let input_file = File::open(input).context(format!("Failed to open input: {}", input))?;
    let mut reader = BufReader::new(input_file);
    let mut output_file =
        File::create(output).context(format!("Failed to create output: {}", output))?;

    let mut buffer = vec![0u8; block_size];
    let mut pending: Vec<Vec<u8>> = Vec::with_capacity(BLOCKS_PER_BATCH);
    let mut next_id = 0u64;
    let mut total_bytes = 0u64;
    let mut total_nt = 0u64;
    let mut worst_run = 0usize;
    let mut invalid_blocks = 0u64;

    loop {
        let bytes_read = read_block(&mut reader, &mut buffer)?;
        if bytes_read > 0 {
            total_bytes += bytes_read as u64;
            pending.push(buffer[..bytes_read].to_vec());
        }
        let at_eof = bytes_read == 0;

        if pending.len() >= BLOCKS_PER_BATCH || (at_eof && !pending.is_empty()) {
            let batch = std::mem::take(&mut pending);
            let first_id = next_id;
            next_id += batch.len() as u64;

            let results = ParallelProcessor::encode_batch(codec, first_id, batch)?;
            for result in &results {
                total_nt += result.report.length as u64;
                worst_run = worst_run.max(result.report.max_run);
                if !result.report.valid {
                    invalid_blocks += 1;
                }
                output_file.write_all(result.fasta_entry.as_bytes())?;
            }
            print!("\r    -> Packed {} blocks ({} bytes)... ", next_id, total_bytes);
            io::stdout().flush()?;
        }

        if at_eof {
            break;
        }
    }

    println!("\n[✔] Pack Finished.");
    println!("--------------------------------------------------");
    println!("    Total Input:   {} bytes", total_bytes);
    println!("    Total DNA:     {} nt", total_nt);
    println!("    Blocks:        {}", next_id);
    println!("    Max Run Seen:  {}", worst_run);
    if invalid_blocks > 0 {
        // short blocks can sit outside the GC window; the analyzer flags them
        println!("    [!] {} block(s) outside the GC window", invalid_blocks);
    }
    println!("    Output File:   {}", output);
    println!("--------------------------------------------------");
    Ok(())
}

/// Fills as much of the buffer as the stream allows; plain `read` may
/// return short counts mid-file.
fn read_block<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn restore(codec: &Codec, input: &str, output: &str) -> Result<()> {
    println!("[*] Reading DNA Stream from {}...", input);

    let input_file = File::open(input).context("Failed to open DNA file")?;
    let reader = BufReader::new(input_file);
    let mut output_file = File::create(output).context("Failed to create output file")?;

    // Batch Config: 2000 strands or 32MB buffer
    let batcher = FastaBatchIterator::new(reader, 2000, 32 * 1024 * 1024);

    let mut decoded: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
    let mut next_expected = 0u64;
    let mut blocks_recovered = 0u64;

    for batch_result in batcher {
        let batch = batch_result?;
        for (block_id, outcome) in ParallelProcessor::decode_batch(codec, &batch) {
            let payload = outcome
                .map_err(|e| anyhow::Error::from(e).context(format!("Block {} failed", block_id)))?;
            decoded.insert(block_id, payload);
            blocks_recovered += 1;
        }

        // flush the contiguous prefix to disk
        while let Some(ready) = decoded.remove(&next_expected) {
            output_file.write_all(&ready)?;
            next_expected += 1;
        }
        print!("\r    -> Recovered {} blocks... ", blocks_recovered);
        io::stdout().flush()?;
    }

    if !decoded.is_empty() {
        let stuck: Vec<_> = decoded.keys().collect();
        anyhow::bail!(
            "[!] SEQUENCE GAP: Recovered blocks {:?} but missing Block {}. Stream is broken.",
            stuck,
            next_expected
        );
    }

    println!("\n[✔] Restoration Complete: {} blocks written to {}.", blocks_recovered, output);
    Ok(())
}

fn mutate(input: &str, output: &str, dropout: u8, substitution: f32) -> Result<()> {
    println!(
        "[*] Simulating {}% dropout and {:.2}% substitution...",
        dropout,
        substitution * 100.0
    );

    let input_file = File::open(input).context(format!("Failed to open input: {}", input))?;
    let reader = BufReader::new(input_file);
    let mut output_file =
        File::create(output).context(format!("Failed to create output: {}", output))?;

    let dropout_rate = dropout as f64 / 100.0;
    let mut total_strands = 0usize;
    let mut kept_strands = 0usize;

    let batcher = FastaBatchIterator::new(reader, 2000, 64 * 1024 * 1024);
    for batch_result in batcher {
        let batch = batch_result?;
        total_strands += batch.len();

        let survivors = ParallelProcessor::decay_batch(batch, dropout_rate, substitution);
        kept_strands += survivors.len();
        for strand in survivors {
            output_file.write_all(strand.as_bytes())?;
        }
    }

    println!(
        "[✔] Simulation Complete. Processed {} strands. Surviving: {} (in {}).",
        total_strands, kept_strands, output
    );
    Ok(())
}
