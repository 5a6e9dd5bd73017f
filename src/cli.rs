// src/cli.rs
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "helix", version, about, long_about = None)]
#[command(help_template = "\
{name} {version} - {about}

{usage-heading}
{usage}

{all-args}
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Maximum homopolymer runlength allowed in emitted DNA.
    #[arg(long, global = true, default_value_t = 3, value_name = "INT")]
    pub ell: usize,

    /// GC-content tolerance around 1/2 (exclusive bounds 0 and 0.5).
    #[arg(long, global = true, default_value_t = 0.05, value_name = "FLOAT")]
    pub epsilon: f64,

    /// Skip the VT error-detection suffix.
    #[arg(long, global = true)]
    pub no_ec: bool,

    /// Worker threads for block-level pack/restore (0 means one per core).
    #[arg(short = 'j', long, global = true, default_value_t = 0, value_name = "THREADS")]
    pub jobs: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a 0/1 bit string into a constraint-satisfying DNA codeword.
    #[command(visible_alias = "enc")]
    Encode {
        /// Bit string to encode, e.g. "11010011" (length must be even)
        #[arg(value_name = "BITS")]
        bits: String,
    },

    /// Decode a DNA codeword back into its bit string.
    #[command(visible_alias = "dec")]
    Decode {
        /// DNA string over A,T,C,G
        #[arg(value_name = "DNA")]
        dna: String,
    },

    /// Report GC ratio, runlengths, and constraint validity of a sequence.
    Analyze {
        /// DNA string over A,T,C,G
        #[arg(value_name = "DNA")]
        dna: String,
    },

    /// Stream a binary file into a DNA archive, one codeword per block.
    Pack {
        /// Input binary file
        #[arg(value_name = "INPUT_FILE")]
        input: String,

        /// Output DNA FASTA file
        #[arg(short, long, default_value = "output.fasta", value_name = "DNA_FILE")]
        output: String,

        /// Payload bytes per block
        #[arg(long, default_value_t = helix::DEFAULT_BLOCK_BYTES, value_name = "BYTES")]
        block_size: usize,
    },

    /// Restore a binary file from a DNA archive (parameters must match pack).
    Restore {
        /// Input DNA FASTA file
        #[arg(value_name = "DNA_FILE")]
        input: String,

        /// Output binary path for the restored file
        #[arg(value_name = "OUTPUT_FILE")]
        output: String,
    },

    /// Simulate physical decay (strand dropout and substitutions).
    #[command(visible_alias = "sim")]
    Mutate {
        /// Input DNA FASTA file
        #[arg(value_name = "DNA_FILE")]
        input: String,

        /// Output decayed FASTA file
        #[arg(short, long, default_value = "decayed.fasta", value_name = "OUT_FILE")]
        output: String,

        /// Percentage of strands to drop (0-100)
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
        dropout: u8,

        /// Probability of substitution per base (0.0 - 1.0)
        #[arg(short = 'm', long, default_value_t = 0.0, value_name = "RATE")]
        substitution: f32,
    },
}
