//! Command-line surface: `blf-gen`, `blf-check`, and `search`.

use crate::error::Error;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "prospector", version, about = "secp256k1 hash160 search engine with a bloom-filter membership test")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Scalar-selection strategy for `search`.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Mode {
    /// Scan the range sequentially.
    Range,
    /// Draw scalars uniformly at random from the range.
    Random,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a bloom filter from hash160 values (one hex-encoded 20-byte hash per line on stdin).
    BlfGen {
        /// Expected number of items, used to size the filter.
        #[arg(short = 'n', long)]
        expected_items: u64,

        /// Where to write the filter.
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Target false-positive rate.
        #[arg(long, default_value_t = crate::bloom::DEFAULT_FALSE_POSITIVE_RATE)]
        false_positive_rate: f64,
    },

    /// Check whether hash160 values are present in a saved filter.
    BlfCheck {
        /// Filter file to load.
        #[arg(short = 'f', long)]
        filter: PathBuf,

        /// Hex-encoded hash160 values to check.
        hashes: Vec<String>,
    },

    /// Scan a scalar range (or draw random scalars from it) against a filter.
    Search {
        /// Filter file to load.
        #[arg(short = 'f', long)]
        filter: PathBuf,

        /// Scalar range as `lo:hi`, each a hex-encoded big-endian integer.
        #[arg(short = 'r', long)]
        range: String,

        /// Worker thread count. Defaults to the number of logical CPUs.
        #[arg(short = 't', long)]
        threads: Option<usize>,

        /// Sequential range scan or uniform random draws from the range.
        #[arg(long, value_enum, default_value_t = Mode::Range)]
        mode: Mode,

        /// PRNG seed for random mode. Ignored unless `--mode random` and `-u` is absent.
        #[arg(short = 's', long)]
        seed: Option<u64>,

        /// Seed the random-mode PRNG from `/dev/urandom` instead of `-s`.
        #[arg(short = 'u', long)]
        urandom: bool,
    },
}

/// Parses a `lo:hi` range argument into two big-endian 256-bit scalars.
pub fn parse_range(range: &str) -> Result<(crate::u256::Limbs, crate::u256::Limbs), Error> {
    let (lo, hi) = range
        .split_once(':')
        .ok_or_else(|| Error::Config(format!("range must be `lo:hi`, got {range:?}")))?;
    Ok((parse_hex_u256(lo)?, parse_hex_u256(hi)?))
}

fn parse_hex_u256(s: &str) -> Result<crate::u256::Limbs, Error> {
    let trimmed = s.trim().trim_start_matches("0x");
    if trimmed.len() > 64 {
        return Err(Error::Config(format!("scalar {s:?} exceeds 256 bits")));
    }
    let padded = format!("{:0>64}", trimmed);
    let bytes = hex::decode(&padded).map_err(|e| Error::Config(format!("invalid hex scalar {s:?}: {e}")))?;
    let array: [u8; 32] = bytes.try_into().map_err(|_| Error::Config(format!("scalar {s:?} is not 32 bytes")))?;
    Ok(crate::u256::from_be_bytes(&array))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_range_splits_lo_hi() {
        let (lo, hi) = parse_range("1:3e8").unwrap();
        assert_eq!(lo, [1, 0, 0, 0]);
        assert_eq!(hi, [0x3e8, 0, 0, 0]);
    }

    #[test]
    fn parse_range_rejects_missing_colon() {
        assert!(parse_range("123").is_err());
    }

    #[test]
    fn parse_range_rejects_oversized_scalar() {
        let too_long = "1".repeat(65);
        assert!(parse_range(&format!("0:{too_long}")).is_err());
    }
}
