use anyhow::{Result, bail};
use std::collections::HashSet;

const DEFAULT_SEED: u64 = 1337;

/// Resolve a list of CLI seed arguments into canonical seeds.
///
/// Supports signed and unsigned integers plus `0x`-prefixed hex. Duplicates
/// are dropped in order; an empty list yields the default seed.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        let seed = if let Ok(value) = token.parse::<i64>() {
            value.unsigned_abs()
        } else if let Ok(value) = token.parse::<u64>() {
            value
        } else if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            && let Ok(value) = u64::from_str_radix(hex, 16)
        {
            value
        } else {
            bail!("Unrecognized seed token: {token}");
        };

        if seen.insert(seed) {
            seeds.push(seed);
        }
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }

    Ok(seeds)
}
