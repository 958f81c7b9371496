use anyhow::{Context, Result, bail};
use std::collections::HashSet;

pub const DEFAULT_SEED: u64 = 1337;

/// Seed metadata used for scenario runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    /// The token as written on the command line.
    pub token: Option<String>,
}

impl SeedInfo {
    #[must_use]
    pub fn from_numeric(seed: u64) -> Self {
        Self { seed, token: None }
    }

    #[must_use]
    pub fn from_token(seed: u64, token: &str) -> Self {
        Self {
            seed,
            token: Some(token.to_string()),
        }
    }
}

/// Resolve a list of CLI seed arguments into canonical seed metadata.
///
/// Supports decimal integers (negative values use their magnitude) and
/// `0x`-prefixed hexadecimal. Duplicates keep their first position.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut resolved = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let info = parse_seed_token(token)?;
        if seen.insert(info.seed) {
            resolved.push(info);
        }
    }

    if resolved.is_empty() {
        resolved.push(SeedInfo::from_numeric(DEFAULT_SEED));
    }

    Ok(resolved)
}

fn parse_seed_token(token: &str) -> Result<SeedInfo> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        let seed = u64::from_str_radix(&hex.replace('_', ""), 16)
            .with_context(|| format!("invalid hex seed: {token}"))?;
        return Ok(SeedInfo::from_token(seed, token));
    }

    if let Ok(value) = token.parse::<i64>() {
        return Ok(SeedInfo::from_numeric(value.unsigned_abs()));
    }

    if let Ok(value) = token.parse::<u64>() {
        return Ok(SeedInfo::from_numeric(value));
    }

    bail!("Unrecognized seed token: {token}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn resolves_decimal_and_hex() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "-7", "0xC0FFEE", "18446744073709551615"]))
            .unwrap();
        let values: Vec<u64> = seeds.iter().map(|s| s.seed).collect();
        assert_eq!(values, vec![42, 7, 0x00C0_FFEE, u64::MAX]);
        assert_eq!(seeds[2].token.as_deref(), Some("0xC0FFEE"));
    }

    #[test]
    fn duplicates_collapse_in_order() {
        let seeds = resolve_seed_inputs(&tokens(&["0x10", "16", "3"])).unwrap();
        let values: Vec<u64> = seeds.iter().map(|s| s.seed).collect();
        assert_eq!(values, vec![16, 3]);
    }

    #[test]
    fn empty_input_defaults() {
        let seeds = resolve_seed_inputs(&[]).unwrap();
        assert_eq!(seeds, vec![SeedInfo::from_numeric(DEFAULT_SEED)]);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = resolve_seed_inputs(&tokens(&["banana"])).unwrap_err();
        assert!(err.to_string().contains("banana"));
        assert!(resolve_seed_inputs(&tokens(&["0xZZ"])).is_err());
    }
}
