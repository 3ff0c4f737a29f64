/// Small helpers shared by the engine: amount conversions and text parsing

use crate::constants::LAMPORTS_PER_SOL;

/// Convert SOL amount to lamports
pub fn sol_to_lamports(sol_amount: f64) -> u64 {
    (sol_amount * LAMPORTS_PER_SOL as f64).round().max(0.0) as u64
}

/// Convert lamports to SOL
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Parse a user-entered decimal amount
///
/// Returns 0.0 for empty, unparsable, negative or non-finite input so that
/// callers treat it as "nothing requested".
pub fn parse_amount(text: &str) -> f64 {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Format an amount with a fixed number of decimals, as used for the
/// carried-over input when switching side
pub fn format_amount(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

/// Truncate a string at a char boundary
pub fn safe_truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Shorten a signature or address for log lines
pub fn short_id(s: &str) -> String {
    if s.len() <= 12 {
        s.to_string()
    } else {
        format!("{}...{}", safe_truncate(s, 6), &s[s.len() - 4..])
    }
}
