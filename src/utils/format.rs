//! Display formatting for view models

use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};

/// `0x1234...abcd`
pub fn short_address(address: &Address) -> String {
    let full = format!("{:#x}", address);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Token amount with `decimals`, trailing zeros trimmed (`1.5`, `20`)
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
    match format_units(amount, decimals) {
        Ok(s) if s.contains('.') => s.trim_end_matches('0').trim_end_matches('.').to_string(),
        Ok(s) => s,
        // decimals above 77 cannot be represented; show raw units
        Err(_) => amount.to_string(),
    }
}

/// Integer with thousands separators (`1,234,567`)
pub fn format_count(value: U256) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// 🥇 🥈 🥉 for the podium, `#n` after that
pub fn rank_badge(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("#{}", n),
    }
}

/// Unix seconds as `YYYY-MM-DD HH:MM:SS UTC`
pub fn format_timestamp(secs: U256) -> String {
    u64::try_from(secs)
        .ok()
        .and_then(|s| i64::try_from(s).ok())
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("@{}", secs))
}

/// Countdown such as `2h 05m` or `45s`
pub fn format_remaining(secs: U256) -> String {
    let Ok(secs) = u64::try_from(secs) else {
        return "∞".to_string();
    };
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m", h, m)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}
