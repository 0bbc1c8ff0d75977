//! Number formatting for math-narrative lines.
//!
//! Narrative output groups thousands the way the reference UI rendered
//! them, so "$8,000,000" reads as money and "1,000,000" as a share count.

/// Formats a share count with thousands separators.
pub fn shares(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Formats a dollar amount. Whole amounts render without cents; fractional
/// amounts keep two decimals.
pub fn money(value: f64) -> String {
    let sanitized = if value.is_finite() { value } else { 0.0 };
    let negative = sanitized < 0.0;
    let magnitude = sanitized.abs();
    let body = if (magnitude - magnitude.trunc()).abs() < 1e-9 {
        group_thousands(&format!("{:.0}", magnitude))
    } else {
        let fixed = format!("{:.2}", magnitude);
        let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        format!("{}.{}", group_thousands(whole), cents)
    };
    if negative {
        format!("-${body}")
    } else {
        format!("${body}")
    }
}

/// Formats a per-share price with four decimals.
pub fn price(value: f64) -> String {
    let sanitized = if value.is_finite() { value } else { 0.0 };
    format!("${:.4}", sanitized)
}

/// Formats a ratio as a percentage with the given number of decimals.
pub fn percent(value: f64, decimals: usize) -> String {
    let scaled = value * 100.0;
    let sanitized = if scaled.is_finite() { scaled } else { 0.0 };
    format!("{:.*}%", decimals, sanitized)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let count = digits.len();
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (count - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
