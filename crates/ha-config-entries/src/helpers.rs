//! Shared helpers for integrations

/// Format a MAC address string for storage (matches HA's `format_mac`).
///
/// Colon, dash, dot (`aabb.ccdd.eeff`) and bare 12-character forms are
/// normalized to lowercase colon-separated pairs. Anything else is returned
/// unchanged.
pub fn format_mac(mac: &str) -> String {
    let len = mac.chars().count();
    let count = |sep: char| mac.chars().filter(|c| *c == sep).count();

    let stripped = match len {
        17 if count(':') == 5 => return mac.to_lowercase(),
        17 if count('-') == 5 => mac.replace('-', ""),
        14 if count('.') == 2 => mac.replace('.', ""),
        _ => mac.to_string(),
    };

    let chars: Vec<char> = stripped.to_lowercase().chars().collect();
    if chars.len() != 12 {
        return mac.to_string();
    }

    chars
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}
