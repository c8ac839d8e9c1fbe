const UNIT: f64 = 1024.0;
const SUFFIXES: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Renders a byte count with binary units, e.g. `1.50KiB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut suffix = 0;
    while value >= UNIT && suffix < SUFFIXES.len() - 1 {
        value /= UNIT;
        suffix += 1;
    }
    format!("{:.2}{}", value, SUFFIXES[suffix])
}
