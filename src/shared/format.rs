/// Human readable archive size, 1000-based with one decimal.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1000.0;
    if kb > 1000.0 {
        format!("{:.1} MB", kb / 1000.0)
    } else {
        format!("{kb:.1} KB")
    }
}
