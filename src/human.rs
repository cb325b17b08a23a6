const UNITS: [&str; 5] = ["", "K", "M", "G", "T"];

/// Three significant digits and a binary (1024) unit: `9.50`, `95.0K`.
pub fn human_readable(num: f64) -> String {
    let mut value = num;
    for unit in UNITS {
        if value < 10.0 {
            return format!("{:.2}{}", value, unit);
        }
        if value < 100.0 {
            return format!("{:.1}{}", value, unit);
        }
        if value < 1000.0 {
            return format!("{:.0}{}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.0}{}", value * 1024.0, UNITS[UNITS.len() - 1])
}
