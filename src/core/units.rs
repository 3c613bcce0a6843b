//! Unit formatting for readouts and graph max labels

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Format a value with a binary prefix (`Ki`/`Mi`) and a unit suffix.
///
/// Values above 1 MiB are shown in `Mi`, values above 1 KiB in `Ki`,
/// everything else unscaled. Two decimals are always printed, followed by a
/// space, the prefix and the units: `format_metric_pretty(2048.0, "B")`
/// gives `"2.00 KiB"`.
pub fn format_metric_pretty(value: f64, units: &str) -> String {
    let (scaled, prefix) = if value > MIB {
        (value / MIB, "Mi")
    } else if value > KIB {
        (value / KIB, "Ki")
    } else {
        (value, "")
    };

    format!("{:.2} {}{}", scaled, prefix, units)
}

/// Format a percentage readout (e.g. `"42.50 %"`)
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_metric_pretty(value, ""))
}

/// Format a bit rate readout (e.g. `"1.00 Mib/s"`)
pub fn format_bit_rate(bits_per_sec: f64) -> String {
    format!("{}b/s", format_metric_pretty(bits_per_sec, ""))
}
