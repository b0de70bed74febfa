/// Size formatting utilities — human-readable byte counts.
///
/// All internal sizes are `u64` bytes. Floating point is only used at the
/// display-formatting boundary.

/// Unit base used when rendering a byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeUnits {
    /// Powers of 1024, labelled KB/MB/GB/TB as disk tools conventionally do.
    #[default]
    Binary,
    /// Powers of 1000.
    Decimal,
}

impl SizeUnits {
    #[inline]
    fn base(self) -> f64 {
        match self {
            Self::Binary => 1024.0,
            Self::Decimal => 1000.0,
        }
    }
}

/// Format a byte count with binary units.
pub fn format_size(bytes: u64) -> String {
    format_size_with(bytes, SizeUnits::Binary)
}

/// Format a byte count with the given unit base.
///
/// Bytes are printed exactly; KB and MB with one decimal; GB and above
/// with two.
pub fn format_size_with(bytes: u64, units: SizeUnits) -> String {
    const LABELS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    let base = units.base();
    let mut value = bytes as f64;
    if value < base {
        return format!("{bytes} B");
    }

    let mut unit = 0;
    value /= base;
    while value >= base && unit + 1 < LABELS.len() {
        value /= base;
        unit += 1;
    }

    if unit < 2 {
        format!("{value:.1} {}", LABELS[unit])
    } else {
        format!("{value:.2} {}", LABELS[unit])
    }
}

/// Format a count with thousand separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
