//! Text normalization for Persian/Arabic/English user input and headers.
//!
//! Keyboards in the wild mix Persian and Arabic code points for the same
//! letter and digit, so classification and header matching run on a
//! normalized form. Literal lookups keep using the raw (trimmed) text.

const ZWNJ: char = '\u{200C}';
const TATWEEL: char = '\u{0640}';

/// Map a single character onto its canonical form.
fn canonical_char(c: char) -> char {
    match c {
        // Persian digits ۰..۹
        '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
        // Arabic-Indic digits ٠..٩
        '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
        // Arabic yeh / alef maksura -> Persian yeh
        '\u{064A}' | '\u{0649}' => '\u{06CC}',
        // Arabic kaf -> Persian keheh
        '\u{0643}' => '\u{06A9}',
        ZWNJ => ' ',
        _ => c,
    }
}

/// Convert Persian and Arabic-Indic digits to ASCII, leaving everything else intact.
pub fn ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' | '\u{0660}'..='\u{0669}' => canonical_char(c),
            _ => c,
        })
        .collect()
}

/// Normalize free text for pattern matching.
///
/// Digits become ASCII, Arabic letter variants become Persian, tatweel is
/// dropped, ZWNJ becomes a space, runs of whitespace collapse to one space,
/// and the result is trimmed and lowercased.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .filter(|&c| c != TATWEEL)
        .map(canonical_char)
        .collect();
    mapped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parse an integer from user- or sheet-provided text.
///
/// Accepts Persian digits, surrounding whitespace, and a zero fraction
/// (`"3.0"`), since numeric cells often round-trip through floats.
pub fn parse_integer(text: &str) -> Option<i64> {
    let ascii = ascii_digits(text.trim());
    if let Ok(n) = ascii.parse::<i64>() {
        return Some(n);
    }
    let f = ascii.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Some(f as i64)
    } else {
        None
    }
}

/// Parse a floating point number, accepting Persian digits and thousands separators.
pub fn parse_number(text: &str) -> Option<f64> {
    let ascii: String = ascii_digits(text.trim())
        .chars()
        .filter(|&c| c != ',' && c != '\u{066C}')
        .map(|c| if c == '\u{066B}' { '.' } else { c })
        .collect();
    if ascii.is_empty() {
        return None;
    }
    ascii.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- normalize ----

    #[test]
    fn test_normalize_persian_digits() {
        assert_eq!(normalize("رتبه ۱ کیه"), "رتبه 1 کیه");
        assert_eq!(normalize("٣"), "3");
    }

    #[test]
    fn test_normalize_arabic_letters() {
        // Arabic yeh and kaf in "كد پرسنلي"
        assert_eq!(normalize("\u{0643}د پرسنل\u{064A}"), "کد پرسنلی");
    }

    #[test]
    fn test_normalize_zwnj_and_whitespace() {
        assert_eq!(normalize("  نام\u{200C}خانوادگی  "), "نام خانوادگی");
        assert_eq!(normalize("Top \t 5\nplayers"), "top 5 players");
    }

    #[test]
    fn test_normalize_drops_tatweel() {
        assert_eq!(normalize("رتـــبه"), "رتبه");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize("   "), "");
    }

    // ---- numbers ----

    #[test]
    fn test_parse_integer_variants() {
        assert_eq!(parse_integer("3"), Some(3));
        assert_eq!(parse_integer(" ۱۲ "), Some(12));
        assert_eq!(parse_integer("3.0"), Some(3));
        assert_eq!(parse_integer("3.5"), None);
        assert_eq!(parse_integer("abc"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("1,250"), Some(1250.0));
        assert_eq!(parse_number("۲۵۰"), Some(250.0));
        assert_eq!(parse_number("-4.5"), Some(-4.5));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(2.5), "2.5");
    }
}
