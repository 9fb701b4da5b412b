/// Sentinel period key for invoices whose date could not be parsed.
///
/// Unparseable dates never block invoice capture; such invoices simply fall
/// outside any period-scoped return until the date is corrected.
pub const UNKNOWN_PERIOD: &str = "UNKNOWN";

/// Derives the "MMYYYY" filing-period key from a free-form invoice date.
///
/// Accepts `.`, `/` and `-` as separators and two layouts:
/// `YYYY-MM-DD` (detected when the first segment is 4 characters) and
/// `DD-MM-YYYY` / `DD-MMM-YY`. The month may be numeric or a 3-letter
/// case-insensitive English abbreviation; two-digit years are expanded by
/// prefixing "20".
///
/// Pure and deterministic. Any input that fails to yield both a month and a
/// year token returns [`UNKNOWN_PERIOD`]: this function never fails.
///
/// # Arguments
///
/// * `invoice_date` - The raw date string, if any
///
/// # Returns
///
/// Returns the "MMYYYY" key, or `"UNKNOWN"`.
pub fn derive_period_key(invoice_date: Option<&str>) -> String {
    let Some(raw) = invoice_date else {
        return UNKNOWN_PERIOD.to_string();
    };
    if raw.trim().is_empty() {
        return UNKNOWN_PERIOD.to_string();
    }

    // Normalize separators
    let cleaned = raw.replace(['.', '/'], "-");
    let parts: Vec<&str> = cleaned.split('-').collect();

    let (month, year) = if parts.first().map(|p| p.len()) == Some(4) {
        // YYYY-MM-DD
        (parts.get(1).copied(), parts.first().copied())
    } else if parts.len() >= 3 {
        // DD-MM-YYYY or DD-MMM-YY
        (parts.get(1).copied(), parts.get(2).copied())
    } else {
        (None, None)
    };

    let (Some(month), Some(year)) = (month, year) else {
        return UNKNOWN_PERIOD.to_string();
    };
    if month.is_empty() || year.is_empty() {
        return UNKNOWN_PERIOD.to_string();
    }

    // Short year (25 -> 2025)
    let year = if year.len() == 2 {
        format!("20{}", year)
    } else {
        year.to_string()
    };

    let mm = month_number(month);

    format!("{}{}", mm, year)
}

/// Maps a month token to its 2-digit number.
///
/// The abbreviation match uses the first 3 characters of the token, so
/// "Mar", "march" and "MAR" all resolve to "03". Non-name tokens are
/// treated as numeric and left-padded with a zero.
fn month_number(month: &str) -> String {
    let prefix: String = month.chars().take(3).collect::<String>().to_lowercase();

    let mapped = match prefix.as_str() {
        "jan" => "01",
        "feb" => "02",
        "mar" => "03",
        "apr" => "04",
        "may" => "05",
        "jun" => "06",
        "jul" => "07",
        "aug" => "08",
        "sep" => "09",
        "oct" => "10",
        "nov" => "11",
        "dec" => "12",
        _ => return format!("{:0>2}", month),
    };

    mapped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_choice_does_not_change_the_key() {
        assert_eq!(derive_period_key(Some("15.03.2024")), "032024");
        assert_eq!(derive_period_key(Some("15/03/2024")), "032024");
        assert_eq!(derive_period_key(Some("15-03-2024")), "032024");
    }

    #[test]
    fn recognizes_iso_layout() {
        assert_eq!(derive_period_key(Some("2024-03-15")), "032024");
        assert_eq!(derive_period_key(Some("2025/01/05")), "012025");
    }

    #[test]
    fn recognizes_month_abbreviations() {
        assert_eq!(derive_period_key(Some("15-Mar-24")), "032024");
        assert_eq!(derive_period_key(Some("05-Jan-2025")), "012025");
        assert_eq!(derive_period_key(Some("01-DEC-25")), "122025");
        assert_eq!(derive_period_key(Some("31-august-2024")), "082024");
    }

    #[test]
    fn expands_two_digit_years() {
        assert_eq!(derive_period_key(Some("01-02-25")), "022025");
    }

    #[test]
    fn pads_single_digit_months() {
        assert_eq!(derive_period_key(Some("15-3-2024")), "032024");
    }

    #[test]
    fn degrades_to_unknown_on_bad_input() {
        assert_eq!(derive_period_key(None), UNKNOWN_PERIOD);
        assert_eq!(derive_period_key(Some("")), UNKNOWN_PERIOD);
        assert_eq!(derive_period_key(Some("   ")), UNKNOWN_PERIOD);
        assert_eq!(derive_period_key(Some("garbage")), UNKNOWN_PERIOD);
        assert_eq!(derive_period_key(Some("15-03")), UNKNOWN_PERIOD);
    }

    #[test]
    fn unmapped_month_names_fall_through_as_numeric() {
        // Not a known abbreviation; padded as-is, matching the original
        // tolerant behavior rather than rejecting the record.
        assert_eq!(derive_period_key(Some("15-xx-2024")), "xx2024");
    }
}
