const DEVANAGARI_DIGITS: [char; 10] = ['०', '१', '२', '३', '४', '५', '६', '७', '८', '९'];

/// Replaces Devanagari numerals with ASCII digits, leaving everything else intact.
pub fn to_ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match DEVANAGARI_DIGITS.iter().position(|d| *d == c) {
            Some(idx) => char::from(b'0' + idx as u8),
            None => c,
        })
        .collect()
}

/// Farmer profiles are keyed by the last 10 digits of the mobile number.
/// "+91 99220-01122" and "9922001122" map to the same key.
pub fn normalize_mobile(mobile: &str) -> String {
    let digits: Vec<char> = to_ascii_digits(mobile)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let start = digits.len().saturating_sub(10);
    digits[start..].iter().collect()
}

/// Formats a rupee amount with Indian digit grouping, e.g. `₹1,23,456`.
/// Paise are dropped after rounding.
pub fn format_rupees(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let negative = rounded < 0;
    let digits = rounded.unsigned_abs().to_string();

    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<String> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (h, t) = rest.split_at(rest.len() - 2);
            groups.push(t.to_string());
            rest = h;
        }
        groups.push(rest.to_string());
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };

    if negative {
        format!("-₹{}", grouped)
    } else {
        format!("₹{}", grouped)
    }
}

/// Formats a hectare figure the way the claim form's area field holds it,
/// e.g. "0.50". The unit is printed by the form itself.
pub fn format_hectares(area: f64) -> String {
    format!("{:.2}", area)
}

/// Makes text printable with a Latin-only report font: the rupee sign becomes
/// "Rs.", Devanagari digits become ASCII and other non-ASCII text is dropped.
pub fn report_safe_text(text: &str) -> String {
    let replaced = to_ascii_digits(&text.replace('₹', "Rs."));
    replaced
        .chars()
        .filter(|c| c.is_ascii())
        .collect::<String>()
        .trim()
        .to_string()
}
