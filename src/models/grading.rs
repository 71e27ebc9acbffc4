//! Answer parsing and grading.
//!
//! User input is parsed leniently: leading whitespace is skipped and the
//! longest decimal prefix is used, so `"4 apples"` reads as `4`. Input with no
//! numeric prefix becomes NaN and is therefore never correct.

/// Parse the leading decimal number of `input`, or NaN if there is none.
///
/// Accepts an optional sign, digits with an optional fraction, an optional
/// exponent, and the literal `Infinity`. Trailing text is ignored.
pub fn parse_float(input: &str) -> f64 {
    let text = input.trim_start();
    let bytes = text.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    if text[end..].starts_with("Infinity") {
        return if bytes.first() == Some(&b'-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    text[..end].parse().unwrap_or(f64::NAN)
}

/// Grade raw user input against the authoritative answer.
///
/// Returns the parsed value alongside the verdict. Comparison is exact.
pub fn grade(raw_input: &str, correct_answer: f64) -> (f64, bool) {
    let parsed = parse_float(raw_input);
    (parsed, parsed == correct_answer)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_numbers() {
        assert_eq!(parse_float("4"), 4.0);
        assert_eq!(parse_float("-12"), -12.0);
        assert_eq!(parse_float("+7"), 7.0);
        assert_eq!(parse_float("3.25"), 3.25);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("5."), 5.0);
        assert_eq!(parse_float("1e3"), 1000.0);
        assert_eq!(parse_float("2.5E-1"), 0.25);
    }

    #[test]
    fn skips_leading_whitespace_and_trailing_garbage() {
        assert_eq!(parse_float("  42  "), 42.0);
        assert_eq!(parse_float("\t8\n"), 8.0);
        assert_eq!(parse_float("4abc"), 4.0);
        assert_eq!(parse_float("1.2.3"), 1.2);
        assert_eq!(parse_float("0x10"), 0.0);
        assert_eq!(parse_float("7e"), 7.0);
        assert_eq!(parse_float("7e+"), 7.0);
    }

    #[test]
    fn non_numeric_input_is_nan() {
        assert!(parse_float("abc").is_nan());
        assert!(parse_float("").is_nan());
        assert!(parse_float("   ").is_nan());
        assert!(parse_float("-").is_nan());
        assert!(parse_float(".").is_nan());
        assert!(parse_float("nan").is_nan());
        assert!(parse_float("inf").is_nan());
    }

    #[test]
    fn infinity_literal() {
        assert_eq!(parse_float("Infinity"), f64::INFINITY);
        assert_eq!(parse_float("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(parse_float("+Infinityx"), f64::INFINITY);
    }

    #[test]
    fn grading_is_exact_equality() {
        assert_eq!(grade("4", 4.0), (4.0, true));
        assert_eq!(grade(" 4.0 ", 4.0), (4.0, true));
        assert_eq!(grade("5", 4.0), (5.0, false));
        assert_eq!(grade("0.30000000000000004", 0.1 + 0.2), (0.1 + 0.2, true));
        assert!(!grade("0.3", 0.1 + 0.2).1);
    }

    #[test]
    fn unparsable_input_is_always_wrong() {
        for correct in [0.0, 4.0, -1.5, f64::INFINITY] {
            let (parsed, is_correct) = grade("abc", correct);
            assert!(parsed.is_nan());
            assert!(!is_correct);
        }
        // NaN never equals itself either
        assert!(!grade("abc", f64::NAN).1);
    }
}
