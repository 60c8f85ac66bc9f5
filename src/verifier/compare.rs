//! Output comparison
//!
//! Best-effort: normalised substring first, then a numeric fallback that ignores
//! numbers which merely echo the test input.

use std::sync::OnceLock;

use regex::Regex;

/// Expected and printed numbers closer than this are the same answer
pub const NUMERIC_TOLERANCE: f64 = 0.1;

/// A printed number this close to an input number is an echo of it
pub const ECHO_TOLERANCE: f64 = 0.001;

/// Expected text with more prose characters than this needs prose in the output too
pub const PROSE_MIN_EXPECTED: usize = 5;

/// Output with fewer prose characters than this counts as "numbers only"
pub const PROSE_MIN_ACTUAL: usize = 2;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?[\d,]*\.?\d+").expect("valid number pattern"))
}

/// Collapse whitespace runs to single spaces and trim
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All numeric literals in `text`; thousands separators are dropped
pub fn extract_numbers(text: &str) -> Vec<f64> {
    number_pattern()
        .find_iter(text)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .collect()
}

fn prose_len(text: &str) -> usize {
    number_pattern().replace_all(text, "").trim().chars().count()
}

fn is_echo(value: f64, inputs: &[f64]) -> bool {
    inputs.iter().any(|i| (value - i).abs() < ECHO_TOLERANCE)
}

/// Result of comparing one test case
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// Normalised expected text appears in the output
    Contains,
    /// A computed number matches within tolerance
    NumericMatch,
    /// Nothing printed
    NoOutput,
    /// Expected a number, output has no digits at all
    NoDigits,
    /// Right number without the surrounding text
    MissingText,
    /// Every printed number is an input echo
    EchoOnly,
    /// Anything else; carries the printed line closest to the expectation
    Mismatch { closest_line: Option<String> },
}

impl Comparison {
    pub fn is_pass(&self) -> bool {
        matches!(self, Comparison::Contains | Comparison::NumericMatch)
    }
}

/// Compare program output against the expected text for one test input
pub fn compare(input: &str, expected: &str, actual: &str) -> Comparison {
    let norm_expected = normalize(expected);
    let norm_actual = normalize(actual);

    if norm_actual.contains(&norm_expected) {
        return Comparison::Contains;
    }
    if norm_actual.is_empty() {
        return Comparison::NoOutput;
    }

    let expected_has_digits = norm_expected.chars().any(|c| c.is_ascii_digit());
    let actual_has_digits = norm_actual.chars().any(|c| c.is_ascii_digit());
    if expected_has_digits && !actual_has_digits {
        return Comparison::NoDigits;
    }

    let input_nums = extract_numbers(input);
    let expected_nums = extract_numbers(&norm_expected);
    let actual_nums = extract_numbers(&norm_actual);

    let numeric_match = expected_nums.iter().any(|e| {
        actual_nums
            .iter()
            .any(|u| (u - e).abs() < NUMERIC_TOLERANCE && !is_echo(*u, &input_nums))
    });

    if numeric_match {
        if prose_len(&norm_expected) > PROSE_MIN_EXPECTED
            && prose_len(&norm_actual) < PROSE_MIN_ACTUAL
        {
            return Comparison::MissingText;
        }
        return Comparison::NumericMatch;
    }

    let only_echoes = actual_nums.iter().all(|u| is_echo(*u, &input_nums));
    if !actual_nums.is_empty() && only_echoes && !expected_nums.is_empty() {
        return Comparison::EchoOnly;
    }

    Comparison::Mismatch {
        closest_line: closest_line(&norm_expected, actual),
    }
}

/// Printed line with the smallest edit distance to the expectation
fn closest_line(expected: &str, actual: &str) -> Option<String> {
    actual
        .lines()
        .map(normalize)
        .filter(|line| !line.is_empty())
        .min_by_key(|line| triple_accel::levenshtein(line.as_bytes(), expected.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  a \n\t b\r\n c  "), "a b c");
        assert_eq!(normalize("\n \n"), "");
    }

    #[test]
    fn test_extract_numbers() {
        assert_eq!(extract_numbers("1,000.5 and -3 or .25"), vec![1000.5, -3.0, 0.25]);
        assert_eq!(extract_numbers("radius 5 is 523.60"), vec![5.0, 523.6]);
        assert!(extract_numbers("no numbers").is_empty());
    }

    #[test]
    fn test_substring_with_extra_prompts() {
        let actual = "Enter the radius: 5\nThe volume of a sphere with radius 5 is 523.60 cubic units.\n";
        assert_eq!(
            compare("5", "The volume of a sphere with radius 5 is 523.60 cubic units.", actual),
            Comparison::Contains
        );
    }

    #[test]
    fn test_numeric_tolerance() {
        assert!(compare("", "Result: 62.5", "Result: 62.51").is_pass());
        assert_eq!(compare("", "Result: 62.5", "Result: 62.49"), Comparison::NumericMatch);
        assert!(matches!(
            compare("", "Result: 62.5", "Result: 62.7"),
            Comparison::Mismatch { .. }
        ));
    }

    #[test]
    fn test_echo_is_not_an_answer() {
        assert_eq!(compare("5", "Volume: 523.60", "5"), Comparison::EchoOnly);
        assert_eq!(
            compare("5", "The answer is 5.05 units", "Enter: 5"),
            Comparison::EchoOnly
        );
    }

    #[test]
    fn test_empty_and_digitless_output() {
        assert_eq!(compare("5", "Volume: 523.60", "  \n"), Comparison::NoOutput);
        assert_eq!(compare("5", "Volume: 523.60", "Enter radius:"), Comparison::NoDigits);
    }

    #[test]
    fn test_number_without_text() {
        assert_eq!(
            compare("5", "The volume of a sphere is 523.60 cubic units.", "5\n523.6"),
            Comparison::MissingText
        );
    }

    #[test]
    fn test_mismatch_reports_closest_line() {
        let actual = "Enter the radius: 5\nVolume is 100.00\nBye";
        match compare("5", "Volume is 523.60", actual) {
            Comparison::Mismatch { closest_line } => {
                assert_eq!(closest_line.as_deref(), Some("Volume is 100.00"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
