use crate::error::FieldError;
use crate::models::MangaRating;

/// Parse a label of the form `"<num> / <den> ... <count> votes"`.
///
/// Tokens are read by position after splitting on whitespace: numerator
/// first, denominator third, vote count fourth. A denominator that is zero
/// or not a number makes the percentage `"NaN%"` rather than an error; only
/// a label too short to hold a fraction is rejected.
pub fn parse_rating(label: &str) -> Result<MangaRating, FieldError> {
    let tokens: Vec<&str> = label.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(FieldError::new(
            "rating",
            format!("expected `<num> / <den>`, got {:?}", label),
        ));
    }

    let numerator = tokens[0];
    let denominator = tokens[2];

    Ok(MangaRating {
        stars: format!("{} / {}", numerator, denominator),
        percentage: percentage(numerator, denominator),
        votes: tokens.get(3).and_then(|t| parse_grouped_count(t)),
    })
}

fn percentage(numerator: &str, denominator: &str) -> String {
    let num = numerator.parse::<f64>().unwrap_or(f64::NAN);
    let den = denominator.parse::<f64>().unwrap_or(f64::NAN);

    let value = if den == 0.0 { f64::NAN } else { num / den * 100.0 };
    if value.is_finite() {
        format!("{:.2}%", value)
    } else {
        "NaN%".to_string()
    }
}

/// `"(12,345"` -> 12345. Group separators and surrounding punctuation are
/// ignored.
fn parse_grouped_count(token: &str) -> Option<u64> {
    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
