//! Approximate address derivation.
//!
//! Published profiles never show a full street address. The approximation
//! strips postal codes and keeps only the last one or two comma-separated
//! components, which in practice yields "city, country" or just "city".

/// Reduce a full address to a coarse, display-safe form.
///
/// Returns an empty string when nothing survives the reduction.
pub fn approximate_address(full_address: &str) -> String {
    let parts: Vec<String> = full_address
        .split(',')
        .map(strip_postal_code)
        .filter(|part| !part.is_empty())
        .collect();

    let keep = parts.len().min(2);
    parts[parts.len() - keep..].join(", ")
}

/// Drop tokens that look like postal codes: runs of 4 to 6 digits, or the
/// common `XX-NNNN`-style prefixed variants.
fn strip_postal_code(component: &str) -> String {
    component
        .split_whitespace()
        .filter(|token| !looks_like_postal_code(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn looks_like_postal_code(token: &str) -> bool {
    let trimmed = token.trim_matches(|c: char| c == '-' || c == '.');

    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 4 {
        return false;
    }

    trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || c == '-' || c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_last_two_components() {
        assert_eq!(
            approximate_address("Calle Mayor 5, Centro, Madrid, Spain"),
            "Madrid, Spain"
        );
    }

    #[test]
    fn strips_postal_codes() {
        assert_eq!(
            approximate_address("Gran Via 12, 28013 Madrid, Spain"),
            "Madrid, Spain"
        );
        assert_eq!(
            approximate_address("ul. Marszalkowska 1, 00-950 Warsaw, Poland"),
            "Warsaw, Poland"
        );
    }

    #[test]
    fn single_component_survives() {
        assert_eq!(approximate_address("Lisbon"), "Lisbon");
    }

    #[test]
    fn component_reduced_to_only_a_postal_code_is_dropped() {
        assert_eq!(approximate_address("08001, Barcelona, Spain"), "Barcelona, Spain");
    }

    #[test]
    fn short_house_numbers_are_not_postal_codes() {
        assert_eq!(approximate_address("5 Oak Lane, Dublin"), "5 Oak Lane, Dublin");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(approximate_address(""), "");
        assert_eq!(approximate_address("  ,  "), "");
    }
}
