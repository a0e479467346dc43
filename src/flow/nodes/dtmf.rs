//! Shared DTMF validation used by the digit-collecting handlers (ops 20, 30,
//! 31, 105).

/// Split a `valid_keys` string ("1,2,3") into its comma-separated tokens.
pub fn valid_keys_set(valid_keys: &str) -> Vec<&str> {
    valid_keys.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Build the alternation regex handed to the provider as a collection hint
/// (scenario 1: `valid_keys = "1,2,3"` → `"1|2|3"`).
pub fn build_valid_regex(valid_keys: &str) -> String {
    valid_keys_set(valid_keys).join("|")
}

/// Whether `digits` satisfies `valid_keys`. A single collected digit must be
/// one of the listed tokens; a multi-digit run must be composed entirely of
/// single-character tokens from the set.
pub fn digits_accepted(digits: &str, valid_keys: &str) -> bool {
    let set = valid_keys_set(valid_keys);
    if set.is_empty() {
        return true;
    }
    if digits.chars().count() == 1 {
        set.contains(&digits)
    } else {
        digits
            .chars()
            .all(|c| set.iter().any(|token| token.len() == 1 && token.starts_with(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_digit_must_be_in_set() {
        assert!(digits_accepted("2", "1,2,3"));
        assert!(!digits_accepted("9", "1,2,3"));
    }

    #[test]
    fn multi_digit_checks_every_character() {
        assert!(digits_accepted("123", "0,1,2,3,4,5,6,7,8,9"));
        assert!(!digits_accepted("1a3", "0,1,2,3,4,5,6,7,8,9"));
    }

    #[test]
    fn empty_valid_keys_accepts_anything() {
        assert!(digits_accepted("555", ""));
    }

    #[test]
    fn regex_joins_with_pipe() {
        assert_eq!(build_valid_regex("1,2,3"), "1|2|3");
    }
}
