//! Player name normalization
//!
//! Training rows and prediction queries are joined on the compact
//! "first-initial.last-name" form, so both sides must go through
//! [`short_name`].

/// Compact join key for a player: "Aaron Rodgers" -> "A.Rodgers".
///
/// Names with fewer than two whitespace-separated tokens are returned trimmed
/// but otherwise unchanged, which makes the function idempotent.
pub fn short_name(full_name: &str) -> String {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    if parts.len() < 2 {
        return full_name.trim().to_string();
    }

    // Safe: split_whitespace never yields empty tokens
    let initial = parts[0].chars().next().unwrap_or_default();
    format!("{}.{}", initial, parts[parts.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_token_name() {
        assert_eq!(short_name("Aaron Rodgers"), "A.Rodgers");
    }

    #[test]
    fn test_single_token_passes_through() {
        assert_eq!(short_name("Odell"), "Odell");
    }

    #[test]
    fn test_idempotent() {
        for name in ["Aaron Rodgers", "Odell", "Amon-Ra St. Brown", "C.J. Stroud"] {
            let once = short_name(name);
            assert_eq!(short_name(&once), once);
        }
    }

    #[test]
    fn test_uses_last_token() {
        // Suffixes are not stripped; both sides of the join see the same key
        assert_eq!(short_name("Michael Pittman Jr."), "M.Jr.");
        assert_eq!(short_name("Amon-Ra St. Brown"), "A.Brown");
    }

    #[test]
    fn test_extra_whitespace() {
        assert_eq!(short_name("  Josh   Allen "), "J.Allen");
        assert_eq!(short_name(""), "");
    }
}
