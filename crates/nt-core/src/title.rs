//! Title canonicalization and fuzzy matching against remote record titles.
//!
//! Remote records carry human-authored titles of the form `"12. Kardiologi"`.
//! There is no stable shared key between the roster and the remote stores,
//! so matching works on the canonical (number-stripped) title with a
//! number-anchored containment fallback for partial renames.

/// Strip a leading `"<digits>. "` prefix and surrounding whitespace.
///
/// Accepts exactly the prefixes [`parse_number`] accepts, including stray
/// whitespace before the dot, so a title never both parses as numbered and
/// keeps its prefix.
pub fn canonical_title(title: &str) -> &str {
    let trimmed = title.trim();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = trimmed[digits..].trim_start();
        if let Some(stripped) = rest.strip_prefix('.') {
            return stripped.trim_start();
        }
    }
    trimmed
}

/// Parse the lecture number out of a `"N. Title"` string, if present.
pub fn parse_number(title: &str) -> Option<u32> {
    let trimmed = title.trim();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let rest = &trimmed[digits.len()..];
    if !rest.trim_start().starts_with('.') {
        return None;
    }
    digits.parse().ok()
}

/// Decide whether a remote record title refers to the given local lecture.
///
/// Exact canonical match (case-insensitive) wins. When that fails, a
/// containment fallback covers partial renames, but only when the remote
/// title's parsed number equals the local number: a bare shared numeric
/// prefix alone never matches.
pub fn title_matches(local_number: u32, local_title: &str, remote_title: &str) -> bool {
    let local = canonical_title(local_title).to_lowercase();
    let remote = canonical_title(remote_title).to_lowercase();

    if !local.is_empty() && local == remote {
        return true;
    }

    if parse_number(remote_title) != Some(local_number) {
        return false;
    }
    if local.is_empty() || remote.is_empty() {
        // A numbered but otherwise empty title is still the same slot.
        return local.is_empty() && remote.is_empty();
    }
    local.contains(&remote) || remote.contains(&local)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_strips_numbered_prefix() {
        assert_eq!(canonical_title("12. Kardiologi"), "Kardiologi");
        assert_eq!(canonical_title("  3.   Lungmedicin "), "Lungmedicin");
        assert_eq!(canonical_title("Kardiologi"), "Kardiologi");
    }

    #[test]
    fn canonical_and_parse_share_whitespace_tolerance() {
        // Whatever parses as a numbered prefix must also canonicalize away.
        assert_eq!(parse_number(" 7 .Njurmedicin"), Some(7));
        assert_eq!(canonical_title(" 7 .Njurmedicin"), "Njurmedicin");
    }

    #[test]
    fn canonical_leaves_numbers_without_dot() {
        assert_eq!(canonical_title("12 Kardiologi"), "12 Kardiologi");
        assert_eq!(canonical_title("2024 i siffror"), "2024 i siffror");
    }

    #[test]
    fn parse_number_reads_prefix() {
        assert_eq!(parse_number("12. Kardiologi"), Some(12));
        assert_eq!(parse_number(" 7 .Njurmedicin"), Some(7));
        assert_eq!(parse_number("Kardiologi"), None);
        assert_eq!(parse_number("12 Kardiologi"), None);
    }

    #[test]
    fn exact_canonical_match_ignores_case_and_number() {
        assert!(title_matches(12, "Kardiologi", "12. kardiologi"));
        // Exact canonical equality matches even when the remote number drifted;
        // that is precisely the numbering-repair case.
        assert!(title_matches(12, "Kardiologi", "11. Kardiologi"));
    }

    #[test]
    fn containment_fallback_requires_matching_number() {
        // Partial rename, same number: match.
        assert!(title_matches(12, "Kardiologi", "12. Kardiologi och EKG"));
        assert!(title_matches(12, "12. Kardiologi och EKG", "12. Kardiologi"));
        // Same number prefix but unrelated titles: no match.
        assert!(!title_matches(12, "Kardiologi", "12. Njurmedicin"));
        // Related titles but wrong number and not exact: no match.
        assert!(!title_matches(12, "Kardiologi", "13. Kardiologi och EKG"));
    }

    #[test]
    fn empty_titles_never_cross_match() {
        assert!(!title_matches(12, "", "12. Kardiologi"));
        assert!(!title_matches(12, "Kardiologi", "12."));
    }
}
