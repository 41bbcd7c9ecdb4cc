//! Identity normalization and name derivation.
//!
//! Both ledgers carry an email-like identity for the paying party. The
//! normalized form is the join key for bucketing; the derived name is the
//! coarser token used by the medium-confidence layer.

/// Canonical join key: surrounding whitespace removed, case-folded.
///
/// Callers guarantee a non-blank identity; blank input yields an empty key.
pub fn normalize(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Extracts a coarse name token from the local part of an identity.
///
/// Keeps letters (including German umlauts and `ß`), dots and hyphens.
/// Returns `None` when fewer than two characters remain, or when the
/// remainder is mostly separators.
///
/// ```
/// use charge_recon::identity::derive_name;
///
/// assert_eq!(derive_name("John.Doe42@example.com").as_deref(), Some("john.doe"));
/// assert_eq!(derive_name("7@example.com"), None);
/// ```
pub fn derive_name(identity: &str) -> Option<String> {
    let local = identity.split('@').next().unwrap_or_default();

    let cleaned: String = local.chars().filter(|c| is_name_char(*c)).collect();

    let core = cleaned.trim_matches(|c| c == '.' || c == '-');
    if cleaned.chars().count() < 2 || core.chars().count() < 2 {
        return None;
    }

    Some(cleaned.to_lowercase())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, 'ä' | 'ö' | 'ü' | 'Ä' | 'Ö' | 'Ü' | 'ß' | '.' | '-')
}
