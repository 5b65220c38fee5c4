//! Text normalization for search
//!
//! Café names and addresses mix hiragana/katakana and fullwidth/halfwidth
//! spellings. Search folds both sides to a canonical form so that e.g.
//! "ｃａｆｅ" matches "cafe" and "こーひー" matches "コーヒー".

/// Normalize a string for search comparison:
/// fullwidth alphanumerics to halfwidth, hiragana to katakana, then lowercase.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            // Fullwidth A-Z, a-z, 0-9 sit at a fixed offset from ASCII
            '\u{FF10}'..='\u{FF19}' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
                char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
            }
            // Hiragana block maps onto katakana at +0x60
            '\u{3041}'..='\u{3096}' => char::from_u32(c as u32 + 0x60).unwrap_or(c),
            _ => c,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullwidth_to_halfwidth() {
        assert_eq!(normalize("ＣＡＦＥ１２３"), "cafe123");
    }

    #[test]
    fn test_hiragana_to_katakana() {
        assert_eq!(normalize("こーひー"), "コーヒー");
    }

    #[test]
    fn test_lowercase() {
        assert_eq!(normalize("Latte Art"), "latte art");
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(normalize("鹿児島市"), "鹿児島市");
        assert_eq!(normalize(""), "");
    }
}
