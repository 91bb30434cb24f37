//! Text normalization and fuzzy string similarity for titles and artists.
//!
//! Two listings of the same song rarely agree byte for byte: "The Beatles"
//! vs "Beatles", "Beyoncé" vs "Beyonce", "Jolene (feat. X)" vs "Jolene".
//! Everything is reduced to a folded, punctuation-free form before the edit
//! distance is taken.

use std::collections::{BTreeMap, HashMap};

use strsim::normalized_levenshtein;

/// Lowercase and strip diacritics from Latin letters.
pub fn fold_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => out.push('a'),
            'æ' => out.push_str("ae"),
            'ç' | 'ć' | 'č' => out.push('c'),
            'ď' | 'đ' => out.push('d'),
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => out.push('e'),
            'ğ' => out.push('g'),
            'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => out.push('i'),
            'ł' | 'ľ' => out.push('l'),
            'ñ' | 'ń' | 'ň' => out.push('n'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => out.push('o'),
            'œ' => out.push_str("oe"),
            'ř' => out.push('r'),
            'ś' | 'š' | 'ş' => out.push('s'),
            'ß' => out.push_str("ss"),
            'ť' | 'ţ' => out.push('t'),
            'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => out.push('u'),
            'ý' | 'ÿ' => out.push('y'),
            'ź' | 'ż' | 'ž' => out.push('z'),
            other => out.push(other),
        }
    }
    out
}

/// Reduce a title or artist to its comparison form.
///
/// Folds case and diacritics, drops featuring credits, removes punctuation,
/// collapses whitespace and strips a leading article.
pub fn normalize_text(text: &str) -> String {
    let mut result = fold_to_ascii(text);

    for pattern in [" (feat", " [feat", " (ft.", " feat.", " ft.", " featuring "] {
        if let Some(pos) = result.find(pattern) {
            result.truncate(pos);
        }
    }

    let words: Vec<String> = result
        .replace('&', " and ")
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut skip = 0;
    while words.len() - skip > 1 && matches!(words[skip].as_str(), "the" | "a" | "an") {
        skip += 1;
    }
    words[skip..].join(" ")
}

/// Similarity of two already-normalized strings, 0.0–1.0.
///
/// An empty side is no evidence of a match and scores 0.0, even against
/// another empty string.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    normalized_levenshtein(a, b)
}

/// Case, punctuation and diacritic insensitive similarity, 0.0–1.0.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    normalized_similarity(&normalize_text(a), &normalize_text(b))
}

/// Maps known artist spellings to one canonical name.
#[derive(Debug, Clone, Default)]
pub struct ArtistAliases {
    canonical: HashMap<String, String>,
}

impl ArtistAliases {
    /// Build from a `canonical name → [aliases]` table.
    pub fn new(table: &BTreeMap<String, Vec<String>>) -> Self {
        let mut canonical = HashMap::new();
        for (name, aliases) in table {
            let target = normalize_text(name);
            for alias in aliases {
                canonical.insert(normalize_text(alias), target.clone());
            }
        }
        Self { canonical }
    }

    /// Normalized artist name with aliases resolved.
    pub fn canonical(&self, artist: &str) -> String {
        let normalized = normalize_text(artist);
        match self.canonical.get(&normalized) {
            Some(target) => target.clone(),
            None => normalized,
        }
    }

    /// Two charts that both omit the artist do not disagree on it, so they
    /// compare as equal.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let (a, b) = (self.canonical(a), self.canonical(b));
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        normalized_similarity(&a, &b)
    }
}

/// Default alias table.
pub fn default_artist_aliases() -> BTreeMap<String, Vec<String>> {
    let mut table = BTreeMap::new();
    table.insert(
        "traditional".to_string(),
        ["trad", "trad.", "traditional song", "public domain", "anonymous", "unknown"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_to_ascii() {
        assert_eq!(fold_to_ascii("Beyoncé"), "beyonce");
        assert_eq!(fold_to_ascii("Mötley Crüe"), "motley crue");
        assert_eq!(fold_to_ascii("Straße"), "strasse");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("The Beatles"), "beatles");
        assert_eq!(normalize_text("  Don't   Stop  Believin' "), "dont stop believin");
        assert_eq!(normalize_text("Jolene (feat. Someone)"), "jolene");
        assert_eq!(normalize_text("Simon & Garfunkel"), "simon and garfunkel");
        // A lone article is a title in its own right
        assert_eq!(normalize_text("The"), "the");
    }

    #[test]
    fn test_text_similarity() {
        assert_eq!(text_similarity("Amazing Grace", "amazing grace!"), 1.0);
        assert_eq!(text_similarity("The Beatles", "Beatles"), 1.0);
        assert!(text_similarity("Amazing Grace", "Amazing Race") > 0.85);
        assert!(text_similarity("Amazing Grace", "Wonderwall") < 0.3);
        assert_eq!(text_similarity("", "Wonderwall"), 0.0);
        assert_eq!(text_similarity("", ""), 0.0);
        assert_eq!(text_similarity("?!", "  "), 0.0);
    }

    #[test]
    fn test_artist_aliases() {
        let aliases = ArtistAliases::new(&default_artist_aliases());
        assert_eq!(aliases.canonical("Trad."), "traditional");
        assert_eq!(aliases.canonical("Public Domain"), "traditional");
        assert_eq!(aliases.similarity("Traditional", "Trad."), 1.0);
        assert!(ArtistAliases::default().similarity("Traditional", "Trad.") < 0.5);
        assert_eq!(aliases.similarity("", " "), 1.0);
        assert_eq!(aliases.similarity("", "Oasis"), 0.0);
    }
}
