//! Text helpers for URL slugs and `LIKE` patterns.

/// Lowercase ASCII slug: runs of anything but `[a-z0-9]` collapse into a
/// single `-`, leading/trailing dashes are dropped. Common Latin accents are
/// folded first (`Crème brûlée` -> `creme-brulee`).
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

const MAX_SLUG_LEN: usize = 120;

fn fold_accent(c: char) -> Vec<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        'ß' => return vec!['s', 's'],
        'æ' | 'Æ' => return vec!['a', 'e'],
        other => other,
    };
    vec![folded]
}

/// The `n`-th candidate for a clashing slug: `base` for 1, `base-n` after
pub fn slug_candidate(base: &str, n: u32) -> String {
    if n <= 1 {
        base.to_string()
    } else {
        format!("{base}-{n}")
    }
}

/// Escape `%`, `_` and `\` so user input matches literally in `LIKE`/`ILIKE`
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `%input%` with the input escaped
pub fn contains_pattern(input: &str) -> String {
    format!("%{}%", escape_like(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Summer Sale -- 2025!  "), "summer-sale-2025");
        assert_eq!(slugify("T-Shirt (Blue)"), "t-shirt-blue");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn test_slug_is_length_capped() {
        let slug = slugify(&"word ".repeat(100));
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_slug_candidates() {
        assert_eq!(slug_candidate("hoodie", 1), "hoodie");
        assert_eq!(slug_candidate("hoodie", 3), "hoodie-3");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like(r"50%_off\"), r"50\%\_off\\");
        assert_eq!(contains_pattern("tee"), "%tee%");
    }
}
