/// Derive a URL-safe slug from a human-entered name.
///
/// Lowercases, keeps ASCII alphanumerics, transliterates common accented
/// Latin letters, and collapses every run of whitespace or punctuation into a
/// single underscore. Letters with no reasonable ASCII mapping are dropped
/// without leaving a separator behind. Leading and trailing underscores are
/// stripped, so `"完了 (Completed)"` becomes `completed`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_alphabetic() {
            // Non-ASCII letter: transliterate when we know how, drop otherwise.
            if let Some(mapped) = transliterate(ch) {
                if pending_sep && !out.is_empty() {
                    out.push('_');
                }
                pending_sep = false;
                out.push_str(mapped);
            }
        } else {
            pending_sep = true;
        }
    }

    out
}

fn transliterate(ch: char) -> Option<&'static str> {
    let mut lowered = ch.to_lowercase();
    let ch = lowered.next().unwrap_or(ch);
    let mapped = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'œ' => "oe",
        'ř' => "r",
        'ś' | 'š' => "s",
        'ß' => "ss",
        'ť' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_joins_words() {
        assert_eq!(slugify("In Progress"), "in_progress");
        assert_eq!(slugify("Todo"), "todo");
    }

    #[test]
    fn punctuation_collapses_to_single_separator() {
        assert_eq!(slugify("Ready to Deploy!"), "ready_to_deploy");
        assert_eq!(slugify("a - b -- c"), "a_b_c");
    }

    #[test]
    fn unmapped_letters_are_dropped() {
        assert_eq!(slugify("完了 (Completed)"), "completed");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn accented_latin_is_transliterated() {
        assert_eq!(slugify("Naïve Idée"), "naive_idee");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn edges_are_trimmed() {
        assert_eq!(slugify("  padded  "), "padded");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn digits_are_preserved() {
        assert_eq!(slugify("Sprint 42"), "sprint_42");
    }
}
