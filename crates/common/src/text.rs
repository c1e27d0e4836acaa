// Word counting for the status bar.
//
// Markup tags are stripped, then every CJK ideograph counts as one word and
// every run of ASCII letters counts as one word.

use std::sync::OnceLock;

use regex::Regex;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"))
}

fn cjk_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\x{4e00}-\x{9fff}\x{3400}-\x{4dbf}]").expect("cjk pattern is valid")
    })
}

fn latin_word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-zA-Z]+").expect("word pattern is valid"))
}

/// Count words in `text`.
pub fn count_words(text: &str) -> usize {
    let stripped = tag_pattern().replace_all(text, "");
    let cjk = cjk_pattern().find_iter(&stripped).count();
    let latin = latin_word_pattern().find_iter(&stripped).count();
    cjk + latin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_latin_words() {
        assert_eq!(count_words("Hello, world! It's 2024."), 4);
    }

    #[test]
    fn counts_each_ideograph() {
        assert_eq!(count_words("今天天气很好"), 6);
        assert_eq!(count_words("今天 good day"), 4);
    }

    #[test]
    fn ignores_markup_tags() {
        assert_eq!(count_words("<div class=\"note\">two words</div>"), 2);
    }

    #[test]
    fn empty_and_numeric_text() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("12 34 -- 56"), 0);
    }

    #[test]
    fn markdown_heading() {
        assert_eq!(count_words("# 2024-01-07 Sun\n\n- buy milk\n"), 3);
    }
}
