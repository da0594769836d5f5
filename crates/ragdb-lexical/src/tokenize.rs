//! Shared tokenizer: case-folded word tokens, punctuation stripped.

/// Split on every non-alphanumeric character and lowercase the rest.
/// Applied identically to corpus chunks and queries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    #[test]
    fn folds_case_and_strips_punctuation() {
        assert_eq!(tokenize("Pho, recipe! (v2)"), vec!["pho", "recipe", "v2"]);
    }

    #[test]
    fn handles_unicode_words() {
        assert_eq!(tokenize("Phở bò: ngon"), vec!["phở", "bò", "ngon"]);
    }

    #[test]
    fn punctuation_only_input_yields_nothing() {
        assert!(tokenize("?! … --").is_empty());
    }
}
