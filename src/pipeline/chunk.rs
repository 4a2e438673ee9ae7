//! Sentence-boundary chunking under a word budget.
//!
//! The model is prompted per chunk, so a chunk must never cut a sentence in
//! half — a truncated clinical vignette produces a truncated question. The
//! splitter scans for `.`, `!`, `?` followed by whitespace and treats that as
//! a boundary unless the period belongs to an initial (`J. Smith`) or a known
//! abbreviation (`e.g.`, `i.e.`, `etc.`). The `regex` crate has no lookbehind,
//! so this is a hand-rolled scanner rather than a split pattern.
//!
//! Chunks accumulate whole sentences until the word budget would be exceeded;
//! a single sentence longer than the budget becomes its own oversized chunk
//! rather than being split.

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "etc", "vs", "cf", "al", "fig", "dr", "mr", "mrs", "ms", "no", "approx",
];

/// Split `text` into sentences.
///
/// Whitespace between sentences is consumed; each returned sentence is
/// trimmed and non-empty. The concatenation of the results (joined with
/// single spaces) preserves every word of the input in order.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if matches!(c, '.' | '!' | '?') {
            let next_is_space = chars.get(i + 1).map(|n| n.is_whitespace()).unwrap_or(true);
            if next_is_space && !(c == '.' && is_non_terminal_period(&chars, i)) {
                let sentence: String = chars[start..=i].iter().collect();
                let trimmed = sentence.trim();
                if !trimmed.is_empty() {
                    sentences.push(trimmed.to_string());
                }
                i += 1;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                start = i;
                continue;
            }
        }
        i += 1;
    }

    if start < chars.len() {
        let tail: String = chars[start..].iter().collect();
        let trimmed = tail.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
    }

    sentences
}

/// True when the period at `idx` ends an initial or abbreviation rather than
/// a sentence.
fn is_non_terminal_period(chars: &[char], idx: usize) -> bool {
    // Collect the word immediately before the period.
    let mut j = idx;
    while j > 0 && (chars[j - 1].is_alphanumeric() || chars[j - 1] == '.') {
        j -= 1;
    }
    let word: String = chars[j..idx].iter().collect();

    // Single capital letter: an initial, as in "J. Smith".
    if word.len() == 1 && word.chars().all(|c| c.is_uppercase()) {
        return true;
    }
    // Internal dots mark dotted tokens like "U.S" or "e.g".
    if word.contains('.') {
        return true;
    }
    ABBREVIATIONS
        .iter()
        .any(|a| word.eq_ignore_ascii_case(a))
}

/// Count whitespace-separated words.
fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Split `text` into chunks of at most `word_budget` words, never breaking a
/// sentence. A sentence longer than the budget becomes its own chunk.
pub fn chunk_text(text: &str, word_budget: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_words = 0;

    for sentence in sentences {
        let words = word_count(&sentence);
        if current_words + words <= word_budget {
            current.push(sentence);
            current_words += words;
        } else {
            if !current.is_empty() {
                chunks.push(current.join(" "));
            }
            if words <= word_budget {
                current = vec![sentence];
                current_words = words;
            } else {
                // Oversized sentence: emit as-is rather than splitting it.
                chunks.push(sentence);
                current = Vec::new();
                current_words = 0;
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence_of(words: usize, tag: &str) -> String {
        let mut s: Vec<String> = (0..words.saturating_sub(1))
            .map(|i| format!("{tag}{i}"))
            .collect();
        s.push(format!("{tag}end."));
        s.join(" ")
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let s = split_sentences("The heart pumps. Blood flows! Where does it go? Away.");
        assert_eq!(
            s,
            vec!["The heart pumps.", "Blood flows!", "Where does it go?", "Away."]
        );
    }

    #[test]
    fn keeps_abbreviations_intact() {
        let s = split_sentences("Use diuretics, e.g. furosemide. Monitor potassium.");
        assert_eq!(
            s,
            vec!["Use diuretics, e.g. furosemide.", "Monitor potassium."]
        );
    }

    #[test]
    fn keeps_initials_intact() {
        let s = split_sentences("Described by J. Smith in 1998. It remains relevant.");
        assert_eq!(
            s,
            vec!["Described by J. Smith in 1998.", "It remains relevant."]
        );
    }

    #[test]
    fn reconstruction_preserves_every_word() {
        let text = "Alpha beta gamma. Delta epsilon? Zeta eta theta! Iota.";
        let chunks = chunk_text(text, 4);
        let rebuilt: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.split_whitespace())
            .collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn chunks_respect_budget_for_normal_sentences() {
        let text = format!(
            "{} {} {}",
            sentence_of(40, "a"),
            sentence_of(40, "b"),
            sentence_of(40, "c")
        );
        let chunks = chunk_text(&text, 90);
        for chunk in &chunks {
            assert!(chunk.split_whitespace().count() <= 90);
        }
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn never_splits_mid_sentence_even_when_budget_forces_singletons() {
        // Three ~90-word sentences with a 100-word budget: no pair fits, so
        // each sentence must come out as exactly one chunk.
        let text = format!(
            "{} {} {}",
            sentence_of(90, "x"),
            sentence_of(90, "y"),
            sentence_of(90, "z")
        );
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert_eq!(chunk.matches('.').count(), 1, "chunk holds one sentence");
        }
    }

    #[test]
    fn oversized_sentence_becomes_its_own_chunk() {
        let big = sentence_of(50, "big");
        let text = format!("Short one. {big} Another short.");
        let chunks = chunk_text(&text, 10);
        assert!(chunks.iter().any(|c| c.split_whitespace().count() == 50));
        let rebuilt: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.split_whitespace())
            .collect();
        assert_eq!(rebuilt, text.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("   \n\t ", 100).is_empty());
    }
}
