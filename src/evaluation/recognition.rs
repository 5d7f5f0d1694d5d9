//! Character and word error rates.
//!
//! Characters are Unicode scalar values. Words come from whitespace splitting, with
//! every punctuation character split off as its own token, so "Hello, world." is
//! `["Hello", ",", "world", "."]`.

use serde::{Deserialize, Serialize};

/// Edit counts and error rates (percent) for one prediction/reference pair or a corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionScore {
    pub cer: f32,
    pub wer: f32,
    pub char_edits: usize,
    pub word_edits: usize,
    pub reference_chars: usize,
    pub reference_words: usize,
}

/// Punctuation that becomes a standalone token, beyond ASCII punctuation.
const EXTRA_PUNCTUATION: &[char] = &[
    '،', '؛', '؟', '۔', '।', '॥', '‘', '’', '“', '”', '…', '«', '»', '–', '—',
];

fn is_token_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || EXTRA_PUNCTUATION.contains(&c)
}

/// Split text into word and punctuation tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for chunk in text.split_whitespace() {
        let mut start = None;
        for (i, c) in chunk.char_indices() {
            if is_token_punctuation(c) {
                if let Some(s) = start.take() {
                    tokens.push(&chunk[s..i]);
                }
                tokens.push(&chunk[i..i + c.len_utf8()]);
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            tokens.push(&chunk[s..]);
        }
    }
    tokens
}

/// Levenshtein distance with unit costs, two-row.
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (m, n) = (a.len(), b.len());
    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for (i, a_item) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_item) in b.iter().enumerate() {
            let cost = usize::from(a_item != b_item);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Edits over reference length as a percentage, with the empty-reference guard.
fn error_rate(edits: usize, predicted_len: usize, reference_len: usize) -> f32 {
    if reference_len == 0 {
        return if predicted_len == 0 { 0.0 } else { 100.0 };
    }
    edits as f32 / reference_len as f32 * 100.0
}

pub fn score(predicted: &str, reference: &str) -> RecognitionScore {
    let pred_chars: Vec<char> = predicted.chars().collect();
    let ref_chars: Vec<char> = reference.chars().collect();
    let pred_words = tokenize(predicted);
    let ref_words = tokenize(reference);

    let char_edits = levenshtein(&pred_chars, &ref_chars);
    let word_edits = levenshtein(&pred_words, &ref_words);

    RecognitionScore {
        cer: error_rate(char_edits, pred_chars.len(), ref_chars.len()),
        wer: error_rate(word_edits, pred_words.len(), ref_words.len()),
        char_edits,
        word_edits,
        reference_chars: ref_chars.len(),
        reference_words: ref_words.len(),
    }
}

/// Corpus-level rates: total edits over total reference length.
pub fn score_corpus<'a, I>(pairs: I) -> RecognitionScore
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut total = RecognitionScore::default();
    let (mut pred_chars, mut pred_words) = (0usize, 0usize);

    for (predicted, reference) in pairs {
        let s = score(predicted, reference);
        total.char_edits += s.char_edits;
        total.word_edits += s.word_edits;
        total.reference_chars += s.reference_chars;
        total.reference_words += s.reference_words;
        pred_chars += predicted.chars().count();
        pred_words += tokenize(predicted).len();
    }

    total.cer = error_rate(total.char_edits, pred_chars, total.reference_chars);
    total.wer = error_rate(total.word_edits, pred_words, total.reference_words);
    total
}
