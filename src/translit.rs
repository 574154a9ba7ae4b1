//! # Transliteration
//!
//! Devanagari → Latin romanization via an ordered rewrite table. Rule order
//! is load-bearing: whole-word exceptions come before conjuncts, conjuncts
//! before the consonant they start with, and each consonant's matra/halant
//! combinations before the bare consonant (which carries the inherent "a").
//! The table is a priority-ordered list, never a map.

use once_cell::sync::Lazy;

/// Whole-word forms that a character-wise pass would corrupt.
const EXCEPTIONS: &[(&str, &str)] = &[("हैं", "hain"), ("है", "hai"), ("नहीं", "nahin")];

/// Conjuncts first, then plain consonants. Values are the bare consonant
/// sound; the inherent "a" is appended by the rule generator.
const CONSONANTS: &[(&str, &str)] = &[
    ("क्ष", "ksh"),
    ("ज्ञ", "gy"),
    ("श्र", "shr"),
    ("त्र", "tr"),
    ("क", "k"),
    ("ख", "kh"),
    ("ग", "g"),
    ("घ", "gh"),
    ("ङ", "n"),
    ("च", "ch"),
    ("छ", "chh"),
    ("ज", "j"),
    ("झ", "jh"),
    ("ञ", "n"),
    ("ट", "t"),
    ("ठ", "th"),
    ("ड", "d"),
    ("ढ", "dh"),
    ("ण", "n"),
    ("त", "t"),
    ("थ", "th"),
    ("द", "d"),
    ("ध", "dh"),
    ("न", "n"),
    ("प", "p"),
    ("फ", "ph"),
    ("ब", "b"),
    ("भ", "bh"),
    ("म", "m"),
    ("य", "y"),
    ("र", "r"),
    ("ल", "l"),
    ("व", "v"),
    ("श", "sh"),
    ("ष", "sh"),
    ("स", "s"),
    ("ह", "h"),
    ("ळ", "l"),
];

/// Dependent vowel signs (matras).
const MATRAS: &[(&str, &str)] = &[
    ("ा", "aa"),
    ("ि", "i"),
    ("ी", "ee"),
    ("ु", "u"),
    ("ू", "oo"),
    ("ृ", "ri"),
    ("े", "e"),
    ("ै", "ai"),
    ("ो", "o"),
    ("ौ", "au"),
    ("ॉ", "o"),
];

/// Independent vowels.
const VOWELS: &[(&str, &str)] = &[
    ("अ", "a"),
    ("आ", "aa"),
    ("इ", "i"),
    ("ई", "ee"),
    ("उ", "u"),
    ("ऊ", "oo"),
    ("ऋ", "ri"),
    ("ए", "e"),
    ("ऐ", "ai"),
    ("ओ", "o"),
    ("औ", "au"),
    ("ऑ", "o"),
];

const DIGITS: &[(&str, &str)] = &[
    ("०", "0"),
    ("१", "1"),
    ("२", "2"),
    ("३", "3"),
    ("४", "4"),
    ("५", "5"),
    ("६", "6"),
    ("७", "7"),
    ("८", "8"),
    ("९", "9"),
];

/// Trailing signs and punctuation, plus stray matras/halants that survive
/// the combination rules (for example a matra after a conjunct handled as a
/// single unit).
const SIGNS: &[(&str, &str)] = &[
    ("ं", "n"),
    ("ँ", "n"),
    ("ः", "h"),
    ("्", ""),
    ("।", "."),
    ("॥", ".."),
];

/// The full rewrite table, expanded once in priority order.
static RULES: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    let mut rules: Vec<(String, String)> = Vec::new();

    for (word, latin) in EXCEPTIONS {
        rules.push((word.to_string(), latin.to_string()));
    }

    for (cons, base) in CONSONANTS {
        // consonant + matra combinations before the halant form, and the
        // halant form before the bare consonant
        for (matra, vowel) in MATRAS {
            rules.push((format!("{cons}{matra}"), format!("{base}{vowel}")));
        }
        rules.push((format!("{cons}्"), base.to_string()));
        rules.push((cons.to_string(), format!("{base}a")));
    }

    for table in [VOWELS, MATRAS, DIGITS, SIGNS] {
        for (pat, rep) in table {
            rules.push((pat.to_string(), rep.to_string()));
        }
    }

    rules
});

/// Apply the rewrite table in order. Pure and deterministic.
pub fn transliterate(input: &str) -> String {
    let mut out = input.to_string();
    for (pattern, replacement) in RULES.iter() {
        if out.contains(pattern.as_str()) {
            out = out.replace(pattern.as_str(), replacement);
        }
    }
    out
}
