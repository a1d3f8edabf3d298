//! Script and language heuristics used to keep enhancement from translating speech

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::utils::tts_preprocessor::{tts_filter, SpeechFilter};

/// Declaration order breaks ties between equally frequent scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Devanagari,
    Bengali,
    Arabic,
    Cyrillic,
    Greek,
    Hebrew,
    Thai,
    Hangul,
    Kana,
    Han,
    Unknown,
}

impl Script {
    pub fn of(c: char) -> Option<Script> {
        let script = match c as u32 {
            0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F | 0x1E00..=0x1EFF => Script::Latin,
            0x0900..=0x097F | 0xA8E0..=0xA8FF => Script::Devanagari,
            0x0980..=0x09FF => Script::Bengali,
            0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => Script::Arabic,
            0x0400..=0x052F => Script::Cyrillic,
            0x0370..=0x03FF | 0x1F00..=0x1FFF => Script::Greek,
            0x0590..=0x05FF => Script::Hebrew,
            0x0E00..=0x0E7F => Script::Thai,
            0xAC00..=0xD7AF | 0x1100..=0x11FF | 0x3130..=0x318F => Script::Hangul,
            0x3040..=0x30FF | 0x31F0..=0x31FF => Script::Kana,
            0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF => Script::Han,
            _ => return None,
        };
        Some(script)
    }

    /// Scripts written without spaces between words
    pub fn is_unspaced(&self) -> bool {
        matches!(self, Script::Thai | Script::Han | Script::Kana)
    }

    /// Japanese mixes Han and Kana, so the two count as one writing system
    pub fn compatible_with(&self, other: Script) -> bool {
        let cjk = |s: Script| matches!(s, Script::Han | Script::Kana);
        *self == other || (cjk(*self) && cjk(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectedLanguage {
    pub code: &'static str,
    pub name: &'static str,
    pub script: Script,
}

impl DetectedLanguage {
    const fn new(code: &'static str, name: &'static str, script: Script) -> Self {
        Self { code, name, script }
    }

    pub const UNKNOWN: DetectedLanguage = DetectedLanguage::new("und", "Unknown", Script::Unknown);
}

const KNOWN_LANGUAGES: &[DetectedLanguage] = &[
    DetectedLanguage::new("en", "English", Script::Latin),
    DetectedLanguage::new("es", "Spanish", Script::Latin),
    DetectedLanguage::new("fr", "French", Script::Latin),
    DetectedLanguage::new("de", "German", Script::Latin),
    DetectedLanguage::new("pt", "Portuguese", Script::Latin),
    DetectedLanguage::new("it", "Italian", Script::Latin),
    DetectedLanguage::new("nl", "Dutch", Script::Latin),
    DetectedLanguage::new("ne", "Nepali", Script::Devanagari),
    DetectedLanguage::new("hi", "Hindi", Script::Devanagari),
    DetectedLanguage::new("mr", "Marathi", Script::Devanagari),
    DetectedLanguage::new("bn", "Bengali", Script::Bengali),
    DetectedLanguage::new("ar", "Arabic", Script::Arabic),
    DetectedLanguage::new("ur", "Urdu", Script::Arabic),
    DetectedLanguage::new("fa", "Persian", Script::Arabic),
    DetectedLanguage::new("ru", "Russian", Script::Cyrillic),
    DetectedLanguage::new("uk", "Ukrainian", Script::Cyrillic),
    DetectedLanguage::new("el", "Greek", Script::Greek),
    DetectedLanguage::new("he", "Hebrew", Script::Hebrew),
    DetectedLanguage::new("th", "Thai", Script::Thai),
    DetectedLanguage::new("ko", "Korean", Script::Hangul),
    DetectedLanguage::new("ja", "Japanese", Script::Kana),
    DetectedLanguage::new("zh", "Chinese", Script::Han),
];

fn by_code(code: &str) -> DetectedLanguage {
    KNOWN_LANGUAGES
        .iter()
        .copied()
        .find(|l| l.code == code)
        .unwrap_or(DetectedLanguage::UNKNOWN)
}

/// Resolve a Whisper language hint, which is either an ISO code or an English name
pub fn lookup_language(hint: &str) -> Option<DetectedLanguage> {
    let hint = hint.trim().to_lowercase();
    KNOWN_LANGUAGES
        .iter()
        .copied()
        .find(|l| l.code == hint || l.name.to_lowercase() == hint)
}

const NEPALI_MARKERS: &[&str] = &["छ", "छु", "हो", "मेरो", "तपाईं", "तपाई", "गर्नु", "भयो", "छैन", "हुन्छ"];
const HINDI_MARKERS: &[&str] = &["है", "हूँ", "मेरा", "मेरी", "आप", "नहीं", "क्या", "हैं", "था", "रहा"];
const MARATHI_MARKERS: &[&str] = &["आहे", "आहेत", "माझे", "माझा", "मी", "नाही", "काय", "होते"];

const ENGLISH_WORDS: &[&str] = &[
    "the", "and", "is", "i", "my", "to", "a", "of", "you", "it", "not", "am", "have", "need", "help", "want",
];
const SPANISH_WORDS: &[&str] = &[
    "el", "la", "de", "que", "y", "es", "por", "para", "estoy", "mi", "con", "muy", "necesito", "quiero",
];
const FRENCH_WORDS: &[&str] = &[
    "le", "la", "les", "et", "est", "je", "suis", "pas", "avec", "mon", "ne", "vous", "besoin", "veux",
];
const GERMAN_WORDS: &[&str] = &[
    "der", "die", "das", "und", "ist", "ich", "nicht", "mit", "mein", "bin", "brauche", "möchte",
];
const PORTUGUESE_WORDS: &[&str] = &[
    "não", "eu", "estou", "com", "meu", "você", "é", "uma", "muito", "preciso", "quero",
];

fn count_markers(tokens: &[&str], markers: &[&str]) -> usize {
    tokens.iter().filter(|t| markers.contains(*t)).count()
}

fn word_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '\''))
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && !is_combining_mark(c)))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Devanagari vowel signs and viramas are not alphanumeric but belong to the word
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0900..=0x0903 | 0x093A..=0x094F | 0x0951..=0x0957 | 0x0962..=0x0963)
}

fn devanagari_language(tokens: &[&str]) -> DetectedLanguage {
    let nepali = count_markers(tokens, NEPALI_MARKERS);
    let hindi = count_markers(tokens, HINDI_MARKERS);
    let marathi = count_markers(tokens, MARATHI_MARKERS);

    if nepali > hindi && nepali >= marathi {
        by_code("ne")
    } else if marathi > hindi && marathi > nepali {
        by_code("mr")
    } else {
        by_code("hi")
    }
}

fn latin_language(text: &str, tokens: &[&str]) -> DetectedLanguage {
    let lower = text.to_lowercase();
    let has_any = |chars: &[char]| lower.chars().any(|c| chars.contains(&c));

    let mut scores = [
        ("en", count_markers(tokens, ENGLISH_WORDS)),
        ("es", count_markers(tokens, SPANISH_WORDS)),
        ("fr", count_markers(tokens, FRENCH_WORDS)),
        ("de", count_markers(tokens, GERMAN_WORDS)),
        ("pt", count_markers(tokens, PORTUGUESE_WORDS)),
    ];
    if has_any(&['ñ', '¿', '¡']) {
        scores[1].1 += 3;
    }
    if has_any(&['è', 'ê', 'à', 'ù', 'î', 'ç', 'œ']) {
        scores[2].1 += 2;
    }
    if has_any(&['ß', 'ä', 'ö', 'ü']) {
        scores[3].1 += 3;
    }
    if has_any(&['ã', 'õ']) {
        scores[4].1 += 3;
    }

    // English wins ties, including the no-signal case
    let mut best = scores[0];
    for candidate in &scores[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }
    by_code(best.0)
}

/// Guess the language of `text` from the characters it is written in
pub fn detect_language(text: &str) -> DetectedLanguage {
    let mut counts: BTreeMap<Script, usize> = BTreeMap::new();
    for c in text.chars() {
        if let Some(script) = Script::of(c) {
            *counts.entry(script).or_default() += 1;
        }
    }

    let Some((&dominant, _)) = counts.iter().max_by_key(|(script, count)| (**count, Reverse(**script))) else {
        return DetectedLanguage::UNKNOWN;
    };

    let owned = word_tokens(text);
    let tokens: Vec<&str> = owned.iter().map(String::as_str).collect();

    match dominant {
        Script::Latin => latin_language(text, &tokens),
        Script::Devanagari => devanagari_language(&tokens),
        Script::Bengali => by_code("bn"),
        Script::Arabic => by_code("ar"),
        Script::Cyrillic => by_code("ru"),
        Script::Greek => by_code("el"),
        Script::Hebrew => by_code("he"),
        Script::Thai => by_code("th"),
        Script::Hangul => by_code("ko"),
        Script::Kana => by_code("ja"),
        Script::Han if counts.contains_key(&Script::Kana) => by_code("ja"),
        Script::Han => by_code("zh"),
        Script::Unknown => DetectedLanguage::UNKNOWN,
    }
}

/// Combine text detection with the transcriber's own guess.
/// The hint wins when it is written in the script actually found in the text.
pub fn resolve_language(text: &str, hint: Option<&str>) -> DetectedLanguage {
    let detected = detect_language(text);
    let Some(hinted) = hint.and_then(lookup_language) else {
        return detected;
    };

    if detected.script == Script::Unknown || hinted.script.compatible_with(detected.script) {
        hinted
    } else {
        detected
    }
}

fn fixed_label() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?im)^\s*fixed\b[^:\n]{0,40}:").expect("valid label pattern"))
}

fn original_label() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^\s*original\s*:\s*").expect("valid label pattern"))
}

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('\u{201C}', '\u{201D}'),
    ('\u{2018}', '\u{2019}'),
    ('\u{00AB}', '\u{00BB}'),
    ('\u{201E}', '\u{201C}'),
];

fn strip_wrapping_quotes(text: &str) -> &str {
    let mut current = text.trim();
    loop {
        let mut chars = current.chars();
        let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
            return current;
        };
        if !QUOTE_PAIRS.contains(&(first, last)) {
            return current;
        }
        current = current[first.len_utf8()..current.len() - last.len_utf8()].trim();
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean a transcript down to the words that should be spoken
pub fn sanitize_transcript(text: &str) -> String {
    let unquoted = strip_wrapping_quotes(text);
    let filtered = tts_filter(unquoted, SpeechFilter::default());
    let collapsed = collapse_whitespace(&filtered);
    strip_wrapping_quotes(&collapsed).to_string()
}

/// Clean a model reply: drop echoed "Fixed…:" and "Original:" labels, then sanitize
pub fn sanitize_reply(text: &str) -> String {
    let mut current = text.trim();

    if let Some(last) = fixed_label().find_iter(current).last() {
        current = &current[last.end()..];
    }
    if let Some(label) = original_label().find(current) {
        current = &current[label.end()..];
    }

    sanitize_transcript(current)
}

/// Units compared by the over-edit check: words, or characters for unspaced scripts
pub fn comparison_units(text: &str, script: Script) -> Vec<String> {
    if script.is_unspaced() {
        text.chars()
            .filter(|c| !c.is_whitespace() && Script::of(*c).is_some())
            .map(|c| c.to_string())
            .collect()
    } else {
        text.split_whitespace()
            .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation()).to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}
