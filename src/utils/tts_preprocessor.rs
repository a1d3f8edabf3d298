/// Which annotations to drop before text reaches the synthesizer.
///
/// Whisper marks non-speech as `[BLANK_AUDIO]`, `(inaudible)` or `*coughs*`; the
/// chat model occasionally echoes the same markers back.
#[derive(Debug, Clone, Copy)]
pub struct SpeechFilter {
    pub ignore_brackets: bool,
    pub ignore_parentheses: bool,
    pub ignore_asterisks: bool,
    pub ignore_angle_brackets: bool,
}

impl Default for SpeechFilter {
    fn default() -> Self {
        Self {
            ignore_brackets: true,
            ignore_parentheses: true,
            ignore_asterisks: true,
            ignore_angle_brackets: true,
        }
    }
}

/// Strip stage directions and markup from `text`, keeping the spoken words
pub fn tts_filter(text: &str, filter: SpeechFilter) -> String {
    let mut result = text.to_string();

    if filter.ignore_asterisks {
        result = strip_enclosed(&result, '*', '*');
    }
    if filter.ignore_brackets {
        result = strip_enclosed(&result, '[', ']');
    }
    if filter.ignore_parentheses {
        result = strip_enclosed(&result, '(', ')');
    }
    if filter.ignore_angle_brackets {
        result = strip_enclosed(&result, '<', '>');
    }

    result
}

/// Remove every `open ... close` span. Unterminated spans are kept verbatim.
fn strip_enclosed(text: &str, open: char, close: char) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending = String::new();
    let mut depth = 0usize;

    for ch in text.chars() {
        if depth > 0 {
            pending.push(ch);
            if ch == close {
                depth -= 1;
                if depth == 0 {
                    pending.clear();
                }
            } else if ch == open && open != close {
                depth += 1;
            }
        } else if ch == open {
            depth = 1;
            pending.push(ch);
        } else {
            result.push(ch);
        }
    }

    result.push_str(&pending);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_transcription_markers() {
        let out = tts_filter("I [BLANK_AUDIO] want (inaudible) water *coughs*", SpeechFilter::default());
        assert_eq!(out.split_whitespace().collect::<Vec<_>>(), vec!["I", "want", "water"]);
    }

    #[test]
    fn nested_spans_are_removed_whole() {
        assert_eq!(strip_enclosed("a (b (c) d) e", '(', ')'), "a  e");
    }

    #[test]
    fn unterminated_span_is_kept() {
        assert_eq!(strip_enclosed("call 5 (five", '(', ')'), "call 5 (five");
        assert_eq!(strip_enclosed("rate 5*", '*', '*'), "rate 5*");
    }

    #[test]
    fn disabled_filters_leave_text_alone() {
        let filter = SpeechFilter {
            ignore_brackets: false,
            ignore_parentheses: false,
            ignore_asterisks: false,
            ignore_angle_brackets: false,
        };
        assert_eq!(tts_filter("keep [this] (too)", filter), "keep [this] (too)");
    }
}
