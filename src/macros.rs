//! Character classification predicates shared by the reader, scanner, and
//! presenter. These operate on decoded `char`s rather than raw bytes, since
//! the reader has already transcoded the input to UTF-8 by the time the
//! scanner sees it.

pub(crate) fn is_alpha(ch: impl Into<Option<char>>) -> bool {
    let Some(ch) = ch.into() else {
        return false;
    };
    ch.is_ascii_digit() || ch.is_ascii_alphabetic() || ch == '_' || ch == '-'
}

pub(crate) fn is_ascii(ch: char) -> bool {
    ch.is_ascii()
}

pub(crate) fn is_digit(ch: impl Into<Option<char>>) -> bool {
    ch.into().map(|ch| ch.is_ascii_digit()).unwrap_or(false)
}

pub(crate) fn is_hex(ch: impl Into<Option<char>>) -> bool {
    ch.into().map(|ch| ch.is_ascii_hexdigit()).unwrap_or(false)
}

/// Is this character printable per the YAML 1.2 `nb-char` production.
pub(crate) fn is_printable(ch: char) -> bool {
    match ch {
        '\u{feff}' | '\u{fffe}' | '\u{ffff}' => false,
        '\x09'
        | '\x0a'
        | '\x20'..='\x7e'
        | '\u{00a0}'..='\u{00bf}'
        | '\u{00c0}'..='\u{cfff}'
        | '\u{d000}'..='\u{d7ff}'
        | '\u{e000}'..='\u{efff}'
        | '\u{f000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}' => true,
        _ => false,
    }
}

pub(crate) fn is_bom(ch: char) -> bool {
    ch == '\u{feff}'
}

pub(crate) fn is_space(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some(' ')
}

pub(crate) fn is_tab(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some('\t')
}

pub(crate) fn is_blank(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_space(ch) || is_tab(ch)
}

pub(crate) fn is_blankz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_blank(ch) || is_breakz(ch)
}

/// YAML line-break characters: CR, LF, NEL, LS, PS. Scanning normalizes all
/// of these (and CRLF) to a single logical break.
pub(crate) fn is_break(ch: impl Into<Option<char>>) -> bool {
    matches!(
        ch.into(),
        Some('\r' | '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}')
    )
}

pub(crate) fn is_breakz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    ch.is_none() || is_break(ch)
}

pub(crate) fn vecdeque_starts_with<T: PartialEq + Copy>(
    vec: &std::collections::VecDeque<T>,
    needle: &[T],
) -> bool {
    let (head, tail) = vec.as_slices();
    if head.len() >= needle.len() {
        head.starts_with(needle)
    } else {
        head.iter()
            .chain(tail.iter())
            .copied()
            .take(needle.len())
            .eq(needle.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_normalization_classes() {
        assert!(is_break(Some('\n')));
        assert!(is_break(Some('\r')));
        assert!(is_break(Some('\u{0085}')));
        assert!(!is_break(Some('a')));
        assert!(is_breakz(None));
    }

    #[test]
    fn bom_is_only_feff() {
        assert!(is_bom('\u{feff}'));
        assert!(!is_bom('\u{7eff}'));
    }

    #[test]
    fn vecdeque_prefix_match_spans_both_slices() {
        let mut dq = std::collections::VecDeque::new();
        dq.push_back('-');
        dq.push_back('-');
        dq.push_back('-');
        dq.push_front('x');
        dq.pop_front();
        assert!(vecdeque_starts_with(&dq, &['-', '-', '-']));
        assert!(!vecdeque_starts_with(&dq, &['-', '-', '-', '-']));
    }
}
