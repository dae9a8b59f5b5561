//! Fitting outbound text into IRC lines.

/// Turn rendered text into PRIVMSG payloads of at most `max_bytes` each.
///
/// IRC lines cannot carry CR, LF or NUL, so every CR- or LF-separated
/// line becomes at least one payload and NUL bytes are removed; blank lines
/// are dropped. Long lines are wrapped at spaces where possible and never
/// inside a UTF-8 character.
pub fn split_for_irc(text: &str, max_bytes: usize) -> Vec<String> {
    let max_bytes = max_bytes.max(4);

    text.split(['\r', '\n'])
        .map(|line| line.replace('\0', ""))
        .filter(|line| !line.trim().is_empty())
        .flat_map(|line| wrap_line(&line, max_bytes))
        .collect()
}

fn wrap_line(line: &str, max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in line.split(' ') {
        let needed = if current.is_empty() { word.len() } else { current.len() + 1 + word.len() };
        if needed <= max_bytes {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        // A single word longer than a line is cut at char boundaries.
        let mut rest = word;
        while rest.len() > max_bytes {
            let mut cut = max_bytes;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            chunks.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        current.push_str(rest);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(split_for_irc("<bob> hi there", 400), vec!["<bob> hi there"]);
    }

    #[test]
    fn test_newlines_become_lines() {
        let lines = split_for_irc("<alice> first\n\nsecond\r\nthird", 400);
        assert_eq!(lines, vec!["<alice> first", "second", "third"]);
    }

    #[test]
    fn test_bare_carriage_return_splits() {
        let lines = split_for_irc("line one\rline two\r\n", 400);
        assert_eq!(lines, vec!["line one", "line two"]);
        assert!(lines.iter().all(|l| !l.contains(['\r', '\n'])));
    }

    #[test]
    fn test_nul_bytes_removed() {
        assert_eq!(split_for_irc("a\0b\n\0", 400), vec!["ab"]);
    }

    #[test]
    fn test_wraps_on_spaces() {
        let lines = split_for_irc("aaaa bbbb cccc", 9);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc"]);
        assert!(lines.iter().all(|l| l.len() <= 9));
    }

    #[test]
    fn test_long_word_cut_on_char_boundary() {
        let lines = split_for_irc("ééééé", 5);
        assert_eq!(lines, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(split_for_irc(" \n \n", 100).is_empty());
    }
}
