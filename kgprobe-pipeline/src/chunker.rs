#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub index: usize,
}

/// Split plain text into paragraph chunks of at most `max_chars` characters.
///
/// Paragraphs are separated by blank lines. Paragraphs longer than the limit
/// are cut at sentence ends where possible; short neighbours are merged.
pub fn chunk_text(input: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();

    for paragraph in paragraphs(input) {
        if paragraph.chars().count() <= max_chars {
            pieces.push(paragraph);
        } else {
            pieces.extend(split_long(&paragraph, max_chars));
        }
    }

    merge_small_pieces(pieces, max_chars / 4, max_chars)
        .into_iter()
        .enumerate()
        .map(|(index, content)| Chunk { content, index })
        .collect()
}

fn paragraphs(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in input.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join(" ").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        out.push(current.join(" ").trim().to_string());
    }

    out.retain(|p| !p.is_empty());
    out
}

fn split_long(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for sentence in sentences(paragraph) {
        let candidate_len = current.chars().count() + sentence.chars().count() + 1;
        if !current.is_empty() && candidate_len > max_chars {
            out.push(std::mem::take(&mut current));
        }
        if sentence.chars().count() > max_chars {
            // No sentence boundary to use; hard cut on char boundaries
            let chars: Vec<char> = sentence.chars().collect();
            for window in chars.chunks(max_chars) {
                out.push(window.iter().collect::<String>().trim().to_string());
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        out.push(current);
    }

    out.retain(|p| !p.is_empty());
    out
}

fn sentences(paragraph: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = paragraph.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        let at_end = matches!(b, b'.' | b'!' | b'?')
            && bytes.get(i + 1).is_none_or(|next| next.is_ascii_whitespace());
        if at_end {
            let sentence = paragraph[start..=i].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = i + 1;
        }
    }
    let rest = paragraph[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

fn merge_small_pieces(pieces: Vec<String>, min_chars: usize, max_chars: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();

    for piece in pieces {
        match merged.last_mut() {
            Some(last)
                if last.chars().count() < min_chars
                    && last.chars().count() + piece.chars().count() + 2 <= max_chars =>
            {
                last.push_str("\n\n");
                last.push_str(&piece);
            }
            _ => merged.push(piece),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("MiniMax is a language model provider.", 1000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "MiniMax is a language model provider.");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn blank_input_has_no_chunks() {
        assert!(chunk_text("  \n\n \n", 1000).is_empty());
    }

    #[test]
    fn small_paragraphs_are_merged() {
        let text = "First.\n\nSecond.\n\nThird.";
        let chunks = chunk_text(text, 100);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("First."));
        assert!(chunks[0].content.contains("Third."));
    }

    #[test]
    fn long_paragraph_splits_on_sentences() {
        let sentence = "This sentence is exactly long enough to matter here.";
        let text = std::iter::repeat_n(sentence, 6).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 120);

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 120, "{}", chunk.content);
            assert!(chunk.content.ends_with('.'));
        }
        let indexes: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indexes, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn unbroken_text_is_hard_cut() {
        let text = "x".repeat(250);
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].content.len(), 50);
    }
}
