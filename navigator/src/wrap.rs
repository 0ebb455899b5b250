use textwrap::Options;
use textwrap::WordSplitter;
use textwrap::core::display_width;

/// One display row of wrapped text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedLine {
    pub text: String,
    /// Index of the source line this row belongs to.
    pub logical: usize,
    /// Byte offset of `text` inside its source line.
    pub offset: usize,
}

impl AsRef<str> for WrappedLine {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Wraps every line of `text` at `width` columns. A width of 0 disables
/// wrapping.
pub fn word_wrap(text: &str, width: usize) -> Vec<String> {
    layout(text, width).into_iter().map(|line| line.text).collect()
}

/// Like [`word_wrap`], but remembers where each row came from.
///
/// The first row of a source line keeps its indentation; continuation rows
/// start at column 0 so the highlight engine can tell them apart from
/// nested entries.
pub fn layout(text: &str, width: usize) -> Vec<WrappedLine> {
    let mut rows = Vec::new();
    for (logical, source) in text.lines().enumerate() {
        if width == 0 || display_width(source) <= width {
            rows.push(WrappedLine {
                text: source.to_string(),
                logical,
                offset: 0,
            });
            continue;
        }

        let options = Options::new(width)
            .word_splitter(WordSplitter::NoHyphenation)
            .break_words(true);
        let mut cursor = 0;
        for segment in textwrap::wrap(source, options) {
            let offset = source[cursor..]
                .find(segment.as_ref())
                .map_or(cursor, |found| cursor + found);
            cursor = offset + segment.len();
            rows.push(WrappedLine {
                text: segment.into_owned(),
                logical,
                offset,
            });
        }
    }
    rows
}

/// Source lines `rows` cover, rebuilt from the original text so that
/// whitespace dropped at wrap points is restored.
pub fn source_slice(text: &str, rows: &[WrappedLine]) -> String {
    let sources: Vec<&str> = text.lines().collect();
    let mut pieces: Vec<&str> = Vec::new();
    let mut span: Option<(usize, usize, usize)> = None;

    for row in rows {
        let end = row.offset + row.text.len();
        span = match span {
            Some((logical, start, _)) if logical == row.logical => Some((logical, start, end)),
            previous => {
                push_span(&sources, previous, &mut pieces);
                Some((row.logical, row.offset, end))
            }
        };
    }
    push_span(&sources, span, &mut pieces);
    pieces.join("\n")
}

fn push_span<'a>(
    sources: &[&'a str],
    span: Option<(usize, usize, usize)>,
    pieces: &mut Vec<&'a str>,
) {
    if let Some((logical, start, end)) = span
        && let Some(piece) = sources.get(logical).and_then(|line| line.get(start..end))
    {
        pieces.push(piece);
    }
}
