/// What the text left of the cursor says about the completion wanted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CursorText {
    /// Identifier characters typed so far.
    pub prefix: String,
    /// Expression before a `.` directly preceding the prefix.
    pub receiver: Option<String>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn trailing_ident(text: &str) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map_or(text.len(), |(i, _)| i);
    &text[start..]
}

/// Inspect the line containing the cursor. `line` and `column` are 1-based,
/// the column counting bytes.
pub(crate) fn cursor_text(text: &str, line: u32, column: u32) -> CursorText {
    let Some(current) = text.lines().nth(line.saturating_sub(1) as usize) else {
        return CursorText::default();
    };
    let mut end = (column.saturating_sub(1) as usize).min(current.len());
    while !current.is_char_boundary(end) {
        end -= 1;
    }
    let before = &current[..end];

    let prefix = trailing_ident(before);
    let rest = &before[..before.len() - prefix.len()];
    let receiver = rest
        .strip_suffix('.')
        .map(trailing_ident)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    CursorText {
        prefix: prefix.to_string(),
        receiver,
    }
}
