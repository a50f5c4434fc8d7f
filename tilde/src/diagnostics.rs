use crate::error::Error;

/// Formats `err` followed by the offending source line.
pub fn render_error(source: &str, err: &Error) -> String {
    let mut out = err.to_string();
    let line = err.line();
    if let Some(line_text) = source_line(source, line) {
        let indent: String = line_text
            .chars()
            .take_while(|ch| ch.is_whitespace())
            .collect();
        out.push_str(&format!("\n  |\n{line:>3} | {line_text}\n  | {indent}^"));
    }
    out
}

fn source_line(source: &str, line: usize) -> Option<&str> {
    let line_text = source.lines().nth(line.checked_sub(1)?)?;
    (!line_text.trim().is_empty()).then_some(line_text)
}
