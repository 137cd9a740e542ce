//! Doc comment formatting shared by the generators.

use std::fmt::Write;

use wasmapi_types::Lines;

use crate::error::CodegenResult;

/// Greedy word wrap of one paragraph at `width` columns.
///
/// Words longer than `width` get a line of their own. Empty input yields a
/// single empty line so blank doc lines survive.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    lines.push(line);
    lines
}

/// Wrap every line of `doc` so that `prefix` plus text fits in `width`.
pub fn wrapped_lines(doc: &Lines, prefix_len: usize, width: usize) -> Vec<String> {
    let avail = width.saturating_sub(prefix_len).max(16);
    doc.lines().into_iter().flat_map(|l| wrap(l, avail)).collect()
}

/// Block comment in the `/** ... */` style used by TypeScript and C.
pub fn block_comment(out: &mut String, doc: &Lines, indent: &str, width: usize) -> CodegenResult<()> {
    writeln!(out, "{indent}/**")?;
    for line in wrapped_lines(doc, indent.len() + 3, width) {
        if line.is_empty() {
            writeln!(out, "{indent} *")?;
        } else {
            writeln!(out, "{indent} * {line}")?;
        }
    }
    writeln!(out, "{indent} */")?;
    Ok(())
}

/// Line comments with the given marker (`///`, `//`).
pub fn line_comment(out: &mut String, doc: &Lines, indent: &str, marker: &str, width: usize) -> CodegenResult<()> {
    for line in wrapped_lines(doc, indent.len() + marker.len() + 1, width) {
        if line.is_empty() {
            writeln!(out, "{indent}{marker}")?;
        } else {
            writeln!(out, "{indent}{marker} {line}")?;
        }
    }
    Ok(())
}
