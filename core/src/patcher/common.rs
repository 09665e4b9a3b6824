/// Leading spaces and tabs of `line`.
pub fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// One indentation level in the style of `indent` (tab if it contains one).
pub fn indent_unit(indent: &str) -> &'static str {
    if indent.contains('\t') {
        "\t"
    } else {
        "    "
    }
}

/// Indentation of the last non-blank line of `block`, if it is indented.
pub(crate) fn last_line_indent(block: &str) -> Option<&str> {
    block
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(leading_whitespace)
        .filter(|indent| !indent.is_empty())
}

/// Replaces the indentation of every indented, non-blank line with `indent`.
///
/// Lines without indentation and blank lines are kept as they are.
pub fn adjust_indentation(code: &str, indent: &str) -> String {
    code.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                return line.to_string();
            }
            let ws = leading_whitespace(line);
            if ws.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", indent, &line[ws.len()..])
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
