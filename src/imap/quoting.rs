use std::borrow::Cow;

fn is_atom_special(c: char) -> bool {
    matches!(c, '(' | ')' | '{' | ' ' | '%' | '*' | '"' | '\\') || c.is_control() || !c.is_ascii()
}

/// Renders `value` as an IMAP quoted string, escaping `"` and `\`.
pub fn quoted(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Renders `value` as an IMAP astring: bare when it is a valid atom, quoted otherwise.
pub fn astring(value: &str) -> Cow<'_, str> {
    if value.is_empty() || value.chars().any(is_atom_special) {
        Cow::Owned(quoted(value))
    } else {
        Cow::Borrowed(value)
    }
}
