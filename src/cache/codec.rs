//! Canonical text encoding of id lists stored in scalar columns.
//!
//! Lists are written the way the first version of the app wrote them:
//! `['id1', 'id2']`, with `[]` for the empty list. Items containing a single
//! quote are wrapped in double quotes instead, and backslashes or the active
//! quote character are escaped, so genre names like `children's music`
//! survive the round trip.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot decode list '{input}': {reason}")]
pub struct DecodeError {
    pub input: String,
    pub reason: &'static str,
}

impl DecodeError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

pub fn encode_list<T: AsRef<str>>(items: &[T]) -> String {
    let mut out = String::from("[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_quoted(&mut out, item.as_ref());
    }
    out.push(']');
    out
}

fn push_quoted(out: &mut String, item: &str) {
    let quote = if item.contains('\'') && !item.contains('"') {
        '"'
    } else {
        '\''
    };
    out.push(quote);
    for c in item.chars() {
        if c == '\\' || c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(quote);
}

pub fn decode_list(text: &str) -> Result<Vec<String>, DecodeError> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| DecodeError::new(text, "missing brackets"))?;

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(_) => return Err(DecodeError::new(text, "expected a quoted item")),
        };

        let mut item = String::new();
        loop {
            match chars.next() {
                None => return Err(DecodeError::new(text, "unterminated item")),
                Some('\\') => match chars.next() {
                    Some(c) => item.push(c),
                    None => return Err(DecodeError::new(text, "dangling escape")),
                },
                Some(c) if c == quote => break,
                Some(c) => item.push(c),
            }
        }
        items.push(item);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return Err(DecodeError::new(text, "expected ', ' between items")),
        }
    }

    Ok(items)
}
