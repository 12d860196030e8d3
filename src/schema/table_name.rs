//! Qualified table names and the command-text fallback scan.
//!
//! Some drivers do not report base table names. For single-table commands
//! the name can be recovered from the command text itself.

/// A `[[catalog.]schema.]table` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTableName {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    /// Table name without quotes.
    pub table: String,
    /// Table name as written, quotes included.
    pub quoted_table: String,
}

impl QualifiedTableName {
    /// A bare table name as reported by the driver.
    pub fn from_table(table: &str, quote: char) -> Self {
        Self {
            catalog: None,
            schema: None,
            table: unquote(table, quote).to_string(),
            quoted_table: quoted(table, quote),
        }
    }

    /// Parse a possibly qualified, possibly quoted name.
    ///
    /// Returns `None` for an empty name or more than three parts.
    pub fn parse(name: &str, quote: char) -> Option<Self> {
        let parts = split_qualified(name, quote);
        let (catalog, schema, table) = match parts.as_slice() {
            [table] => (None, None, *table),
            [schema, table] => (None, Some(*schema), *table),
            [catalog, schema, table] => (Some(*catalog), Some(*schema), *table),
            _ => return None,
        };
        let table_name = unquote(table, quote);
        if table_name.is_empty() {
            return None;
        }
        let part = |s: Option<&str>| s.map(|s| unquote(s, quote).to_string()).filter(|s| !s.is_empty());
        Some(Self {
            catalog: part(catalog),
            schema: part(schema),
            table: table_name.to_string(),
            quoted_table: quoted(table, quote),
        })
    }

    /// The table name, quoted or not.
    pub fn table(&self, quoted: bool) -> &str {
        if quoted {
            &self.quoted_table
        } else {
            &self.table
        }
    }
}

fn unquote(s: &str, quote: char) -> &str {
    s.strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .unwrap_or(s)
}

fn quoted(s: &str, quote: char) -> String {
    if s.starts_with(quote) {
        s.to_string()
    } else {
        format!("{quote}{s}{quote}")
    }
}

fn split_qualified(name: &str, quote: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in name.char_indices() {
        if c == quote {
            in_quote = !in_quote;
        } else if c == '.' && !in_quote {
            parts.push(name[start..i].trim());
            start = i + 1;
        }
    }
    parts.push(name[start..].trim());
    parts
}

/// Split command text into words and punctuation.
///
/// Quoted identifiers stay in one token together with any qualifying dots.
/// Commas and parentheses are tokens of their own.
pub(crate) fn tokenize(text: &str, quote: char) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        if in_quote {
            if c == quote {
                in_quote = false;
            }
            continue;
        }
        if c == quote {
            in_quote = true;
            start.get_or_insert(i);
        } else if c.is_whitespace() || c == ';' {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
        } else if matches!(c, ',' | '(' | ')') {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
            tokens.push(&text[i..i + 1]);
        } else {
            start.get_or_insert(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

const JOIN_WORDS: [&str; 7] = ["join", "inner", "left", "right", "full", "cross", "natural"];

const CLAUSE_WORDS: [&str; 14] = [
    "where", "order", "group", "having", "union", "set", "values", "on", "with", "limit", "for",
    "option", "output", "select",
];

fn is_word(token: &str, words: &[&str]) -> bool {
    words.iter().any(|w| token.eq_ignore_ascii_case(w))
}

fn is_identifier(token: &str, quote: char) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c == quote || c == '_' || c == '[' || c.is_alphanumeric())
}

/// Extract the single table a command reads or writes.
///
/// Handles `SELECT ... FROM t`, `INSERT [INTO] t`, `UPDATE t` and
/// `DELETE [FROM] t`. Returns `None` when the command is none of those, when
/// the table is a subquery, or when a second table follows (a comma or a
/// join, after an optional alias).
pub fn table_from_command_text(text: &str, quote: char) -> Option<String> {
    let tokens = tokenize(text, quote);
    let first = *tokens.first()?;
    let keyword_at = |i: usize, word: &str| tokens.get(i).is_some_and(|t| t.eq_ignore_ascii_case(word));

    let index = if first.eq_ignore_ascii_case("select") {
        tokens.iter().position(|t| t.eq_ignore_ascii_case("from"))? + 1
    } else if first.eq_ignore_ascii_case("insert") {
        if keyword_at(1, "into") {
            2
        } else {
            1
        }
    } else if first.eq_ignore_ascii_case("update") {
        1
    } else if first.eq_ignore_ascii_case("delete") {
        if keyword_at(1, "from") {
            2
        } else {
            1
        }
    } else {
        return None;
    };

    let table = *tokens.get(index)?;
    if !is_identifier(table, quote) {
        return None;
    }

    let mut rest = tokens[index + 1..].iter().copied();
    let mut next = rest.next();
    match next {
        Some(t) if t.eq_ignore_ascii_case("as") => {
            rest.next();
            next = rest.next();
        }
        Some(t) if is_identifier(t, quote) && !is_word(t, &JOIN_WORDS) && !is_word(t, &CLAUSE_WORDS) => {
            next = rest.next();
        }
        _ => {}
    }
    match next {
        Some(",") => None,
        Some(t) if is_word(t, &JOIN_WORDS) => None,
        _ => Some(table.to_string()),
    }
}
