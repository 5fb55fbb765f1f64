//! ARFF export and import
//!
//! The self-describing text format used to hand a [`FeatureTable`] to an
//! external classifier: a header of attribute declarations followed by one
//! data line per instance. Sparse rows are written as `{index value, ...}`.
//!
//! ```text
//! @relation authorship
//!
//! @attribute title string
//! @attribute 'Words{the}' numeric
//! @attribute author {alice,bob}
//!
//! @data
//! 'doc one',3,alice
//! {0 'doc two',2 bob}
//! ```

use super::{Attribute, AttributeKind, FeatureTable, Row};
use crate::{Error, Result};
use std::path::Path;

/// Write `table` to `path` in ARFF format
///
/// # Errors
/// Returns error if the file cannot be written
pub fn write_arff<P: AsRef<Path>>(path: P, table: &FeatureTable) -> Result<()> {
    std::fs::write(path.as_ref(), table.to_arff_string())?;
    tracing::debug!(
        path = %path.as_ref().display(),
        instances = table.num_instances(),
        "Wrote ARFF file"
    );
    Ok(())
}

/// Read an ARFF file into a table (no class attribute is designated)
///
/// # Errors
/// Returns error if the file cannot be read or is malformed
pub fn read_arff<P: AsRef<Path>>(path: P) -> Result<FeatureTable> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_arff(&content)
}

impl FeatureTable {
    /// Render the table as ARFF text
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_arff_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("@relation {}\n\n", quote(self.relation())));
        for attr in self.attributes() {
            let kind = match attr.kind() {
                AttributeKind::Numeric => "numeric".to_string(),
                AttributeKind::String => "string".to_string(),
                AttributeKind::Nominal(labels) => format!(
                    "{{{}}}",
                    labels.iter().map(|l| quote(l)).collect::<Vec<_>>().join(",")
                ),
            };
            out.push_str(&format!("@attribute {} {kind}\n", quote(attr.name())));
        }
        out.push_str("\n@data\n");

        let string_columns: Vec<usize> = self
            .attributes()
            .iter()
            .enumerate()
            .filter(|(_, a)| matches!(a.kind(), AttributeKind::String))
            .map(|(i, _)| i)
            .collect();

        for (row_index, row) in self.rows().iter().enumerate() {
            let cell = |col: usize| -> String {
                let value = row.value(col);
                if value.is_nan() {
                    return "?".to_string();
                }
                match self.attributes()[col].kind() {
                    AttributeKind::Numeric => value.to_string(),
                    AttributeKind::Nominal(labels) => labels
                        .get(value as usize)
                        .map_or_else(|| "?".to_string(), |l| quote(l)),
                    AttributeKind::String => self
                        .string_value(row_index, col)
                        .map_or_else(|| "?".to_string(), quote),
                }
            };
            match row {
                Row::Dense(_) => {
                    let cells: Vec<String> = (0..self.num_attributes()).map(cell).collect();
                    out.push_str(&cells.join(","));
                }
                Row::Sparse(entries) => {
                    // String cells are pool indices; index 0 must still be written.
                    let mut columns: Vec<usize> = entries.iter().map(|&(col, _)| col).collect();
                    columns.extend(string_columns.iter().copied());
                    columns.sort_unstable();
                    columns.dedup();
                    let cells: Vec<String> = columns
                        .into_iter()
                        .map(|col| format!("{col} {}", cell(col)))
                        .collect();
                    out.push_str(&format!("{{{}}}", cells.join(",")));
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Parse ARFF text into a table (no class attribute is designated)
///
/// # Errors
/// Returns [`Error::ArffParse`] on malformed input
pub fn parse_arff(content: &str) -> Result<FeatureTable> {
    let mut relation: Option<String> = None;
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut table: Option<FeatureTable> = None;

    for (line_index, raw) in content.lines().enumerate() {
        let line_no = line_index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let tokens = tokenize(line, line_no)?;

        if let Some(table) = table.as_mut() {
            let row = parse_row(table, &tokens, line_no)?;
            table
                .push_row(row)
                .map_err(|e| parse_error(line_no, e.to_string()))?;
            continue;
        }

        let keyword = match tokens.first() {
            Some(Token::Word(w)) => w.to_ascii_lowercase(),
            _ => return Err(parse_error(line_no, "expected a header keyword")),
        };
        match keyword.as_str() {
            "@relation" => {
                relation = Some(token_text(tokens.get(1), line_no)?);
            }
            "@attribute" => {
                attributes.push(parse_attribute(&tokens[1..], line_no)?);
            }
            "@data" => {
                let name = relation
                    .take()
                    .ok_or_else(|| parse_error(line_no, "@data before @relation"))?;
                table = Some(FeatureTable::new(name, std::mem::take(&mut attributes)));
            }
            other => {
                return Err(parse_error(line_no, format!("unknown keyword '{other}'")));
            }
        }
    }

    table.ok_or_else(|| parse_error(content.lines().count(), "missing @data section"))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Comma,
    Open,
    Close,
}

fn parse_error(line: usize, message: impl Into<String>) -> Error {
    Error::ArffParse {
        line,
        message: message.into(),
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s == "?"
        || s.chars().any(|c| {
            c.is_whitespace() || matches!(c, ',' | '{' | '}' | '\'' | '"' | '%' | '\\')
        })
}

fn quote(s: &str) -> String {
    if !needs_quotes(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn tokenize(line: &str, line_no: usize) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '{' => {
                chars.next();
                tokens.push(Token::Open);
            }
            '}' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '\'' | '"' => {
                let delimiter = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('r') => text.push('\r'),
                            Some('t') => text.push('\t'),
                            Some(other) => text.push(other),
                            None => return Err(parse_error(line_no, "dangling escape")),
                        },
                        Some(ch) if ch == delimiter => break,
                        Some(ch) => text.push(ch),
                        None => return Err(parse_error(line_no, "unterminated quote")),
                    }
                }
                tokens.push(Token::Quoted(text));
            }
            _ => {
                let mut text = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || matches!(ch, ',' | '{' | '}') {
                        break;
                    }
                    text.push(ch);
                    chars.next();
                }
                tokens.push(Token::Word(text));
            }
        }
    }
    Ok(tokens)
}

fn token_text(token: Option<&Token>, line_no: usize) -> Result<String> {
    match token {
        Some(Token::Word(s) | Token::Quoted(s)) => Ok(s.clone()),
        _ => Err(parse_error(line_no, "expected a name")),
    }
}

fn parse_attribute(tokens: &[Token], line_no: usize) -> Result<Attribute> {
    let name = token_text(tokens.first(), line_no)?;
    match tokens.get(1) {
        Some(Token::Word(kind)) => match kind.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => Ok(Attribute::numeric(name)),
            "string" => Ok(Attribute::string(name)),
            other => Err(parse_error(
                line_no,
                format!("unsupported attribute type '{other}'"),
            )),
        },
        Some(Token::Open) => {
            let mut labels = Vec::new();
            for token in &tokens[2..] {
                match token {
                    Token::Word(l) | Token::Quoted(l) => labels.push(l.clone()),
                    Token::Comma => {}
                    Token::Close => return Ok(Attribute::nominal(name, labels)),
                    Token::Open => return Err(parse_error(line_no, "nested '{'")),
                }
            }
            Err(parse_error(line_no, "unterminated nominal label list"))
        }
        _ => Err(parse_error(line_no, "missing attribute type")),
    }
}

#[allow(clippy::cast_precision_loss)]
fn parse_cell(table: &mut FeatureTable, column: usize, token: &Token, line_no: usize) -> Result<f64> {
    let attr = table
        .attribute(column)
        .ok_or_else(|| parse_error(line_no, format!("attribute index {column} out of range")))?
        .clone();
    if matches!(token, Token::Word(w) if w == "?") {
        return Ok(f64::NAN);
    }
    let text = token_text(Some(token), line_no)?;
    match attr.kind() {
        AttributeKind::Numeric => text
            .parse::<f64>()
            .map_err(|_| parse_error(line_no, format!("'{text}' is not numeric"))),
        AttributeKind::Nominal(_) => attr.label_index(&text).map(|i| i as f64).ok_or_else(|| {
            parse_error(
                line_no,
                format!("'{text}' is not a label of '{}'", attr.name()),
            )
        }),
        AttributeKind::String => Ok(table.intern_string(text)),
    }
}

fn parse_row(table: &mut FeatureTable, tokens: &[Token], line_no: usize) -> Result<Row> {
    if tokens.first() == Some(&Token::Open) {
        if tokens.last() != Some(&Token::Close) {
            return Err(parse_error(line_no, "unterminated sparse row"));
        }
        let mut entries = Vec::new();
        for pair in tokens[1..tokens.len() - 1].split(|t| *t == Token::Comma) {
            if pair.is_empty() {
                continue;
            }
            let [index, value] = pair else {
                return Err(parse_error(line_no, "sparse entry must be 'index value'"));
            };
            let column = token_text(Some(index), line_no)?
                .parse::<usize>()
                .map_err(|_| parse_error(line_no, "sparse index is not an integer"))?;
            entries.push((column, parse_cell(table, column, value, line_no)?));
        }
        return Ok(Row::Sparse(entries));
    }

    let cells: Vec<&Token> = tokens.iter().filter(|t| **t != Token::Comma).collect();
    if cells.len() != table.num_attributes() {
        return Err(parse_error(
            line_no,
            format!(
                "expected {} values, found {}",
                table.num_attributes(),
                cells.len()
            ),
        ));
    }
    let mut values = Vec::with_capacity(cells.len());
    for (column, token) in cells.into_iter().enumerate() {
        values.push(parse_cell(table, column, token, line_no)?);
    }
    Ok(Row::Dense(values))
}
