//! Tiny line-oriented textual front end for `execute_update_text`.
//!
//! This is **not** a SPARQL parser — the real SPARQL 1.1 update
//! parser/translator is out of scope (see crate docs); it is assumed to
//! produce the same statement-level calls this module's output feeds into.
//! This dialect exists so `Engine::execute_update_text` and the CLI demo
//! have something to parse without pulling in a real SPARQL grammar.
//!
//! Grammar, one statement per non-blank, non-comment line:
//!
//! ```text
//! GRAPH <uri>                      -- sets the graph for following lines
//! INSERT subject predicate object
//! DELETE subject predicate object
//! ```
//!
//! `subject`/`predicate` are bare tokens (a blank-node label starts with
//! `:`; compact or absolute URIs are otherwise written bare, e.g.
//! `nie:title` or `http://example.com/a`). `object` is either a quoted
//! string literal (`"..."`), an angle-bracketed URI (`<...>`), or a bare
//! token — bare objects are auto-dispatched against the ontology datatype,
//! exactly like `insert_statement`'s own dispatch.

use crate::error::{EngineError, Result};

/// Insert or delete, mirroring the statement API's two mutating entry points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Insert,
    Delete,
}

/// One parsed line.
#[derive(Clone, Debug)]
pub struct ParsedStatement {
    pub op: Op,
    pub graph: Option<String>,
    pub subject: String,
    pub predicate: String,
    pub object: ObjectToken,
}

/// An object token's surface form, before ontology-driven dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectToken {
    /// Angle-bracketed: always a URI, routed through `_with_uri`.
    Uri(String),
    /// Quoted: always a literal, routed through `_with_string`.
    String(String),
    /// Bare: dispatch decides, exactly like `insert_statement`.
    Bare(String),
}

/// Parses `text` into a sequence of statements. Errors map to
/// [`EngineError::Constraint`] — the taxonomy has no dedicated "parse error"
/// kind, and a malformed update is a caller-input violation in the same
/// sense as other `Constraint` failures.
pub fn parse(text: &str) -> Result<Vec<ParsedStatement>> {
    let mut statements = Vec::new();
    let mut graph: Option<String> = None;
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("GRAPH ") {
            graph = Some(parse_uri(rest.trim(), lineno)?);
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let op = match parts.next() {
            Some("INSERT") => Op::Insert,
            Some("DELETE") => Op::Delete,
            _ => return Err(malformed(lineno, "expected INSERT or DELETE")),
        };
        let rest = parts
            .next()
            .ok_or_else(|| malformed(lineno, "missing statement body"))?;
        let tokens = tokenize(rest, lineno)?;
        if tokens.len() != 3 {
            return Err(malformed(lineno, "expected subject predicate object"));
        }
        let object = classify_object(&tokens[2]);
        statements.push(ParsedStatement {
            op,
            graph: graph.clone(),
            subject: tokens[0].clone(),
            predicate: tokens[1].clone(),
            object,
        });
    }
    Ok(statements)
}

fn tokenize(s: &str, lineno: usize) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = s.trim().chars().peekable();
    while chars.peek().is_some() {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        let mut token = String::new();
        if chars.peek() == Some(&'"') {
            token.push(chars.next().unwrap());
            let mut closed = false;
            for c in chars.by_ref() {
                token.push(c);
                if c == '"' {
                    closed = true;
                    break;
                }
            }
            if !closed {
                return Err(malformed(lineno, "unterminated string literal"));
            }
        } else {
            while matches!(chars.peek(), Some(c) if !c.is_whitespace()) {
                token.push(chars.next().unwrap());
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

fn classify_object(token: &str) -> ObjectToken {
    if token.len() >= 2 && token.starts_with('<') && token.ends_with('>') {
        ObjectToken::Uri(token[1..token.len() - 1].to_string())
    } else if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        ObjectToken::String(token[1..token.len() - 1].to_string())
    } else {
        ObjectToken::Bare(token.to_string())
    }
}

fn parse_uri(token: &str, lineno: usize) -> Result<String> {
    if token.len() >= 2 && token.starts_with('<') && token.ends_with('>') {
        Ok(token[1..token.len() - 1].to_string())
    } else {
        Err(malformed(lineno, "expected <uri> after GRAPH"))
    }
}

fn malformed(lineno: usize, reason: &str) -> EngineError {
    EngineError::constraint(format!("malformed update text at line {}: {reason}", lineno + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_insert_with_string_literal() {
        let stmts = parse(r#"INSERT http://x/a nie:title "hello""#).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].op, Op::Insert);
        assert_eq!(stmts[0].subject, "http://x/a");
        assert_eq!(stmts[0].object, ObjectToken::String("hello".into()));
    }

    #[test]
    fn parses_bare_and_uri_objects() {
        let stmts = parse(
            "INSERT http://x/a rdf:type nie:InformationElement\nINSERT http://x/a nao:hasTag <http://x/t1>",
        )
        .unwrap();
        assert_eq!(stmts[0].object, ObjectToken::Bare("nie:InformationElement".into()));
        assert_eq!(stmts[1].object, ObjectToken::Uri("http://x/t1".into()));
    }

    #[test]
    fn graph_applies_to_following_lines_only() {
        let stmts = parse(
            "GRAPH <http://g/1>\nINSERT http://x/a nie:title \"t\"\nGRAPH <http://g/2>\nINSERT http://x/a nie:title \"u\"",
        )
        .unwrap();
        assert_eq!(stmts[0].graph.as_deref(), Some("http://g/1"));
        assert_eq!(stmts[1].graph.as_deref(), Some("http://g/2"));
    }

    #[test]
    fn rejects_unknown_op() {
        assert!(parse("UPDATE http://x/a p o").is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(parse(r#"INSERT http://x/a nie:title "unterminated"#).is_err());
    }
}
