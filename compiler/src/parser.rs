//! Declaration scanner.
//!
//! Walks the token stream looking for `@relais` annotation blocks, binds each
//! block to the next class/struct definition and extracts that definition's
//! public data members. Anything that does not look like a data member is
//! skipped; the scanner never rejects a file.

use crate::{
    tags::{parse_class_tokens, parse_field_tags},
    tokenizer::{tokenize_source, Token, TokenKind},
    types::{ClassToken, FieldDescriptor, FieldTags, ScannedClass},
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref ANNOTATION: Regex = Regex::new(r"^//\s*@relais(_list)?(?:\s+(.*))?$").unwrap();
    static ref INLINE_TAG: Regex = Regex::new(r"@relais\b\s*(.*)$").unwrap();
}

/// Leading keywords of member-level statements that never declare a data member.
const NON_MEMBER_KEYWORDS: [&str; 14] = [
    "using", "typedef", "friend", "static", "static_assert", "template", "enum",
    "struct", "class", "union", "namespace", "virtual", "explicit", "operator",
];

const ACCESS_KEYWORDS: [&str; 3] = ["public", "private", "protected"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingAnnotation,
    SeekingDeclaration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Namespace(String),
    Block,
}

/// How a member-level statement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementKind {
    /// Terminated by `;` (possibly after a brace initializer).
    Simple,
    /// Had a parameter list and a `{ ... }` body.
    Function,
    /// A nested `struct`/`class`/`enum`/`union` definition.
    NestedType,
    /// Hit the enclosing `}` or end of input before its terminator.
    Incomplete,
}

struct Statement {
    kind:  StatementKind,
    /// Token range of the statement, terminator excluded.
    begin: usize,
    end:   usize,
    /// Index of the first token after the statement.
    next:  usize,
}

/// Scans header text and returns every annotated class in declaration order.
pub fn scan_source(text: &str) -> Vec<ScannedClass> {
    let tokens = tokenize_source(text);
    scan_tokens(text, &tokens)
}

/// Scans an already tokenized header. `text` must be the text `tokens` came from.
pub fn scan_tokens(text: &str, tokens: &[Token]) -> Vec<ScannedClass> {
    if tokens.is_empty() {
        return Vec::new();
    }
    Scanner { text, tokens }.run()
}

/// Splits an annotation comment into (is_list, content).
pub fn parse_annotation_comment(comment: &str) -> Option<(bool, &str)> {
    let caps = ANNOTATION.captures(comment.trim())?;
    let is_list = caps.get(1).is_some();
    let content = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
    Some((is_list, content))
}

struct Scanner<'a> {
    text:   &'a str,
    tokens: &'a [Token],
}

impl<'a> Scanner<'a> {
    fn token(&self, index: usize) -> &'a Token {
        // The stream always ends with Eof; clamp to it.
        &self.tokens[index.min(self.tokens.len() - 1)]
    }

    fn previous_code_token(&self, index: usize) -> Option<&'a Token> {
        self.tokens[..index]
            .iter()
            .rev()
            .find(|t| t.kind != TokenKind::Comment)
    }

    fn run(&self) -> Vec<ScannedClass> {
        let mut classes = Vec::new();
        let mut scopes: Vec<Scope> = Vec::new();
        let mut pending: Vec<ClassToken> = Vec::new();
        let mut state = ScanState::SeekingAnnotation;
        let mut index = 0;

        while index < self.tokens.len() {
            let tok = self.token(index);
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Comment => {
                    let annotation = if tok.first_on_line {
                        parse_annotation_comment(&tok.text)
                    } else {
                        None
                    };
                    if let Some((is_list, content)) = annotation {
                        if state == ScanState::SeekingAnnotation {
                            pending.extend(parse_class_tokens(content, is_list));
                            // Collect the rest of the run of annotation lines.
                            while let Some((is_list, content)) = self
                                .annotation_at(index + 1)
                            {
                                pending.extend(parse_class_tokens(content, is_list));
                                index += 1;
                            }
                            state = ScanState::SeekingDeclaration;
                        } else {
                            debug!(
                                "line {}: annotation ignored while looking for a declaration",
                                tok.line
                            );
                        }
                    }
                    index += 1;
                }
                _ if tok.is("namespace") => {
                    index = self.enter_namespace(index, &mut scopes);
                }
                _ if tok.is("{") => {
                    scopes.push(Scope::Block);
                    index += 1;
                }
                _ if tok.is("}") => {
                    scopes.pop();
                    index += 1;
                }
                _ if state == ScanState::SeekingDeclaration
                    && (tok.is("struct") || tok.is("class")) =>
                {
                    match self.class_definition(index) {
                        Some((name_index, open)) => {
                            let name = self.token(name_index);
                            let is_struct = tok.is("struct");
                            let fields = self.scan_members(open, is_struct);
                            classes.push(ScannedClass {
                                name: name.text.clone(),
                                namespace: namespace_path(&scopes),
                                is_struct,
                                line: name.line,
                                annotations: std::mem::take(&mut pending),
                                fields,
                            });
                            state = ScanState::SeekingAnnotation;
                            // Resume at the body so nested annotated types are found too.
                            index = open;
                        }
                        None => index += 1,
                    }
                }
                _ => index += 1,
            }
        }

        if !pending.is_empty() {
            debug!("discarding annotation block with no following declaration");
        }
        classes
    }

    fn annotation_at(&self, index: usize) -> Option<(bool, &'a str)> {
        let tok = self.token(index);
        if tok.kind == TokenKind::Comment && tok.first_on_line {
            parse_annotation_comment(&tok.text)
        } else {
            None
        }
    }

    /// Handles `namespace a::b {`; returns the index after the opening brace
    /// (or after the alias/using statement when there is none).
    fn enter_namespace(&self, index: usize, scopes: &mut Vec<Scope>) -> usize {
        let mut name = String::new();
        let mut i = index + 1;
        loop {
            let tok = self.token(i);
            if tok.is("{") {
                scopes.push(Scope::Namespace(name));
                return i + 1;
            }
            if tok.kind == TokenKind::Ident || tok.is("::") {
                name.push_str(&tok.text);
                i += 1;
            } else if tok.kind == TokenKind::Comment {
                i += 1;
            } else {
                // `namespace x = y;`, `using namespace x;` or garbage
                return i;
            }
        }
    }

    /// Recognizes `struct|class Name ... {` starting at the keyword. Returns
    /// the indices of the name and of the opening brace.
    fn class_definition(&self, index: usize) -> Option<(usize, usize)> {
        if let Some(prev) = self.previous_code_token(index) {
            // `enum class`, template parameters, elaborated `friend class X`
            if prev.is("enum") || prev.is("<") || prev.is(",") || prev.is("friend") {
                return None;
            }
        }
        let name_index = index + 1;
        let name = self.token(name_index);
        if name.kind != TokenKind::Ident || self.token(name_index + 1).is("::") {
            return None;
        }

        let mut depth = 0usize;
        let mut i = name_index + 1;
        loop {
            let tok = self.token(i);
            match tok.kind {
                TokenKind::Eof => return None,
                _ if tok.is("(") || tok.is("<") => depth += 1,
                _ if tok.is(")") || tok.is(">") => depth = depth.saturating_sub(1),
                _ if depth == 0 && tok.is("{") => return Some((name_index, i)),
                _ if depth == 0 && (tok.is(";") || tok.is("}") || tok.is("=")) => return None,
                _ => {}
            }
            i += 1;
        }
    }

    /// Extracts public data members from the body opened at `open`.
    fn scan_members(&self, open: usize, is_struct: bool) -> Vec<FieldDescriptor> {
        let mut fields = Vec::new();
        let mut public = is_struct;
        let mut i = open + 1;

        loop {
            let tok = self.token(i);
            if tok.kind == TokenKind::Eof || tok.is("}") {
                break;
            }
            if tok.kind == TokenKind::Comment || tok.is(";") {
                i += 1;
                continue;
            }
            if ACCESS_KEYWORDS.contains(&tok.text.as_str()) && self.token(i + 1).is(":") {
                public = tok.is("public");
                i += 2;
                continue;
            }

            let stmt = self.statement(i);
            let trailing = self.trailing_comment(&stmt);
            if public && stmt.kind == StatementKind::Simple {
                match self.member(&stmt, trailing) {
                    Some(field) => fields.push(field),
                    None => debug!("line {}: not a data member, skipped", tok.line),
                }
            }
            i = if trailing.is_some() { stmt.next + 1 } else { stmt.next };
        }

        fields
    }

    /// Delimits the member-level statement starting at `begin`.
    fn statement(&self, begin: usize) -> Statement {
        let mut depth = 0usize;
        let mut saw_params = false;
        let mut i = begin;

        loop {
            let tok = self.token(i);
            if tok.kind == TokenKind::Eof {
                return Statement { kind: StatementKind::Incomplete, begin, end: i, next: i };
            }
            if tok.is("(") || tok.is("[") {
                saw_params |= tok.is("(");
                depth += 1;
            } else if tok.is(")") || tok.is("]") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && tok.is(";") {
                return Statement { kind: StatementKind::Simple, begin, end: i, next: i + 1 };
            } else if depth == 0 && tok.is("}") {
                return Statement { kind: StatementKind::Incomplete, begin, end: i, next: i };
            } else if depth == 0 && tok.is("{") {
                let close = self.matching_brace(i);
                if saw_params {
                    let next = if self.token(close + 1).is(";") { close + 2 } else { close + 1 };
                    return Statement { kind: StatementKind::Function, begin, end: close + 1, next };
                }
                let first = self.first_code_token(begin);
                if ["struct", "class", "union", "enum"].iter().any(|k| first.is(k)) {
                    let mut stmt = self.statement(close + 1);
                    stmt.begin = begin;
                    if stmt.kind != StatementKind::Incomplete {
                        stmt.kind = StatementKind::NestedType;
                    }
                    return stmt;
                }
                // Brace initializer: keep going until the terminator.
                i = close + 1;
                continue;
            }
            i += 1;
        }
    }

    fn first_code_token(&self, begin: usize) -> &'a Token {
        self.tokens[begin..]
            .iter()
            .find(|t| t.kind != TokenKind::Comment)
            .unwrap_or_else(|| self.token(begin))
    }

    /// Index of the `}` closing the brace at `open` (Eof if unbalanced).
    fn matching_brace(&self, open: usize) -> usize {
        let mut depth = 0usize;
        let mut i = open;
        loop {
            let tok = self.token(i);
            if tok.kind == TokenKind::Eof {
                return i;
            }
            if tok.is("{") {
                depth += 1;
            } else if tok.is("}") {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            i += 1;
        }
    }

    /// The comment sharing a line with the statement terminator, if any.
    fn trailing_comment(&self, stmt: &Statement) -> Option<&'a Token> {
        let tok = self.token(stmt.next);
        if stmt.next > 0 && tok.kind == TokenKind::Comment && !tok.first_on_line {
            Some(tok)
        } else {
            None
        }
    }

    /// Matches `type-expression identifier [= default | {init}]` against a statement.
    fn member(&self, stmt: &Statement, trailing: Option<&Token>) -> Option<FieldDescriptor> {
        let code: Vec<&Token> = self.tokens[stmt.begin..stmt.end]
            .iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();
        let code = strip_attributes(&code);

        let first = code.first()?;
        if NON_MEMBER_KEYWORDS.contains(&first.text.as_str()) {
            return None;
        }
        if code.iter().any(|t| t.is("(") || t.is("~")) {
            return None;
        }

        // Declarator ends at the first top-level `=` or `{`.
        let mut angle = 0usize;
        let mut split = code.len();
        for (i, tok) in code.iter().enumerate() {
            if tok.is("<") {
                angle += 1;
            } else if tok.is(">") {
                angle = angle.saturating_sub(1);
            } else if angle == 0 && (tok.is("=") || tok.is("{")) {
                split = i;
                break;
            } else if angle == 0 && (tok.is(",") || tok.is(":") || tok.is("[")) {
                // Several declarators, bit-fields and arrays are out of reach.
                return None;
            }
        }

        let declarator = &code[..split];
        let (name, type_tokens) = declarator.split_last()?;
        if name.kind != TokenKind::Ident || type_tokens.is_empty() {
            return None;
        }
        if !type_tokens.iter().any(|t| t.kind == TokenKind::Ident) {
            return None;
        }

        if has_top_level_comma(&code[split..]) {
            // `int a = 1, b = 2;`
            return None;
        }

        let default_expr = match code.get(split) {
            Some(tok) if tok.is("=") => self.source_span(&code[split + 1..]),
            Some(_) => self.source_span(&code[split..]),
            None => String::new(),
        };

        let tags = trailing
            .and_then(|c| INLINE_TAG.captures(&c.text))
            .and_then(|caps| caps.get(1))
            .map(|m| parse_field_tags(&name.text, m.as_str().trim()))
            .unwrap_or_else(FieldTags::default);

        Some(FieldDescriptor {
            name:          name.text.clone(),
            declared_type: render_type(type_tokens),
            default_expr,
            line:          name.line,
            tags,
        })
    }

    fn source_span(&self, tokens: &[&Token]) -> String {
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => self.text[first.start..last.end].trim().to_string(),
            _ => String::new(),
        }
    }
}

/// True when an initializer span holds a `,` outside any `{}`, `[]` or `<>`,
/// i.e. a further declarator follows.
fn has_top_level_comma(tokens: &[&Token]) -> bool {
    let mut depth = 0usize;
    for tok in tokens {
        if tok.is("{") || tok.is("[") || tok.is("<") {
            depth += 1;
        } else if tok.is("}") || tok.is("]") || tok.is(">") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && tok.is(",") {
            return true;
        }
    }
    false
}

/// Drops `[[...]]` attribute groups.
fn strip_attributes<'t>(code: &[&'t Token]) -> Vec<&'t Token> {
    let mut out = Vec::with_capacity(code.len());
    let mut i = 0;
    while i < code.len() {
        if code[i].is("[") && code.get(i + 1).is_some_and(|t| t.is("[")) {
            let mut depth = 0usize;
            while i < code.len() {
                if code[i].is("[") {
                    depth += 1;
                } else if code[i].is("]") {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                i += 1;
            }
            i += 1;
            continue;
        }
        out.push(code[i]);
        i += 1;
    }
    out
}

/// Re-spells a type from its tokens: `std::optional<std::string>`, `unsigned int`,
/// `std::map<std::string, int>`.
fn render_type(tokens: &[&Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for tok in tokens {
        if let Some(p) = prev {
            if (p.is_word() && tok.is_word()) || p.is(",") {
                out.push(' ');
            }
        }
        out.push_str(&tok.text);
        prev = Some(*tok);
    }
    out
}

fn namespace_path(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .filter_map(|s| match s {
            Scope::Namespace(name) if !name.is_empty() => Some(name.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("::")
}
