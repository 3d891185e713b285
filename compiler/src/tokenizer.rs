use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(
        r#"(?s)(/\*.*?\*/|/\*.*|//[^\n]*|#(?:[^\n\\]|\\.)*|"(?:[^"\\\n]|\\.)*"?|'(?:[^'\\\n]|\\.)*'?|\d[\w.']*|[A-Za-z_][A-Za-z0-9_]*|::|\s+|.)"#
    ).unwrap();
    static ref RAW_STRING_PREFIX: Regex = Regex::new(r"^(?:u8|[uUL])?R$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
    /// A `//` comment, kept because annotations live in them.
    Comment,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:          TokenKind,
    pub text:          String,
    pub line:          usize,
    pub column:        usize,
    /// Byte range in the source text.
    pub start:         usize,
    pub end:           usize,
    /// No other token precedes this one on its line.
    pub first_on_line: bool,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Comment && self.text == text
    }

    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::Number)
    }
}

/// Splits C++-like header text into a flat token stream.
///
/// Block comments, preprocessor lines and whitespace are dropped; line
/// comments are kept. Never fails: a character that starts no known token
/// becomes a one-character `Punct`. The stream always ends with an `Eof` token.
pub fn tokenize_source(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut pos = 0;
    let mut last_content_line = 0;

    while pos < text.len() {
        let Some(mat) = TOKEN_REGEX.find_at(text, pos) else {
            break;
        };
        let start = mat.start();
        let mut end = mat.end();
        let mut part = mat.as_str();

        let mut raw = false;
        if RAW_STRING_PREFIX.is_match(part) && text[end..].starts_with('"') {
            end = raw_string_end(text, end);
            part = &text[start..end];
            raw = true;
        }

        let first = part.chars().next().unwrap_or(' ');
        if !first.is_whitespace() {
            let kind = if part.starts_with("//") {
                Some(TokenKind::Comment)
            } else if part.starts_with("/*") || first == '#' {
                None
            } else if raw || first == '"' {
                Some(TokenKind::Str)
            } else if first == '\'' {
                Some(TokenKind::Char)
            } else if first.is_ascii_digit() {
                Some(TokenKind::Number)
            } else if first == '_' || first.is_ascii_alphabetic() {
                Some(TokenKind::Ident)
            } else {
                Some(TokenKind::Punct)
            };

            if let Some(kind) = kind {
                tokens.push(Token {
                    kind,
                    text: part.to_string(),
                    line,
                    column,
                    start,
                    end,
                    first_on_line: last_content_line != line,
                });
            }
            last_content_line = line + part.matches('\n').count();
        }

        // Update line/column
        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.len() + 1;
            }
        } else {
            column += part.len();
        }

        pos = end;
    }

    // Append EOF token
    tokens.push(Token {
        kind:          TokenKind::Eof,
        text:          "".to_string(),
        line,
        column,
        start:         text.len(),
        end:           text.len(),
        first_on_line: true,
    });
    tokens
}

/// End offset of a raw string literal whose opening quote sits at `quote`.
fn raw_string_end(text: &str, quote: usize) -> usize {
    let body = &text[quote + 1..];
    let Some(open) = body.find('(') else {
        return quote + 1;
    };
    let delimiter = &body[..open];
    let terminator = format!("){}\"", delimiter);
    match body[open..].find(&terminator) {
        Some(close) => quote + 1 + open + close + terminator.len(),
        None => text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_tokenize_simple() {
        let got = tokenize_source("int x = 10;");
        assert_eq!(texts(&got), vec!["int", "x", "=", "10", ";", ""]);
        assert_eq!((got[1].line, got[1].column), (1, 5));
        assert_eq!((got[4].line, got[4].column), (1, 11));
        assert_eq!(got[5].kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_qualified_template() {
        let got = tokenize_source("std::optional<std::string> name;");
        assert_eq!(
            texts(&got),
            vec!["std", "::", "optional", "<", "std", "::", "string", ">", "name", ";", ""]
        );
    }

    #[test]
    fn test_tokenize_keeps_line_comments_only() {
        let src = "#include <x>\n/* { */ int a; // @relais primary_key\n// standalone\n";
        let got = tokenize_source(src);
        assert_eq!(
            texts(&got),
            vec!["int", "a", ";", "// @relais primary_key", "// standalone", ""]
        );
        assert_eq!(got[3].kind, TokenKind::Comment);
        assert!(!got[3].first_on_line);
        assert!(got[4].first_on_line);
        assert_eq!(got[4].line, 3);
    }

    #[test]
    fn test_tokenize_strings_hide_braces() {
        let got = tokenize_source(r#"std::string s = "{ not a brace }"; char c = '}';"#);
        assert_eq!(got[5].kind, TokenKind::Str);
        assert_eq!(got[5].text, "\"{ not a brace }\"");
        assert!(got.iter().all(|t| t.kind != TokenKind::Punct || (t.text != "{" && t.text != "}")));
    }

    #[test]
    fn test_tokenize_raw_string() {
        let got = tokenize_source("auto s = R\"x({)\")x\"; int y;");
        assert_eq!(got[3].kind, TokenKind::Str);
        assert_eq!(got[3].text, "R\"x({)\")x\"");
        assert_eq!(texts(&got[4..]), vec![";", "int", "y", ";", ""]);
    }

    #[test]
    fn test_tokenize_unexpected_text_is_punct() {
        let got = tokenize_source("int x = 10 @");
        assert_eq!(got[4].text, "@");
        assert_eq!(got[4].kind, TokenKind::Punct);
    }

    #[test]
    fn test_byte_offsets() {
        let src = "a  bb";
        let got = tokenize_source(src);
        assert_eq!(&src[got[1].start..got[1].end], "bb");
    }
}
