//! Compiles shell-style query text (`{name: /^jo/i, _id: ObjectId("...")}`)
//! into a typed [`Document`].
//!
//! The pipeline is:
//!
//! 1. blank text or `{}` compiles to the empty document ("no constraint");
//! 2. a single quote-aware pass quotes bare keys and expands shell
//!    shorthands (`ObjectId`, `ISODate`, `NumberInt`, `NumberLong`,
//!    `NumberDecimal`, `BinData`, `MinKey`, `MaxKey`, `/regex/flags`,
//!    single-quoted strings) into extended JSON;
//! 3. the result is parsed as strict JSON and its `$`-wrappers are resolved
//!    into typed values.
//!
//! String literals are copied through untouched, so braces, colons and
//! slashes inside them are never rewritten.

use crate::dates::DatePolicy;
use crate::error::CompileError;
use crate::extjson::decode_document;
use crate::value::Document;
use serde_json::Value as Json;
use tracing::debug;

const FRAGMENT_PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub dates: DatePolicy,
}

/// Compiles `text` with the default options (zone-less dates are UTC).
pub fn compile(text: &str) -> Result<Document, CompileError> {
    compile_with(text, &CompileOptions::default())
}

pub fn compile_with(text: &str, options: &CompileOptions) -> Result<Document, CompileError> {
    if is_empty_query(text) {
        return Ok(Document::new());
    }
    let expanded = expand_shell_syntax(text, &options.dates)?;
    debug!(query = %text, expanded = %expanded, "expanded query text");
    let json: Json =
        serde_json::from_str(&expanded).map_err(|source| CompileError::InvalidJson {
            query: expanded.clone(),
            source,
        })?;
    decode_document(json, &options.dates)
}

/// True for text that means "no constraint": blank, or `{}` once whitespace
/// is removed.
pub fn is_empty_query(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact.is_empty() || compact == "{}"
}

/// Rewrites shell syntax into strict extended JSON without decoding it.
pub fn expand_shell_syntax(text: &str, dates: &DatePolicy) -> Result<String, CompileError> {
    Expander::new(text, dates).run()
}

enum Arg {
    Str(String),
    Num(String),
}

struct Expander<'a> {
    chars: Vec<char>,
    pos: usize,
    out: String,
    /// Last significant (non-whitespace) character of the source seen so
    /// far; `'"'` after a string, `'}'` after an expanded shorthand.
    prev: Option<char>,
    dates: &'a DatePolicy,
}

impl<'a> Expander<'a> {
    fn new(text: &str, dates: &'a DatePolicy) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            out: String::with_capacity(text.len() + 16),
            prev: None,
            dates,
        }
    }

    fn run(mut self) -> Result<String, CompileError> {
        while let Some(ch) = self.peek() {
            match ch {
                '"' | '\'' => {
                    let literal = self.read_string()?;
                    self.out.push_str(&literal);
                    self.prev = Some('"');
                }
                '/' if self.in_value_position() => self.expand_regex()?,
                ch if ch.is_whitespace() => {
                    self.out.push(ch);
                    self.pos += 1;
                }
                ch if is_word_char(ch) => self.expand_word()?,
                ch => {
                    self.out.push(ch);
                    self.prev = Some(ch);
                    self.pos += 1;
                }
            }
        }
        Ok(self.out)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next_significant(&self) -> Option<char> {
        self.chars[self.pos..]
            .iter()
            .copied()
            .find(|ch| !ch.is_whitespace())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn in_key_position(&self) -> bool {
        matches!(self.prev, None | Some('{') | Some(','))
    }

    fn in_value_position(&self) -> bool {
        matches!(self.prev, Some(':') | Some('[') | Some(','))
    }

    fn fragment_from(&self, start: usize) -> String {
        let end = self.pos.max(start + 1).min(self.chars.len());
        self.chars[start..end]
            .iter()
            .take(FRAGMENT_PREVIEW_CHARS)
            .collect()
    }

    /// Consumes a single- or double-quoted literal and returns it as a
    /// double-quoted JSON string literal. Double-quoted input is copied
    /// verbatim.
    fn read_string(&mut self) -> Result<String, CompileError> {
        let start = self.pos;
        let Some(quote) = self.peek() else {
            return Err(CompileError::UnterminatedString {
                fragment: String::new(),
            });
        };
        self.pos += 1;
        let mut literal = String::from('"');
        loop {
            let Some(ch) = self.peek() else {
                return Err(CompileError::UnterminatedString {
                    fragment: self.fragment_from(start),
                });
            };
            self.pos += 1;
            match ch {
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return Err(CompileError::UnterminatedString {
                            fragment: self.fragment_from(start),
                        });
                    };
                    self.pos += 1;
                    if quote == '\'' && escaped == '\'' {
                        literal.push('\'');
                    } else {
                        literal.push('\\');
                        literal.push(escaped);
                    }
                }
                ch if ch == quote => {
                    literal.push('"');
                    return Ok(literal);
                }
                '"' => literal.push_str("\\\""),
                ch => literal.push(ch),
            }
        }
    }

    /// `/pattern/flags` in value position becomes
    /// `{"$regex": "pattern", "$options": "flags"}`. `\/` inside the pattern
    /// is an escaped delimiter and is unescaped; `/` inside a character
    /// class does not terminate the literal.
    fn expand_regex(&mut self) -> Result<(), CompileError> {
        let start = self.pos;
        self.pos += 1;
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            let ch = match self.peek() {
                Some('\n') | None => {
                    return Err(CompileError::UnterminatedRegex {
                        fragment: self.fragment_from(start),
                    });
                }
                Some(ch) => ch,
            };
            self.pos += 1;
            match ch {
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return Err(CompileError::UnterminatedRegex {
                            fragment: self.fragment_from(start),
                        });
                    };
                    self.pos += 1;
                    if escaped != '/' {
                        pattern.push('\\');
                    }
                    pattern.push(escaped);
                }
                '[' => {
                    in_class = true;
                    pattern.push(ch);
                }
                ']' => {
                    in_class = false;
                    pattern.push(ch);
                }
                '/' if !in_class => break,
                ch => pattern.push(ch),
            }
        }
        let mut flags = String::new();
        while let Some(flag) = self.peek().filter(char::is_ascii_alphabetic) {
            flags.push(flag);
            self.pos += 1;
        }

        self.out.push_str("{\"$regex\":");
        self.out.push_str(&json_string(&pattern));
        if !flags.is_empty() {
            self.out.push_str(",\"$options\":");
            self.out.push_str(&json_string(&flags));
        }
        self.out.push('}');
        self.prev = Some('}');
        Ok(())
    }

    fn expand_word(&mut self) -> Result<(), CompileError> {
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let is_identifier = word.starts_with(|ch: char| ch.is_ascii_alphabetic());

        match self.next_significant() {
            Some('(') if is_identifier => self.expand_constructor(&word, start),
            Some(':') if self.in_key_position() => {
                self.out.push_str(&json_string(&word));
                self.prev = Some('"');
                Ok(())
            }
            Some(next) if word == "new" && next.is_ascii_alphabetic() => {
                self.skip_whitespace();
                Ok(())
            }
            _ => {
                self.out.push_str(&word);
                self.prev = word.chars().next_back();
                Ok(())
            }
        }
    }

    fn expand_constructor(&mut self, name: &str, start: usize) -> Result<(), CompileError> {
        self.skip_whitespace();
        let args = self.read_args(name, start)?;
        let malformed = |this: &Self| CompileError::MalformedConstructor {
            name: name.to_string(),
            fragment: this.fragment_from(start),
        };

        let expansion = match (name, args.as_slice()) {
            ("ObjectId" | "ObjectID", [Arg::Str(hex)]) => {
                format!("{{\"$oid\":{}}}", json_string(hex))
            }
            ("ISODate" | "Date", [Arg::Str(date)]) => {
                let millis =
                    self.dates
                        .parse_millis(date)
                        .ok_or_else(|| CompileError::InvalidDate {
                            fragment: date.clone(),
                        })?;
                format!("{{\"$date\":{{\"$numberLong\":\"{millis}\"}}}}")
            }
            ("NumberInt", [Arg::Num(n) | Arg::Str(n)]) => {
                format!("{{\"$numberInt\":{}}}", json_string(n))
            }
            ("NumberLong", [Arg::Num(n) | Arg::Str(n)]) => {
                format!("{{\"$numberLong\":{}}}", json_string(n))
            }
            ("NumberDecimal", [Arg::Num(n) | Arg::Str(n)]) => {
                format!("{{\"$numberDecimal\":{}}}", json_string(n))
            }
            ("BinData", [Arg::Num(subtype), Arg::Str(payload)]) => {
                let subtype = subtype.parse::<u8>().map_err(|_| malformed(self))?;
                format!(
                    "{{\"$binary\":{{\"base64\":{},\"subType\":\"{subtype:02x}\"}}}}",
                    json_string(payload)
                )
            }
            ("MinKey", []) => "{\"$minKey\":1}".to_string(),
            ("MaxKey", []) => "{\"$maxKey\":1}".to_string(),
            (
                "ObjectId" | "ObjectID" | "ISODate" | "Date" | "NumberInt" | "NumberLong"
                | "NumberDecimal" | "BinData" | "MinKey" | "MaxKey",
                _,
            ) => return Err(malformed(self)),
            _ => {
                return Err(CompileError::UnknownConstructor {
                    name: name.to_string(),
                });
            }
        };
        self.out.push_str(&expansion);
        self.prev = Some('}');
        Ok(())
    }

    /// Reads `( arg, arg, ... )` where each argument is a string or numeric
    /// literal.
    fn read_args(&mut self, name: &str, start: usize) -> Result<Vec<Arg>, CompileError> {
        let malformed = |this: &Self| CompileError::MalformedConstructor {
            name: name.to_string(),
            fragment: this.fragment_from(start),
        };
        if self.peek() != Some('(') {
            return Err(malformed(self));
        }
        self.pos += 1;
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(')') if args.is_empty() => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some('"' | '\'') => {
                    let literal = self.read_string()?;
                    let value: String =
                        serde_json::from_str(&literal).map_err(|_| malformed(self))?;
                    args.push(Arg::Str(value));
                }
                Some(ch) if is_number_char(ch) => {
                    let begin = self.pos;
                    while self.peek().is_some_and(is_number_char) {
                        self.pos += 1;
                    }
                    args.push(Arg::Num(self.chars[begin..self.pos].iter().collect()));
                }
                _ => {
                    self.pos = (self.pos + 1).min(self.chars.len());
                    return Err(malformed(self));
                }
            }
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    return Ok(args);
                }
                _ => {
                    self.pos = (self.pos + 1).min(self.chars.len());
                    return Err(malformed(self));
                }
            }
        }
    }
}

/// Characters allowed in bare keys and bare value words.
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '_' | '$' | '.' | '@' | '#' | '%' | '&' | '*' | '!' | '-' | '+'
        )
}

fn is_number_char(ch: char) -> bool {
    ch.is_ascii_digit() || matches!(ch, '+' | '-' | '.' | 'e' | 'E')
}

fn json_string(text: &str) -> String {
    Json::String(text.to_string()).to_string()
}
