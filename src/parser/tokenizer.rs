// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Zero-copy tokenizer for template source
//!
//! Splits source into literal text runs (each ending at a newline at the
//! latest, so standalone lines can be detected) and tags. Delimiter changes
//! are applied while tokenizing.

use crate::error::{MustacheError, Result};
use crate::segment::MustacheTagType;

const DEFAULT_OPEN: &str = "{{";
const DEFAULT_CLOSE: &str = "}}";

/// Token of template source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'input> {
    /// Literal text, containing at most one newline at its end
    Text {
        /// Text slice
        text: &'input str,
        /// Line of the text
        line: usize,
    },
    /// A tag
    Tag {
        /// Tag type
        tag_type: MustacheTagType,
        /// Trimmed content without sigils
        content: &'input str,
        /// Line the tag starts on
        line: usize,
        /// Byte offset of the opening delimiter
        start: usize,
        /// Byte offset just past the closing delimiter
        end: usize,
    },
}

impl Token<'_> {
    /// Line the token starts on
    pub fn line(&self) -> usize {
        match self {
            Token::Text { line, .. } | Token::Tag { line, .. } => *line,
        }
    }
}

/// Tokenizer state
pub struct Tokenizer<'input> {
    template_name: &'input str,
    source: &'input str,
    pos: usize,
    line: usize,
    open: String,
    close: String,
    tokens: Vec<Token<'input>>,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer with the default `{{ }}` delimiters
    pub fn new(template_name: &'input str, source: &'input str) -> Self {
        Self {
            template_name,
            source,
            pos: 0,
            line: 1,
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole source
    pub fn tokenize(mut self) -> Result<Vec<Token<'input>>> {
        let source = self.source;
        while self.pos < source.len() {
            let Some(offset) = source[self.pos..].find(self.open.as_str()) else {
                self.push_text(&source[self.pos..]);
                break;
            };
            if offset > 0 {
                self.push_text(&source[self.pos..self.pos + offset]);
            }
            self.pos += offset;
            self.read_tag()?;
        }
        Ok(self.tokens)
    }

    fn push_text(&mut self, text: &'input str) {
        for piece in text.split_inclusive('\n') {
            self.tokens.push(Token::Text {
                text: piece,
                line: self.line,
            });
            if piece.ends_with('\n') {
                self.line += 1;
            }
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> MustacheError {
        MustacheError::compilation(self.template_name, line, message)
    }

    fn read_tag(&mut self) -> Result<()> {
        let source = self.source;
        let start = self.pos;
        let line = self.line;
        let inner_start = start + self.open.len();

        // Triple mustache is only recognized with the default delimiters
        let triple = self.open == DEFAULT_OPEN && source[inner_start..].starts_with('{');
        let (raw, end) = if triple {
            let close = format!("}}{}", self.close);
            let from = inner_start + 1;
            let offset = source[from..]
                .find(close.as_str())
                .ok_or_else(|| self.error(line, "Unterminated tag {{{"))?;
            (&source[from..from + offset], from + offset + close.len())
        } else {
            let offset = source[inner_start..]
                .find(self.close.as_str())
                .ok_or_else(|| self.error(line, format!("Unterminated tag {}", self.open)))?;
            (
                &source[inner_start..inner_start + offset],
                inner_start + offset + self.close.len(),
            )
        };

        let (tag_type, content) = if triple {
            (MustacheTagType::UnescapeVariable, raw.trim())
        } else {
            classify(raw.trim())
        };
        if content.is_empty() && tag_type != MustacheTagType::Comment {
            return Err(self.error(line, "Empty tag"));
        }

        if tag_type == MustacheTagType::Delimiter {
            self.change_delimiters(content, line)?;
        }

        self.tokens.push(Token::Tag {
            tag_type,
            content,
            line,
            start,
            end,
        });
        self.line += source[start..end].matches('\n').count();
        self.pos = end;
        Ok(())
    }

    fn change_delimiters(&mut self, content: &str, line: usize) -> Result<()> {
        let mut parts = content.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(open), Some(close), None) if !open.contains('=') && !close.contains('=') => {
                self.open = open.to_string();
                self.close = close.to_string();
                Ok(())
            }
            _ => Err(self.error(line, format!("Invalid delimiter tag: {content}"))),
        }
    }
}

fn classify(raw: &str) -> (MustacheTagType, &str) {
    let Some(sigil) = raw.chars().next() else {
        return (MustacheTagType::Variable, raw);
    };
    let rest = raw[sigil.len_utf8()..].trim();
    match sigil {
        '#' => (MustacheTagType::Section, rest),
        '^' => (MustacheTagType::InvertedSection, rest),
        '/' => (MustacheTagType::SectionEnd, rest),
        '!' => (MustacheTagType::Comment, rest),
        '>' => (MustacheTagType::Partial, rest),
        '&' => (MustacheTagType::UnescapeVariable, rest),
        '{' => (
            MustacheTagType::UnescapeVariable,
            rest.strip_suffix('}').unwrap_or(rest).trim(),
        ),
        '=' if raw.len() > 1 && raw.ends_with('=') => (
            MustacheTagType::Delimiter,
            raw[1..raw.len() - 1].trim(),
        ),
        _ => (MustacheTagType::Variable, raw),
    }
}

/// Tokenize the source of the named template
pub fn tokenize<'input>(template_name: &'input str, source: &'input str) -> Result<Vec<Token<'input>>> {
    Tokenizer::new(template_name, source).tokenize()
}
