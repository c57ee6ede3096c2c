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

//! Template compiler
//!
//! Turns template source into the segment tree of a [`Template`]. Lines
//! holding nothing but whitespace and a single section, inverted section,
//! section end, comment, partial or delimiter tag are removed from the
//! output entirely.

pub mod tokenizer;

pub use tokenizer::{Token, Tokenizer, tokenize};

use crate::engine::{EngineConfiguration, EngineShared};
use crate::error::{MustacheError, Result};
use crate::segment::{
    CommentSegment, MustacheTagType, Origin, PartialSegment, RootSegment, SectionSegment, Segment,
    TextSegment, ValueSegment,
};
use crate::template::Template;
use std::sync::{Arc, Weak};

/// Compile the source of the named template
pub(crate) fn compile(
    name: &str,
    source: &str,
    configuration: &EngineConfiguration,
    engine: Weak<EngineShared>,
) -> Result<Template> {
    let template_name: Arc<str> = Arc::from(name);
    let tokens = remove_standalone_lines(tokenize(name, source)?);
    let root = TreeBuilder::new(Arc::clone(&template_name), source, configuration).build(tokens)?;
    Ok(Template::new(template_name, root, engine))
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// Drop the surrounding whitespace of tags standing alone on their line
fn remove_standalone_lines(tokens: Vec<Token<'_>>) -> Vec<Token<'_>> {
    let mut result = Vec::with_capacity(tokens.len());
    let mut line: Vec<Token<'_>> = Vec::new();
    for token in tokens {
        let ends_line = matches!(&token, Token::Text { text, .. } if text.ends_with('\n'));
        line.push(token);
        if ends_line {
            flush_line(&mut line, &mut result);
        }
    }
    flush_line(&mut line, &mut result);
    result
}

fn flush_line<'a>(line: &mut Vec<Token<'a>>, result: &mut Vec<Token<'a>>) {
    let mut tags = line.iter().filter(|token| matches!(token, Token::Tag { .. }));
    let standalone = match (tags.next(), tags.next()) {
        (Some(Token::Tag { tag_type, .. }), None) => {
            tag_type.can_be_standalone()
                && line.iter().all(|token| match token {
                    Token::Text { text, .. } => is_blank(text),
                    Token::Tag { .. } => true,
                })
        }
        _ => false,
    };
    if standalone {
        result.extend(line.drain(..).filter(|token| matches!(token, Token::Tag { .. })));
    } else {
        result.append(line);
    }
}

struct OpenSection<'a> {
    tag_type: MustacheTagType,
    key: &'a str,
    line: usize,
    content_start: usize,
    index: usize,
    children: Vec<Segment>,
}

struct TreeBuilder<'a> {
    template_name: Arc<str>,
    source: &'a str,
    configuration: &'a EngineConfiguration,
    next_index: usize,
}

impl<'a> TreeBuilder<'a> {
    fn new(template_name: Arc<str>, source: &'a str, configuration: &'a EngineConfiguration) -> Self {
        Self {
            template_name,
            source,
            configuration,
            next_index: 0,
        }
    }

    fn origin(&mut self, line: usize) -> Origin {
        self.next_index += 1;
        Origin::new(Arc::clone(&self.template_name), line, self.next_index)
    }

    fn error(&self, line: usize, message: String) -> MustacheError {
        MustacheError::compilation(self.template_name.as_ref(), line, message)
    }

    fn build(mut self, tokens: Vec<Token<'a>>) -> Result<RootSegment> {
        let mut root: Vec<Segment> = Vec::new();
        let mut open: Vec<OpenSection<'a>> = Vec::new();

        for token in tokens {
            let segment = match token {
                Token::Text { text, line } => {
                    let children = open.last_mut().map_or(&mut root, |section| &mut section.children);
                    if let Some(Segment::Text(previous)) = children.last_mut() {
                        previous.push_str(text);
                        continue;
                    }
                    Segment::Text(TextSegment::new(text, self.origin(line)))
                }
                Token::Tag {
                    tag_type,
                    content,
                    line,
                    start,
                    end,
                } => match tag_type {
                    MustacheTagType::Variable | MustacheTagType::UnescapeVariable => {
                        let unescape = tag_type == MustacheTagType::UnescapeVariable;
                        let origin = self.origin(line);
                        Segment::Value(ValueSegment::new(content, origin, unescape, self.configuration))
                    }
                    MustacheTagType::Section | MustacheTagType::InvertedSection => {
                        self.next_index += 1;
                        open.push(OpenSection {
                            tag_type,
                            key: content,
                            line,
                            content_start: end,
                            index: self.next_index,
                            children: Vec::new(),
                        });
                        continue;
                    }
                    MustacheTagType::SectionEnd => {
                        let section = open.pop().ok_or_else(|| {
                            self.error(line, format!("Unexpected section end tag {content}"))
                        })?;
                        if section.key != content {
                            return Err(self.error(
                                line,
                                format!("Section {} closed by {content}", section.key),
                            ));
                        }
                        let origin = Origin::new(Arc::clone(&self.template_name), section.line, section.index);
                        let segment = SectionSegment::new(
                            section.key,
                            origin,
                            &self.source[section.content_start..start],
                            section.children,
                            self.configuration,
                        );
                        if section.tag_type == MustacheTagType::InvertedSection {
                            Segment::InvertedSection(segment)
                        } else {
                            Segment::Section(segment)
                        }
                    }
                    MustacheTagType::Comment => Segment::Comment(CommentSegment::new(content, self.origin(line))),
                    MustacheTagType::Partial => Segment::Partial(PartialSegment::new(content, self.origin(line))),
                    MustacheTagType::Delimiter => continue,
                },
            };
            open.last_mut()
                .map_or(&mut root, |section| &mut section.children)
                .push(segment);
        }

        if let Some(section) = open.pop() {
            return Err(self.error(section.line, format!("Unterminated section {}", section.key)));
        }
        Ok(RootSegment::new(root))
    }
}
