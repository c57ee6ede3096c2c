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

//! Compiled template tree
//!
//! A template compiles into a [`RootSegment`] owning a strict tree of
//! [`Segment`]s. The tree is immutable after compilation and shared by every
//! concurrent render; each segment writes its contribution to the output sink
//! and recurses into its children.

mod partial;
mod section;
mod value;

pub use partial::PartialSegment;
pub use section::SectionSegment;
pub use value::ValueSegment;

use crate::context::ExecutionContext;
use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// Kind of a compiled segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentType {
    /// Root of a template
    Root,
    /// Literal text
    Text,
    /// Escaped or unescaped variable
    Value,
    /// Section
    Section,
    /// Inverted section
    InvertedSection,
    /// Partial template
    Partial,
    /// Comment
    Comment,
}

/// Kind of a tag in template source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MustacheTagType {
    /// `{{name}}`
    Variable,
    /// `{{{name}}}` or `{{&name}}`
    UnescapeVariable,
    /// `{{#name}}`
    Section,
    /// `{{^name}}`
    InvertedSection,
    /// `{{/name}}`
    SectionEnd,
    /// `{{! text}}`
    Comment,
    /// `{{>name}}`
    Partial,
    /// `{{=<% %>=}}`
    Delimiter,
}

impl MustacheTagType {
    /// Tags that may stand alone on a line, which is then removed
    pub fn can_be_standalone(self) -> bool {
        !matches!(self, MustacheTagType::Variable | MustacheTagType::UnescapeVariable)
    }
}

/// Tag metadata handed to pluggable collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MustacheTagInfo {
    /// Tag content, e.g. the key
    pub text: String,
    /// Tag type
    pub tag_type: MustacheTagType,
    /// Line of the tag
    pub line: usize,
    /// Template containing the tag
    pub template_name: Arc<str>,
}

/// Where a segment comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Template name
    pub template_name: Arc<str>,
    /// Line in the template source, starting at 1
    pub line: usize,
    /// Position of the segment in compilation order
    pub index: usize,
}

impl Origin {
    /// Create a new origin
    pub fn new(template_name: Arc<str>, line: usize, index: usize) -> Self {
        Self {
            template_name,
            line,
            index,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.template_name, self.line)
    }
}

/// Node of a compiled template
#[derive(Debug)]
pub enum Segment {
    /// Literal text
    Text(TextSegment),
    /// Variable
    Value(ValueSegment),
    /// Section
    Section(SectionSegment),
    /// Inverted section
    InvertedSection(SectionSegment),
    /// Partial
    Partial(PartialSegment),
    /// Comment
    Comment(CommentSegment),
}

impl Segment {
    /// Kind of the segment
    pub fn segment_type(&self) -> SegmentType {
        match self {
            Segment::Text(_) => SegmentType::Text,
            Segment::Value(_) => SegmentType::Value,
            Segment::Section(_) => SegmentType::Section,
            Segment::InvertedSection(_) => SegmentType::InvertedSection,
            Segment::Partial(_) => SegmentType::Partial,
            Segment::Comment(_) => SegmentType::Comment,
        }
    }

    /// Where the segment comes from
    pub fn origin(&self) -> &Origin {
        match self {
            Segment::Text(segment) => &segment.origin,
            Segment::Value(segment) => segment.origin(),
            Segment::Section(segment) | Segment::InvertedSection(segment) => segment.origin(),
            Segment::Partial(segment) => segment.origin(),
            Segment::Comment(segment) => &segment.origin,
        }
    }

    /// Raw text of the tag, or the literal text
    pub fn text(&self) -> &str {
        match self {
            Segment::Text(segment) => &segment.text,
            Segment::Value(segment) => segment.text(),
            Segment::Section(segment) | Segment::InvertedSection(segment) => segment.text(),
            Segment::Partial(segment) => segment.name(),
            Segment::Comment(segment) => &segment.text,
        }
    }

    /// Child segments of sections
    pub fn children(&self) -> &[Segment] {
        match self {
            Segment::Section(segment) | Segment::InvertedSection(segment) => segment.children(),
            _ => &[],
        }
    }

    /// Write this segment's contribution to the sink
    pub fn execute(&self, out: &mut dyn fmt::Write, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        match self {
            Segment::Text(segment) => out.write_str(&segment.text).map_err(Into::into),
            Segment::Value(segment) => segment.execute(out, ctx),
            Segment::Section(segment) => segment.execute(out, ctx),
            Segment::InvertedSection(segment) => segment.execute_inverted(out, ctx),
            Segment::Partial(segment) => segment.execute(out, ctx),
            Segment::Comment(_) => Ok(()),
        }
    }
}

/// Literal text, written verbatim
#[derive(Debug, Clone)]
pub struct TextSegment {
    text: String,
    origin: Origin,
}

impl TextSegment {
    /// Create a text segment
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }
}

/// Comment, contributes nothing
#[derive(Debug, Clone)]
pub struct CommentSegment {
    text: String,
    origin: Origin,
}

impl CommentSegment {
    /// Create a comment segment
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }
}

/// Root of a compiled template
#[derive(Debug)]
pub struct RootSegment {
    children: Vec<Segment>,
}

impl RootSegment {
    /// Create a root over the given children
    pub fn new(children: Vec<Segment>) -> Self {
        Self { children }
    }

    /// Top-level segments
    pub fn children(&self) -> &[Segment] {
        &self.children
    }

    /// Execute every child in order
    pub fn execute(&self, out: &mut dyn fmt::Write, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        execute_all(&self.children, out, ctx)
    }

    /// Depth-first iterator over all value segments
    pub fn value_segments(&self) -> impl Iterator<Item = &ValueSegment> {
        let mut stack: Vec<&Segment> = self.children.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(segment) = stack.pop() {
                stack.extend(segment.children().iter().rev());
                if let Segment::Value(value) = segment {
                    return Some(value);
                }
            }
            None
        })
    }
}

pub(crate) fn execute_all(
    segments: &[Segment],
    out: &mut dyn fmt::Write,
    ctx: &mut ExecutionContext<'_>,
) -> Result<()> {
    for segment in segments {
        segment.execute(out, ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_tags() {
        assert!(MustacheTagType::Section.can_be_standalone());
        assert!(MustacheTagType::Comment.can_be_standalone());
        assert!(!MustacheTagType::Variable.can_be_standalone());
        assert!(!MustacheTagType::UnescapeVariable.can_be_standalone());
    }

    #[test]
    fn test_origin_display() {
        let origin = Origin::new("foo".into(), 12, 3);
        assert_eq!(origin.to_string(), "foo:12");
    }
}
