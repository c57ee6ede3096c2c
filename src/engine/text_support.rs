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

//! Output escaping

use crate::error::Result;
use std::borrow::Cow;

/// Escapes values before they are written to the output
pub trait TextSupport: Send + Sync {
    /// Escape the text for HTML output
    fn escape_html<'a>(&self, text: &'a str) -> Result<Cow<'a, str>>;
}

/// Escapes `&`, `<`, `>`, `"` and `'`
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlTextSupport;

impl TextSupport for HtmlTextSupport {
    fn escape_html<'a>(&self, text: &'a str) -> Result<Cow<'a, str>> {
        let Some(first) = text.find(['&', '<', '>', '"', '\'']) else {
            return Ok(Cow::Borrowed(text));
        };
        let mut escaped = String::with_capacity(text.len() + 16);
        escaped.push_str(&text[..first]);
        for c in text[first..].chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                _ => escaped.push(c),
            }
        }
        Ok(Cow::Owned(escaped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        let support = HtmlTextSupport;
        assert_eq!(
            support.escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#).unwrap(),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_nothing_to_escape_borrows() {
        let escaped = HtmlTextSupport.escape_html("plain text").unwrap();
        assert!(matches!(escaped, Cow::Borrowed("plain text")));
    }
}
