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

//! Splitting of tag keys into parts

use smallvec::SmallVec;

/// Parts of a tag key, resolved left to right
pub type KeyParts = SmallVec<[String; 2]>;

/// Splits a tag key into the names resolved one after another
pub trait KeySplitter: Send + Sync {
    /// Split the key
    fn split(&self, key: &str) -> KeyParts;
}

/// Splits on `.`; the key `.` alone is a single part meaning "this"
#[derive(Debug, Default, Clone, Copy)]
pub struct DotKeySplitter;

impl KeySplitter for DotKeySplitter {
    fn split(&self, key: &str) -> KeyParts {
        let key = key.trim();
        if key == "." {
            return smallvec::smallvec![".".to_string()];
        }
        key.split('.')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }
}
