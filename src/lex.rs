// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::ops::Range;

// =================================================================
// Span
// =================================================================

/// Identifies a half-open region `[start,end)` of the source text
/// covered by a single token, along with the token's kind.  Unlike
/// `std::ops::Range` this implements `Copy`, which keeps token
/// bookkeeping cheap during parsing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span<T>
where
    T: Clone + Copy + PartialEq,
{
    pub kind: T,
    pub start: usize,
    pub end: usize,
}

impl<T> Span<T>
where
    T: Clone + Copy + PartialEq,
{
    pub fn new(kind: T, range: Range<usize>) -> Self {
        Self { kind, start: range.start, end: range.end }
    }

    /// Number of characters covered by this span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    fn shift(&mut self, delta: usize) {
        self.start += delta;
        self.end += delta;
    }
}

// =================================================================
// Scanning
// =================================================================

/// A single scanning rule: given the remaining input, try to
/// recognise a token starting at position zero.  Scanners never look
/// behind the current position, which is what allows them to be
/// combined freely in a table.
pub type Scanner<T> = fn(&[char]) -> Result<Span<T>, ()>;

/// Splits a character sequence into tokens by trying a fixed table of
/// `Scanner`s, in order, at the current offset.  Rule order is the
/// disambiguation mechanism: the first rule that matches wins, there
/// is no longest-match-wins behaviour.
pub struct TableLexer<T>
where
    T: Copy + Clone + PartialEq + 'static,
{
    input: Vec<char>,
    offset: usize,
    table: &'static [Scanner<T>],
}

impl<T> TableLexer<T>
where
    T: Copy + Clone + PartialEq + 'static,
{
    pub fn new(input: &str, table: &'static [Scanner<T>]) -> Self {
        Self { input: input.chars().collect(), offset: 0, table }
    }

    /// Peek at the next token without consuming it.  `Err` carries the
    /// offset at which no rule matched.
    pub fn peek(&self) -> Result<Span<T>, usize> {
        self.scan(self.offset)
    }

    /// Consume and return the next token.
    pub fn next(&mut self) -> Result<Span<T>, usize> {
        let t = self.scan(self.offset)?;
        self.offset = t.end;
        Ok(t)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.input.len()
    }

    /// Recover the source text underlying a given span.
    pub fn text(&self, span: Span<T>) -> String {
        self.input[span.range()].iter().collect()
    }

    fn scan(&self, start: usize) -> Result<Span<T>, usize> {
        let remaining = &self.input[start..];
        for rule in self.table {
            if let Ok(mut span) = rule(remaining) {
                span.shift(start);
                return Ok(span);
            }
        }
        Err(start)
    }
}
