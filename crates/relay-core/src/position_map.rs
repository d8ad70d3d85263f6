//! Original→generated position pairs for one module.
//!
//! Every pipeline pass keeps the line count, so body line `n` of the
//! generated function is source line `n`; the code generator then shifts
//! the generated side by its header length.

use serde::{Deserialize, Serialize};

use crate::Result;

/// 1-based line and column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub original: Position,
    pub generated: Position,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMap {
    pub source: String,
    pub generated: String,
    pub mappings: Vec<Mapping>,
}

impl PositionMap {
    pub fn new(source: impl Into<String>, generated: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            generated: generated.into(),
            mappings: Vec::new(),
        }
    }

    /// Pair line `n` of `original` with line `n` of `generated_body`, anchored
    /// at each line's first non-blank column. Blank lines are not mapped.
    pub fn from_aligned_lines(
        source: impl Into<String>,
        generated: impl Into<String>,
        original: &str,
        generated_body: &str,
    ) -> Self {
        let mut map = Self::new(source, generated);
        for (index, (before, after)) in original.lines().zip(generated_body.lines()).enumerate() {
            let (Some(from), Some(to)) = (first_column(before), first_column(after)) else {
                continue;
            };
            map.add(
                Position { line: index + 1, column: from },
                Position { line: index + 1, column: to },
            );
        }
        map
    }

    pub fn add(&mut self, original: Position, generated: Position) {
        self.mappings.push(Mapping { original, generated });
    }

    /// Move every generated position down by `lines`.
    pub fn shift_generated(&mut self, lines: usize) {
        for mapping in &mut self.mappings {
            mapping.generated.line += lines;
        }
    }

    /// Source line of a generated line: exact mapping, else the nearest
    /// preceding one plus the distance.
    pub fn original_line(&self, generated_line: usize) -> Option<usize> {
        self.mappings
            .iter()
            .filter(|m| m.generated.line <= generated_line)
            .max_by_key(|m| m.generated.line)
            .map(|m| m.original.line + (generated_line - m.generated.line))
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn first_column(line: &str) -> Option<usize> {
    line.chars()
        .position(|c| !c.is_whitespace())
        .map(|index| index + 1)
}
