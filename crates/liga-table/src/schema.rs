//! Semantic column resolution.
//!
//! Maps roles (rank, personnel code, names, question/answer) onto a table's
//! headers through configured alias lists, once per loaded table. A role
//! that matches two headers is an error rather than a silent first pick.

use std::fmt;

use liga_core::config::SchemaAliases;
use liga_core::text;

use crate::error::SchemaError;
use crate::table::Table;

/// Semantic role a column can play in a data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Rank,
    PersonnelCode,
    FirstName,
    LastName,
    Question,
    Answer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Rank,
        Role::PersonnelCode,
        Role::FirstName,
        Role::LastName,
        Role::Question,
        Role::Answer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Rank => "rank",
            Role::PersonnelCode => "personnel-code",
            Role::FirstName => "first-name",
            Role::LastName => "last-name",
            Role::Question => "question",
            Role::Answer => "answer",
        }
    }

    fn aliases<'a>(&self, aliases: &'a SchemaAliases) -> &'a [String] {
        match self {
            Role::Rank => &aliases.rank,
            Role::PersonnelCode => &aliases.personnel_code,
            Role::FirstName => &aliases.first_name,
            Role::LastName => &aliases.last_name,
            Role::Question => &aliases.question,
            Role::Answer => &aliases.answer,
        }
    }

    fn slot(&self) -> usize {
        match self {
            Role::Rank => 0,
            Role::PersonnelCode => 1,
            Role::FirstName => 2,
            Role::LastName => 3,
            Role::Question => 4,
            Role::Answer => 5,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indices of the columns of `table` whose header equals one of `aliases`
/// after normalization.
pub fn matching_columns(table: &Table, aliases: &[String]) -> Vec<usize> {
    let wanted: Vec<String> = aliases.iter().map(|a| text::normalize(a)).collect();
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, header)| wanted.contains(&text::normalize(header)))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of the columns whose normalized header starts with one of
/// `prefixes` followed by nothing, whitespace, a digit, or punctuation.
pub fn prefixed_columns(table: &Table, prefixes: &[String]) -> Vec<usize> {
    let wanted: Vec<String> = prefixes.iter().map(|p| text::normalize(p)).collect();
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, header)| {
            let header = text::normalize(header);
            wanted.iter().any(|prefix| {
                header.strip_prefix(prefix.as_str()).is_some_and(|rest| {
                    rest.chars()
                        .next()
                        .is_none_or(|c| c.is_whitespace() || c.is_ascii_digit() || c.is_ascii_punctuation())
                })
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// Column positions of each semantic role in one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    slots: [Option<usize>; 6],
}

impl Schema {
    /// Resolve every role against the table headers.
    pub fn resolve(table: &Table, aliases: &SchemaAliases) -> Result<Self, SchemaError> {
        let mut schema = Schema::default();
        for role in Role::ALL {
            let found = matching_columns(table, role.aliases(aliases));
            match found.as_slice() {
                [] => {}
                [index] => schema.slots[role.slot()] = Some(*index),
                many => {
                    return Err(SchemaError::AmbiguousColumn {
                        role,
                        columns: many.iter().map(|&i| table.columns()[i].clone()).collect(),
                    })
                }
            }
        }
        Ok(schema)
    }

    pub fn get(&self, role: Role) -> Option<usize> {
        self.slots[role.slot()]
    }

    pub fn require(&self, role: Role) -> Result<usize, SchemaError> {
        self.get(role).ok_or(SchemaError::MissingColumn(role))
    }

    pub fn has(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    fn is_role_column(&self, column: usize) -> bool {
        self.slots.contains(&Some(column))
    }

    /// Question column and its paired answer column.
    ///
    /// The answer is the explicit answer-role column when present, otherwise
    /// the column right of the question column.
    pub fn literal_columns(&self, table: &Table) -> Option<(usize, usize)> {
        let question = self.get(Role::Question)?;
        let answer = match self.get(Role::Answer) {
            Some(answer) => answer,
            None if question + 1 < table.columns().len() => question + 1,
            None => return None,
        };
        Some((question, answer))
    }

    /// Column compared by distance questions.
    ///
    /// A configured header must exist; otherwise the first numeric column
    /// that plays no role is chosen.
    pub fn metric_column(
        &self,
        table: &Table,
        configured: Option<&str>,
    ) -> Result<usize, SchemaError> {
        if let Some(header) = configured {
            let wanted = text::normalize(header);
            return table
                .columns()
                .iter()
                .position(|c| text::normalize(c) == wanted)
                .ok_or_else(|| SchemaError::UnknownColumn(header.to_string()));
        }
        (0..table.columns().len())
            .find(|&i| !self.is_role_column(i) && table.is_numeric_column(i))
            .ok_or(SchemaError::NoNumericColumn)
    }
}
