use crate::options::OptionTable;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Export,
    Import,
    Update,
}

impl Operation {
    pub fn past_tense(self) -> &'static str {
        match self {
            Operation::Export => "exported",
            Operation::Import => "imported",
            Operation::Update => "updated",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Export => "export",
            Operation::Import => "import",
            Operation::Update => "update",
        })
    }
}

/// Outcome of one export, import or update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub operation: Operation,
    pub rows: u64,
    /// Entities inserted for file rows (relationship targets not included)
    pub created: u64,
    /// Existing entities merged with a file row
    pub updated: u64,
    pub options: OptionTable,
}

impl RunSummary {
    pub fn new(operation: Operation, options: OptionTable) -> Self {
        Self {
            operation,
            rows: 0,
            created: 0,
            updated: 0,
            options,
        }
    }

    pub fn inc_rows(&mut self) {
        self.rows += 1;
    }

    pub fn inc_created(&mut self) {
        self.created += 1;
    }

    pub fn inc_updated(&mut self) {
        self.updated += 1;
    }

    /// `"2 rows imported."`, `"1 row exported."`
    pub fn message(&self) -> String {
        let noun = if self.rows == 1 { "row" } else { "rows" };
        format!("{} {noun} {}.", self.rows, self.operation.past_tense())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_pluralizes_rows() {
        let mut summary = RunSummary::new(Operation::Import, Vec::new());
        assert_eq!(summary.message(), "0 rows imported.");
        summary.inc_rows();
        assert_eq!(summary.message(), "1 row imported.");
        summary.inc_rows();
        assert_eq!(summary.message(), "2 rows imported.");
    }

    #[test]
    fn counters() {
        let mut summary = RunSummary::new(Operation::Update, vec![("property", "id".into())]);
        summary.inc_rows();
        summary.inc_updated();
        summary.inc_rows();
        summary.inc_created();
        assert_eq!((summary.rows, summary.created, summary.updated), (2, 1, 1));
        assert_eq!(summary.message(), "2 rows updated.");
        assert_eq!(summary.operation.to_string(), "update");
    }
}
