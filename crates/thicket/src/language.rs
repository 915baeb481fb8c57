//! A grammar table paired with its optional external scanner.

use std::fmt;
use std::sync::Arc;

use crate::lexer::{ExternalScanner, ScannerFactory};
use crate::table::{GrammarTable, TableError};

/// Everything needed to parse one language.
///
/// Cloning is cheap; the table is shared. A `Language` is `Send + Sync`, so
/// parsers on different threads can share one.
#[derive(Clone)]
pub struct Language {
    table: Arc<GrammarTable>,
    scanner: Option<ScannerFactory>,
}

impl Language {
    /// Wraps a loaded table.
    #[must_use]
    pub fn new(table: impl Into<Arc<GrammarTable>>) -> Self {
        Self {
            table: table.into(),
            scanner: None,
        }
    }

    /// Loads a language from a JSON table artifact on disk.
    ///
    /// # Errors
    ///
    /// Returns a [`TableError`] if the table cannot be read or loaded.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, TableError> {
        GrammarTable::from_path(path).map(Self::new)
    }

    /// Attaches an external scanner factory.
    #[must_use]
    pub fn with_scanner(mut self, factory: ScannerFactory) -> Self {
        self.scanner = Some(factory);
        self
    }

    /// The grammar table.
    #[must_use]
    pub fn table(&self) -> &GrammarTable {
        &self.table
    }

    /// Whether this language uses an external scanner.
    #[must_use]
    pub fn has_scanner(&self) -> bool {
        self.scanner.is_some()
    }

    pub(crate) fn create_scanner(&self) -> Option<Box<dyn ExternalScanner>> {
        self.scanner.map(|factory| factory())
    }

    /// Whether two handles share the same table.
    #[must_use]
    pub fn same_table(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.table.name())
            .field("scanner", &self.scanner.is_some())
            .finish()
    }
}
