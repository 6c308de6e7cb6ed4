//! Document-collection sources
//!
//! A [`Collection`] is any store that can hand out a cursor over its
//! documents, such as a database collection or an in-memory table. Each call
//! to [`Collection::find`] starts a fresh cursor, which makes collection
//! sources replayable.

use crate::error::BoxError;
use crate::record::Record;

/// Cursor over the documents of a collection
pub type Cursor = Box<dyn Iterator<Item = Result<Record, BoxError>>>;

/// A queryable set of documents
pub trait Collection {
    /// Name of the collection, used as the table name
    fn name(&self) -> &str;

    /// Open a cursor over every document
    fn find(&self) -> Result<Cursor, BoxError>;
}

/// A collection held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    name: String,
    documents: Vec<Record>,
}

impl MemoryCollection {
    /// Create a collection from documents
    pub fn new(name: impl Into<String>, documents: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            documents,
        }
    }

    /// Append a document
    pub fn insert(&mut self, document: Record) {
        self.documents.push(document);
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when the collection holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self) -> Result<Cursor, BoxError> {
        Ok(Box::new(self.documents.clone().into_iter().map(Ok)))
    }
}
