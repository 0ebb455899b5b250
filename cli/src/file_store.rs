use docpeek_navigator::DocumentId;
use docpeek_navigator::DocumentPage;
use docpeek_navigator::DocumentStore;
use docpeek_navigator::ListQuery;
use docpeek_navigator::MemoryStore;
use docpeek_navigator::StoreError;
use docpeek_query::Document;
use docpeek_query::compile;
use docpeek_query::format_document;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::debug;

/// A collection kept in a local file, one extended-JSON document per line.
/// Every change rewrites the whole file atomically.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    documents: MemoryStore,
}

impl JsonLinesStore {
    /// Loads `path`; a missing file is an empty collection.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        let mut documents = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let doc = compile(line).map_err(|source| StoreError::Decode {
                location: format!("{}:{}", path.display(), index + 1),
                source,
            })?;
            documents.push(doc);
        }
        debug!(path = %path.display(), count = documents.len(), "loaded collection");
        Ok(Self {
            path,
            documents: MemoryStore::from_documents(documents),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        for doc in self.documents.documents() {
            writeln!(file, "{}", format_document(doc)?)?;
        }
        file.flush()?;
        file.persist(&self.path).map_err(|err| err.error)?;
        debug!(path = %self.path.display(), "saved collection");
        Ok(())
    }
}

impl DocumentStore for JsonLinesStore {
    fn list_documents(&self, query: &ListQuery) -> Result<DocumentPage, StoreError> {
        self.documents.list_documents(query)
    }

    fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.documents.get_document(id)
    }

    fn insert_document(&mut self, doc: Document) -> Result<DocumentId, StoreError> {
        let id = self.documents.insert_document(doc)?;
        self.save()?;
        Ok(id)
    }

    fn update_document(&mut self, id: &DocumentId, doc: Document) -> Result<(), StoreError> {
        self.documents.update_document(id, doc)?;
        self.save()
    }

    fn delete_document(&mut self, id: &DocumentId) -> Result<(), StoreError> {
        self.documents.delete_document(id)?;
        self.save()
    }
}
