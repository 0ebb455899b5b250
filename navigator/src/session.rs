//! One open document plus its navigator, and the editor round trips that
//! change what is stored.

use crate::editor::EditorError;
use crate::editor::ExternalEditor;
use crate::state::Navigator;
use crate::store::DocumentId;
use crate::store::DocumentStore;
use crate::store::ID_FIELD;
use crate::store::StoreError;
use docpeek_query::CompileError;
use docpeek_query::CompileOptions;
use docpeek_query::Document;
use docpeek_query::FormatError;
use docpeek_query::compile_with;
use docpeek_query::extjson::encode_value;
use docpeek_query::is_empty_query;
use docpeek_query::render_document;
use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::info;

#[derive(Debug, Error)]
pub enum EditorRoundTripError {
    #[error("no document is open")]
    NoDocument,
    #[error("document has no _id")]
    MissingId,
    #[error("_id cannot be changed (was {original}, now {edited})")]
    IdChanged { original: String, edited: String },
    #[error("failed to render document: {0}")]
    Format(#[from] FormatError),
    #[error("editor failed: {0}")]
    Editor(#[from] EditorError),
    #[error("edited text is not a valid document: {0}")]
    Compile(#[from] CompileError),
    #[error("store rejected the change: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The editor returned an equal document; nothing was written.
    Unchanged,
    Updated(Document),
}

/// Navigator state bound to the document it shows.
#[derive(Debug, Clone, Default)]
pub struct DocumentSession {
    navigator: Navigator,
    document: Option<Document>,
    options: CompileOptions,
}

impl DocumentSession {
    pub fn new(width: usize, window_height: usize, options: CompileOptions) -> Self {
        Self {
            navigator: Navigator::new(width, window_height),
            document: None,
            options,
        }
    }

    /// Renders `doc` and shows it from the top.
    pub fn open(&mut self, doc: Document) -> Result<(), FormatError> {
        let text = render_document(&doc)?;
        self.navigator.open(text);
        self.document = Some(doc);
        Ok(())
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }

    /// Sends the open document through `editor` and writes the result back.
    ///
    /// A result equal to the open document (key order and layout aside) is
    /// not written. The stored `_id` is kept when the edited text drops it;
    /// changing it is an error. On any error the store and the session are
    /// left as they were.
    pub fn edit(
        &mut self,
        store: &mut dyn DocumentStore,
        editor: &mut dyn ExternalEditor,
    ) -> Result<EditOutcome, EditorRoundTripError> {
        let original = self
            .document
            .as_ref()
            .ok_or(EditorRoundTripError::NoDocument)?;
        let id = DocumentId::of(original).ok_or(EditorRoundTripError::MissingId)?;
        let edited = editor.edit(self.navigator.text()).inspect_err(|err| {
            error!(%id, "editor round trip failed: {err}");
        })?;

        let updated = with_id(compile_with(&edited, &self.options)?, &id)?;
        if &updated == original {
            debug!(%id, "edited document is equal to the original");
            return Ok(EditOutcome::Unchanged);
        }

        let text = render_document(&updated)?;
        store
            .update_document(&id, updated.clone())
            .inspect_err(|err| error!(%id, "failed to store edited document: {err}"))?;
        info!(%id, "document updated");
        self.navigator.reload(text);
        self.document = Some(updated.clone());
        Ok(EditOutcome::Updated(updated))
    }
}

/// Opens an empty document in `editor` and inserts what comes back. Empty
/// text or `{}` means "nothing to insert" and returns `None`.
pub fn insert_via_editor(
    store: &mut dyn DocumentStore,
    editor: &mut dyn ExternalEditor,
    options: &CompileOptions,
) -> Result<Option<DocumentId>, EditorRoundTripError> {
    insert_edited(store, editor, options, "{}\n")
}

/// Opens `doc` without its `_id` in `editor` and inserts the result as a new
/// document.
pub fn duplicate_via_editor(
    doc: &Document,
    store: &mut dyn DocumentStore,
    editor: &mut dyn ExternalEditor,
    options: &CompileOptions,
) -> Result<Option<DocumentId>, EditorRoundTripError> {
    let mut copy = doc.clone();
    copy.remove(ID_FIELD);
    let text = render_document(&copy)?;
    insert_edited(store, editor, options, &text)
}

fn insert_edited(
    store: &mut dyn DocumentStore,
    editor: &mut dyn ExternalEditor,
    options: &CompileOptions,
    text: &str,
) -> Result<Option<DocumentId>, EditorRoundTripError> {
    let edited = editor.edit(text)?;
    if is_empty_query(&edited) {
        debug!("nothing to insert");
        return Ok(None);
    }
    let doc = compile_with(&edited, options)?;
    let id = store
        .insert_document(doc)
        .inspect_err(|err| error!("failed to insert document: {err}"))?;
    info!(%id, "document inserted");
    Ok(Some(id))
}

fn with_id(mut doc: Document, id: &DocumentId) -> Result<Document, EditorRoundTripError> {
    match doc.get(ID_FIELD) {
        Some(edited) if edited == id.value() => Ok(doc),
        Some(edited) => Err(EditorRoundTripError::IdChanged {
            original: id.to_string(),
            edited: encode_value(edited).to_string(),
        }),
        None => {
            doc = std::iter::once((ID_FIELD.to_string(), id.value().clone()))
                .chain(doc)
                .collect();
            Ok(doc)
        }
    }
}
