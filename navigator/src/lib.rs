//! Interactive navigation over a rendered document: wrapping, indentation
//! driven highlighting, cursor state, copying, and the editor round trips
//! that write changes back to a [`DocumentStore`].

mod clipboard;
mod copy;
mod editor;
mod highlight;
mod session;
mod state;
mod store;
mod wrap;

pub use clipboard::Clipboard;
pub use clipboard::ClipboardError;
pub use clipboard::MemoryClipboard;
pub use copy::CopyError;
pub use copy::CopyMode;
pub use copy::clean_selection;
pub use editor::EditorError;
pub use editor::ExternalEditor;
pub use highlight::next_lines_to_highlight;
pub use session::DocumentSession;
pub use session::EditOutcome;
pub use session::EditorRoundTripError;
pub use session::duplicate_via_editor;
pub use session::insert_via_editor;
pub use state::Navigator;
pub use store::DocumentId;
pub use store::DocumentPage;
pub use store::DocumentStore;
pub use store::ID_FIELD;
pub use store::ListQuery;
pub use store::MemoryStore;
pub use store::StoreError;
pub use store::compare_values;
pub use store::run_query;
pub use wrap::WrappedLine;
pub use wrap::layout;
pub use wrap::source_slice;
pub use wrap::word_wrap;
