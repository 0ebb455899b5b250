use crate::config::Config;
use crate::file_store::JsonLinesStore;
use crate::history::QueryHistory;
use crate::system_clipboard::SystemClipboard;
use crate::system_editor::SystemEditor;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use docpeek_navigator::CopyMode;
use docpeek_navigator::DocumentId;
use docpeek_navigator::DocumentSession;
use docpeek_navigator::DocumentStore;
use docpeek_navigator::EditOutcome;
use docpeek_navigator::ListQuery;
use docpeek_navigator::Navigator;
use docpeek_navigator::duplicate_via_editor;
use docpeek_navigator::insert_via_editor;
use docpeek_query::CompileOptions;
use docpeek_query::Document;
use docpeek_query::compile_with;
use docpeek_query::format_document;
use docpeek_query::is_empty_query;
use docpeek_query::render_document;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;
use tracing::warn;

/// Browse and edit documents with shell-style queries.
#[derive(Debug, Parser)]
#[command(name = "docpeek", version)]
pub struct Cli {
    /// Editor command used for edit, insert and duplicate (overrides config).
    #[arg(long = "editor", global = true)]
    pub editor: Option<String>,

    /// Offset such as +02:00 for dates typed without a zone (overrides config).
    #[arg(long = "utc-offset", global = true, allow_hyphen_values = true)]
    pub utc_offset: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile query text and print it as indented extended JSON.
    Compile {
        /// Query text, e.g. '{name: /^jo/i}'.
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Print a document file as wrapped display rows.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Wrap width in columns; 0 disables wrapping.
        #[arg(long = "width")]
        width: Option<usize>,

        /// Prefix each row with its 1-based row number.
        #[arg(long = "numbers")]
        numbers: bool,
    },

    /// Copy the entry at a row of a document file.
    Copy {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// 1-based display row to select.
        #[arg(long = "line")]
        line: usize,

        #[arg(long = "mode", value_enum, default_value_t = CopyModeArg::Full)]
        mode: CopyModeArg,

        /// Print the copied text instead of using the clipboard.
        #[arg(long = "stdout")]
        stdout: bool,

        /// Wrap width in columns; 0 disables wrapping.
        #[arg(long = "width")]
        width: Option<usize>,
    },

    /// List documents of a collection file matching a query.
    Find {
        #[arg(value_name = "STORE")]
        store: PathBuf,

        #[arg(long = "filter", default_value = "")]
        filter: String,

        #[arg(long = "sort", default_value = "")]
        sort: String,

        #[arg(long = "projection", default_value = "")]
        projection: String,

        #[arg(long = "skip", default_value_t = 0)]
        skip: usize,

        #[arg(long = "limit")]
        limit: Option<usize>,
    },

    /// Edit a stored document in the external editor.
    Edit {
        #[arg(value_name = "STORE")]
        store: PathBuf,

        /// Document _id: 24 hex digits, an integer, or a string.
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Write a new document in the external editor and store it.
    Insert {
        #[arg(value_name = "STORE")]
        store: PathBuf,
    },

    /// Store an edited copy of a document under a new _id.
    Duplicate {
        #[arg(value_name = "STORE")]
        store: PathBuf,

        #[arg(value_name = "ID")]
        id: String,
    },

    /// Remove a document.
    Delete {
        #[arg(value_name = "STORE")]
        store: PathBuf,

        #[arg(value_name = "ID")]
        id: String,
    },

    /// Show recently used query texts.
    History {
        /// Forget all recorded queries.
        #[arg(long = "clear")]
        clear: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CopyModeArg {
    /// The whole entry, key included.
    Full,
    /// Only the value.
    Value,
}

impl From<CopyModeArg> for CopyMode {
    fn from(mode: CopyModeArg) -> Self {
        match mode {
            CopyModeArg::Full => CopyMode::Full,
            CopyModeArg::Value => CopyMode::Value,
        }
    }
}

/// Everything a command needs besides its own arguments.
pub struct AppContext {
    pub config: Config,
    pub history: QueryHistory,
    pub options: CompileOptions,
}

impl AppContext {
    pub fn new(home: &Path, mut config: Config, cli: &Cli) -> Result<Self> {
        if let Some(editor) = &cli.editor {
            config.editor = Some(editor.clone());
        }
        if let Some(offset) = &cli.utc_offset {
            config.query.naive_utc_offset = Some(offset.clone());
        }
        let options = config.compile_options()?;
        let history = QueryHistory::new(home, config.history.max_entries);
        Ok(Self {
            config,
            history,
            options,
        })
    }

    fn editor(&self) -> SystemEditor {
        SystemEditor::resolve(self.config.editor.as_deref())
    }

    fn compile(&self, text: &str) -> Result<Document> {
        let doc = compile_with(text, &self.options)?;
        if !is_empty_query(text)
            && let Err(err) = self.history.record(text)
        {
            warn!("failed to record query history: {err:#}");
        }
        Ok(doc)
    }
}

pub fn run(command: Command, ctx: &AppContext) -> Result<()> {
    match command {
        Command::Compile { text } => {
            let doc = ctx.compile(&text)?;
            println!("{}", render_document(&doc)?);
        }
        Command::Render {
            file,
            width,
            numbers,
        } => {
            let navigator = open_file(&file, width.unwrap_or(ctx.config.view.width), ctx)?;
            for (index, row) in navigator.lines().iter().enumerate() {
                if numbers {
                    println!("{:>4} {}", index + 1, row.text);
                } else {
                    println!("{}", row.text);
                }
            }
        }
        Command::Copy {
            file,
            line,
            mode,
            stdout,
            width,
        } => {
            let mut navigator = open_file(&file, width.unwrap_or(ctx.config.view.width), ctx)?;
            navigator.select(line.saturating_sub(1));
            let text = if stdout {
                navigator.selection_text(mode.into())?
            } else {
                navigator
                    .copy_selection(mode.into(), &mut SystemClipboard::new())
                    .context("failed to copy selection")?
            };
            if stdout {
                println!("{text}");
            } else {
                eprintln!("Copied {} characters", text.chars().count());
            }
        }
        Command::Find {
            store,
            filter,
            sort,
            projection,
            skip,
            limit,
        } => {
            let query = ListQuery {
                filter: ctx.compile(&filter).context("invalid filter")?,
                sort: ctx.compile(&sort).context("invalid sort")?,
                projection: ctx.compile(&projection).context("invalid projection")?,
                skip,
                limit,
            };
            let store = open_store(&store)?;
            let page = store.list_documents(&query)?;
            for doc in &page.documents {
                println!("{}", format_document(doc)?);
            }
            eprintln!("{} of {} documents", page.documents.len(), page.total);
        }
        Command::Edit { store, id } => {
            let mut store = open_store(&store)?;
            let id = parse_id(&id);
            let doc = store.get_document(&id)?;
            let mut session = DocumentSession::new(
                ctx.config.view.width,
                ctx.config.view.height,
                ctx.options.clone(),
            );
            session.open(doc)?;
            match session.edit(&mut store, &mut ctx.editor())? {
                EditOutcome::Unchanged => println!("Document {id} unchanged"),
                EditOutcome::Updated(_) => {
                    info!(%id, "edited document");
                    println!("Updated document {id}");
                }
            }
        }
        Command::Insert { store } => {
            let mut store = open_store(&store)?;
            match insert_via_editor(&mut store, &mut ctx.editor(), &ctx.options)? {
                Some(id) => println!("Inserted document {id}"),
                None => println!("Nothing to insert"),
            }
        }
        Command::Duplicate { store, id } => {
            let mut store = open_store(&store)?;
            let doc = store.get_document(&parse_id(&id))?;
            match duplicate_via_editor(&doc, &mut store, &mut ctx.editor(), &ctx.options)? {
                Some(id) => println!("Inserted document {id}"),
                None => println!("Nothing to insert"),
            }
        }
        Command::Delete { store, id } => {
            let mut store = open_store(&store)?;
            let id = parse_id(&id);
            store.delete_document(&id)?;
            info!(%id, "deleted document");
            println!("Deleted document {id}");
        }
        Command::History { clear } => {
            if clear {
                ctx.history.clear()?;
                println!("History cleared");
            } else {
                for entry in ctx.history.entries()? {
                    println!("{entry}");
                }
            }
        }
    }
    Ok(())
}

fn open_file(path: &Path, width: usize, ctx: &AppContext) -> Result<Navigator> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let doc = compile_with(&text, &ctx.options)
        .with_context(|| format!("{} is not a valid document", path.display()))?;
    let mut navigator = Navigator::new(width, ctx.config.view.height);
    navigator.open(render_document(&doc)?);
    Ok(navigator)
}

fn open_store(path: &Path) -> Result<JsonLinesStore> {
    JsonLinesStore::open(path).with_context(|| format!("failed to open {}", path.display()))
}

fn parse_id(text: &str) -> DocumentId {
    let Ok(id) = text.parse::<DocumentId>();
    id
}
