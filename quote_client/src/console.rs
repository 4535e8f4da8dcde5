//! Line-oriented console for the quote manager.
//!
//! Input lines arrive from a stdin reader thread over a channel, conflicts from
//! the sync worker over another; `Console::run` multiplexes both with
//! `select!`. While a conflict is pending, the next input line is read as the
//! answer to it instead of as a command.
use crate::model::conflict::{Conflict, PendingConflict, Resolution};
use crate::model::store::{EXPORT_FILE_NAME, QuoteStore};
use crate::notify::Notifier;
use crate::sync::{RemoteSource, SyncHandle};
use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, never, select, unbounded};
use log::{debug, info};
use quote_common::{NewQuote, Quote, QuoteError, Result};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread;

const HELP: &str = "\
Commands:
  random                      show a random quote
  add <category> | <text>     add a quote (posted to the server first)
  filter [category]           list quotes in a category, or all quotes
  all                         list all quotes
  categories                  list categories
  import <path>               import quotes from a JSON file
  export [path]               export all quotes to a JSON file
  sync                        synchronize with the server now
  help                        show this help
  quit                        exit";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Random,
    Add { category: String, text: String },
    Filter(Option<String>),
    Categories,
    Import(PathBuf),
    Export(PathBuf),
    Sync,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = QuoteError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word.to_ascii_lowercase().as_str() {
            "random" | "new" | "r" => ConsoleCommand::Random,
            "add" => {
                let (category, text) = rest.split_once('|').ok_or_else(|| {
                    QuoteError::Format("usage: add <category> | <text>".to_string())
                })?;
                ConsoleCommand::Add {
                    category: category.trim().to_string(),
                    text: text.trim().to_string(),
                }
            }
            "filter" if rest.is_empty() => ConsoleCommand::Filter(None),
            "filter" => ConsoleCommand::Filter(Some(rest.to_string())),
            "all" => ConsoleCommand::Filter(None),
            "categories" => ConsoleCommand::Categories,
            "import" if rest.is_empty() => {
                return Err(QuoteError::Format("usage: import <path>".to_string()));
            }
            "import" => ConsoleCommand::Import(PathBuf::from(rest)),
            "export" if rest.is_empty() => ConsoleCommand::Export(PathBuf::from(EXPORT_FILE_NAME)),
            "export" => ConsoleCommand::Export(PathBuf::from(rest)),
            "sync" => ConsoleCommand::Sync,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            other => {
                return Err(QuoteError::Format(format!(
                    "unknown command `{}`, type `help`",
                    other
                )));
            }
        };
        Ok(command)
    }
}

/// Whether the console keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

enum Input {
    Shutdown,
    /// No Ctrl+C handler left to signal us.
    ShutdownDetached,
    Conflict(Option<PendingConflict>),
    Line(Option<String>),
}

/// Spawn a thread that forwards stdin lines into a channel until EOF.
pub fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("stdin closed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn format_time(timestamp: i64) -> String {
    DateTime::from_timestamp_millis(timestamp)
        .map(|time| time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Interactive front end over the shared store.
pub struct Console<W: Write> {
    store: Arc<Mutex<QuoteStore>>,
    remote: Box<dyn RemoteSource>,
    notifier: Arc<dyn Notifier>,
    // Dropped before `sync`, whose drop waits for the worker.
    pending: Option<PendingConflict>,
    sync: Option<SyncHandle>,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(
        store: Arc<Mutex<QuoteStore>>,
        remote: Box<dyn RemoteSource>,
        notifier: Arc<dyn Notifier>,
        sync: Option<SyncHandle>,
        out: W,
    ) -> Self {
        Self {
            store,
            remote,
            notifier,
            pending: None,
            sync,
            out,
        }
    }

    /// Blocking loop over input lines, conflicts and the shutdown signal.
    pub fn run(
        &mut self,
        lines: Receiver<String>,
        conflicts: Receiver<PendingConflict>,
        shutdown: Receiver<()>,
    ) -> Result<()> {
        self.show_startup()?;
        let mut conflicts = conflicts;
        let mut shutdown = shutdown;

        loop {
            let input = select! {
                recv(shutdown) -> msg => match msg {
                    Ok(()) => Input::Shutdown,
                    Err(_) => Input::ShutdownDetached,
                },
                recv(conflicts) -> msg => Input::Conflict(msg.ok()),
                recv(lines) -> msg => Input::Line(msg.ok()),
            };
            match input {
                Input::Shutdown | Input::Line(None) => break,
                Input::ShutdownDetached => shutdown = never(),
                Input::Conflict(Some(pending)) => self.on_conflict(pending)?,
                // Sync worker is gone.
                Input::Conflict(None) => conflicts = never(),
                Input::Line(Some(line)) => {
                    if self.on_line(&line)? == Control::Quit {
                        break;
                    }
                }
            }
        }
        info!("Console stopping...");
        // The sync worker may be blocked on one of these.
        if let Some(pending) = self.pending.take() {
            pending.resolve(Resolution::Cancel);
        }
        for pending in conflicts.try_iter() {
            pending.resolve(Resolution::Cancel);
        }
        drop(conflicts);
        if let Some(sync) = self.sync.take() {
            sync.stop();
        }
        Ok(())
    }

    /// Shows the remembered category if it still exists, otherwise a random quote.
    pub fn show_startup(&mut self) -> Result<()> {
        let restored = self.store.lock()?.restored_category()?;
        match restored {
            Some(category) => self.filter(Some(category)),
            None => self.show_random(),
        }
    }

    /// Presents a conflict and waits for the next line to answer it.
    pub fn on_conflict(&mut self, pending: PendingConflict) -> Result<()> {
        self.print_conflict(&pending.conflict)?;
        if let Some(previous) = self.pending.replace(pending) {
            previous.resolve(Resolution::Cancel);
        }
        Ok(())
    }

    /// Handles one input line. Command errors are reported, not returned.
    pub fn on_line(&mut self, line: &str) -> Result<Control> {
        let line = line.trim();
        if let Some(pending) = self.pending.take() {
            match line.parse::<Resolution>() {
                Ok(choice) => pending.resolve(choice),
                Err(_) => {
                    writeln!(self.out, "Answer with: local | server | both | cancel")?;
                    self.pending = Some(pending);
                }
            }
            return Ok(Control::Continue);
        }
        if line.is_empty() {
            return Ok(Control::Continue);
        }

        let outcome = line.parse::<ConsoleCommand>().and_then(|cmd| self.execute(cmd));
        match outcome {
            Ok(control) => Ok(control),
            Err(e @ (QuoteError::Io(_) | QuoteError::MutexLock(_))) => Err(e),
            Err(e) => {
                self.notifier.error(&e.to_string());
                Ok(Control::Continue)
            }
        }
    }

    pub fn execute(&mut self, command: ConsoleCommand) -> Result<Control> {
        match command {
            ConsoleCommand::Random => self.show_random()?,
            ConsoleCommand::Add { category, text } => self.add(&text, &category)?,
            ConsoleCommand::Filter(category) => self.filter(category)?,
            ConsoleCommand::Categories => self.show_categories()?,
            ConsoleCommand::Import(path) => self.import(&path)?,
            ConsoleCommand::Export(path) => self.export(&path)?,
            ConsoleCommand::Sync => match &self.sync {
                Some(sync) => {
                    sync.sync_now()?;
                    self.notifier.info("Synchronization requested");
                }
                None => self.notifier.info("Synchronization is disabled"),
            },
            ConsoleCommand::Help => writeln!(self.out, "{}", HELP)?,
            ConsoleCommand::Quit => return Ok(Control::Quit),
        }
        Ok(Control::Continue)
    }

    fn add(&mut self, text: &str, category: &str) -> Result<()> {
        let draft = NewQuote::new(text, category)?;
        self.notifier.info("Saving quote...");
        self.remote.post_quote(&draft)?;

        let (quote, current) = {
            let mut store = self.store.lock()?;
            let quote = store.add(draft.text(), draft.category())?;
            (quote, store.selected_category()?)
        };
        self.notifier.success(&format!(
            "Quote added successfully to category: {}",
            quote.category
        ));
        if current.as_deref().is_none_or(|c| c == quote.category) {
            self.filter(current)?;
        }
        Ok(())
    }

    fn filter(&mut self, category: Option<String>) -> Result<()> {
        let matching: Vec<Quote> = {
            let mut store = self.store.lock()?;
            store.select_category(category.as_deref())?;
            store.filter_by_category(category.as_deref()).cloned().collect()
        };
        if matching.is_empty() {
            writeln!(
                self.out,
                "No quotes found in category: {}",
                category.unwrap_or_default()
            )?;
            return Ok(());
        }
        for quote in &matching {
            self.print_quote(quote)?;
        }
        Ok(())
    }

    fn show_random(&mut self) -> Result<()> {
        let quote = self.store.lock()?.random_quote().cloned();
        match quote {
            Some(quote) => self.print_quote(&quote)?,
            None => writeln!(self.out, "No quotes available")?,
        }
        Ok(())
    }

    fn show_categories(&mut self) -> Result<()> {
        let (categories, selected) = {
            let store = self.store.lock()?;
            (store.list_categories(), store.restored_category()?)
        };
        let marker = |c: &str| if selected.as_deref() == Some(c) { "*" } else { " " };
        writeln!(self.out, "{} All Categories", if selected.is_none() { "*" } else { " " })?;
        for category in &categories {
            writeln!(self.out, "{} {}", marker(category), category)?;
        }
        Ok(())
    }

    fn import(&mut self, path: &Path) -> Result<()> {
        let json = fs::read_to_string(path)
            .map_err(|e| QuoteError::Format(format!("Error reading file {}: {}", path.display(), e)))?;
        let count = self.store.lock()?.import_json(&json)?;
        self.notifier
            .success(&format!("Successfully imported {} quotes!", count));
        self.show_random()
    }

    fn export(&mut self, path: &Path) -> Result<()> {
        let (json, count) = {
            let store = self.store.lock()?;
            (store.export_all()?, store.len())
        };
        fs::write(path, json)
            .map_err(|e| QuoteError::Storage(format!("Error writing {}: {}", path.display(), e)))?;
        self.notifier.success(&format!(
            "Exported {} quotes to {}",
            count,
            path.display()
        ));
        Ok(())
    }

    fn print_quote(&mut self, quote: &Quote) -> Result<()> {
        writeln!(self.out, "\"{}\"", quote.text)?;
        writeln!(self.out, "    Category: {}", quote.category)?;
        Ok(())
    }

    fn print_conflict(&mut self, conflict: &Conflict) -> Result<()> {
        writeln!(self.out, "=== Resolve Conflict (quote {}) ===", conflict.id)?;
        for (label, version) in [("Local Version", &conflict.local), ("Server Version", &conflict.remote)] {
            writeln!(self.out, "{}:", label)?;
            writeln!(self.out, "    \"{}\"", version.text)?;
            writeln!(self.out, "    Category: {}", version.category)?;
            writeln!(self.out, "    Last modified: {}", format_time(version.timestamp))?;
        }
        writeln!(self.out, "Keep [local] | [server] | [both] | [cancel]?")?;
        Ok(())
    }
}
