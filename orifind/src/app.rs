//! Event loop: stdin commands in, status lines and focused matches out.
//!
//! Everything that touches the search session runs on the main thread.
//! Stdin and the optional file watcher feed one channel, and the session
//! gets a tick whenever no event is waiting and it still has work.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::Instant;

use parking_lot::Mutex;

use orifind_core::{
    Direction, Document, Event, EventListener, NavOutcome, NodeId, SearchConfig, SearchSession,
    TextSource,
};

use crate::monitor::DocumentMonitor;
use crate::render;

/// Everything the event loop reacts to.
#[derive(Debug)]
pub enum AppEvent {
    /// One line typed on stdin.
    Input(String),
    /// Stdin reached end of file.
    InputClosed,
    /// The watched file was reloaded into the shared document.
    DocumentChanged,
    /// Forwarded from the search session.
    Search(Event),
}

/// What to open and how.
#[derive(Debug)]
pub struct Options {
    pub file: PathBuf,
    pub query: Option<String>,
    pub watch: bool,
}

/// Session listener posting into the event loop's channel.
struct ChannelListener {
    tx: mpsc::Sender<AppEvent>,
}

impl EventListener for ChannelListener {
    fn send_event(&self, event: Event) {
        let _ = self.tx.send(AppEvent::Search(event));
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Search(String),
    Next,
    Previous,
    ToggleCase,
    ToggleWord,
    Clear,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        match line {
            ":n" => Self::Next,
            ":p" => Self::Previous,
            ":c" => Self::ToggleCase,
            ":w" => Self::ToggleWord,
            ":clear" => Self::Clear,
            ":q" => Self::Quit,
            _ => Self::Search(line.to_owned()),
        }
    }
}

pub struct App {
    document: Arc<Mutex<Document>>,
    /// Root of the document the session last saw. The watcher swaps in a
    /// whole new tree, and roots are never reused.
    root: NodeId,
    session: SearchSession<ChannelListener>,
    events: mpsc::Receiver<AppEvent>,
    input_closed: bool,
}

impl App {
    /// Load the file, start the input reader (and watcher), and run until
    /// `:q` or until stdin closes and the last search settles.
    pub fn run(config: &SearchConfig, options: Options) -> Result<(), String> {
        let text = std::fs::read_to_string(&options.file)
            .map_err(|e| format!("{}: {e}", options.file.display()))?;
        let document = Arc::new(Mutex::new(Document::from_plain_text(&text)));
        log::info!(
            "app: loaded {} ({} nodes)",
            options.file.display(),
            document.lock().len()
        );

        let (tx, rx) = mpsc::channel();
        spawn_input(tx.clone())?;
        let monitor = if options.watch {
            DocumentMonitor::new(&options.file, Arc::clone(&document), tx.clone())
        } else {
            None
        };

        let mut app = Self::new(config, document, tx, rx);

        if let Some(query) = &options.query {
            app.session
                .perform_search(&mut app.document.lock(), query, Instant::now());
        }

        app.event_loop();

        let Self {
            document, session, ..
        } = app;
        session.teardown(&mut document.lock());
        if let Some(monitor) = monitor {
            monitor.shutdown();
        }
        Ok(())
    }

    fn new(
        config: &SearchConfig,
        document: Arc<Mutex<Document>>,
        tx: mpsc::Sender<AppEvent>,
        events: mpsc::Receiver<AppEvent>,
    ) -> Self {
        let root = document.lock().root();
        Self {
            document,
            root,
            session: SearchSession::new(config, ChannelListener { tx }),
            events,
            input_closed: false,
        }
    }

    fn event_loop(&mut self) {
        loop {
            let now = Instant::now();
            let event = match self.session.next_wakeup(now) {
                Some(deadline) => {
                    match self.events.recv_timeout(deadline.saturating_duration_since(now)) {
                        Ok(ev) => Some(ev),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                // Idle with no more input: flush what is queued, then stop.
                None if self.input_closed => match self.events.try_recv() {
                    Ok(ev) => Some(ev),
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => return,
                },
                None => match self.events.recv() {
                    Ok(ev) => Some(ev),
                    Err(_) => return,
                },
            };

            match event {
                Some(ev) => {
                    if !self.handle(ev) {
                        return;
                    }
                }
                None => self.tick(),
            }
        }
    }

    /// One unit of session work, unless the document was swapped under us.
    fn tick(&mut self) {
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();
        // A scan must never finish against a tree it did not start on.
        if !self.sync_document(&mut doc) {
            self.session.tick(&mut doc, Instant::now());
        }
    }

    /// React to one event. Returns `false` to quit.
    fn handle(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Input(line) => return self.command(Command::parse(&line)),
            AppEvent::InputClosed => {
                log::debug!("app: stdin closed");
                self.input_closed = true;
            }
            AppEvent::DocumentChanged => {
                let document = Arc::clone(&self.document);
                self.sync_document(&mut document.lock());
            }
            AppEvent::Search(Event::StatusChanged(status)) => {
                let line = render::status(&status, self.session.options());
                if !line.is_empty() {
                    println!("{line}");
                }
            }
            AppEvent::Search(Event::ScrollIntoView { node, index }) => {
                if let Some(text) = render::focus(&self.document.lock(), index, node) {
                    println!("{text}");
                }
            }
        }
        true
    }

    fn command(&mut self, command: Command) -> bool {
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();
        self.sync_document(&mut doc);
        match command {
            Command::Search(query) => {
                self.session.perform_search(&mut doc, &query, Instant::now());
            }
            Command::Next => self.navigate(&mut doc, Direction::Next),
            Command::Previous => self.navigate(&mut doc, Direction::Previous),
            Command::ToggleCase => {
                let on = self.session.toggle_case_sensitive(&mut doc);
                println!("-- case sensitive: {}", if on { "on" } else { "off" });
            }
            Command::ToggleWord => {
                let on = self.session.toggle_whole_word(&mut doc);
                println!("-- whole word: {}", if on { "on" } else { "off" });
            }
            Command::Clear => self.session.clear_search(&mut doc),
            Command::Quit => return false,
        }
        true
    }

    /// Notice a reloaded document and restart the search on it. Returns
    /// whether it had changed.
    fn sync_document(&mut self, doc: &mut Document) -> bool {
        if doc.root() == self.root {
            return false;
        }
        self.root = doc.root();
        println!("-- document reloaded");
        self.session.content_changed(doc);
        true
    }

    fn navigate(&mut self, doc: &mut Document, direction: Direction) {
        match self.session.navigate(doc, direction) {
            NavOutcome::Empty => println!("-- nothing to navigate"),
            NavOutcome::Stale => println!("-- results out of date, searching again"),
            NavOutcome::Moved(_) => {}
        }
    }
}

fn spawn_input(tx: mpsc::Sender<AppEvent>) -> Result<(), String> {
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(AppEvent::Input(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(AppEvent::InputClosed);
        })
        .map(drop)
        .map_err(|e| format!("failed to spawn input thread: {e}"))
}
