//! Terminal front end for the softphone

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info, warn};
use login::{FieldKind, LoginFlow, LoginState};
use ratatui::{backend::Backend, Terminal};
use settings_manager::{
    load_overrides, FileStorage, MemoryStorage, Settings, SettingsManager, SettingsStorage,
};
use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

mod ui;


/// softphone - SIP over WebSocket softphone
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// TOML file with host-provided override settings
    #[clap(long, value_name = "PATH")]
    overrides: Option<PathBuf>,

    /// Settings file (defaults to the user data directory)
    #[clap(long, value_name = "PATH", conflicts_with = "ephemeral")]
    storage: Option<PathBuf>,

    /// Keep settings in memory only
    #[clap(long)]
    ephemeral: bool,

    /// Clear persisted settings and exit
    #[clap(long, conflicts_with = "print")]
    reset: bool,

    /// Print the effective settings as JSON and exit
    #[clap(long)]
    print: bool,
}

fn build_storage(args: &Args) -> Result<Box<dyn SettingsStorage>> {
    if args.ephemeral {
        debug!("Using in-memory settings storage");
        return Ok(Box::new(MemoryStorage::new()));
    }
    let storage = match &args.storage {
        Some(path) => FileStorage::with_file(path),
        None => FileStorage::new()?,
    };
    debug!("Using settings file {:?}", storage.path());
    Ok(Box::new(storage))
}

/// App state
struct App {
    /// The one settings store
    store: SettingsManager,
    /// Login screen controller
    flow: LoginFlow,
    /// Filled by the login flow's callback
    logged_in: Rc<RefCell<Option<Settings>>>,
    /// Settings of the accepted login, once persisted
    session: Option<Settings>,
    /// Whether the app should exit
    should_quit: bool,
}

impl App {
    fn new(store: SettingsManager) -> Self {
        let logged_in = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&logged_in);
        let flow = LoginFlow::new(store.snapshot(), store.default_domain(), move |settings| {
            *sink.borrow_mut() = Some(settings);
        });

        Self {
            store,
            flow,
            logged_in,
            session: None,
            should_quit: false,
        }
    }

    /// Handle input events
    fn handle_event(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        if self.session.is_some() {
            self.should_quit = true;
            return Ok(());
        }

        match self.flow.state() {
            LoginState::SettingsOpen => self.handle_settings_key(key)?,
            _ => self.handle_login_key(key)?,
        }

        self.finish_login()
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('s') if ctrl => self.flow.open_settings(),
            KeyCode::Char('r') if ctrl => self.flow.reset(&mut self.store)?,
            KeyCode::Enter => {
                self.flow.submit();
            }
            KeyCode::Backspace => {
                let mut name = self.flow.display_name().to_string();
                name.pop();
                self.flow.change_display_name(name);
            }
            KeyCode::Char(c) if !ctrl => {
                let mut name = self.flow.display_name().to_string();
                name.push(c);
                self.flow.change_display_name(name);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.flow.cancel_settings();
                return Ok(());
            }
            KeyCode::Enter => {
                if let Err(e) = self.flow.submit_editor() {
                    debug!("Settings rejected, {}: {}", e.field.label(), e.message);
                }
                return Ok(());
            }
            KeyCode::Char('r') if ctrl => {
                self.flow.reset(&mut self.store)?;
                return Ok(());
            }
            _ => {}
        }

        let Some(editor) = self.flow.editor_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Down | KeyCode::Tab => editor.focus_next(),
            KeyCode::Up | KeyCode::BackTab => editor.focus_prev(),
            KeyCode::Backspace => editor.backspace(),
            KeyCode::Char(' ')
                if matches!(editor.focused().kind(), FieldKind::Toggle | FieldKind::Choice) =>
            {
                editor.activate()
            }
            KeyCode::Char(c) if !ctrl => editor.input(c),
            _ => {}
        }
        Ok(())
    }

    /// Persist whatever the login flow handed over
    fn finish_login(&mut self) -> Result<()> {
        let Some(settings) = self.logged_in.borrow_mut().take() else {
            return Ok(());
        };

        self.store
            .set(settings.clone())
            .context("Failed to save settings")?;
        info!(
            "Logged in as {}",
            settings.uri.as_deref().unwrap_or_default()
        );
        self.session = Some(settings);
        Ok(())
    }
}

fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::draw(f, &app.flow, app.session.as_ref()))?;

        if event::poll(tick_rate)? {
            let event = event::read()?;
            app.handle_event(event)?;
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configure logging based on debug flag
    if args.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
        debug!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    info!("Starting softphone");

    let mut storage = build_storage(&args)?;
    if args.reset {
        storage.clear().context("Failed to clear settings")?;
        println!("Settings cleared");
        return Ok(());
    }

    let overrides = load_overrides(args.overrides.as_deref())?;
    let store = SettingsManager::new(storage, overrides).context("Failed to load settings")?;

    if args.print {
        println!("{}", serde_json::to_string_pretty(store.get())?);
        return Ok(());
    }

    if store.is_ready()? {
        debug!("Returning user, settings found");
    } else {
        debug!("First run, no stored settings");
    }

    let mut app = App::new(store);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        warn!("Exiting on error: {:#}", e);
    }
    result?;

    if let Some(settings) = &app.session {
        println!(
            "Logged in as {} <{}> via {}",
            settings.display_name.as_deref().unwrap_or_default(),
            settings.uri.as_deref().unwrap_or_default(),
            settings.socket.uri
        );
    }

    info!("Exiting softphone");
    Ok(())
}
