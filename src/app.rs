use crate::commands::{self, PaletteCommand};
use crate::data::{CartRepository, ProductsRepository};
use crate::db::ProductsDao;
use crate::event::{Event, EventHandler};
use crate::query::Query;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{CartView, ProductsView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(200);

/// Everything views need to build their queries
#[derive(Clone)]
pub struct AppContext {
  pub products: Arc<dyn ProductsRepository>,
  pub cart: CartRepository,
  /// Local catalog, read for palette suggestions
  pub catalog: ProductsDao,
  pub api_url: String,
  pub offline: bool,
  pub user: Option<String>,
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` palette
  command: CommandInput,

  /// Categories in the local cache, kept current for the palette
  categories: Query<Vec<String>>,

  ctx: AppContext,

  /// Last message for the footer
  status: Option<String>,

  should_quit: bool,
}

impl App {
  /// Needs a running tokio runtime: the root view starts fetching right away.
  pub fn new(ctx: AppContext) -> Self {
    let root = Self::products_view(&ctx, None);
    let catalog = ctx.catalog.clone();
    let mut categories = Query::new(move || catalog.cache_categories());
    categories.fetch();

    Self {
      view_stack: vec![root],
      command: CommandInput::new(),
      categories,
      ctx,
      status: None,
      should_quit: false,
    }
  }

  fn products_view(ctx: &AppContext, category: Option<String>) -> Box<dyn View> {
    Box::new(ProductsView::new(ctx.products.clone(), ctx.cart.clone(), category))
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    info!("TUI started");

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    info!("TUI stopped");
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        if self.categories.poll() {
          if let Some(categories) = self.categories.latest() {
            self.command.set_categories(categories.clone());
          }
        }
        if let Some(view) = self.view_stack.last_mut() {
          view.tick();
        }
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.command.handle_key(key) {
      KeyResult::Handled => return,
      KeyResult::Event(CommandEvent::Submitted(cmd)) => {
        self.execute_command(&cmd);
        return;
      }
      KeyResult::Event(CommandEvent::Cancelled) => return,
      KeyResult::NotHandled => {}
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };

    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.view_stack.push(next),
      ViewAction::Pop => self.pop_view(),
    }
  }

  fn pop_view(&mut self) {
    if self.view_stack.len() > 1 {
      self.view_stack.pop();
    } else {
      self.should_quit = true;
    }
  }

  fn execute_command(&mut self, line: &str) {
    debug!(command = line, "Executing command");
    self.status = None;

    let command = match commands::parse(line) {
      Ok(Some(command)) => command,
      Ok(None) => return,
      Err(message) => {
        self.status = Some(message);
        return;
      }
    };

    match command {
      PaletteCommand::Products { category } => {
        self.view_stack.clear();
        self.view_stack.push(Self::products_view(&self.ctx, category));
      }
      PaletteCommand::Cart => {
        self.view_stack.truncate(1);
        self
          .view_stack
          .push(Box::new(CartView::new(self.ctx.cart.clone())));
      }
      PaletteCommand::Refresh => {
        if let Some(view) = self.view_stack.last_mut() {
          view.refresh();
        }
      }
      PaletteCommand::Quit => self.should_quit = true,
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn api_url(&self) -> &str {
    &self.ctx.api_url
  }

  pub fn is_offline(&self) -> bool {
    self.ctx.offline
  }

  pub fn user(&self) -> Option<&str> {
    self.ctx.user.as_deref()
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self.view_stack.iter().map(|v| v.breadcrumb_label()).collect()
  }
}
