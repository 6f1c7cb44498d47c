use crate::data::types::{CartItem, Product};
use crate::data::{CartRepository, ProductsOutcome, ProductsRepository};
use crate::network::NetworkResult;
use crate::query::Query;
use crate::ui::components::{describe_outcome, render_banner, Notices};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_price, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::CartView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::sync::Arc;
use tracing::error;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Product catalog list, optionally narrowed to one category
pub struct ProductsView {
  cart: CartRepository,
  category: Option<String>,
  query: Query<ProductsOutcome>,
  /// Last successful catalog, kept on screen while a refetch fails
  products: Vec<Product>,
  list_state: ListState,
  notices: Notices,
  ticks: usize,
}

fn in_category(category: Option<&str>, product: &Product) -> bool {
  category.map_or(true, |c| product.category.eq_ignore_ascii_case(c))
}

impl ProductsView {
  pub fn new(
    products: Arc<dyn ProductsRepository>,
    cart: CartRepository,
    category: Option<String>,
  ) -> Self {
    let mut query = Query::new(move || products.fetch_products());

    // Start fetching immediately
    query.fetch();

    Self {
      cart,
      category,
      query,
      products: Vec::new(),
      list_state: ListState::default(),
      notices: Notices::new(),
      ticks: 0,
    }
  }

  fn is_loading(&self) -> bool {
    self.query.latest().map_or(true, NetworkResult::is_loading)
  }

  fn selected_product(&self) -> Option<&Product> {
    self.list_state.selected().and_then(|i| self.products.get(i))
  }

  fn add_selected_to_cart(&mut self) {
    let Some(product) = self.selected_product() else {
      return;
    };

    let item = CartItem::from_product(product, 1);
    let cart = self.cart.clone();
    self.notices.run_blocking(move || match cart.add_to_cart(&item) {
      Ok(stored) => format!(
        "Added {} (x{})",
        truncate(&stored.title, 30),
        stored.quantity
      ),
      Err(e) => {
        error!(error = %e, product = item.id, "Add to cart failed");
        format!("Could not add to cart: {}", e)
      }
    });
  }

  fn title(&self) -> String {
    let name = match &self.category {
      Some(category) => format!("Products [{}]", category),
      None => "Products".to_string(),
    };
    if self.is_loading() {
      let frame = SPINNER[self.ticks % SPINNER.len()];
      format!(" {} {} loading ", name, frame)
    } else {
      format!(" {} ({}) ", name, self.products.len())
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    ensure_valid_selection(&mut self.list_state, self.products.len());

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.products.is_empty() {
      let content = match &self.category {
        _ if self.is_loading() => "Fetching the catalog...".to_string(),
        Some(category) => format!("No products in '{}'. Try :products <Tab>.", category),
        None => "Nothing to show. Press 'r' to retry.".to_string(),
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let title_width = (area.width as usize).saturating_sub(40).max(10);
    let items: Vec<ListItem> = self
      .products
      .iter()
      .map(|product| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<5}", product.id), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("{:>10}", format_price(product.price)),
            Style::default().fg(Color::Green),
          ),
          Span::raw("  "),
          Span::styled(
            format!("{:<16}", truncate(&product.category, 16)),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(" "),
          Span::raw(truncate(&product.title, title_width)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let Some(product) = self.selected_product() else {
      return;
    };

    let text = vec![
      Line::from(Span::styled(product.title.as_str(), Style::default().bold())),
      Line::from(vec![
        Span::styled(format_price(product.price), Style::default().fg(Color::Green)),
        Span::raw("  "),
        Span::styled(product.category.as_str(), Style::default().fg(Color::Yellow)),
      ]),
      Line::from(product.description.as_str()),
    ];

    let paragraph = Paragraph::new(text)
      .block(Block::default().borders(Borders::ALL).title(" Details "))
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.refresh();
        Some(ViewAction::None)
      }
      KeyCode::Char('a') | KeyCode::Enter => {
        self.add_selected_to_cart();
        Some(ViewAction::None)
      }
      KeyCode::Char('c') => Some(ViewAction::Push(Box::new(CartView::new(self.cart.clone())))),
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for ProductsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_navigation(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Outcome banner
        Constraint::Min(3),    // List
        Constraint::Length(6), // Selected product
        Constraint::Length(1), // Notice
      ])
      .split(area);

    render_banner(frame, chunks[0], &describe_outcome(self.query.latest()));
    self.render_list(frame, chunks[1]);
    self.render_detail(frame, chunks[2]);

    if let Some(notice) = self.notices.current() {
      let line = Paragraph::new(format!(" {}", notice)).style(Style::default().fg(Color::Magenta));
      frame.render_widget(line, chunks[3]);
    }
  }

  fn breadcrumb_label(&self) -> String {
    match &self.category {
      Some(category) => format!("Products [{}]", category),
      None => "Products".to_string(),
    }
  }

  fn tick(&mut self) {
    self.ticks = self.ticks.wrapping_add(1);
    self.notices.poll();
    if self.query.poll() {
      if let Some(products) = self.query.latest().and_then(NetworkResult::data) {
        let category = self.category.as_deref();
        self.products = products
          .iter()
          .filter(|p| in_category(category, p))
          .cloned()
          .collect();
      }
    }
  }

  fn refresh(&mut self) {
    self.notices.clear();
    self.query.refetch();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("a", "add").with_priority(20),
      ShortcutInfo::new("c", "cart").with_priority(30),
      ShortcutInfo::new("r", "refetch").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
