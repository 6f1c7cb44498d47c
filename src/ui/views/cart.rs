use crate::data::cart::cart_total;
use crate::data::types::CartItem;
use crate::data::CartRepository;
use crate::query::Query;
use crate::ui::components::Notices;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_price, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use tracing::error;

/// Cart lines, live from the local store
pub struct CartView {
  cart: CartRepository,
  query: Query<Vec<CartItem>>,
  list_state: ListState,
  notices: Notices,
  /// Total awaiting a yes/no before the order is placed
  pending_order: Option<f64>,
}

impl CartView {
  pub fn new(cart: CartRepository) -> Self {
    let source = cart.clone();
    let mut query = Query::new(move || source.get_all_cart_items());
    query.fetch();

    Self {
      cart,
      query,
      list_state: ListState::default(),
      notices: Notices::new(),
      pending_order: None,
    }
  }

  fn items(&self) -> &[CartItem] {
    self.query.latest().map(Vec::as_slice).unwrap_or(&[])
  }

  fn remove_selected(&mut self) {
    let Some(item) = self.list_state.selected().and_then(|i| self.items().get(i)) else {
      return;
    };
    let (id, title) = (item.id, item.title.clone());
    let cart = self.cart.clone();

    self.notices.run_blocking(move || match cart.remove_cart_item(id) {
      Ok(true) => format!("Removed {}", truncate(&title, 30)),
      Ok(false) => "Already removed".to_string(),
      Err(e) => {
        error!(error = %e, product = id, "Remove from cart failed");
        format!("Could not remove: {}", e)
      }
    });
  }

  fn clear(&mut self) {
    let cart = self.cart.clone();
    self.notices.run_blocking(move || match cart.clear_cart() {
      Ok(()) => "Cart cleared".to_string(),
      Err(e) => {
        error!(error = %e, "Clear cart failed");
        format!("Could not clear the cart: {}", e)
      }
    });
  }

  fn ask_to_place_order(&mut self) {
    if self.items().is_empty() {
      self.notices.set("Your cart is empty, nothing to order");
      return;
    }
    self.pending_order = Some(cart_total(self.items()));
  }

  fn place_order(&mut self) {
    let cart = self.cart.clone();
    self.notices.set("Placing order...");
    self.notices.run_blocking(move || match cart.place_order() {
      Ok(Some(receipt)) => format!(
        "Your order was successful! Total {}",
        format_price(receipt.total)
      ),
      Ok(None) => "Your cart is empty, nothing to order".to_string(),
      Err(e) => {
        error!(error = %e, "Place order failed");
        format!("Could not place the order: {}", e)
      }
    });
  }

  /// While an order waits for confirmation every key answers the question.
  fn handle_confirmation(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('y') | KeyCode::Enter => {
        self.pending_order = None;
        self.place_order();
      }
      KeyCode::Char('n') | KeyCode::Esc => {
        self.pending_order = None;
        self.notices.set("Order cancelled");
      }
      _ => {}
    }
  }

  fn render_confirmation(&self, frame: &mut Frame, area: Rect, total: f64) {
    let width = 44u16.min(area.width);
    let height = 5u16.min(area.height);
    let popup = Rect::new(
      area.x + (area.width - width) / 2,
      area.y + (area.height - height) / 2,
      width,
      height,
    );

    let text = vec![
      Line::from(format!("Place order for {}?", format_price(total))),
      Line::from(""),
      Line::from(Span::styled("y: confirm   n: cancel", Style::default().fg(Color::DarkGray))),
    ];
    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Checkout "),
    );

    frame.render_widget(Clear, popup);
    frame.render_widget(paragraph, popup);
  }
}

impl View for CartView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.pending_order.is_some() {
      self.handle_confirmation(key);
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('d') | KeyCode::Delete => self.remove_selected(),
      KeyCode::Char('C') => self.clear(),
      KeyCode::Char('o') => self.ask_to_place_order(),
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.items().len();
    ensure_valid_selection(&mut self.list_state, len);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(3), Constraint::Length(1)])
      .split(area);

    let total = cart_total(self.items());
    let block = Block::default()
      .title(format!(" Cart ({}) total {} ", len, format_price(total)))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta));

    if len == 0 {
      let paragraph = Paragraph::new("Your cart is empty. Add products with 'a'.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[0]);
    } else {
      let items: Vec<ListItem> = self
        .items()
        .iter()
        .map(|item| {
          ListItem::new(Line::from(vec![
            Span::styled(format!("{:>3} x ", item.quantity), Style::default().fg(Color::Cyan)),
            Span::styled(
              format!("{:>10}", format_price(item.price)),
              Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
              format!("{:>11}", format_price(item.line_total())),
              Style::default().fg(Color::Green),
            ),
            Span::raw("  "),
            Span::raw(truncate(&item.title, 50)),
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

      frame.render_stateful_widget(list, chunks[0], &mut self.list_state);
    }

    if let Some(notice) = self.notices.current() {
      let line = Paragraph::new(format!(" {}", notice)).style(Style::default().fg(Color::Magenta));
      frame.render_widget(line, chunks[1]);
    }

    if let Some(total) = self.pending_order {
      self.render_confirmation(frame, chunks[0], total);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Cart".to_string()
  }

  fn tick(&mut self) {
    self.notices.poll();
    self.query.poll();
  }

  fn refresh(&mut self) {
    self.query.refetch();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("d", "remove").with_priority(20),
      ShortcutInfo::new("C", "clear").with_priority(30),
      ShortcutInfo::new("o", "order").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
