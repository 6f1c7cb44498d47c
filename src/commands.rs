//! Grammar of the `:` palette.
//!
//! A line is a verb, optionally followed by an argument. Only `products`
//! takes one: a category to narrow the catalog to. Category suggestions
//! come from whatever the local cache currently holds.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteCommand {
  Products { category: Option<String> },
  Cart,
  Refresh,
  Quit,
}

/// A line the palette can offer, with a hint shown next to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
  pub line: String,
  pub hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
  Products,
  Cart,
  Refresh,
  Quit,
}

impl Verb {
  const ALL: [Verb; 4] = [Verb::Products, Verb::Cart, Verb::Refresh, Verb::Quit];

  fn name(self) -> &'static str {
    match self {
      Verb::Products => "products",
      Verb::Cart => "cart",
      Verb::Refresh => "refresh",
      Verb::Quit => "quit",
    }
  }

  fn aliases(self) -> &'static [&'static str] {
    match self {
      Verb::Products => &["p", "shop"],
      Verb::Cart => &["c", "basket"],
      Verb::Refresh => &["r"],
      Verb::Quit => &["q", "exit"],
    }
  }

  fn hint(self) -> &'static str {
    match self {
      Verb::Products => "Browse the catalog, optionally one category",
      Verb::Cart => "Show the shopping cart",
      Verb::Refresh => "Fetch the current view again",
      Verb::Quit => "Exit quickmart",
    }
  }

  fn lookup(word: &str) -> Option<Verb> {
    let word = word.to_lowercase();
    Verb::ALL
      .into_iter()
      .find(|v| v.name() == word || v.aliases().contains(&word.as_str()))
  }

  /// Lower is better. `None` when `word` does not match at all.
  fn rank(self, word: &str) -> Option<u8> {
    let name = self.name();
    let aliases = self.aliases();
    if name == word {
      Some(0)
    } else if aliases.contains(&word) {
      Some(1)
    } else if name.starts_with(word) {
      Some(2)
    } else if aliases.iter().any(|a| a.starts_with(word)) {
      Some(3)
    } else if name.contains(word) {
      Some(4)
    } else {
      None
    }
  }

  fn suggestion(self) -> Suggestion {
    Suggestion {
      line: self.name().to_string(),
      hint: self.hint().to_string(),
    }
  }
}

fn split(line: &str) -> (&str, &str) {
  match line.trim_start().split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (line.trim(), ""),
  }
}

/// Parse a submitted line. Blank input is `Ok(None)`; the error is the
/// message to show the user.
pub fn parse(line: &str) -> Result<Option<PaletteCommand>, String> {
  let (word, arg) = split(line);
  if word.is_empty() {
    return Ok(None);
  }

  let verb = Verb::lookup(word).ok_or_else(|| format!("Unknown command: {}", word))?;
  let command = match verb {
    Verb::Products => PaletteCommand::Products {
      category: (!arg.is_empty()).then(|| arg.to_string()),
    },
    _ if !arg.is_empty() => return Err(format!("{} takes no argument", verb.name())),
    Verb::Cart => PaletteCommand::Cart,
    Verb::Refresh => PaletteCommand::Refresh,
    Verb::Quit => PaletteCommand::Quit,
  };
  Ok(Some(command))
}

/// Suggestions for what has been typed so far, best first.
///
/// Once the verb is `products` and a space follows, suggestions switch to the
/// known categories, with the unfiltered catalog listed first.
pub fn suggest(input: &str, categories: &[String]) -> Vec<Suggestion> {
  let has_arg = input.trim_start().contains(char::is_whitespace);
  let (word, arg) = split(input);

  if has_arg {
    return match Verb::lookup(word) {
      Some(Verb::Products) => suggest_categories(arg, categories),
      _ => Vec::new(),
    };
  }

  let word = word.to_lowercase();
  let mut ranked: Vec<(u8, Verb)> = Verb::ALL
    .into_iter()
    .filter_map(|v| v.rank(&word).map(|r| (r, v)))
    .collect();
  // Stable, so ties keep table order
  ranked.sort_by_key(|(r, _)| *r);
  ranked.into_iter().map(|(_, v)| v.suggestion()).collect()
}

fn suggest_categories(partial: &str, categories: &[String]) -> Vec<Suggestion> {
  let partial = partial.to_lowercase();
  let in_category = |category: &String| Suggestion {
    line: format!("products {}", category),
    hint: "Only this category".to_string(),
  };

  if partial.is_empty() {
    return std::iter::once(Verb::Products.suggestion())
      .chain(categories.iter().map(in_category))
      .collect();
  }

  let (prefixed, containing): (Vec<&String>, Vec<&String>) = categories
    .iter()
    .filter(|c| c.to_lowercase().contains(&partial))
    .partition(|c| c.to_lowercase().starts_with(&partial));

  prefixed.into_iter().chain(containing).map(in_category).collect()
}
