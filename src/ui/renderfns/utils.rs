/// Truncate a string to at most `max_len` characters, adding "..." if cut
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    return s.to_string();
  }
  let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
  format!("{}...", kept)
}

/// Prices are stored as plain numbers in the store's currency
pub fn format_price(amount: f64) -> String {
  format!("${:.2}", amount)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    // Byte slicing would panic mid-character here
    assert_eq!(truncate("crème brûlée set", 8), "crème...");
  }

  #[test]
  fn test_format_price() {
    assert_eq!(format_price(109.95), "$109.95");
    assert_eq!(format_price(7.0), "$7.00");
    assert_eq!(format_price(0.0), "$0.00");
  }
}
