/// Schema applied on every open.
pub const SCHEMA: &str = r#"
-- Last successful catalog fetch, overwritten per product id
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    price REAL NOT NULL,
    image TEXT NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per product in the cart
CREATE TABLE IF NOT EXISTS cart_items (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    price REAL NOT NULL,
    image TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity >= 1)
);

-- Encrypted key/value pairs; keys are stored hashed
CREATE TABLE IF NOT EXISTS secure_prefs (
    key_hash TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
