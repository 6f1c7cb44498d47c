mod app;
mod cli;
mod commands;
mod config;
mod data;
mod db;
mod event;
mod logging;
mod network;
mod query;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::data::{AuthRepository, CartRepository, ProductsRepositoryImpl, SecureStorage};
use crate::db::Database;
use crate::network::{FixedConnectivity, NetworkMonitor, QuickMartApi, QuickMartClient, TcpReachability};

#[derive(Parser, Debug)]
#[command(name = "quickmart")]
#[command(about = "Browse a product catalog and keep a cart, online or offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/quickmart/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Never touch the network; serve the catalog from the local cache
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
  /// Fetch the catalog once and print the outcome
  Products,
  /// Sign in (password from QUICKMART_PASSWORD, else the saved one)
  Login {
    #[arg(short, long)]
    username: String,
  },
  /// Create an account (password from QUICKMART_PASSWORD)
  Signup {
    #[arg(short, long)]
    email: String,
    #[arg(short, long)]
    username: String,
  },
  /// Drop the current session
  Logout {
    /// Also forget the saved username and password
    #[arg(long)]
    forget: bool,
  },
  /// Inspect or change the cart
  #[command(subcommand)]
  Cart(CartCommand),
}

#[derive(Subcommand, Debug)]
enum CartCommand {
  List,
  /// Add a cached product by id
  Add {
    id: i64,
    #[arg(short, long, default_value_t = 1)]
    quantity: i64,
  },
  Remove {
    id: i64,
  },
  Clear,
  /// Place an order for everything in the cart
  Checkout {
    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;
  let data_dir = config.data_dir()?;

  let _log_guard = logging::init(
    &data_dir.join("logs"),
    config.log_filter.as_deref(),
    args.command.is_some(),
  )?;

  let db = Database::open(&data_dir.join("quickmart.db"))?;
  let client = QuickMartClient::new(&config)?;
  let api_url = client.base_url().to_string();

  let network: Arc<dyn NetworkMonitor> = if args.offline {
    Arc::new(FixedConnectivity(false))
  } else {
    Arc::new(TcpReachability::for_url(client.base_url(), config.connect_check_timeout())?)
  };
  let api: Arc<dyn QuickMartApi> = Arc::new(client);

  let products = Arc::new(ProductsRepositoryImpl::new(api.clone(), db.products(), network));
  let cart = CartRepository::new(db.cart());
  let auth = AuthRepository::new(api, SecureStorage::open(&data_dir, db.prefs())?);

  match args.command {
    None => {
      let user = auth.current_session()?.map(|s| s.username);
      let mut app = app::App::new(app::AppContext {
        products,
        cart,
        catalog: db.products(),
        api_url,
        offline: args.offline,
        user,
      });
      app.run().await?;
    }
    Some(CliCommand::Products) => cli::products(products.as_ref(), &db.products()).await?,
    Some(CliCommand::Login { username }) => cli::login(&auth, &username).await?,
    Some(CliCommand::Signup { email, username }) => cli::signup(&auth, &email, &username).await?,
    Some(CliCommand::Logout { forget }) => cli::logout(&auth, forget)?,
    Some(CliCommand::Cart(cmd)) => match cmd {
      CartCommand::List => cli::cart_list(&cart)?,
      CartCommand::Add { id, quantity } => cli::cart_add(&cart, &db.products(), id, quantity)?,
      CartCommand::Remove { id } => cli::cart_remove(&cart, id)?,
      CartCommand::Clear => cli::cart_clear(&cart)?,
      CartCommand::Checkout { yes } => cli::checkout(&cart, |total| {
        if yes {
          Ok(true)
        } else {
          cli::confirm_on_stdin(total)
        }
      })?,
    },
  }

  Ok(())
}
