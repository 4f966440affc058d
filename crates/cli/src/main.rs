//! Naked Pineapple cart CLI - Inspect and edit the local cart.
//!
//! The CLI is one more context over the file-backed storage area, so every
//! command reads the current cart from disk and writes it back through the
//! same mutation engine the other components use.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with its item count and grand total
//! np-cart show
//!
//! # Add two units of a product
//! np-cart add --id 12 --name "Dried Pineapple" --price 19.99 --image /img/12.jpg -q 2
//!
//! # Change a line's quantity (0 or less removes it)
//! np-cart set 12 5
//!
//! # Remove a line
//! np-cart remove 12
//!
//! # Submit the cart to the configured order endpoint
//! np-cart checkout
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart
//! - `add` - Add a product
//! - `set` - Set a line's quantity
//! - `remove` - Remove a line
//! - `clear` - Empty the cart
//! - `checkout` - Submit an order and clear the cart on success

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use np_cart::CartConfig;
use np_cart_core::ProductId;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "np-cart")]
#[command(author, version, about = "Naked Pineapple local cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart
    Show {
        /// Print the stored JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Add a product to the cart
    Add {
        /// Product ID
        #[arg(long)]
        id: ProductId,

        /// Product display name
        #[arg(short, long)]
        name: String,

        /// Unit price (numbers or numeric strings)
        #[arg(short, long)]
        price: String,

        /// Image URL
        #[arg(short, long, default_value = "")]
        image: String,

        /// Units to add (0 or less adds one)
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Set the quantity of a line
    Set {
        /// Product ID
        id: ProductId,

        /// New quantity (0 or less removes the line)
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line from the cart
    Remove {
        /// Product ID
        id: ProductId,
    },
    /// Empty the cart
    Clear,
    /// Submit the cart as an order
    Checkout,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CartConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "np_cart=warn,np_cart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &CartConfig) -> Result<(), Box<dyn std::error::Error>> {
    let context = commands::open_context(config);

    match cli.command {
        Commands::Show { json } => commands::cart::show(&context, json),
        Commands::Add {
            id,
            name,
            price,
            image,
            quantity,
        } => commands::cart::add(&context, id, &name, &price, &image, quantity)?,
        Commands::Set { id, quantity } => commands::cart::set(&context, &id, quantity)?,
        Commands::Remove { id } => commands::cart::remove(&context, &id)?,
        Commands::Clear => commands::cart::clear(&context)?,
        Commands::Checkout => commands::checkout::run(&context, config).await?,
    }
    Ok(())
}
