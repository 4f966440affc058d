//! Cart inspection and mutation commands.
//!
//! # Usage
//!
//! ```bash
//! np-cart show
//! np-cart show --json
//! np-cart add --id 12 --name "Dried Pineapple" --price 19.99 -q 2
//! np-cart set 12 5
//! np-cart remove 12
//! np-cart clear
//! ```
//!
//! # Environment Variables
//!
//! - `CART_STORAGE_DIR` - Directory holding the cart file
//! - `CART_STORAGE_KEY` - Storage key (file name without `.json`)

use std::fmt::Write as _;

use np_cart::context::CartContext;
use np_cart::storage::StorageArea;
use np_cart::Error;
use np_cart_core::{Cart, ProductId, ProductInput};

/// Print the cart.
///
/// With `json`, prints the stored blob as-is (or `[]` when nothing is stored).
#[allow(clippy::print_stdout)]
pub fn show<S: StorageArea>(context: &CartContext<S>, json: bool) {
    if json {
        println!("{}", context.store().raw().unwrap_or_else(|| "[]".to_string()));
    } else {
        print!("{}", render(&context.store().read()));
    }
}

/// Add `quantity` units of a product.
///
/// # Errors
///
/// Returns `Error::BadRequest` for an empty name, or `Error::Store` if the
/// cart could not be written.
pub fn add<S: StorageArea>(
    context: &CartContext<S>,
    id: ProductId,
    name: &str,
    price: &str,
    image: &str,
    quantity: i64,
) -> Result<(), Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest("product name must not be empty".to_string()));
    }

    let product = ProductInput::new(id, name, price, image);
    let cart = context.engine().add_item(&product, quantity).into_result()?;
    report(&cart);
    Ok(())
}

/// Overwrite a line's quantity.
///
/// # Errors
///
/// Returns `Error::Store` if the cart could not be written.
pub fn set<S: StorageArea>(
    context: &CartContext<S>,
    id: &ProductId,
    quantity: i64,
) -> Result<(), Error> {
    if quantity > 0 && context.store().read().get(id).is_none() {
        tracing::warn!(product_id = %id, "product is not in the cart");
    }
    let cart = context.engine().update_quantity(id, quantity).into_result()?;
    report(&cart);
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns `Error::Store` if the cart could not be written.
pub fn remove<S: StorageArea>(context: &CartContext<S>, id: &ProductId) -> Result<(), Error> {
    let cart = context.engine().remove_item(id).into_result()?;
    report(&cart);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `Error::Store` if the cart file could not be removed.
pub fn clear<S: StorageArea>(context: &CartContext<S>) -> Result<(), Error> {
    let cart = context.engine().clear().into_result()?;
    report(&cart);
    Ok(())
}

/// Print the aggregates after a mutation.
#[allow(clippy::print_stdout)]
fn report(cart: &Cart) {
    println!("{}", summary(cart));
}

fn summary(cart: &Cart) -> String {
    let count = cart.item_count();
    let noun = if count == 1 { "item" } else { "items" };
    format!("{count} {noun}, total {:.2}", cart.grand_total())
}

/// Format the cart as a plain-text table.
fn render(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6}  {:<32} {:>10} {:>5} {:>10}",
        "ID", "NAME", "PRICE", "QTY", "TOTAL"
    );
    for line in cart.lines() {
        let _ = writeln!(
            out,
            "{:>6}  {:<32} {:>10.2} {:>5} {:>10.2}",
            line.id,
            line.name,
            line.price,
            line.quantity,
            line.line_total()
        );
    }
    let _ = writeln!(out, "{}", summary(cart));
    out
}
