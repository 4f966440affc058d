//! File-backed storage across process restarts.

#![allow(clippy::unwrap_used)]

use np_cart::CartSettings;
use np_cart::context::CartContext;
use np_cart::storage::{FileStorage, StorageArea};
use np_cart_core::{ProductId, ProductInput};
use np_cart_integration_tests::product;
use rust_decimal::Decimal;

fn open(dir: &tempfile::TempDir, key: &str) -> CartContext<FileStorage> {
    let settings = CartSettings {
        storage_key: key.to_string(),
        ..CartSettings::default()
    };
    CartContext::new(FileStorage::new(dir.path()), &settings)
}

#[test]
fn test_cart_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let first = open(&dir, "cart");
        first.engine().add_item(&product(1, "12.50"), 2);
        first.engine().add_item(&product(2, "0.99"), 1);
    }

    let second = open(&dir, "cart");
    let cart = second.store().read();
    assert_eq!(cart.item_count(), 3);
    assert_eq!(cart.grand_total(), Decimal::new(2599, 2));
    assert_eq!(cart.lines()[0].id, ProductId::new(1));
}

#[test]
fn test_keys_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let cart = open(&dir, "cart");
    let saved = open(&dir, "saved-for-later");

    cart.engine().add_one(&product(1, "1"));

    assert!(saved.store().read().is_empty());
    assert!(dir.path().join("cart.json").exists());
    assert!(!dir.path().join("saved-for-later.json").exists());
}

#[test]
fn test_clear_removes_file_and_tolerates_missing() {
    let dir = tempfile::tempdir().unwrap();
    let context = open(&dir, "cart");
    context.engine().add_one(&product(1, "1"));

    assert!(context.engine().clear().is_durable());
    assert!(!dir.path().join("cart.json").exists());
    assert!(context.engine().clear().is_durable());
}

#[test]
fn test_stored_blob_matches_wire_shape() {
    let dir = tempfile::tempdir().unwrap();
    let context = open(&dir, "cart");
    context.engine().add_item(&product(4, "3"), 2);

    let raw = context.store().storage().get_item("cart").unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let line = &value[0];

    assert_eq!(line["id"], 4);
    assert_eq!(line["name"], "Product 4");
    assert_eq!(line["image"], "/images/4.jpg");
    assert_eq!(line["quantity"], 2);
    assert_eq!(line["price"].as_f64(), Some(3.0));
    assert_eq!(line["total"].as_f64(), Some(6.0));
}

#[test]
fn test_text_ids_persist_as_strings() {
    let dir = tempfile::tempdir().unwrap();
    let context = open(&dir, "cart");
    context.engine().add_item(&ProductInput::new("SKU-42", "Mango", "2", ""), 3);

    let raw = context.store().storage().get_item("cart").unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["id"], "SKU-42");

    let reopened = open(&dir, "cart");
    assert_eq!(reopened.store().read().item_count(), 3);
}

#[test]
fn test_string_numeric_id_merges_with_number() {
    let dir = tempfile::tempdir().unwrap();
    let context = open(&dir, "cart");
    context
        .store()
        .storage()
        .set_item(
            "cart",
            r#"[{"id":"1","name":"a","price":10,"image":"","quantity":2,"total":20}]"#,
        )
        .unwrap();

    assert_eq!(context.store().read().item_count(), 2);

    let cart = context.engine().add_one(&product(1, "10")).into_result().unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.item_count(), 3);
}
