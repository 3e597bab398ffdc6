//! # Seed Data Generator
//!
//! Populates a SQLite workbook with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./ledger_dev.db with 40 items (default)
//! cargo run -p ledger-db --bin seed
//!
//! # Custom item count and database path
//! cargo run -p ledger-db --bin seed -- --count 200 --db ./data/ledger.db
//! ```
//!
//! ## Generated Data
//! - Inventory: `{CATEGORY}-{INDEX}` SKUs with retail, wholesale and cost
//! - Customers: a handful of named customers, some with store credit
//! - Settings: company profile, `TaxRate = 0.08`, `NextInvoiceID = 1001`
//! - Expenses: one rent row for the current month
//!
//! Transactions are left empty; they are only ever written by a checkout.

use std::env;
use std::sync::Arc;

use chrono::Local;
use ledger_core::{
    Customer, Expense, InventoryItem, Money, DATE_FORMAT, NEXT_INVOICE_ID_KEY,
};
use ledger_db::{DbConfig, SqliteWorkbook, Workbook};
use uuid::Uuid;

/// Product families for demo inventory.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("TEE", &["Classic Tee", "Pocket Tee", "V-Neck", "Long Sleeve", "Tank"]),
    ("HAT", &["Snapback", "Beanie", "Bucket Hat", "Trucker"]),
    ("MUG", &["Camp Mug", "Latte Mug", "Travel Tumbler"]),
    ("STK", &["Die-Cut Sticker", "Holo Sticker", "Sticker Pack"]),
];

const COLORS: &[&str] = &["Black", "White", "Red", "Navy", "Sage"];

const CUSTOMERS: &[(&str, &str, i64)] = &[
    ("Ann Lee", "ann@example.com", 2_500),
    ("Bob Ruiz", "bob@example.com", 0),
    ("Cam Ortiz", "cam@example.com", 1_000),
    ("Dee Park", "dee@example.com", 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path = String::from("./ledger_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Sheet Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of inventory items (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./ledger_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Sheet Ledger Seed Data Generator");
    println!("===================================");
    println!("Database: {}", db_path);
    println!("Items:    {}", count);
    println!();

    let store = SqliteWorkbook::open(&DbConfig::new(&db_path)).await?;
    let workbook = Workbook::new(Arc::new(store));

    let created = workbook.ensure_all().await?;
    println!("✓ Connected, {} sheet(s) created", created.len());

    let existing = workbook.inventory().list().await?.len();
    if existing > 0 {
        println!("⚠ Workbook already has {} inventory rows", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Inventory
    let mut generated = 0;
    'outer: for (category, names) in CATEGORIES {
        for (name_idx, name) in names.iter().enumerate() {
            for (color_idx, color) in COLORS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }
                let item = generate_item(category, name, color, name_idx * 10 + color_idx);
                workbook.inventory().insert(&item).await?;
                generated += 1;
            }
        }
    }
    println!("✓ Generated {} inventory items", generated);

    // Customers
    let today = Local::now().format(DATE_FORMAT).to_string();
    for (name, email, credit_cents) in CUSTOMERS {
        let customer = Customer {
            customer_id: customer_token(),
            name: name.to_string(),
            email: email.to_string(),
            phone: String::new(),
            joined: today.clone(),
            address: String::new(),
            notes: String::new(),
            credit: Money::from_cents(*credit_cents),
        };
        workbook.customers().insert(&customer).await?;
    }
    println!("✓ Generated {} customers", CUSTOMERS.len());

    // Settings
    let settings = workbook.settings();
    settings.upsert("CompanyName", "Sheet Ledger Demo Co.").await?;
    settings.upsert("Address", "1 Market St").await?;
    settings.upsert("TaxRate", "0.08").await?;
    settings.upsert("VenmoUser", "@ledger-demo").await?;
    settings.upsert(NEXT_INVOICE_ID_KEY, "1001").await?;
    println!("✓ Settings written (next invoice 1001)");

    // Expenses
    workbook
        .expenses()
        .append(&Expense {
            date: today,
            category: "Rent".to_string(),
            amount: Money::from_cents(120_000),
            description: "Monthly rent".to_string(),
        })
        .await?;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single item with deterministic demo values.
fn generate_item(category: &str, name: &str, color: &str, seed: usize) -> InventoryItem {
    let price_cents = 499 + ((seed * 37) % 2_500) as i64;
    let wholesale_cents = price_cents * 60 / 100;
    let cost = (price_cents as f64 * (0.3 + (seed % 10) as f64 / 100.0)).round() / 100.0;

    InventoryItem {
        sku: format!("{}-{:03}", category, seed),
        name: format!("{} ({})", name, color),
        price: Money::from_cents(price_cents),
        wholesale_price: Money::from_cents(wholesale_cents),
        stock_qty: (seed % 40) as i64,
        cost: Some(cost),
    }
}

/// `C-` plus five hex characters.
fn customer_token() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("C-{}", &hex[..5])
}
