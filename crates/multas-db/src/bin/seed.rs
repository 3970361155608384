//! # Seed Data Generator
//!
//! Inserts the preset services for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default tenant in ./multas_dev.db
//! cargo run -p multas-db --bin seed
//!
//! # Specify database path and tenant
//! cargo run -p multas-db --bin seed -- --db ./data/multas.db --tenant <uuid>
//! ```
//!
//! ## Generated Services
//! - Recurso de multa (STANDARD split: R$ 6,00 / R$ 6,00 / R$ 3,50)
//! - Recurso de multa - capital (CAPITAL split: R$ 11,00 / R$ 11,00 / R$ 3,50)

use chrono::Utc;
use multas_core::{Service, SplitConfig, DEFAULT_TENANT_ID};
use multas_db::{Database, DbConfig};
use std::env;
use uuid::Uuid;

/// (name, description, split, suggested price in centavos)
const PRESETS: &[(&str, &str, SplitConfig, i64)] = &[
    (
        "Recurso de multa",
        "Defesa prévia e recursos JARI/CETRAN",
        SplitConfig::STANDARD,
        6000,
    ),
    (
        "Recurso de multa - capital",
        "Recursos para órgãos autuadores de capitais",
        SplitConfig::CAPITAL,
        8000,
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./multas_dev.db");
    let mut tenant_id = String::from(DEFAULT_TENANT_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Multas Back Office Seed Data");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./multas_dev.db)");
                println!("  -t, --tenant <ID>    Tenant id (default: {})", DEFAULT_TENANT_ID);
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Multas Back Office Seed Data");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Tenant:   {}", tenant_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.services().count(&tenant_id).await?;
    if existing > 0 {
        println!("⚠ Tenant already has {} services", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    for (name, description, split, default_amount_cents) in PRESETS {
        let service = preset_service(&tenant_id, name, description, split, *default_amount_cents);

        if let Err(e) = db.services().insert(&service).await {
            eprintln!("Failed to insert {}: {}", service.name, e);
            continue;
        }

        println!(
            "  + {} (minimum {}, suggested {})",
            service.name,
            split.minimum_charge(),
            service.default_amount().unwrap_or_default()
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn preset_service(
    tenant_id: &str,
    name: &str,
    description: &str,
    split: &SplitConfig,
    default_amount_cents: i64,
) -> Service {
    let now = Utc::now();

    let mut service = Service {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        acsm_value_cents: 0,
        icetran_value_cents: 0,
        taxa_cobranca_cents: 0,
        default_amount_cents: Some(default_amount_cents),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    service.apply_split(split);
    service
}
