//! # Seed Data Generator
//!
//! Books a day of sample reservations for development.
//!
//! ## Usage
//! ```bash
//! # Book tomorrow's schedule into ./slotbook_dev.db
//! cargo run -p slotbook-service --bin seed
//!
//! # Specify database path (or set SLOTBOOK_DB_PATH)
//! cargo run -p slotbook-service --bin seed -- --db ./data/slotbook.db
//!
//! # Book a specific day
//! cargo run -p slotbook-service --bin seed -- --date 2026-03-02
//! ```
//!
//! ## Generated Schedule
//! Every provider works 09:00 to 17:00 UTC. Each books the services it
//! offers back to back, so the day exercises the half-open overlap rule.
//! A share of the reservations are then moved through the lifecycle:
//! - every 3rd is confirmed
//! - every 5th is cancelled by the customer
//! - every 7th gets a tip
//!
//! One deliberately overlapping request per provider is expected to be
//! rejected with a slot conflict.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use slotbook_core::{Actor, CustomerRef, GuestContact, Money, ReservationStatus, SlotWindow};
use slotbook_db::{Database, DbConfig};
use slotbook_service::{
    CustomerInfo, InMemoryDirectory, PricingInputs, ProviderInfo, ReservationError,
    ReservationService, ReserveRequest, ServiceConfig, ServiceDefinition, ServiceInfo,
};

/// Providers and the service ids they offer.
const PROVIDERS: &[(&str, &str, &[&str])] = &[
    ("prov-ana", "Ana's Chair", &["svc-cut", "svc-beard"]),
    ("prov-bo", "Bo Colour Studio", &["svc-colour", "svc-cut"]),
    ("prov-cy", "Cy Massage", &["svc-massage"]),
];

/// (id, name, minutes, price in cents)
const SERVICES: &[(&str, &str, i64, i64)] = &[
    ("svc-cut", "Haircut", 30, 3500),
    ("svc-beard", "Beard Trim", 15, 1500),
    ("svc-colour", "Full Colour", 90, 12000),
    ("svc-massage", "Deep Tissue Massage", 60, 9000),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("cust-001", "Dana Ortiz"),
    ("cust-002", "Eli Moreau"),
    ("cust-003", "Fay Lindqvist"),
    ("cust-004", "Gus Adeyemi"),
];

const DAY_START_HOUR: u32 = 9;
const DAY_END_HOUR: u32 = 17;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut db_path =
        env::var("SLOTBOOK_DB_PATH").unwrap_or_else(|_| String::from("./slotbook_dev.db"));
    let mut day = (Utc::now() + Duration::days(1)).date_naive();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--date" => {
                if i + 1 < args.len() {
                    day = NaiveDate::parse_from_str(&args[i + 1], "%Y-%m-%d")?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Slotbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: $SLOTBOOK_DB_PATH or ./slotbook_dev.db)");
                println!("      --date <DATE>    Day to book, YYYY-MM-DD (default: tomorrow)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Slotbook Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Day:      {}", day);
    println!();

    let config = ServiceConfig::load()?;
    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let directory = Arc::new(InMemoryDirectory::new());
    register_directory(&directory).await;

    let service = ReservationService::new(
        db,
        config,
        directory.clone(),
        directory.clone(),
        directory,
    );

    let opening = Utc
        .from_local_datetime(&day.and_hms_opt(DAY_START_HOUR, 0, 0).ok_or("invalid opening time")?)
        .single()
        .ok_or("ambiguous opening time")?;
    let closing = opening + Duration::hours(i64::from(DAY_END_HOUR - DAY_START_HOUR));
    let whole_day = SlotWindow::new(opening, closing)?;

    // Check existing reservations
    let (first_provider, _, _) = PROVIDERS[0];
    let existing = service
        .list_for_provider(first_provider, &whole_day)
        .await?
        .len();
    if existing > 0 {
        println!("⚠ {} already has {} reservations on {}", first_provider, existing, day);
        println!("  Skipping seed to avoid conflicts.");
        println!("  Pick another --date or delete the database file.");
        return Ok(());
    }

    println!();
    println!("Booking reservations...");

    let started = std::time::Instant::now();
    let mut booked = Vec::new();
    let mut seq = 0usize;

    for (provider_id, display_name, offered) in PROVIDERS {
        let mut cursor = opening;
        let mut index = 0usize;

        loop {
            let service_id = offered[index % offered.len()];
            let minutes = service_minutes(service_id);
            let window = SlotWindow::starting_at(cursor, minutes)?;
            if window.end() > closing {
                break;
            }

            let request = sample_request(provider_id, service_id, window, seq);
            match service.reserve(request).await {
                Ok(reservation) => booked.push(reservation),
                Err(e) => eprintln!("Failed to book {} at {}: {}", provider_id, window, e),
            }

            cursor = window.end();
            index += 1;
            seq += 1;
        }

        // Straddles the first two bookings of the day.
        let service_id = offered[0];
        let overlapping = SlotWindow::starting_at(
            opening + Duration::minutes(service_minutes(service_id) / 2),
            service_minutes(service_id),
        )?;
        match service
            .reserve(sample_request(provider_id, service_id, overlapping, seq))
            .await
        {
            Err(ReservationError::SlotConflict { .. }) => {
                println!("  ✓ {}: overlapping request rejected", display_name)
            }
            Ok(r) => eprintln!("  ✗ {}: overlap admitted as {}", display_name, r.reference_code),
            Err(e) => eprintln!("  ✗ {}: unexpected error: {}", display_name, e),
        }
    }

    println!("  Booked {} reservations", booked.len());

    println!();
    println!("Applying lifecycle changes...");

    let mut confirmed = 0;
    let mut cancelled = 0;
    let mut tipped = 0;

    for (n, reservation) in booked.iter().enumerate() {
        let owner = match reservation.customer.customer_id() {
            Some(id) => Actor::customer(id),
            None => Actor::guest(),
        };

        if n % 5 == 4 {
            service
                .cancel(reservation.id, owner, Some("schedule clash".to_string()))
                .await?;
            cancelled += 1;
            continue;
        }

        if n % 3 == 0 {
            service
                .change_status(
                    reservation.id,
                    ReservationStatus::Confirmed,
                    Actor::provider(reservation.provider_id.clone()),
                )
                .await?;
            confirmed += 1;
        }

        if n % 7 == 0 {
            service
                .record_tip(reservation.id, Money::from_cents(500), owner)
                .await?;
            tipped += 1;
        }
    }

    let elapsed = started.elapsed();
    println!("  Confirmed: {}", confirmed);
    println!("  Cancelled: {}", cancelled);
    println!("  Tipped:    {}", tipped);
    println!();
    println!("✓ Seeded {} reservations in {:?}", booked.len(), elapsed);

    if let Some(first) = booked.first() {
        let found = service.get_by_reference(&first.reference_code).await?;
        let history = service.get_history(found.id).await?;
        println!(
            "  {} -> {} ({} history entries)",
            found.reference_code,
            found.status,
            history.len()
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,slotbook=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn register_directory(directory: &InMemoryDirectory) {
    for (provider_id, display_name, _) in PROVIDERS {
        directory
            .put_provider(ProviderInfo {
                provider_id: provider_id.to_string(),
                display_name: display_name.to_string(),
                active: true,
            })
            .await;
    }

    for (service_id, name, minutes, price_cents) in SERVICES {
        directory
            .put_service(ServiceDefinition {
                service_id: service_id.to_string(),
                name: name.to_string(),
                duration_minutes: *minutes,
                price: Money::from_cents(*price_cents),
                currency: None,
                active: true,
            })
            .await;
    }

    for (customer_id, name) in CUSTOMERS {
        directory
            .put_customer(CustomerInfo {
                customer_id: customer_id.to_string(),
                name: name.to_string(),
                email: None,
            })
            .await;
    }
}

fn service_minutes(service_id: &str) -> i64 {
    SERVICES
        .iter()
        .find(|(id, ..)| *id == service_id)
        .map(|(_, _, minutes, _)| *minutes)
        .unwrap_or(30)
}

/// Every 4th booking is a guest; every 6th carries a 10% discount.
fn sample_request(provider_id: &str, service_id: &str, window: SlotWindow, seq: usize) -> ReserveRequest {
    let customer = if seq % 4 == 3 {
        CustomerRef::Guest(GuestContact {
            name: format!("Walk-in {}", seq),
            email: format!("walkin{}@example.com", seq),
            phone: Some("+1 555 010 0199".to_string()),
        })
    } else {
        let (customer_id, _) = CUSTOMERS[seq % CUSTOMERS.len()];
        CustomerRef::Registered {
            customer_id: customer_id.to_string(),
        }
    };

    let discount = if seq % 6 == 5 {
        SERVICES
            .iter()
            .find(|(id, ..)| *id == service_id)
            .map(|(_, _, _, price)| Money::from_cents(*price).apply_rate_bps(1000))
    } else {
        None
    };

    ReserveRequest {
        provider_id: provider_id.to_string(),
        customer,
        slot_id: format!("{}-{:03}", provider_id, seq),
        window,
        service: ServiceInfo {
            service_id: service_id.to_string(),
            service_name: None,
        },
        pricing: PricingInputs {
            discount,
            ..PricingInputs::default()
        },
        notes: None,
    }
}
