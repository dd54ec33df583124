//! Seat Ledger Demo
//!
//! Runs the booking services over an in-memory ledger and replays a short
//! scenario through the gateway:
//! - Seeding the catalog and today's quota pool
//! - Booking seats until a show runs out
//! - Asking for more seats than remain
//! - Looking up the resulting records
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo --features demo
//!
//! # Corrected exact-capacity policy, metrics on :9090
//! BOOKING_EXACT_MATCH_POLICY=grant METRICS_ADDR=0.0.0.0:9090 cargo run --bin demo --features demo
//! ```

use seatledger_booking::metrics::register_booking_metrics;
use seatledger_booking::{Config, Environment, SeatLedgerApp};
use seatledger_runtime::BroadcastEventPublisher;
use seatledger_runtime::metrics::MetricsServer;
use seatledger_testing::InMemoryLedger;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(config.observability.env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;

    println!("\n🎬 ============================================");
    println!("   Seat Ledger - Live Demo");
    println!("============================================\n");

    let mut metrics = config.observability.metrics_addr.map(MetricsServer::new);
    if let Some(server) = metrics.as_mut() {
        server.start()?;
        register_booking_metrics();
    }

    let publisher = BroadcastEventPublisher::new(256);
    let mut events = publisher.subscribe();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            let payload = serde_json::to_string(&event).unwrap_or_default();
            println!("   📣 {payload}");
        }
    });

    let env = Environment::production(Arc::new(InMemoryLedger::new()), Arc::new(publisher));
    let app = SeatLedgerApp::new(&config, env);
    let gateway = app.gateway();

    println!(
        "⚙️  Exact-capacity policy: {}, quota decrement: {}\n",
        config.booking.exact_match, config.quota.decrement
    );

    let steps: Vec<(&str, Vec<&str>)> = vec![
        ("seedShows", vec![]),
        ("initializeQuota", vec!["today"]),
        ("upsertShow", vec!["Atlas", "6pm-9pm", "100", "3", "false"]),
        ("reserveSeats", vec!["alice", "Atlas", "6pm-9pm", "2"]),
        ("reserveSeats", vec!["bob", "Atlas", "6pm-9pm", "3"]),
        ("reserveSeats", vec!["carol", "Atlas", "6pm-9pm", "1"]),
        ("reserveSeats", vec!["dave", "The Dark Knight", "9am-12pm", "1"]),
        ("lookupReservationByTimeSlot", vec!["6pm-9pm"]),
        ("lookupShowByName", vec!["Atlas"]),
    ];

    for (step, (function, args)) in steps.iter().enumerate() {
        println!("{:>2}. {function}({})", step + 1, args.join(", "));
        match gateway.invoke(function, args.as_slice()).await {
            Ok(response) => println!("    ✓ {response}"),
            Err(error) => println!("    ✗ {error}"),
        }
        tokio::task::yield_now().await;
    }

    match gateway.invoke::<&str>("lookupQuotaPool", &[]).await {
        Ok(pool) => println!("\n🎁 Quota pool: {pool}"),
        Err(error) => println!("\n🎁 Quota pool unavailable: {error}"),
    }

    if let Some(rendered) = metrics.as_ref().and_then(MetricsServer::render) {
        println!("\n📊 Metrics snapshot:\n{rendered}");
    }

    drop(app);
    event_log.abort();
    println!("\n✅ Demo complete\n");
    Ok(())
}
