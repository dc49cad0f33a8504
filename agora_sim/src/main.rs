//! Agora bookstore simulator CLI
//!
//! Runs a seeded marketplace simulation and prints its summary.

use agora_sim::{SimConfig, SimulationRunner, SimulationSummary, SystemEvent};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Agora bookstore simulation
#[derive(Parser, Debug)]
#[command(name = "agora-sim")]
#[command(about = "Run a seeded multi-actor bookstore simulation", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of customer actors
    #[arg(short, long, default_value = "10")]
    customers: usize,

    /// Number of employee actors
    #[arg(short, long, default_value = "3")]
    employees: usize,

    /// Ticks to run (the world stops on its own at 500)
    #[arg(long, default_value = "100")]
    steps: u64,

    /// Real-time pause between ticks in milliseconds
    #[arg(long, default_value = "0")]
    pause_ms: u64,

    /// Store-wide event applied before the first tick
    /// (sale, new_arrivals, maintenance)
    #[arg(long)]
    event: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn print_summary(summary: &SimulationSummary) {
    let info = &summary.simulation_info;
    let financial = &summary.financial_metrics;
    let customers = &summary.customer_metrics;
    let employees = &summary.employee_metrics;
    let inventory = &summary.inventory_metrics;
    let comms = &summary.communication_metrics;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "Steps: {} in {:.2}s ({:.1} steps/s), {} actors, {}",
        info.steps_completed, info.simulation_time_seconds, info.steps_per_second,
        info.actors_total, info.status
    );
    info!(
        "Sales: ${:.2}, {} books sold (avg ${:.2})",
        financial.total_sales, financial.total_books_sold, financial.average_book_price
    );
    info!(
        "Customers: {} (satisfaction {:.2}, avg budget left ${:.2}, engagement {:.0}%)",
        customers.total_customers,
        customers.average_satisfaction,
        customers.average_budget_remaining,
        customers.engagement_rate * 100.0
    );
    info!(
        "Employees: {} ({} orders processed)",
        employees.total_employees, employees.total_orders_processed
    );
    for product in &inventory.details {
        info!(
            "  '{}': {} sold, {} in stock, popularity {:.2}",
            product.title, product.sales_count, product.stock, product.popularity
        );
    }
    info!(
        "Messages: {} ({:.1}/step, {} delivery failures)",
        comms.total_messages, comms.messages_per_step, comms.delivery_failures
    );
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides the flag
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let opening_event = match args.event.as_deref().map(str::parse::<SystemEvent>).transpose() {
        Ok(event) => event,
        Err(e) => {
            let available: Vec<_> = SystemEvent::all().iter().map(|ev| ev.name()).collect();
            error!("{}", e);
            error!("Available events: {}", available.join(", "));
            return ExitCode::FAILURE;
        }
    };

    let config = SimConfig {
        seed,
        num_customers: args.customers,
        num_employees: args.employees,
        tick_pause: Duration::from_millis(args.pause_ms),
        opening_event,
        ..Default::default()
    };

    if !args.json {
        info!("Agora Bookstore Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "seed={} customers={} employees={} steps={}",
            seed, config.num_customers, config.num_employees, args.steps
        );
    }

    let summary = match SimulationRunner::new(config).run(args.steps) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Simulation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize summary: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_summary(&summary);
    }

    ExitCode::SUCCESS
}
