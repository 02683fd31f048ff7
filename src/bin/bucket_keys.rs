use bms_data_verifier::buckets::{Granularity, TimeBuckets};
use bms_data_verifier::config::DEFAULT_BATTERY_ID;
use chrono::Utc;
use clap::Parser;

/// Print the bucket keys a record with the given timestamp should carry
#[derive(Parser)]
#[command(author, version, long_about = None)]
struct Args {
    /// Battery ID the keys belong to
    #[arg(long, default_value = DEFAULT_BATTERY_ID)]
    battery_id: String,

    /// Unix timestamp in seconds [default: now]
    #[arg(long)]
    timestamp: Option<i64>,
}

fn main() {
    let args = Args::parse();
    let timestamp = args.timestamp.unwrap_or_else(|| Utc::now().timestamp());

    match TimeBuckets::for_timestamp(&args.battery_id, timestamp) {
        Some(buckets) => {
            println!("Bucket keys for {} at {}:", args.battery_id, timestamp);
            for granularity in Granularity::ALL {
                println!("  {}: {}", granularity.attribute(), buckets.get(granularity));
            }
        }
        None => {
            eprintln!("Timestamp {} is out of range", timestamp);
            std::process::exit(1);
        }
    }
}
