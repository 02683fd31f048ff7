use anyhow::Result;
use bms_data_verifier::config::{resolve_config, save_config, ConfigOverrides};
use bms_data_verifier::dynamo_store::DynamoStore;
use bms_data_verifier::verifier::{Verifier, VerifierOptions};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Verify battery data in the DynamoDB time-series table", long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Sets a custom config file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Write the resolved settings to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_config: Option<String>,

    /// Battery ID to check [default: BAT-0x440]
    #[arg(long, env = "VERIFY_BATTERY_ID")]
    battery_id: Option<String>,

    /// AWS region [default: ap-southeast-2]
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// DynamoDB table name [default: CAN_BMS_Data_Optimized]
    #[arg(long, env = "VERIFY_TABLE")]
    table: Option<String>,

    /// Number of items to check [default: 5]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    limit: Option<u32>,

    /// Time window in seconds to check [default: 3600]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    time_window: Option<u64>,

    /// Check if the secondary indexes are being populated
    #[arg(long)]
    check_gsi: bool,

    /// Also check bucket periods against each record's timestamp
    #[arg(long)]
    strict_buckets: bool,

    /// Custom DynamoDB endpoint, e.g. http://localhost:8000
    #[arg(long, env = "VERIFY_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Per-request timeout in seconds [default: SDK default]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            battery_id: self.battery_id.clone(),
            region: self.region.clone(),
            table: self.table.clone(),
            limit: self.limit,
            time_window_secs: self.time_window,
            check_gsi: self.check_gsi,
            strict_buckets: self.strict_buckets,
            endpoint_url: self.endpoint_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

fn init_logging(debug: u8) {
    let level = match debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = resolve_config(cli.config.as_deref(), cli.overrides())?;

    if let Some(path) = &cli.write_config {
        save_config(&config, path)?;
        println!("Wrote configuration to '{}'", path);
        return Ok(());
    }

    println!("DynamoDB Data Verification for {}", config.table);
    println!("Checking battery: {}", config.battery_id);
    println!("Time window: {} seconds", config.time_window_secs);
    println!("Max items to check: {}", config.limit);
    if config.strict_buckets {
        println!("Strict bucket checks: on");
    }

    let store = DynamoStore::connect(&config.dynamo_settings()).await;
    let verifier = Verifier::new(store, VerifierOptions::from(&config));

    verifier
        .check_recent(&config.battery_id, config.time_window_secs, config.limit)
        .await;

    if config.check_gsi {
        verifier.check_indexes(&config.battery_id).await;
    }

    println!("\nVerification complete!");
    Ok(())
}
