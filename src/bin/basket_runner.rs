use clap::{Parser, Subcommand};
use databuffet_client::{utils, BasketRunner, Config, DataBuffetClient, PollPolicy};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(version, about = "Run Data Buffet baskets and download their output")]
struct Cli {
    /// TOML config file; DATABUFFET__* variables override it
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the basket list as returned by the API
    Baskets,
    /// Print the series stored in a basket
    Contents { basket_id: String },
    /// Print the output file types baskets support
    FileTypes,
    /// Order a basket, wait for it to finish and save the result
    Run {
        basket_id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show the status of an order
    Status { order_id: String },
    /// Save the latest finished result of a basket without ordering
    Download {
        basket_id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Check connectivity and credentials
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load_from(cli.config.as_deref())?;
    utils::init_from_config(&config.logging)?;

    let client = DataBuffetClient::from_config(&config)?;
    info!("Using endpoint {}", client.base_url());

    match cli.command {
        Command::Baskets => {
            println!("{}", client.list_baskets_raw().await?);
        }
        Command::Contents { basket_id } => {
            let contents = client.get_basket_contents(&basket_id).await?;
            println!("{}", serde_json::to_string_pretty(&contents)?);
        }
        Command::FileTypes => {
            let file_types = client.list_file_types().await?;
            println!("{}", serde_json::to_string_pretty(&file_types)?);
        }
        Command::Run { basket_id, output } => {
            let runner = BasketRunner::new(client, PollPolicy::from(&config.polling));
            let report = runner.run(&basket_id, &output).await?;
            info!(
                "Order {} finished, {} bytes written to {}",
                report.order.order_id,
                report.bytes_written,
                report.output.display()
            );
        }
        Command::Status { order_id } => {
            let order = client.get_order_status(&order_id).await?;
            println!("{}", serde_json::to_string_pretty(&order)?);
        }
        Command::Download { basket_id, output } => {
            let runner = BasketRunner::new(client, PollPolicy::from(&config.polling));
            let written = runner.download(&basket_id, &output).await?;
            info!("{} bytes written to {}", written, output.display());
        }
        Command::Health => {
            client.health().await?;
            info!("API reachable, credentials accepted");
        }
    }

    Ok(())
}
