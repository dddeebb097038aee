use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use wayfarer::api::{serve, AppState};
use wayfarer::capabilities::{build_registry, DataProviders};
use wayfarer::providers::flights::FlightFareProvider;
use wayfarer::providers::geocode::LocationIqProvider;
use wayfarer::providers::hotels::BookingProvider;
use wayfarer::providers::llm::OpenAIProvider;
use wayfarer::providers::places::FoursquareProvider;
use wayfarer::providers::weather::OpenWeatherProvider;
use wayfarer::router::{Dispatcher, DispatcherConfig, LlmDecisionOracle};
use wayfarer::Config;

#[derive(Parser)]
#[command(name = "wayfarer")]
#[command(about = "LLM-routed travel assistant backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single travel request and print the result
    Plan {
        #[arg(help = "Travel request, e.g. \"weather in Paris\"")]
        message: String,
    },
    /// Run the HTTP API server
    Serve {
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let dispatcher = Arc::new(build_dispatcher()?);

    match cli.command {
        Commands::Plan { message } => {
            let outcome = dispatcher.run(&message).await?;
            println!("{}", outcome.answer);
        }
        Commands::Serve { port } => {
            serve(AppState { dispatcher }, port).await?;
        }
    }

    Ok(())
}

fn build_dispatcher() -> Result<Dispatcher> {
    let config = Config::from_env();

    let openai_api_key = config
        .openai_api_key
        .context("OPENAI_API_KEY is required")?;
    let llm = Arc::new(OpenAIProvider::new(openai_api_key));
    let oracle = Arc::new(LlmDecisionOracle::new(llm.clone()));

    let data = DataProviders {
        geocode: Arc::new(LocationIqProvider::new(config.locationiq_api_key)),
        weather: Arc::new(OpenWeatherProvider::new(config.openweather_api_key)),
        places: Arc::new(FoursquareProvider::new(config.foursquare_api_key)),
        hotels: Arc::new(BookingProvider::new(config.rapidapi_hotels_key)),
        flights: Arc::new(FlightFareProvider::new(config.rapidapi_flights_key)),
    };
    let handlers = build_registry(llm, data);

    let mut dispatcher_config = DispatcherConfig::default();
    if let Some(max_cycles) = std::env::var("MAX_DISPATCH_CYCLES")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        dispatcher_config.max_cycles = max_cycles;
    }

    Ok(Dispatcher::new(oracle, handlers).with_config(dispatcher_config))
}
