use std::io::Read;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use essayforge::{EssayBackend, EssayConfig, EssayRequest, EssayResponse, Error, Provider};

/// Generate an essay of a target length from a JSON request
#[derive(Debug, Parser)]
#[command(name = "essayforge", version)]
struct Cli
{   /// JSON request file, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String
  , /// Provider to try first (openai, gemini, anthropic)
    #[arg(long)]
    primary: Option<Provider>
  , /// Accepted word-count deviation, e.g. 0.1 for ±10%
    #[arg(long)]
    tolerance: Option<f64>
  , /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool
}

fn read_input(input: &str) -> Result<String, Error>
{   if input == "-"
    {   let mut body = String::new();
        std::io::stdin()
          .read_to_string(&mut body)
          .map_err(|e| Error::InvalidRequest(format!("cannot read stdin: {}", e)))?;
        return Ok(body);
    }
    std::fs::read_to_string(input)
      .map_err(|e| Error::InvalidRequest(format!("cannot read {}: {}", input, e)))
}

async fn run(cli: &Cli) -> Result<EssayResponse, Error>
{   let request = EssayRequest::from_json(&read_input(&cli.input)?)?;

    let mut config = EssayConfig::from_env()?;
    if let Some(primary) = cli.primary
    {   config = config.with_primary(primary)?;
    }
    if let Some(tolerance) = cli.tolerance
    {   config.convergence = config.convergence.with_tolerance(tolerance)?;
    }

    let backend = EssayBackend::from_config(&config)?;
    let mut reply_rx = backend.generate_essay(request).await?;
    let result = reply_rx.recv().await.unwrap_or_else(|| {
      Err(Error::Other("essay job ended without a reply".to_string()))
    });
    if let Err(e) = backend.shutdown().await
    {   error!("Backend shutdown failed: {}", e);
    }
    result
}

fn to_json(value: &serde_json::Value, pretty: bool) -> String
{   let rendered = if pretty
    {   serde_json::to_string_pretty(value)
    } else
    {   serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|_| value.to_string())
}

#[tokio::main]
async fn main() -> ExitCode
{   let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    let cli = Cli::parse();
    match run(&cli).await
    {   Ok(response) => {
          info!(
            "Essay ready: {} of {} words",
            response.actual_word_count, response.target_word_count
          );
          let value = serde_json::to_value(&response)
            .unwrap_or(serde_json::Value::Null);
          println!("{}", to_json(&value, cli.pretty));
          ExitCode::SUCCESS
        }
      , Err(e) => {
          error!("Error generating essay: {}", e);
          let kind = e.kind();
          let value = serde_json::json!({
            "error": e.user_message(),
            "status": kind.status_code(),
          });
          println!("{}", to_json(&value, cli.pretty));
          ExitCode::FAILURE
        }
    }
}
