use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Client CLI for the certificate webhook relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay liveness
    Health,
    /// Show the tracked state of a request
    Status {
        request_id: String,
    },
    /// Submit a certificate add request
    Add(CertArgs),
    /// Submit a certificate reject request
    Reject(CertArgs),
}

#[derive(Args)]
struct CertArgs {
    #[arg(long)]
    callback_url: String,

    #[arg(long)]
    cname_id: String,

    #[arg(long)]
    domain: String,

    #[arg(long)]
    email: String,

    #[arg(long)]
    user_id: String,
}

impl CertArgs {
    fn body(&self) -> Value {
        json!({
            "callback_url": self.callback_url,
            "cname_id": self.cname_id,
            "domain": self.domain,
            "email": self.email,
            "user_id": self.user_id,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match &cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Status { request_id } => {
            client
                .get(format!("{}/status/{}", base, request_id))
                .send()
                .await?
        }
        Commands::Add(args) => {
            client
                .post(format!("{}/api/v1.0/cert/add", base))
                .json(&args.body())
                .send()
                .await?
        }
        Commands::Reject(args) => {
            client
                .post(format!("{}/api/v1.0/cert/reject", base))
                .json(&args.body())
                .send()
                .await?
        }
    };
    print_response(res).await?;

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
