use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "panel-cli")]
#[command(about = "Management CLI for the hostpanel admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8090")]
    url: String,

    /// API key; falls back to HOSTPANEL_API_KEY.
    #[arg(short, long, env = "HOSTPANEL_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show panel status and domain counts
    Status,
    /// List all domains
    List,
    /// Create a site for a domain
    Create { name: String },
    /// Delete a domain
    Delete {
        name: String,
        /// Leave the document root on disk
        #[arg(long)]
        keep_files: bool,
    },
    /// Issue a certificate and switch the site to HTTPS
    EnableTls { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = Url::parse(&cli.url)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match &cli.command {
        Commands::Status => client.get(api_url(&base, &["status"])?),
        Commands::List => client.get(api_url(&base, &["domains"])?),
        Commands::Create { name } => client
            .post(api_url(&base, &["domains"])?)
            .json(&json!({ "name": name })),
        Commands::Delete { name, keep_files } => client
            .delete(api_url(&base, &["domains", name.as_str()])?)
            .query(&[("purge", !keep_files)]),
        Commands::EnableTls { name } => client.post(api_url(&base, &["domains", name.as_str(), "tls"])?),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

/// `<base>/api/<segments...>`, each segment percent-encoded.
fn api_url(base: &Url, segments: &[&str]) -> Result<Url, Box<dyn std::error::Error>> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| format!("{base} cannot be used as a base URL"))?
        .pop_if_empty()
        .push("api")
        .extend(segments);
    Ok(url)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: admin API returned status {}", status);
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => eprintln!("{}", serde_json::to_string_pretty(&body)?),
            Err(_) if !text.is_empty() => eprintln!("Response: {}", text),
            Err(_) => {}
        }
        std::process::exit(1);
    }

    if text.is_empty() {
        println!("OK ({})", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
