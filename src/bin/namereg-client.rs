#![forbid(unsafe_code)]
//! Command-line client: key generation, name registration and lookup

use clap::{Parser, Subcommand};
use namereg::blockchain::{Block, Blockchain};
use namereg::crypto::KeyPair;
use namereg::transaction::Transaction;
use serde_json::Value;

const DEFAULT_NODE: &str = "http://localhost:8080";

#[derive(Parser, Debug)]
#[command(name = "namereg-client", about = "Talk to a name registry node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new P-256 key pair and print its address
    Keygen,
    /// Sign and submit a registration for NAME
    Register {
        /// Secret key as 64 hex characters
        #[arg(long)]
        key: String,
        #[arg(long)]
        name: String,
        /// Use this nonce instead of asking the node
        #[arg(long)]
        nonce: Option<u64>,
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
    /// Resolve NAME to its address
    Lookup {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
    /// Print the node's full chain
    Chain {
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
    /// Download the node's chain and replay it locally from genesis
    Verify {
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let http = reqwest::Client::new();

    match cli.command {
        Command::Keygen => {
            let keypair = KeyPair::generate();
            println!("secret_key: {}", keypair.secret_hex());
            println!("public_key: {}", hex::encode(keypair.public_key_bytes()));
            println!("address:    {}", keypair.address());
        }
        Command::Register {
            key,
            name,
            nonce,
            node,
        } => {
            let keypair = KeyPair::from_secret_hex(&key)?;
            let nonce = match nonce {
                Some(n) => n,
                None => {
                    let url = format!("{}/nonce", node.trim_end_matches('/'));
                    let body: Value = http
                        .get(url)
                        .query(&[("address", keypair.address())])
                        .send()
                        .await?
                        .error_for_status()?
                        .json()
                        .await?;
                    body["nonce"]
                        .as_u64()
                        .ok_or("node returned a malformed nonce response")?
                }
            };

            let tx = Transaction::signed(&keypair, name, nonce)?;
            let response = http
                .post(format!("{}/register", node.trim_end_matches('/')))
                .json(&tx)
                .send()
                .await?;
            print_response(response).await?;
        }
        Command::Lookup { name, node } => {
            let response = http
                .get(format!("{}/lookup", node.trim_end_matches('/')))
                .query(&[("name", name)])
                .send()
                .await?;
            print_response(response).await?;
        }
        Command::Chain { node } => {
            let response = http
                .get(format!("{}/chain", node.trim_end_matches('/')))
                .send()
                .await?;
            print_response(response).await?;
        }
        Command::Verify { node } => {
            let blocks: Vec<Block> = http
                .get(format!("{}/chain", node.trim_end_matches('/')))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let chain = Blockchain::from_blocks(blocks)?;
            println!("chain valid");
            println!("height:  {}", chain.height());
            println!("head:    {}", chain.latest().hash);
            println!("names:   {}", chain.state().name_count());
        }
    }

    Ok(())
}

async fn print_response(response: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        return Err(format!("node answered {}", status).into());
    }
    Ok(())
}
