// GiftVault CLI - Operator tool for the gift-card ledger server

mod api;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};
use uuid::Uuid;

use giftvault_core::SpendProof;

/// GiftVault - Gift Card Ledger Tool
#[derive(Parser)]
#[command(name = "giftvault")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a new gift card
    Mint {
        /// Purchasing user id
        #[arg(long)]
        user: Uuid,

        /// Initial fiat value, e.g. 50.00
        #[arg(long)]
        fiat: String,

        /// Initial crypto-equivalent value
        #[arg(long)]
        crypto: Option<String>,

        /// Issuing merchant id
        #[arg(long)]
        merchant: Option<Uuid>,

        /// Allow top-ups on this card
        #[arg(long)]
        rechargeable: bool,

        /// Require a spend proof on this card
        #[arg(long)]
        privacy: bool,
    },
    /// Show a card snapshot
    Show {
        /// Card id
        card: Uuid,
    },
    /// Recharge a card
    Recharge {
        /// Card id
        card: Uuid,

        /// Paying user id
        #[arg(long)]
        user: Uuid,

        /// Fiat amount to add
        #[arg(long)]
        fiat: String,

        /// Crypto-equivalent amount to add
        #[arg(long)]
        crypto: Option<String>,

        /// Idempotency key for safe retries
        #[arg(long)]
        key: Option<String>,
    },
    /// Spend from a card
    Spend {
        /// Card id
        card: Uuid,

        /// Spending user id
        #[arg(long)]
        user: Uuid,

        /// Fiat amount to spend
        #[arg(long)]
        amount: String,

        /// Change handling: keep, new_card, or refund
        #[arg(long, default_value = "keep")]
        change: String,

        /// Generate a spend proof (required for privacy-enabled cards)
        #[arg(long)]
        with_proof: bool,

        /// Idempotency key for safe retries
        #[arg(long)]
        key: Option<String>,
    },
    /// Show a card's transaction history
    History {
        /// Card id
        card: Uuid,
    },
    /// Show a user's reward points
    Rewards {
        /// User id
        #[arg(long)]
        user: Uuid,
    },
    /// Show a user's non-card account balance
    Account {
        /// User id
        #[arg(long)]
        user: Uuid,
    },
}

fn main() {
    let cli = Cli::parse();
    let client = api::Client::new(cli.server.clone());

    let result = match cli.command {
        Commands::Mint {
            user,
            fiat,
            crypto,
            merchant,
            rechargeable,
            privacy,
        } => handle_mint(&client, user, &fiat, crypto, merchant, rechargeable, privacy),
        Commands::Show { card } => handle_show(&client, card),
        Commands::Recharge {
            card,
            user,
            fiat,
            crypto,
            key,
        } => handle_recharge(&client, card, user, &fiat, crypto, key),
        Commands::Spend {
            card,
            user,
            amount,
            change,
            with_proof,
            key,
        } => handle_spend(&client, card, user, &amount, &change, with_proof, key),
        Commands::History { card } => handle_history(&client, card),
        Commands::Rewards { user } => handle_rewards(&client, user),
        Commands::Account { user } => handle_account(&client, user),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn handle_mint(
    client: &api::Client,
    user: Uuid,
    fiat: &str,
    crypto: Option<String>,
    merchant: Option<Uuid>,
    rechargeable: bool,
    privacy: bool,
) -> anyhow::Result<()> {
    let mut body = json!({
        "userId": user,
        "amountFiat": fiat,
        "isRechargeable": rechargeable,
        "isPrivacyEnabled": privacy,
    });
    if let Some(crypto) = crypto {
        body["amountCrypto"] = json!(crypto);
    }
    if let Some(merchant) = merchant {
        body["merchantId"] = json!(merchant);
    }

    let response = client.post("/api/v1/gift-cards", body)?;
    println!("{}", "Card minted".green().bold());
    print_card(&response["giftCard"]);
    println!(
        "Reward points: {}",
        response["rewardPoints"].to_string().yellow()
    );
    Ok(())
}

fn handle_show(client: &api::Client, card: Uuid) -> anyhow::Result<()> {
    let response = client.get(&format!("/api/v1/gift-cards/{card}"))?;
    print_card(&response);
    Ok(())
}

fn handle_recharge(
    client: &api::Client,
    card: Uuid,
    user: Uuid,
    fiat: &str,
    crypto: Option<String>,
    key: Option<String>,
) -> anyhow::Result<()> {
    let mut body = json!({ "userId": user, "amountFiat": fiat });
    if let Some(crypto) = crypto {
        body["amountCrypto"] = json!(crypto);
    }
    if let Some(key) = key {
        body["idempotencyKey"] = json!(key);
    }

    let response = client.post(&format!("/api/v1/gift-cards/{card}/recharge"), body)?;
    println!("{}", "Card recharged".green().bold());
    print_card(&response["giftCard"]);
    println!(
        "Reward points: {}",
        response["rewardPoints"].to_string().yellow()
    );
    Ok(())
}

fn handle_spend(
    client: &api::Client,
    card: Uuid,
    user: Uuid,
    amount: &str,
    change: &str,
    with_proof: bool,
    key: Option<String>,
) -> anyhow::Result<()> {
    let mut body = json!({
        "userId": user,
        "amount": amount,
        "changeHandling": change,
    });
    if with_proof {
        let proof = SpendProof::generate(&card, Uuid::new_v4().to_string());
        body["proof"] = json!({ "nonce": proof.nonce, "digest": proof.digest });
    }
    if let Some(key) = key {
        body["idempotencyKey"] = json!(key);
    }

    let response = client.post(&format!("/api/v1/gift-cards/{card}/spend"), body)?;
    println!("{}", "Card spent".green().bold());
    print_card(&response["giftCard"]);
    println!("Change: {}", response["change"]["fiat"].as_str().unwrap_or("-"));
    if let Some(new_card) = response["newCardId"].as_str() {
        println!("Change card: {}", new_card.cyan());
    }
    if let Some(refunded) = response["refundedToAccount"].as_str() {
        println!("Refunded to account: {}", refunded.cyan());
    }
    Ok(())
}

fn handle_history(client: &api::Client, card: Uuid) -> anyhow::Result<()> {
    let response = client.get(&format!("/api/v1/gift-cards/{card}/transactions"))?;
    let transactions = response["transactions"].as_array().cloned().unwrap_or_default();
    println!(
        "{} {}",
        transactions.len().to_string().bold(),
        "transactions"
    );
    for tx in transactions {
        println!(
            "  {}  {:10}  {:>12}  {}",
            tx["createdAt"].as_str().unwrap_or("-"),
            tx["type"].as_str().unwrap_or("-"),
            tx["amount"]["fiat"].as_str().unwrap_or("-"),
            tx["status"].as_str().unwrap_or("-"),
        );
    }
    Ok(())
}

fn handle_rewards(client: &api::Client, user: Uuid) -> anyhow::Result<()> {
    let response = client.get(&format!("/api/v1/rewards/balance?userId={user}"))?;
    println!(
        "Total points: {}",
        response["totalPoints"].to_string().yellow().bold()
    );
    for reward in response["rewards"].as_array().cloned().unwrap_or_default() {
        println!(
            "  {:12}  {:>6}  {}",
            reward["type"].as_str().unwrap_or("-"),
            reward["points"].to_string(),
            reward["createdAt"].as_str().unwrap_or("-"),
        );
    }
    Ok(())
}

fn handle_account(client: &api::Client, user: Uuid) -> anyhow::Result<()> {
    let response = client.get(&format!("/api/v1/accounts/{user}/balance"))?;
    println!(
        "Account balance: {}",
        response["balance"].as_str().unwrap_or("0").green().bold()
    );
    Ok(())
}

fn print_card(card: &Value) {
    println!("  Id:        {}", card["id"].as_str().unwrap_or("-").cyan());
    println!(
        "  Status:    {}",
        match card["status"].as_str() {
            Some("active") => "active".green(),
            Some("empty") => "empty".yellow(),
            Some("expired") => "expired".red(),
            other => other.unwrap_or("-").normal(),
        }
    );
    println!(
        "  Balance:   {} fiat / {} crypto",
        card["balance"]["fiat"].as_str().unwrap_or("-"),
        card["balance"]["crypto"].as_str().unwrap_or("-"),
    );
    println!(
        "  Original:  {} fiat",
        card["originalValue"]["fiat"].as_str().unwrap_or("-"),
    );
    println!(
        "  Flags:     rechargeable={} privacy={}",
        card["isRechargeable"],
        card["isPrivacyEnabled"],
    );
    println!(
        "  Expires:   {}",
        card["expiresAt"].as_str().unwrap_or("-"),
    );
}
