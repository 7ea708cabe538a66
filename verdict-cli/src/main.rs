//! # Verdict CLI
//!
//! Command-line interface for the verdict prediction-market engine:
//! stateless settlement/AMM calculators and a scripted end-to-end demo.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use verdict_core::utils::{bps_to_percent, format_timestamp, sha256_hex};
use verdict_core::{
    calculate_payout, confidence_ratio_bps, AmmPool, Engine, MarketParams, Outcome,
    DEFAULT_PROTOCOL_FEE_BPS, DEFAULT_SWAP_FEE_BPS,
};

#[derive(Parser)]
#[command(name = "verdict")]
#[command(about = "Deterministic resolution and settlement engine for binary prediction markets")]
#[command(version)]
struct Cli {
    /// Print engine tracing events
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote a pari-mutuel payout for a winning stake
    Payout {
        /// Winning-side stake amount
        #[arg(short, long)]
        stake: u64,
        /// Total staked on the winning side
        #[arg(short, long)]
        winning_pool: u64,
        /// Total staked on the losing side
        #[arg(short, long)]
        losing_pool: u64,
        /// Protocol fee in basis points
        #[arg(short, long, default_value_t = DEFAULT_PROTOCOL_FEE_BPS)]
        fee_bps: u64,
    },
    /// Quote a constant-product swap between claim balances
    SwapQuote {
        /// Reserve on the input side
        #[arg(long)]
        reserve_in: u64,
        /// Reserve on the output side
        #[arg(long)]
        reserve_out: u64,
        /// Amount of claims paid in
        #[arg(short, long)]
        amount_in: u64,
        /// Swap fee in basis points
        #[arg(short, long, default_value_t = DEFAULT_SWAP_FEE_BPS)]
        fee_bps: u64,
    },
    /// Compute the finalized outcome and confidence for a vote tally
    Confidence {
        /// Number of YES votes
        #[arg(short, long)]
        yes: u64,
        /// Number of NO votes
        #[arg(short, long)]
        no: u64,
    },
    /// Hash an evidence blob with SHA256
    Hash {
        /// Message to hash
        message: String,
    },
    /// Run the full stake -> report -> finalize -> claim -> swap scenario
    Demo {
        /// Dump the final engine state as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .init();
    }

    match cli.command {
        Commands::Payout {
            stake,
            winning_pool,
            losing_pool,
            fee_bps,
        } => {
            let payout = calculate_payout(stake, winning_pool, losing_pool, fee_bps)?;
            println!("{}", "Pari-Mutuel Payout".green().bold());
            println!("{}", "═".repeat(50).bright_black());
            println!("{}: {}", "Stake".yellow().bold(), stake);
            println!(
                "{}: {} / {}",
                "Pools (win/lose)".yellow().bold(),
                winning_pool,
                losing_pool
            );
            println!("{}: {}", "Gross reward".yellow().bold(), payout.gross);
            println!(
                "{}: {} ({}%)",
                "Protocol fee".yellow().bold(),
                payout.fee,
                bps_to_percent(fee_bps)
            );
            println!("{}: {}", "Net payout".cyan().bold(), payout.net);
        }

        Commands::SwapQuote {
            reserve_in,
            reserve_out,
            amount_in,
            fee_bps,
        } => {
            let mut pool = AmmPool::new(fee_bps);
            pool.add_liquidity("quote", reserve_in, reserve_out)?;
            let product_before = pool.product();
            let swap = pool.swap(Outcome::Yes, amount_in, 0)?;

            println!("{}", "Constant-Product Swap Quote".green().bold());
            println!("{}", "═".repeat(50).bright_black());
            println!(
                "{}: {} / {}",
                "Reserves (in/out)".yellow().bold(),
                reserve_in,
                reserve_out
            );
            println!("{}: {}", "Amount in".yellow().bold(), swap.amount_in);
            println!(
                "{}: {} ({}%)",
                "Fee paid".yellow().bold(),
                swap.fee_paid,
                bps_to_percent(fee_bps)
            );
            println!("{}: {}", "Amount out".cyan().bold(), swap.amount_out);
            println!(
                "{}: {} -> {}",
                "Invariant".yellow().bold(),
                product_before,
                pool.product()
            );
        }

        Commands::Confidence { yes, no } => {
            let total = yes + no;
            if total == 0 {
                println!("{}: no votes, nothing to finalize", "Error".red().bold());
                return Ok(());
            }
            let outcome = if yes > no { Outcome::Yes } else { Outcome::No };
            let majority = yes.max(no);
            let confidence = confidence_ratio_bps(majority, total);
            println!("{}", "Consensus Tally".green().bold());
            println!("{}", "═".repeat(50).bright_black());
            println!("{}: {} YES / {} NO", "Votes".yellow().bold(), yes, no);
            println!("{}: {}", "Outcome".cyan().bold(), outcome);
            println!(
                "{}: {} bps ({}%)",
                "Confidence".yellow().bold(),
                confidence,
                bps_to_percent(confidence)
            );
            if yes == no {
                println!("{}", "Tie: finalizes to NO by rule.".bright_black());
            }
        }

        Commands::Hash { message } => {
            let hash = sha256_hex(&message);
            println!("{}: {}", "SHA256 Hash".green().bold(), hash.cyan());
        }

        Commands::Demo { json } => run_demo(json)?,
    }

    Ok(())
}

/// Scripted end-to-end scenario on an in-memory engine.
fn run_demo(json: bool) -> Result<()> {
    const EXPIRY: u64 = 1_735_689_600;
    let mut engine = Engine::new("governance", "identity");

    let market = engine.create_market(
        MarketParams {
            expiry: EXPIRY,
            min_stake: 1,
            max_stake: 1_000,
            category: "sports".to_string(),
        },
        EXPIRY - 86_400,
    )?;

    engine.stake(market, "alice", Outcome::Yes, 100, EXPIRY - 5_000)?;
    engine.stake(market, "bob", Outcome::No, 300, EXPIRY - 4_000)?;

    let mut sources = Vec::new();
    for (account, label) in [
        ("oracle-chainlink", "chainlink"),
        ("oracle-reuters", "reuters"),
        ("oracle-dao", "dao-vote"),
    ] {
        let id = engine.register_source("identity", account, label)?;
        engine.verify_source("identity", id)?;
        sources.push(id);
    }

    let votes = [Outcome::Yes, Outcome::Yes, Outcome::No];
    let mut finalization = None;
    for (source, vote) in sources.iter().zip(votes) {
        finalization = engine.submit_report(market, *source, vote, 9_000, "demo", EXPIRY + 60)?;
    }
    let finalization = finalization.expect("quorum reached");

    // Secondary trading on the claim AMM, independent of resolution.
    engine.amm_add_liquidity(market, "lp", 1_000, 1_000)?;
    let swap = engine.amm_swap(market, Outcome::Yes, 100, 80)?;

    let claim_at = finalization.finalized_at + engine.params().dispute_period + 1;
    let transfer = engine.claim_reward(market, "alice", claim_at)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&engine)?);
        return Ok(());
    }

    println!("{}", "Verdict Demo Scenario".green().bold());
    println!("{}", "═".repeat(50).bright_black());
    println!(
        "{}: {} (expires {})",
        "Market".yellow().bold(),
        market,
        format_timestamp(EXPIRY)
    );
    println!(
        "{}: alice 100 YES, bob 300 NO",
        "Stakes".yellow().bold()
    );
    println!(
        "{}: {} votes -> {} at {} bps",
        "Consensus".yellow().bold(),
        finalization.total_votes,
        finalization.outcome,
        finalization.confidence_bps
    );
    println!(
        "{}: 100 YES in -> {} NO out (fee {})",
        "AMM swap".yellow().bold(),
        swap.amount_out,
        swap.fee_paid
    );
    println!(
        "{}: {} to {} ({} withheld by treasury)",
        "Payout".cyan().bold(),
        transfer.amount,
        transfer.to,
        engine.treasury()
    );
    println!("{}", "═".repeat(50).bright_black());
    println!(
        "{}",
        "Stakes conserved: payouts + fees + residual == pool total.".bright_blue()
    );
    Ok(())
}
