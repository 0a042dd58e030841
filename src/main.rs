use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use orgvote::{
    init_logging, Address, Amount, Clock, InMemoryAccessGate, InMemoryLedger, ManualClock,
    OrganizationRegistry, PlatformConfig, RecordingPayoutSink, RegistrySettings, SaleMode,
    SystemClock,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Organization token sales and votations")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the exact value to pay for a purchase
    Quote {
        #[arg(long, value_enum, default_value = "fixed-quantity")]
        mode: ModeArg,
        /// Units sold before this purchase
        #[arg(long, default_value_t = 0)]
        sold: Amount,
        /// Units to buy
        #[arg(long)]
        amount: Amount,
        /// Unit price for fixed-price sales
        #[arg(long, default_value_t = 0)]
        price: Amount,
    },
    /// Run a sale and a votation against in-memory collaborators
    Simulate {
        #[arg(long, default_value_t = 10)]
        quorum: Amount,
        /// Weights voted on the first option, one donor each
        #[arg(long, value_delimiter = ',', default_value = "4,3,2")]
        for_votes: Vec<Amount>,
        /// Weights voted on the second option, one donor each
        #[arg(long, value_delimiter = ',', default_value = "1")]
        against_votes: Vec<Amount>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    FixedPrice,
    FixedQuantity,
}

impl From<ModeArg> for SaleMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FixedPrice => SaleMode::FixedPrice,
            ModeArg::FixedQuantity => SaleMode::FixedQuantity,
        }
    }
}

const NATIVE_UNIT: Amount = 1_000_000_000_000_000_000;

/// Simulated donors get addresses with every byte set to this value or above
const FIRST_DONOR_BYTE: u8 = 0x10;

fn format_native(value: Amount) -> String {
    format!("{}.{:018}", value / NATIVE_UNIT, value % NATIVE_UNIT)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PlatformConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PlatformConfig::from_env()?,
    };

    init_logging(if args.verbose { "debug" } else { config.log_level.as_str() });
    let settings = RegistrySettings::from_config(&config)?;

    match args.command {
        Command::Quote {
            mode,
            sold,
            amount,
            price,
        } => {
            let total = orgvote_economic::total_price(mode.into(), price, sold, amount, &settings.curve)?;
            println!("{} ({} native units)", total, format_native(total));
        }
        Command::Simulate {
            quorum,
            for_votes,
            against_votes,
        } => simulate(settings, quorum, &for_votes, &against_votes).await?,
    }

    Ok(())
}

type Ballot = (Address, usize, Amount);

/// Assign one donor per positive weight and size the supply to cover all of
/// them
fn plan_ballots(for_votes: &[Amount], against_votes: &[Amount]) -> Result<(Amount, Vec<Ballot>)> {
    let supply = for_votes
        .iter()
        .chain(against_votes)
        .try_fold(0 as Amount, |total, weight| total.checked_add(*weight))
        .context("total vote weight overflows")?
        .max(1);

    let weighted: Vec<(usize, Amount)> = for_votes
        .iter()
        .map(|w| (0, *w))
        .chain(against_votes.iter().map(|w| (1, *w)))
        .filter(|(_, weight)| *weight > 0)
        .collect();

    let mut ballots = Vec::with_capacity(weighted.len());
    for (i, (option, weight)) in weighted.into_iter().enumerate() {
        let Some(byte) = u8::try_from(i).ok().and_then(|i| i.checked_add(FIRST_DONOR_BYTE)) else {
            anyhow::bail!(
                "at most {} donors can be simulated",
                usize::from(u8::MAX - FIRST_DONOR_BYTE) + 1
            );
        };
        ballots.push((Address::repeat_byte(byte), option, weight));
    }

    Ok((supply, ballots))
}

async fn simulate(
    settings: RegistrySettings,
    quorum: Amount,
    for_votes: &[Amount],
    against_votes: &[Amount],
) -> Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    let access = Arc::new(InMemoryAccessGate::new());
    let payout = Arc::new(RecordingPayoutSink::new());
    let clock = Arc::new(ManualClock::new(SystemClock.now()));

    let registry = OrganizationRegistry::new(
        ledger.clone(),
        access.clone(),
        payout.clone(),
        clock.clone(),
        settings,
    );

    let organization = Address::repeat_byte(0x01);
    let admin = Address::repeat_byte(0xad);
    access.grant_admin(organization, admin).await;

    let (supply, ballots) = plan_ballots(for_votes, against_votes)?;
    registry
        .register(organization, SaleMode::FixedQuantity, supply)
        .await?;
    info!("Simulating {} donors over a supply of {}", ballots.len(), supply);

    let proposer = match ballots.first() {
        Some((donor, _, _)) => *donor,
        None => anyhow::bail!("at least one positive vote weight is required"),
    };

    for (donor, _, weight) in &ballots {
        let price = registry.quote_price(organization, *weight).await?;
        registry.buy(organization, *donor, *weight, price).await?;
        println!("{} bought {} tokens for {}", donor, weight, format_native(price));
    }

    let id = registry
        .propose_votation(
            organization,
            proposer,
            "Adopt the simulated proposal".to_string(),
            vec!["For".to_string(), "Against".to_string()],
            quorum,
        )
        .await?;
    registry.approve_votation(organization, admin, id).await?;

    for (donor, option, weight) in &ballots {
        registry.vote(organization, *donor, id, *option, *weight).await?;
    }

    clock.advance(registry.settings().votation.voting_period + 1);
    let outcome = registry.finalize_votation(organization, id).await?;

    println!(
        "Votation {}: for={} against={} quorum={} -> {:?}",
        outcome.votation_id, outcome.votes_for, outcome.votes_against, outcome.quorum, outcome.state
    );
    println!(
        "Proceeds forwarded to {}: {}",
        organization,
        format_native(payout.total_sent_to(organization).await)
    );

    Ok(())
}
