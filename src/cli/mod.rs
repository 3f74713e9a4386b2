use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod amount;
pub mod config;
pub mod logging;
pub mod session;
pub mod status;
pub mod version;

use amount::parse_amount;
use arisan::events::GroupEvent;
use arisan::factory::{unix_now, PlatformConfig};
use arisan::governance::{ProposalCategory, ProposalPayload, Vote};
use arisan::group::{Command, NewGroup};
use config::{default_config_path, ArisanConfig};
use session::{parse_caller, Session};

#[derive(Parser)]
#[command(name = "arisan")]
#[command(author = "Arisan Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for Arisan rotating savings groups", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.local/share/arisan/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Group and caller of a group command.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Group id
    #[arg(long)]
    pub group: u64,

    /// Caller: 0x address or a label (hashed into an address)
    #[arg(long = "as")]
    pub caller: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config file
    InitConfig {
        /// Snapshot path to put in the config
        #[arg(long)]
        store_path: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Initialize the platform wallet and capacity pricing (once)
    InitPlatform {
        /// Platform wallet (default: [platform] wallet from config)
        #[arg(long)]
        wallet: Option<String>,

        /// Capacity upgrade cost (default: [platform] capacity_upgrade_cost)
        #[arg(long)]
        upgrade_cost: Option<String>,
    },

    /// Create a group with the caller as coordinator
    CreateGroup {
        /// Coordinator: 0x address or label
        #[arg(long = "as")]
        caller: String,

        /// Coordinator display handle
        #[arg(long)]
        handle: String,

        #[arg(long)]
        title: String,

        /// Group chat link
        #[arg(long)]
        chat_url: String,

        /// Contribution per round (e.g. 1eth, 1000000gwei)
        #[arg(long)]
        contribution: String,

        /// Coordinator commission, 5-50
        #[arg(long)]
        commission: u8,

        /// Winner prize, 1-100
        #[arg(long)]
        prize: u8,
    },

    /// Join a group (governed by vote unless --no-approval)
    Join {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        handle: String,

        /// Join directly; only while open join is enabled
        #[arg(long)]
        no_approval: bool,
    },

    /// Leave a group
    Leave {
        #[command(flatten)]
        target: Target,
    },

    /// Start the next period
    StartPeriod {
        #[command(flatten)]
        target: Target,
    },

    /// Contribute to the open round
    Contribute {
        #[command(flatten)]
        target: Target,

        /// Period index (default: ongoing period)
        #[arg(long)]
        period: Option<u64>,

        /// Payment (default: the period's contribution amount)
        #[arg(long)]
        amount: Option<String>,
    },

    /// Draw the winner of the open round
    Draw {
        #[command(flatten)]
        target: Target,

        /// Period index (default: ongoing period)
        #[arg(long)]
        period: Option<u64>,
    },

    /// End a period whose due winners have all won
    EndPeriod {
        #[command(flatten)]
        target: Target,

        /// Period index (default: latest period)
        #[arg(long)]
        period: Option<u64>,
    },

    /// Buy one capacity tier
    UpgradeCapacity {
        #[command(flatten)]
        target: Target,

        /// Payment (default: the platform upgrade cost)
        #[arg(long)]
        payment: Option<String>,
    },

    /// Toggle open join (coordinator only)
    ToggleOpenJoin {
        #[command(flatten)]
        target: Target,
    },

    /// Open a proposal
    Propose {
        #[command(flatten)]
        target: Target,

        #[command(subcommand)]
        proposal: ProposeCommand,
    },

    /// Vote on a proposal
    Vote {
        #[command(flatten)]
        target: Target,

        /// Proposal index
        #[arg(long)]
        proposal: u64,

        /// Proposal category, e.g. new-title, kick-member
        #[arg(long)]
        category: ProposalCategory,

        /// Vote against (default: approve)
        #[arg(long)]
        reject: bool,
    },

    /// Show platform or group status
    Status {
        /// Group id (default: platform overview)
        #[arg(long)]
        group: Option<u64>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ProposeCommand {
    NewTitle {
        title: String,
    },
    NewTelegramUrl {
        url: String,
    },
    NewCoordinator {
        /// Member address or label
        member: String,
    },
    NewCommission {
        percentage: u8,
    },
    NewContribution {
        amount: String,
    },
    NewPrize {
        percentage: u8,
    },
    NewMember {
        /// Address or label of the new member
        member: String,
        handle: String,
    },
    KickMember {
        /// Member address or label
        member: String,
    },
    Transfer {
        /// Recipient address or label
        recipient: String,
        amount: String,
    },
}

impl ProposeCommand {
    pub fn into_payload(self) -> Result<ProposalPayload, Box<dyn std::error::Error>> {
        Ok(match self {
            ProposeCommand::NewTitle { title } => ProposalPayload::NewTitle { title },
            ProposeCommand::NewTelegramUrl { url } => ProposalPayload::NewTelegramUrl { url },
            ProposeCommand::NewCoordinator { member } => ProposalPayload::NewCoordinator {
                coordinator: parse_caller(&member)?,
            },
            ProposeCommand::NewCommission { percentage } => {
                ProposalPayload::NewCommission { percentage }
            }
            ProposeCommand::NewContribution { amount } => ProposalPayload::NewContribution {
                amount: parse_amount(&amount)?,
            },
            ProposeCommand::NewPrize { percentage } => ProposalPayload::NewPrize { percentage },
            ProposeCommand::NewMember { member, handle } => ProposalPayload::NewMember {
                address: parse_caller(&member)?,
                handle,
            },
            ProposeCommand::KickMember { member } => ProposalPayload::KickMember {
                member: parse_caller(&member)?,
            },
            ProposeCommand::Transfer { recipient, amount } => ProposalPayload::Transfer {
                recipient: parse_caller(&recipient)?,
                amount: parse_amount(&amount)?,
            },
        })
    }
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    if let Commands::InitConfig { store_path, force } = &cli.command {
        return init_config(&config_path, store_path.clone(), *force);
    }
    if let Commands::Version = cli.command {
        version::execute();
        return Ok(());
    }

    let config = ArisanConfig::load_or_default(&config_path)?;
    logging::init(&config.logging)?;
    let mut session = Session::open(&config)?;

    match cli.command {
        Commands::InitConfig { .. } | Commands::Version => Ok(()),
        Commands::InitPlatform {
            wallet,
            upgrade_cost,
        } => init_platform(&mut session, &config, wallet, upgrade_cost).await,
        Commands::CreateGroup {
            caller,
            handle,
            title,
            chat_url,
            contribution,
            commission,
            prize,
        } => {
            let params = NewGroup {
                title,
                chat_url,
                coordinator: parse_caller(&caller)?,
                coordinator_handle: handle,
                commission_percentage: commission,
                contribution_amount: parse_amount(&contribution)?,
                prize_percentage: prize,
            };
            let group = session.factory_mut().create_group(params, unix_now())?;
            session.save().await?;
            println!("✅ Group {} created", group.id());
            Ok(())
        }
        Commands::Join {
            target,
            handle,
            no_approval,
        } => {
            let command = if no_approval {
                Command::JoinGroupNoApproval { handle }
            } else {
                Command::JoinGroup { handle }
            };
            run(&session, &target, 0, command).await
        }
        Commands::Leave { target } => run(&session, &target, 0, Command::Leave).await,
        Commands::StartPeriod { target } => run(&session, &target, 0, Command::StartPeriod).await,
        Commands::Contribute {
            target,
            period,
            amount,
        } => {
            let handle = session.group(target.group)?;
            let (ongoing, expected) = handle
                .read(|state| {
                    let ongoing = state.periods().ongoing_period();
                    (
                        ongoing.map(|p| p.index),
                        ongoing.map(|p| p.terms.contribution_amount),
                    )
                })
                .await;
            let period = period
                .or(ongoing)
                .ok_or("No period ongoing; pass --period")?;
            let value = match amount {
                Some(amount) => parse_amount(&amount)?,
                None => expected.ok_or("No period ongoing; pass --amount")?,
            };
            run(&session, &target, value, Command::Contribute { period }).await
        }
        Commands::Draw { target, period } => {
            let period = resolve_period(&session, &target, period, true).await?;
            run(&session, &target, 0, Command::DrawWinner { period }).await
        }
        Commands::EndPeriod { target, period } => {
            let period = resolve_period(&session, &target, period, false).await?;
            run(&session, &target, 0, Command::EndPeriod { period }).await
        }
        Commands::UpgradeCapacity { target, payment } => {
            let value = match payment {
                Some(payment) => parse_amount(&payment)?,
                None => session.factory().platform_config()?.capacity.upgrade_cost,
            };
            run(&session, &target, value, Command::UpgradeCapacity).await
        }
        Commands::ToggleOpenJoin { target } => {
            run(&session, &target, 0, Command::ToggleOpenJoin).await
        }
        Commands::Propose { target, proposal } => {
            let payload = proposal.into_payload()?;
            run(&session, &target, 0, Command::Propose(payload)).await
        }
        Commands::Vote {
            target,
            proposal,
            category,
            reject,
        } => {
            let command = Command::Vote {
                proposal,
                category,
                vote: Vote::from_approve(!reject),
            };
            run(&session, &target, 0, command).await
        }
        Commands::Status { group, json } => status::execute(&session, group, json).await,
    }
}

fn init_config(
    config_path: &std::path::Path,
    store_path: Option<PathBuf>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }
    let store_path = store_path.unwrap_or_else(config::default_store_path);
    ArisanConfig::create_default(config_path, &store_path)?;
    println!("✅ Config written to {}", config_path.display());
    Ok(())
}

async fn init_platform(
    session: &mut Session,
    config: &ArisanConfig,
    wallet: Option<String>,
    upgrade_cost: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let wallet = match wallet {
        Some(wallet) => parse_caller(&wallet)?,
        None => config
            .platform
            .wallet_address()?
            .ok_or("No platform wallet: pass --wallet or set [platform] wallet")?,
    };
    let mut policy = config.platform.capacity_policy()?;
    if let Some(cost) = upgrade_cost {
        policy.upgrade_cost = parse_amount(&cost)?;
    }

    let platform = PlatformConfig::with_policy(wallet, policy)?;
    session.factory_mut().install_platform(platform)?;
    session.save().await?;
    println!("✅ Platform initialized with wallet {}", wallet);
    Ok(())
}

/// Ongoing period for draws, latest period for ending.
async fn resolve_period(
    session: &Session,
    target: &Target,
    period: Option<u64>,
    ongoing_only: bool,
) -> Result<u64, Box<dyn std::error::Error>> {
    if let Some(period) = period {
        return Ok(period);
    }
    let handle = session.group(target.group)?;
    let found = handle
        .read(|state| {
            if ongoing_only {
                state.periods().ongoing_period().map(|p| p.index)
            } else {
                state.periods().current_period().map(|p| p.index)
            }
        })
        .await;
    Ok(found.ok_or("No matching period; pass --period")?)
}

async fn run(
    session: &Session,
    target: &Target,
    value: arisan::identity::Wei,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let caller = parse_caller(&target.caller)?;
    let name = command.name();
    let events = session.run(target.group, caller, value, command).await?;
    println!("✅ {} committed", name);
    for event in &events {
        println!("  {}", describe(event));
    }
    Ok(())
}

fn describe(event: &GroupEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| format!("{:?}", event))
}
