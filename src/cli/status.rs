//! `arisan status`: print the read surface.

use super::amount::format_ether;
use super::session::Session;
use arisan::group::GroupDetail;
use serde::Serialize;

#[derive(Serialize)]
struct PlatformStatus {
    initialized: bool,
    platform_wallet: Option<String>,
    capacity_upgrade_cost: Option<String>,
    groups: Vec<u64>,
}

/// Print one group, or the platform overview when `group` is None.
pub async fn execute(
    session: &Session,
    group: Option<u64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let factory = session.factory();
    let Some(id) = group else {
        let platform = factory.platform_config().ok();
        let status = PlatformStatus {
            initialized: platform.is_some(),
            platform_wallet: platform.map(|p| p.platform_wallet.to_string()),
            capacity_upgrade_cost: platform.map(|p| p.capacity.upgrade_cost.to_string()),
            groups: factory.group_ids(),
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            print_platform(&status);
        }
        return Ok(());
    };

    let handle = session.group(id)?;
    let pricing = handle.platform().pricing();
    let detail = handle.read(|state| state.detail(&pricing)).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_group(&detail);
    }
    Ok(())
}

fn print_platform(status: &PlatformStatus) {
    println!("Arisan platform");
    match &status.platform_wallet {
        Some(wallet) => println!("  Wallet: {}", wallet),
        None => println!("  Not initialized (run `arisan init-platform`)"),
    }
    if let Some(cost) = &status.capacity_upgrade_cost {
        println!("  Capacity upgrade cost: {} wei", cost);
    }
    println!("  Groups: {}", status.groups.len());
}

fn print_group(detail: &GroupDetail) {
    let s = &detail.settings;
    println!("Group {}: {}", detail.id, s.title);
    println!("  Chat: {}", s.chat_url);
    println!("  Coordinator: {}", s.coordinator);
    println!(
        "  Contribution: {} | commission {}% | prize {}%",
        format_ether(s.contribution_amount),
        s.commission_percentage,
        s.prize_percentage
    );
    println!(
        "  Members: {}/{} ({} active voters, open join {})",
        detail.member_count,
        s.max_capacity,
        detail.active_voters,
        if s.open_join_enabled { "on" } else { "off" }
    );
    for member in &detail.members {
        println!("    {} {}", member.address, member.handle);
    }
    match detail.ongoing_period {
        Some(period) => println!(
            "  Period {} ongoing, {} due winner(s)",
            period,
            detail.due_winners.len()
        ),
        None => println!("  No period ongoing ({} completed)", detail.periods_count),
    }
    println!(
        "  Proposals: {} open of {}",
        detail.incomplete_proposals, detail.proposals_count
    );
    println!("  Balance: {}", format_ether(detail.balance));
    println!("  Beacon commitment: {}", detail.beacon_commitment);
}
