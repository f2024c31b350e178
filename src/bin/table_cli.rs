//! A plain-text client for watching and playing one table.
//!
//! Connects to the table server over WebSocket, keeps the local view in
//! sync, and turns stdin lines into table commands.

use anyhow::{Context, Result};
use pico_args::Arguments;
use pp_table_client::game::entities::{PlayerAction, PlayerId};
use pp_table_client::game::preaction::PreAction;
use pp_table_client::net::connection::{ConnectionConfig, ConnectionManager};
use pp_table_client::net::gateway::CommandGateway;
use pp_table_client::net::messages::{PlayerRef, TableId};
use pp_table_client::table::session::{TableSession, TableUpdate, UserIntent};
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

const HELP: &str = "\
Connect to a poker table

USAGE:
  table_cli [OPTIONS]

OPTIONS:
  --server URL          Server WebSocket URL  [default: ws://localhost:8080/ws]
  --table ID            Table to join  [default: main]
  --username NAME       Player name

FLAGS:
  -h, --help            Print help information

COMMANDS (stdin):
  sit SEAT BUYIN        Take a seat with a buy-in
  chips AMOUNT          Add chips to your stack
  stand                 Leave your seat
  fold | check | allin  Act on your turn
  call AMOUNT           Call the current bet
  raise AMOUNT          Raise to an amount
  pre fold|checkfold|call
                        Toggle a pre-action for your next turn
  say MESSAGE           Send a chat message
  quit                  Disconnect and exit
";

struct Args {
    server_url: String,
    table: String,
    username: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        server_url: pargs
            .value_from_str("--server")
            .unwrap_or_else(|_| "ws://localhost:8080/ws".to_string()),
        table: pargs
            .value_from_str("--table")
            .unwrap_or_else(|_| "main".to_string()),
        username: pargs.opt_value_from_str("--username").ok().flatten(),
    };

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let username = match args.username {
        Some(name) => name,
        None => {
            print!("Username: ");
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin()
                .read_line(&mut input)
                .context("Failed to read username")?;
            input.trim().to_string()
        }
    };

    let player = PlayerRef {
        id: PlayerId::new(username.clone()),
        name: username,
    };

    let config = ConnectionConfig::new(args.server_url, TableId::new(args.table));
    let (manager, handle, inbound_rx) = ConnectionManager::new(config);
    tokio::spawn(manager.run());

    let session = TableSession::new(player, CommandGateway::new(handle));
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();

    // Blocking stdin reader; ends on EOF or `quit`, which closes the
    // intent channel and winds the session down.
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(Some(intent)) => {
                    if intent_tx.send(intent).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(message) => eprintln!("{message}"),
            }
        }
    });

    tokio::spawn(session.run(inbound_rx, intent_rx, update_tx));

    while let Some(update) = update_rx.recv().await {
        print_update(&update);
    }

    println!("\nDisconnected from table.");
    Ok(())
}

fn parse_amount(parts: &mut std::str::SplitWhitespace, usage: &str) -> Result<u64, String> {
    parts
        .next()
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| usage.to_string())
}

/// Parse one stdin line. `Ok(None)` means quit.
fn parse_command(line: &str) -> Result<Option<UserIntent>, String> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Err(String::new());
    };

    let intent = match command {
        "quit" | "exit" => return Ok(None),
        "sit" => {
            let seat_id = parse_amount(&mut parts, "usage: sit SEAT BUYIN")? as usize;
            let buy_in_amount = parse_amount(&mut parts, "usage: sit SEAT BUYIN")?;
            UserIntent::SitDown {
                seat_id,
                buy_in_amount,
            }
        }
        "chips" => UserIntent::AddChips {
            amount: parse_amount(&mut parts, "usage: chips AMOUNT")?,
        },
        "stand" => UserIntent::StandUp,
        "fold" => UserIntent::Act(PlayerAction::Fold),
        "check" => UserIntent::Act(PlayerAction::Check),
        "call" => UserIntent::Act(PlayerAction::Call {
            amount: parse_amount(&mut parts, "usage: call AMOUNT")?,
        }),
        "raise" => UserIntent::Act(PlayerAction::Raise {
            amount: parse_amount(&mut parts, "usage: raise AMOUNT")?,
        }),
        "allin" => UserIntent::Act(PlayerAction::AllIn),
        "pre" => {
            let which = parts.next().unwrap_or_default();
            let pre = match which {
                "fold" => PreAction::Fold,
                "checkfold" => PreAction::CheckOrFold,
                "call" => PreAction::CallAny,
                _ => return Err("usage: pre fold|checkfold|call".to_string()),
            };
            UserIntent::StagePreAction(pre)
        }
        "say" => {
            let message = line.trim_start().strip_prefix("say").unwrap_or_default();
            UserIntent::Chat(message.trim().to_string())
        }
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(intent))
}

fn print_update(update: &TableUpdate) {
    if let Some(chat) = &update.chat {
        println!("[{}] {}", chat.player, chat.message);
    }
    if let Some(notice) = &update.notice {
        println!("* {notice}");
    }
    if let Some(rejection) = &update.rejection {
        println!("! {rejection}");
    }

    let state = &update.state;
    let board = state
        .community_cards
        .iter()
        .map(|card| card.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "-- {} | pot {} | to call {} | board [{board}]",
        update.status, update.displayed_pot, state.current_bet_to_call
    );
    for (seat_id, occupant) in state.occupied_seats() {
        let cards = occupant
            .hole_cards
            .iter()
            .map(|view| view.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let mut flags = String::new();
        if state.dealer_seat == Some(seat_id) {
            flags.push('D');
        }
        if occupant.is_active {
            flags.push('*');
        }
        if occupant.is_winner {
            flags.push('W');
        }
        println!(
            "   seat {seat_id}: {} ({}) [{cards}] {flags}",
            occupant.display_name, occupant.chip_stack
        );
    }
    if !update.collecting_bets.is_empty() {
        let total: u64 = update.collecting_bets.iter().map(|bet| bet.amount).sum();
        println!("   collecting {total} into the pot...");
    }
    if let Some(pre) = update.staged_pre_action {
        println!("   pre-action staged: {pre:?}");
    }
}
