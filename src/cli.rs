// Line-oriented console front end for the session loop.
//
// Reads commands from stdin, renders session updates to stdout. Kept thin:
// all squad logic lives behind the protocol channel, so this module is one
// interchangeable consumer among possible front ends.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::protocol::{NoticeLevel, UiUpdate, UserCommand};
use crate::squad::{AthleteId, GameweekId};

/// Parse one console line into a command.
pub fn parse_command(line: &str) -> Result<UserCommand, String> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or("");
    let arg = parts.next();

    let parse_id = |arg: Option<&str>, usage: &str| -> Result<u32, String> {
        arg.ok_or_else(|| format!("usage: {usage}"))?
            .parse::<u32>()
            .map_err(|_| format!("usage: {usage}"))
    };

    match verb {
        "gw" => Ok(UserCommand::EnterGameweek(GameweekId(parse_id(
            arg, "gw <gameweek>",
        )?))),
        "add" => Ok(UserCommand::Add(AthleteId(parse_id(arg, "add <id>")?))),
        "rm" => Ok(UserCommand::Remove(AthleteId(parse_id(arg, "rm <id>")?))),
        "start" => Ok(UserCommand::Promote(AthleteId(parse_id(
            arg,
            "start <id>",
        )?))),
        "bench" => Ok(UserCommand::Demote(AthleteId(parse_id(
            arg,
            "bench <id>",
        )?))),
        "captain" => Ok(UserCommand::SetCaptain(AthleteId(parse_id(
            arg,
            "captain <id>",
        )?))),
        "vice" => Ok(UserCommand::SetViceCaptain(AthleteId(parse_id(
            arg,
            "vice <id>",
        )?))),
        "check" => Ok(UserCommand::Validate),
        "save" => Ok(UserCommand::Save),
        "random" => Ok(UserCommand::RequestCandidate),
        "quit" | "q" => Ok(UserCommand::Quit),
        "" => Err(String::new()),
        other => Err(format!("unknown command '{other}'; type 'help'")),
    }
}

fn print_help() {
    println!("commands:");
    println!("  gw <n>        switch to gameweek n");
    println!("  add <id>      add athlete to the squad");
    println!("  rm <id>       remove athlete from the squad");
    println!("  start <id>    promote athlete into the lineup");
    println!("  bench <id>    drop athlete back to the bench");
    println!("  captain <id>  assign the captaincy");
    println!("  vice <id>     assign the vice-captaincy");
    println!("  check         validate the draft");
    println!("  save          validate and commit to the platform");
    println!("  random        load a server-generated squad");
    println!("  quit          exit");
}

fn render(update: &UiUpdate) {
    match update {
        UiUpdate::CatalogReady { athletes } => {
            println!("catalog ready: {athletes} athletes");
        }
        UiUpdate::SquadChanged(s) => {
            println!(
                "gw {} | {} picked, {} starters | cost {}, {} left",
                s.gameweek, s.squad_size, s.starter_count, s.cost_used, s.budget_remaining,
            );
        }
        UiUpdate::EditRejected(e) => {
            println!("rejected: {e}");
        }
        UiUpdate::ValidationFinished(report) => {
            if report.is_valid() {
                println!("squad is valid");
            } else {
                println!("{} violation(s):", report.violations().len());
                for message in report.messages() {
                    println!("  - {message}");
                }
            }
        }
        UiUpdate::Saved { squad_id } => {
            println!("saved as squad {squad_id}");
        }
        UiUpdate::Notice(notice) => {
            let prefix = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Warn => "warn",
                NoticeLevel::Error => "error",
            };
            println!("[{prefix}] {}", notice.message);
        }
    }
}

/// Run the console until the user quits or the session loop ends.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_help();

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => render(&update),
                    None => break,
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        let _ = cmd_tx.send(UserCommand::Quit).await;
                        break;
                    }
                };
                if line.trim() == "help" {
                    print_help();
                    continue;
                }
                match parse_command(&line) {
                    Ok(cmd) => {
                        let quitting = cmd == UserCommand::Quit;
                        if cmd_tx.send(cmd).await.is_err() {
                            break;
                        }
                        if quitting {
                            break;
                        }
                    }
                    Err(message) => {
                        if !message.is_empty() {
                            println!("{message}");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
