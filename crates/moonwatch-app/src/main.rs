// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Moonwatch: headless monitor and remote control for Moonraker printers.
//
// Entry point. Initialises logging and backend services, then runs one
// command.

mod cli;
mod render;
mod services;

use std::process::ExitCode;

use clap::Parser;

use moonwatch_core::error::Result;
use moonwatch_core::gcode::PrinterSettings;
use moonwatch_core::human_errors::humanize_error;
use moonwatch_core::types::PrinterId;

use cli::{Cli, Command, VpnAction};
use services::app_services::AppServices;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            let human = humanize_error(&e);
            eprintln!("{}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dir = services::data_dir::data_dir(cli.data_dir.as_deref())?;
    let svc = AppServices::init(dir).await?;

    match cli.command {
        Command::Login { server, api_key } => {
            let credentials = svc.login(&server, &api_key)?;
            println!("Logged in to {}", credentials.server_address);
        }
        Command::Logout => {
            svc.logout().await?;
            println!("Logged out");
        }
        Command::Add {
            address,
            name,
            id,
            api_key,
        } => {
            let id = svc
                .add_printer(&address, &name, id.map(PrinterId::from), api_key)
                .await?;
            println!("Added {id}");
        }
        Command::Edit {
            id,
            address,
            api_key,
        } => {
            let endpoint = svc.edit_printer(&PrinterId::from(id), &address, api_key).await?;
            println!("{} now at {}", endpoint.id, endpoint.base_url);
        }
        Command::Remove { id } => {
            svc.remove_printer(&PrinterId::from(id)).await?;
            println!("Removed");
        }
        Command::List => {
            let printers = svc.printers().await;
            if printers.is_empty() {
                println!("No printers registered. Use `moonwatch add` or `moonwatch discover`.");
            }
            let selected = svc.selected_printer()?;
            for entry in &printers {
                println!("{}", render::printer_line(entry, selected.as_ref()));
            }
        }
        Command::Discover => {
            let added = svc.discover().await?;
            println!("Discovered {} new printer(s)", added.len());
            for id in added {
                println!("  {id}");
            }
        }
        Command::Import { file } => {
            let report = svc.import_legacy(&file).await?;
            println!(
                "Imported {} printer(s), skipped {}",
                report.imported, report.skipped
            );
        }
        Command::Monitor { id, range } => {
            let id = svc.resolve_printer(id)?;
            let (outcome, entry) = svc.monitor(&id, range).await?;
            if let Some(error) = &outcome.status_error {
                eprintln!("Status refresh failed: {error}");
            }
            match &entry.view {
                Some(view) => {
                    println!("{}", render::view_block(view, &entry.history, outcome.range));
                    println!("{}", render::refreshed_line(entry.refreshed_at));
                }
                None => println!("{}: no status received yet", entry.name),
            }
            for alert in &outcome.alerts {
                println!("! {}: {}", alert.title, alert.message);
            }
        }
        Command::Stop { id } => {
            let id = svc.resolve_printer(id)?;
            report_command("Emergency stop", svc.emergency_stop(&id).await?);
        }
        Command::Settings {
            id,
            bed,
            nozzle,
            speed,
        } => {
            let settings = PrinterSettings::parse(&bed, &nozzle, &speed)?;
            let id = svc.resolve_printer(id)?;
            report_command("Settings", svc.apply_settings(&id, settings).await?);
        }
        Command::Reset { id } => {
            let id = svc.resolve_printer(id)?;
            report_command("Reset", svc.reset_settings(&id).await?);
        }
        Command::Vpn { action } => match action {
            VpnAction::Up => {
                svc.vpn_up().await?;
                println!("VPN up");
            }
            VpnAction::Down => {
                svc.vpn_down().await?;
                println!("VPN down");
            }
            VpnAction::Status => {
                let state = if svc.vpn_active().await { "up" } else { "down" };
                println!("VPN {state}");
            }
        },
        Command::Audit { printer, limit } => {
            let entries = match printer {
                Some(id) => svc.printer_audit_entries(&PrinterId::from(id), limit)?,
                None => svc.recent_audit_entries(limit)?,
            };
            for entry in &entries {
                println!("{}", render::audit_line(entry));
            }
            println!("{} of {} recorded command(s) shown", entries.len(), svc.audit_total()?);
        }
    }
    Ok(())
}

fn report_command(label: &str, accepted: bool) {
    if accepted {
        println!("{label} sent");
    } else {
        println!("{label} failed: the printer did not accept the command");
    }
}
