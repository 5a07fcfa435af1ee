//! Command definitions and dispatch onto the rule engine.

use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use dealership_core::{
    parse_rental_date, AppConfig, DealershipManager, EngineError, EngineResult, LoadOutcome,
    SearchField, Vehicle,
};
use tracing::info;

use crate::render;

/// Inventory operations available both as one-shot commands and in the shell.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the whole inventory.
    List,

    /// Search the inventory.
    Search {
        /// Text to look for (case-insensitive).
        query: String,
        /// Field to match: id, manufacturer, model, dealer, type or all.
        #[arg(long, default_value = "all")]
        field: SearchField,
    },

    /// Show inventory statistics.
    Stats,

    /// List dealers currently holding stock.
    Dealers,

    /// List vehicles of a dealer that can be rented now.
    Available {
        /// Dealer id.
        dealer: String,
    },

    /// List vehicles of a dealer that are out on rental.
    Rented {
        /// Dealer id.
        dealer: String,
    },

    /// Acquire a new vehicle.
    Add {
        /// Vehicle type: suv, sedan, pickup or "sports car".
        #[arg(long = "type")]
        kind: String,
        /// Owning dealer id.
        #[arg(long)]
        dealer: String,
        /// Vehicle id.
        #[arg(long)]
        id: String,
        /// Manufacturer.
        #[arg(long)]
        make: String,
        /// Model.
        #[arg(long)]
        model: String,
        /// Price in dollars.
        #[arg(long, allow_negative_numbers = true)]
        price: f64,
    },

    /// Remove a vehicle; manufacturer, model and price must match.
    Remove {
        #[arg(long)]
        dealer: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        make: String,
        #[arg(long)]
        model: String,
        #[arg(long, allow_negative_numbers = true)]
        price: f64,
    },

    /// Rent a vehicle out.
    Rent {
        #[arg(long)]
        dealer: String,
        #[arg(long)]
        id: String,
        /// Start date, MM/DD/YYYY or YYYY-MM-DD.
        #[arg(long)]
        start: String,
        /// Planned end date, MM/DD/YYYY or YYYY-MM-DD.
        #[arg(long)]
        end: String,
    },

    /// Return a rented vehicle.
    Return {
        #[arg(long)]
        dealer: String,
        #[arg(long)]
        id: String,
    },

    /// Move a vehicle to another dealer.
    Transfer {
        /// Current owner.
        #[arg(long)]
        from: String,
        /// New owner.
        #[arg(long)]
        to: String,
        #[arg(long)]
        id: String,
    },

    /// Import vehicles from a dealer XML document.
    Import {
        /// XML file to read.
        path: PathBuf,
    },

    /// Write the inventory to the export document.
    Export {
        /// Destination, defaults to the configured export path.
        #[arg(long)]
        to: Option<PathBuf>,
    },

    /// Reset the export document to an empty inventory.
    ClearExport {
        /// Destination, defaults to the configured export path.
        #[arg(long)]
        to: Option<PathBuf>,
    },
}

/// Commands accepted by the interactive shell.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ShellCommand {
    #[command(flatten)]
    Inventory(Command),

    /// Allow a dealer to acquire new vehicles.
    EnableAcquisition {
        dealer: String,
    },

    /// Block a dealer from acquiring new vehicles.
    DisableAcquisition {
        dealer: String,
    },

    /// List dealers whose acquisition is switched off.
    AcquisitionStatus,

    /// Re-read the inventory document.
    Reload,

    /// Leave the shell.
    #[command(alias = "quit")]
    Exit,
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

/// Run one inventory command and return the text to print.
pub fn execute(
    manager: &mut DealershipManager,
    config: &AppConfig,
    command: Command,
) -> EngineResult<String> {
    match command {
        Command::List => Ok(render::listing(
            "Current Inventory",
            &manager.list_for_display(),
            "Inventory is empty.",
        )),
        Command::Search { query, field } => Ok(render::listing(
            "Search Results",
            &manager.search(field, &query),
            "No vehicles match your search criteria.",
        )),
        Command::Stats => Ok(render::summary(&manager.summary())),
        Command::Dealers => Ok(manager.dealer_ids().join("\n")),
        Command::Available { dealer } => Ok(choices(&manager.available_for_rent(&dealer))),
        Command::Rented { dealer } => Ok(choices(&manager.rented_by(&dealer))),
        Command::Add {
            kind,
            dealer,
            id,
            make,
            model,
            price,
        } => {
            let vehicle = Vehicle::from_tag(&kind, id, make, model, price, dealer)?;
            let message = format!("Vehicle {} added to dealer {}", vehicle.vehicle_id(), vehicle.dealer_id());
            manager.add_vehicle(vehicle)?;
            Ok(message)
        }
        Command::Remove {
            dealer,
            id,
            make,
            model,
            price,
        } => {
            let removed = manager.remove_vehicle(&dealer, &id, &make, &model, price)?;
            Ok(format!("Vehicle removed: {}", render::vehicle_choice(&removed)))
        }
        Command::Rent {
            dealer,
            id,
            start,
            end,
        } => {
            let start = parse_rental_date(&start)?;
            let end = parse_rental_date(&end)?;
            manager.rent_vehicle(&dealer, &id, start, end)?;
            Ok(format!(
                "Vehicle {id} rented from {} to {}",
                start.format("%m/%d/%Y"),
                end.format("%m/%d/%Y")
            ))
        }
        Command::Return { dealer, id } => {
            manager.return_vehicle(&dealer, &id)?;
            Ok(format!("Vehicle {id} returned to dealer {dealer}"))
        }
        Command::Transfer { from, to, id } => {
            manager.transfer_vehicle(&from, &to, &id)?;
            Ok(format!("Vehicle {id} transferred from {from} to {to}"))
        }
        Command::Import { path } => {
            let report = manager.import_xml_file(&path)?;
            Ok(render::import_report(&report))
        }
        Command::Export { to } => {
            let destination = to.unwrap_or_else(|| config.export_path.clone());
            let count = manager.export_inventory(&destination)?;
            Ok(format!(
                "Exported {count} vehicles to {}",
                destination.display()
            ))
        }
        Command::ClearExport { to } => {
            let destination = to.unwrap_or_else(|| config.export_path.clone());
            manager.clear_export_document(&destination)?;
            Ok(format!("Cleared {}", destination.display()))
        }
    }
}

fn choices(vehicles: &[Vehicle]) -> String {
    vehicles
        .iter()
        .map(render::vehicle_choice)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read commands line by line until EOF or `exit`.
pub fn run_shell(
    manager: &mut DealershipManager,
    config: &AppConfig,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<()> {
    writeln!(output, "dealerctl shell, type 'help' for commands")?;
    for line in input.lines() {
        let line = line?;
        let tokens = match tokenize(&line) {
            Ok(tokens) if tokens.is_empty() => continue,
            Ok(tokens) => tokens,
            Err(err) => {
                writeln!(output, "{err}")?;
                continue;
            }
        };

        let parsed = match ShellLine::try_parse_from(tokens) {
            Ok(parsed) => parsed,
            Err(err) => {
                writeln!(output, "{}", err.render())?;
                continue;
            }
        };

        match parsed.command {
            ShellCommand::Exit => break,
            ShellCommand::Reload => {
                let message = match manager.reload() {
                    LoadOutcome::Missing => "No inventory document found".to_string(),
                    LoadOutcome::Loaded(decoded) => {
                        format!("Loaded {} vehicles", decoded.vehicles.len())
                    }
                    LoadOutcome::Unreadable(err) => format!("Inventory unreadable: {err:#}"),
                };
                writeln!(output, "{message}")?;
            }
            ShellCommand::EnableAcquisition { dealer } => {
                manager.enable_acquisition(&dealer);
                writeln!(output, "Vehicle acquisition enabled for dealer {dealer}")?;
            }
            ShellCommand::DisableAcquisition { dealer } => {
                manager.disable_acquisition(&dealer);
                writeln!(output, "Vehicle acquisition disabled for dealer {dealer}")?;
            }
            ShellCommand::AcquisitionStatus => {
                let disabled = manager.registry().disabled_dealers();
                writeln!(output, "{}", render::acquisition_status(&disabled))?;
            }
            ShellCommand::Inventory(command) => {
                let text = execute(manager, config, command).unwrap_or_else(|err| report(&err));
                writeln!(output, "{text}")?;
            }
        }
    }
    info!("shell session ended");
    Ok(())
}

/// Render a failure for the user.
pub fn report(error: &EngineError) -> String {
    render::failure(error)
}

/// Split a shell line on whitespace, keeping double-quoted runs together.
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            ch if ch.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            ch => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err("unterminated quote".to_string());
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealership_core::KindResolution;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn manager_in(dir: &std::path::Path) -> (DealershipManager, AppConfig) {
        let config = AppConfig {
            inventory_path: dir.join("inventory.json"),
            export_path: dir.join("export.json"),
            log_dir: dir.join("logs"),
            kind_resolution: KindResolution::default(),
        };
        let (manager, _) = DealershipManager::from_config(&config);
        (manager, config)
    }

    #[test]
    fn tokenizer_keeps_quoted_values_together() {
        assert_eq!(
            tokenize(r#"add --type "sports car" --model "Range Rover""#),
            Ok(vec![
                "add".to_string(),
                "--type".to_string(),
                "sports car".to_string(),
                "--model".to_string(),
                "Range Rover".to_string(),
            ])
        );
        assert_eq!(tokenize("   "), Ok(Vec::new()));
        assert_eq!(tokenize(r#"--make """#), Ok(vec!["--make".to_string(), String::new()]));
        assert!(tokenize(r#"add "oops"#).is_err());
    }

    #[test]
    fn shell_line_parses_flattened_commands() {
        let parsed = ShellLine::try_parse_from(["return", "--dealer", "D1", "--id", "V1"])
            .expect("valid line");
        assert_eq!(
            parsed.command,
            ShellCommand::Inventory(Command::Return {
                dealer: "D1".into(),
                id: "V1".into()
            })
        );

        let parsed = ShellLine::try_parse_from(["disable-acquisition", "D1"]).expect("valid line");
        assert_eq!(
            parsed.command,
            ShellCommand::DisableAcquisition { dealer: "D1".into() }
        );
    }

    #[test]
    fn execute_runs_add_and_list() -> Result<()> {
        let dir = tempdir()?;
        let (mut manager, config) = manager_in(dir.path());

        let added = execute(
            &mut manager,
            &config,
            Command::Add {
                kind: "suv".into(),
                dealer: "D1".into(),
                id: "V1".into(),
                make: "Honda".into(),
                model: "CR-V".into(),
                price: 25_000.0,
            },
        )?;
        assert_eq!(added, "Vehicle V1 added to dealer D1");

        let listed = execute(&mut manager, &config, Command::List)?;
        assert!(listed.contains("ID: V1"));

        let err = execute(
            &mut manager,
            &config,
            Command::Rent {
                dealer: "D1".into(),
                id: "V1".into(),
                start: "tomorrow".into(),
                end: "01/10/2024".into(),
            },
        )
        .unwrap_err();
        assert!(err.validation().is_some());
        Ok(())
    }

    #[test]
    fn shell_session_honours_acquisition_switch() -> Result<()> {
        let dir = tempdir()?;
        let (mut manager, config) = manager_in(dir.path());
        let script = "\
disable-acquisition D1
acquisition-status
add --type suv --dealer D1 --id V2 --make Honda --model CR-V --price 25000
enable-acquisition D1
add --type \"sports car\" --dealer D1 --id S1 --make Toyota --model Supra --price 52000
rent --dealer D1 --id S1 --start 01/01/2024 --end 01/10/2024
exit
list
";
        let mut output = Vec::new();
        run_shell(&mut manager, &config, Cursor::new(script), &mut output)?;
        let output = String::from_utf8(output)?;

        assert!(output.contains("Acquisition disabled for: D1"));
        assert!(output.contains("Vehicle acquisition is disabled for dealer D1"));
        assert!(output.contains("Vehicle S1 added to dealer D1"));
        assert!(output.contains("cannot be rented"));
        assert!(!output.contains("Current Inventory"));
        assert_eq!(manager.list_for_display().len(), 1);
        Ok(())
    }

    #[test]
    fn export_defaults_to_configured_path() -> Result<()> {
        let dir = tempdir()?;
        let (mut manager, config) = manager_in(dir.path());

        let err = execute(&mut manager, &config, Command::Export { to: None }).unwrap_err();
        assert_eq!(report(&err), "Operation refused: inventory is empty, nothing to export");

        manager.add_vehicle(
            Vehicle::new(dealership_core::VehicleKind::Sedan, "C1", "Tesla", "Model 3", 40_000.0, "D1")
                .expect("valid sedan"),
        )?;
        execute(&mut manager, &config, Command::Export { to: None })?;
        assert!(config.export_path.exists());
        Ok(())
    }
}
