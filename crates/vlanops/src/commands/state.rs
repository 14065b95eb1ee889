//! `vlanops state`: view and edit the ownership ledger.

use std::collections::BTreeSet;

use serde::Serialize;
use tabled::Tabled;
use vlanops_core::{DeviceStateReader, EntityKey, EntityKind, Ownership};

use crate::cli::{GlobalOpts, StateArgs, StateCommand};
use crate::error::CliError;
use crate::{config, output};

#[derive(Serialize)]
struct StateEntry {
    entity: EntityKey,
    kind: EntityKind,
    ownership: Ownership,
    /// False for ledger entries whose entity is gone from the device.
    present: bool,
}

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Ownership")]
    ownership: String,
}

impl StateEntry {
    fn ownership_label(&self) -> &'static str {
        match (self.ownership, self.present) {
            (Ownership::Managed, true) => "managed",
            (Ownership::Managed, false) => "managed (absent)",
            (Ownership::Unmanaged, _) => "unmanaged",
        }
    }

    fn row(&self) -> StateRow {
        StateRow {
            entity: self.entity.identity(),
            kind: self.kind.to_string(),
            ownership: self.ownership_label().to_owned(),
        }
    }
}

fn parse_keys(raw: &[String]) -> Result<Vec<EntityKey>, CliError> {
    raw.iter()
        .map(|k| {
            k.parse::<EntityKey>().map_err(|e| CliError::Validation {
                field: "key".into(),
                reason: format!("{k}: {e}"),
            })
        })
        .collect()
}

pub async fn handle(args: &StateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        // ── Show ────────────────────────────────────────────────────
        StateCommand::Show => {
            let mut device = config::open_device(global)?;
            let snapshot = device.read_snapshot().await?;
            let ledger = device.ledger();

            let mut entries: Vec<StateEntry> = snapshot
                .entries()
                .into_iter()
                .map(|(entity, ownership)| StateEntry {
                    kind: entity.kind(),
                    entity,
                    ownership,
                    present: true,
                })
                .collect();
            let live: BTreeSet<EntityKey> = entries.iter().map(|e| e.entity.clone()).collect();
            entries.extend(
                ledger
                    .managed()
                    .iter()
                    .filter(|key| !live.contains(*key))
                    .map(|key| StateEntry {
                        entity: key.clone(),
                        kind: key.kind(),
                        ownership: Ownership::Managed,
                        present: false,
                    }),
            );

            if !global.quiet {
                let updated = ledger
                    .updated_at()
                    .map_or_else(|| "never".to_owned(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());
                eprintln!(
                    "Device '{}', ledger {} (updated {updated})",
                    ledger.device(),
                    device.ledger_path().display()
                );
            }
            let out = output::render_list(
                &global.output,
                &entries,
                StateEntry::row,
                |e| format!("{}\t{}", e.entity, e.ownership_label()),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Adopt ───────────────────────────────────────────────────
        StateCommand::Adopt { keys, all } => {
            let mut device = config::open_device(global)?;
            let snapshot = device.read_snapshot().await?;
            let on_device: BTreeSet<EntityKey> =
                snapshot.entries().into_iter().map(|(key, _)| key).collect();

            let wanted = if *all {
                on_device.iter().cloned().collect()
            } else {
                let wanted = parse_keys(keys)?;
                if let Some(missing) = wanted.iter().find(|k| !on_device.contains(*k)) {
                    return Err(CliError::Validation {
                        field: "key".into(),
                        reason: format!("{missing} is not present on the device"),
                    });
                }
                wanted
            };

            let path = device.ledger_path().to_path_buf();
            let mut ledger = device.into_ledger();
            let added = ledger.adopt(wanted);
            ledger.save(&path)?;
            tracing::info!(adopted = added.len(), "ledger updated");

            if !global.quiet {
                for key in &added {
                    eprintln!("✓ Adopted {key}");
                }
                eprintln!("{} entit(ies) newly managed", added.len());
            }
            Ok(())
        }

        // ── Release ─────────────────────────────────────────────────
        StateCommand::Release { keys } => {
            let keys = parse_keys(keys)?;
            let (mut ledger, path) = config::open_ledger(global)?;
            let removed = ledger.release(&keys);
            for key in keys.iter().filter(|k| !removed.contains(*k)) {
                tracing::warn!(%key, "not managed, nothing to release");
            }
            ledger.save(&path)?;

            if !global.quiet {
                for key in &removed {
                    eprintln!("✓ Released {key}");
                }
            }
            Ok(())
        }
    }
}
