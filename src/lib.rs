pub mod cli;
pub mod color;
pub mod config;
pub mod convert;
pub mod error;
pub mod logging;
pub mod merge;
pub mod state;
pub mod storage;
pub mod store;
pub mod sync;
pub mod tokens;

use chrono::{SecondsFormat, Utc};

use crate::cli::{Cli, Command};
use crate::color::{luminance_values, pick_accessible_text_color};
use crate::storage::Slot;
use crate::sync::{load_token_tree, SyncWorkflow};

pub use error::{AppError, AppResult};

/// Entrypoint used by the CLI binary.
pub fn run(cli: Cli) -> AppResult<()> {
    logging::init(cli.verbose);

    let mut config = config::load_sync_config(cli.config.as_deref());
    if let Some(tokens) = cli.tokens {
        config.tokens = tokens;
    }
    if let Some(live) = cli.live {
        config.live = live;
    }
    tracing::debug!(?config, "resolved sync config");

    let store = config.file_store();
    let mut workflow = SyncWorkflow::new(store)
        .with_block(config.block.clone())
        .with_timestamp(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    match cli.command {
        Command::Preview => {
            let tree = load_token_tree(&config.tokens)?;
            let report = workflow.preview(&tree)?;
            println!("{report}");
            println!("Preview saved to: {}", config.preview_path().display());
        }
        Command::Apply => {
            workflow.apply()?;
            println!("Applied preview to {}", config.live.display());
        }
        Command::Restore => {
            workflow.restore()?;
            println!("Restored {} from backup", config.live.display());
        }
        Command::Status => {
            let status = workflow.status();
            println!("{status}");
            println!("pending: {:?}", status.pending_state());
            for slot in Slot::ALL {
                tracing::debug!(%slot, path = %workflow.store().path(slot).display(), "slot path");
            }
        }
        Command::SetPrimary { color } => {
            let variations = workflow.set_primary(&color)?;
            let luminance = luminance_values(&variations);
            println!("primary: {} (luminance {:.3})", variations.primary, luminance.primary);
            println!("light:   {} (luminance {:.3})", variations.light, luminance.light);
            println!("dark:    {} (luminance {:.3})", variations.dark, luminance.dark);
            println!("text:    {}", pick_accessible_text_color(&variations.primary));
        }
    }

    tracing::debug!(state = ?workflow.state(), "done");
    Ok(())
}
