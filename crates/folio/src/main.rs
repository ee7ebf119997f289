// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folio - edition ledger for limited-edition art sales.
//!
//! This is the operator command line: every subcommand opens the ledger,
//! runs one operation and prints its outcome as JSON on stdout.

mod commands;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use folio_ledger::InvalidationReason;

/// Folio - edition ledger for limited-edition art sales.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Name recorded as `created_by` on audit rows.
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Recompute dense edition numbering for a product.
    Resequence {
        /// Product to resequence.
        #[arg(required_unless_present = "all")]
        product_id: Option<String>,
        /// Resequence every product with line items.
        #[arg(long, conflicts_with = "product_id")]
        all: bool,
    },
    /// Take a line item out of the edition and close the gap.
    MarkInvalid {
        line_item_id: String,
        /// removed, restocked or refunded.
        #[arg(long, value_parser = parse_reason)]
        reason: InvalidationReason,
    },
    /// Detect duplicate or gapped numbering and heal it.
    Verify {
        /// Product to verify; all products when omitted.
        product_id: Option<String>,
    },
    /// Compare local orders with the commerce platform. Never writes.
    Compare {
        /// Order id or order number; the most recent orders when omitted.
        order: Option<String>,
        /// Maximum orders compared.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Overwrite status fields on an order after review.
    Apply {
        order_id: String,
        #[arg(long)]
        financial_status: Option<String>,
        #[arg(long)]
        fulfillment_status: Option<String>,
        /// RFC 3339 timestamp, or `none` to clear.
        #[arg(long, value_parser = parse_cancelled_at)]
        cancelled_at: Option<CancelledAt>,
        #[arg(long)]
        archived: Option<bool>,
    },
    /// Copy the platform's status fields onto one order.
    Sync { order_id: String },
    /// List the valid editions an owner holds.
    Editions {
        /// Owner id or email.
        owner: String,
    },
    /// Show audit history for a product or a line item.
    History {
        #[arg(long, required_unless_present = "line_item", conflicts_with = "line_item")]
        product: Option<String>,
        #[arg(long)]
        line_item: Option<String>,
    },
}

/// `--cancelled-at` value: a timestamp, or an explicit clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelledAt(pub Option<DateTime<Utc>>);

fn parse_reason(value: &str) -> Result<InvalidationReason, String> {
    InvalidationReason::parse(&value.to_ascii_lowercase()).ok_or_else(|| {
        format!("unknown reason `{value}` (expected removed, restocked or refunded)")
    })
}

fn parse_cancelled_at(value: &str) -> Result<CancelledAt, String> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(CancelledAt(None));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| CancelledAt(Some(t.with_timezone(&Utc))))
        .map_err(|e| format!("invalid timestamp `{value}`: {e}"))
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("folio={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => folio_config::load_and_validate_path(path),
        None => folio_config::load_and_validate(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            folio_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    if let Some(actor) = cli.actor {
        config.ledger.actor = actor;
    }

    init_tracing(&config.ledger.log_level);

    let cancel = shutdown::install_signal_handler();
    match commands::run(&config, cli.command, &cancel).await {
        Ok(output) => {
            match serde_json::to_string_pretty(&output.value) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    eprintln!("error: failed to render output: {e}");
                    return ExitCode::FAILURE;
                }
            }
            if output.failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_mark_invalid() {
        let cli = Cli::try_parse_from([
            "folio",
            "--actor",
            "ops",
            "mark-invalid",
            "li-1",
            "--reason",
            "Restocked",
        ])
        .unwrap();
        assert_eq!(cli.actor.as_deref(), Some("ops"));
        match cli.command {
            Commands::MarkInvalid {
                line_item_id,
                reason,
            } => {
                assert_eq!(line_item_id, "li-1");
                assert_eq!(reason, InvalidationReason::Restocked);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_reason() {
        let parsed = Cli::try_parse_from(["folio", "mark-invalid", "li-1", "--reason", "lost"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn resequence_needs_product_or_all() {
        assert!(Cli::try_parse_from(["folio", "resequence"]).is_err());
        assert!(Cli::try_parse_from(["folio", "resequence", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["folio", "resequence", "P", "--all"]).is_err());
    }

    #[test]
    fn cancelled_at_accepts_none_and_rfc3339() {
        assert_eq!(parse_cancelled_at("none").unwrap(), CancelledAt(None));
        let parsed = parse_cancelled_at("2026-03-01T12:00:00+01:00").unwrap();
        assert_eq!(
            parsed.0.map(|t| t.to_rfc3339()),
            Some("2026-03-01T11:00:00+00:00".to_string())
        );
        assert!(parse_cancelled_at("yesterday").is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = folio_config::load_and_validate_str("").expect("empty config should be valid");
        assert_eq!(config.ledger.actor, "folio");
    }
}
