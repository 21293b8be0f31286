use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[allow(clippy::upper_case_acronyms)]
#[derive(Parser, Debug)]
#[clap(name = "waybill", about, version)]
pub struct CLI {
    #[clap(subcommand)]
    pub command: Commands,

    /// optional - Path to the waybill.yaml file, default is ./waybill.yaml.
    #[clap(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// optional - off, error, warn, info, debug or trace. `RUST_LOG` directives still apply.
    #[clap(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply guide (waybill) updates to invoices in a single transaction.
    ///
    /// The file holds a JSON array of requests. Only the fields present are written.
    ///
    /// Example:
    /// `waybill apply --file guides.json`
    #[clap(name = "apply")]
    Apply {
        /// JSON file with the update requests, `-` reads standard input.
        #[clap(long, short)]
        file: PathBuf,

        /// optional - Give up and roll back after this many seconds.
        #[clap(long)]
        timeout_secs: Option<u64>,
    },

    /// Search documents with a filter map.
    ///
    /// Keys may end in __in, __like, __gt, __lt, __gte or __lte; a bare key compares for equality.
    ///
    /// Example:
    /// `waybill query --filters '{"d.reason__in": ["VENTA"], "v.plate__like": "%ABC%"}'`
    #[clap(name = "query")]
    Query {
        /// JSON object of filters.
        #[clap(long, short, default_value = "{}")]
        filters: String,

        /// optional - Trusted SQL condition added before the filters, can be repeated.
        #[clap(long)]
        base: Vec<String>,
    },

    /// List delivery documents created within a date range (inclusive).
    ///
    /// Example:
    /// `waybill documents --from 2025-01-01 --to 2025-01-31`
    #[clap(name = "documents")]
    Documents {
        #[clap(long)]
        from: NaiveDate,

        #[clap(long)]
        to: NaiveDate,
    },

    /// Average dispatch time per payment term for delivery documents created within a date
    /// range (inclusive). Deadlines come from `documents.payment_terms` in the manifest.
    ///
    /// Example:
    /// `waybill dispatch-summary --from 2025-01-01 --to 2025-01-31`
    #[clap(name = "dispatch-summary")]
    DispatchSummary {
        #[clap(long)]
        from: NaiveDate,

        #[clap(long)]
        to: NaiveDate,
    },

    /// List documents on routes scheduled for a day.
    ///
    /// Example:
    /// `waybill scheduled --date 2025-10-20`
    #[clap(name = "scheduled")]
    Scheduled {
        #[clap(long)]
        date: NaiveDate,

        /// optional - Extra JSON object of filters.
        #[clap(long, short)]
        filters: Option<String>,
    },
}
