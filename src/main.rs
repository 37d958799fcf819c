//! # graph-notes CLI (`gnotes`)
//!
//! One binary, two modes:
//!
//! - **Download**: `gnotes --user you@outlook.com` authenticates and pulls
//!   every section's pages into the local store.
//! - **Offline**: without `--user`, the remaining flags query the store.
//!
//! ```bash
//! gnotes -u you@outlook.com          # download the notebook
//! gnotes --allsections               # list every cached section
//! gnotes -s Work --alltitles         # list titles in one section
//! gnotes -f kubernetes               # find keyword in page content
//! gnotes -t plan                     # find keyword in titles
//! gnotes -s work -t "plan a"         # print one specific note
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use graph_notes::{config, db, logging, query, store, sync};

/// Download a OneNote notebook for a specific account and read its contents
/// offline afterwards.
#[derive(Parser)]
#[command(name = "gnotes", version)]
struct Cli {
    /// Login like xxxx@outlook.com — downloads that account's notebook.
    /// Without it, the other flags query the local store offline.
    #[arg(long, short)]
    user: Option<String>,

    /// Find keyword in titles and display the page (if exactly one matches).
    /// Combine with -s to print a page from a specific section.
    #[arg(long, short)]
    title: Option<String>,

    /// Section keyword. Combine with -t to print a specific page, or with
    /// --alltitles to list all titles in that section.
    #[arg(long, short)]
    section: Option<String>,

    /// Find all titles from all sections by keyword in page content.
    #[arg(long, short)]
    find: Option<String>,

    /// Show all titles in a specific section (use with -s).
    #[arg(long)]
    alltitles: bool,

    /// Show all sections.
    #[arg(long)]
    allsections: bool,

    /// Path to configuration file (TOML). Missing file means built-in
    /// defaults.
    #[arg(long, default_value = "gnotes.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.log)?;

    match cli.user {
        Some(user) => sync::run_sync(&cfg, &user).await?,
        None => {
            let pool = db::connect(&cfg).await?;
            store::init_schema(&pool).await?;
            let notebook = store::load_all(&pool).await?;
            pool.close().await;

            let opts = query::QueryOpts {
                title: cli.title,
                section: cli.section,
                find: cli.find,
                all_titles: cli.alltitles,
                all_sections: cli.allsections,
            };
            query::run(&mut std::io::stdout(), &notebook, &opts)?;
        }
    }

    Ok(())
}
