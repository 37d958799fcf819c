//! Download-mode orchestration.
//!
//! Drives one full download: token acquisition, sections listing, per-section
//! page listing, per-page content fetch, and a per-section store write. Each
//! section commits before the next begins, so an interrupted run keeps every
//! section it finished. The end-of-run summary reports partial results
//! instead of letting truncated listings pass silently.

use std::time::Instant;

use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::Error;
use crate::graph::GraphClient;
use crate::store;

pub async fn run_sync(config: &Config, user: &str) -> Result<()> {
    let started = Instant::now();

    let token = match auth::acquire_token(&config.auth).await {
        Ok(token) => token,
        Err(Error::Auth {
            code,
            description,
            correlation_id,
        }) => {
            eprintln!("{}", code);
            eprintln!("{}", description);
            if let Some(id) = correlation_id {
                eprintln!("{}", id);
            }
            anyhow::bail!("no token obtained, aborting download");
        }
        Err(e) => return Err(e).context("token acquisition failed"),
    };

    let client = GraphClient::new(&config.graph.base_url, user, token);

    let sections = client.list_sections().await?;

    let pool = db::connect(config).await?;
    store::init_schema(&pool).await?;

    let mut sections_written = 0u64;
    let mut pages_stored = 0u64;
    let mut truncated_listings = u64::from(sections.truncated);

    for (name, record) in &sections.items {
        println!("Reading section: {}, {}", name, record.id);
        let pages = client.list_pages(&record.id).await?;
        if pages.truncated {
            truncated_listings += 1;
        }

        let mut notes = IndexMap::new();
        for (title, page_id) in &pages.items {
            println!("Reading page: {}", title);
            let html = client
                .page_content(page_id)
                .await
                .with_context(|| format!("failed to fetch content of page '{}'", title))?;
            notes.insert(title.clone(), html);
        }

        store::write_section(&pool, name, &notes).await?;
        sections_written += 1;
        pages_stored += notes.len() as u64;
    }

    pool.close().await;

    println!(
        "Finished in {} ({} sections, {} pages)",
        format_elapsed(started.elapsed().as_secs()),
        sections_written,
        pages_stored
    );
    if truncated_listings > 0 {
        println!(
            "warning: {} listing(s) stopped early after repeated fetch failures; the store may be incomplete",
            truncated_listings
        );
    }

    Ok(())
}

fn format_elapsed(total_secs: u64) -> String {
    format!(
        "{}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formats_like_a_clock() {
        assert_eq!(format_elapsed(0), "0:00:00");
        assert_eq!(format_elapsed(61), "0:01:01");
        assert_eq!(format_elapsed(3723), "1:02:03");
    }
}
