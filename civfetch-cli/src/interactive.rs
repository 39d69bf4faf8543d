//! Prompts for the selection and manual-download flows.

use dialoguer::{Confirm, MultiSelect};
use std::io::IsTerminal;
use tracing::warn;

/// Ask the user which catalog entries to download.
///
/// Returns the chosen indices into `labels`; an empty list means nothing was
/// picked.
pub fn choose_models(labels: &[String]) -> anyhow::Result<Vec<usize>> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("Selecting models needs an interactive terminal; pass --all to download every entry");
    }
    let chosen = MultiSelect::new()
        .with_prompt("Select models to download (space to toggle, enter to confirm)")
        .items(labels)
        .interact()?;
    Ok(chosen)
}

/// Print the catalog page link and offer to open it in a browser.
pub fn offer_page(page_url: &str) -> anyhow::Result<()> {
    println!("Download it manually from: {}", page_url);
    if !std::io::stdin().is_terminal() {
        return Ok(());
    }
    let open_now = Confirm::new()
        .with_prompt("Open this page in your browser?")
        .default(false)
        .interact()?;
    if open_now {
        if let Err(e) = open::that(page_url) {
            warn!(error = %e, "Failed to open browser");
            println!("Could not open a browser; copy the link above instead.");
        }
    }
    Ok(())
}
