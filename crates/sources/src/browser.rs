//! Headless-browser driver for the boards that render listings with
//! JavaScript (infinite scroll, "load more" buttons, signup modals).
//!
//! `headless_chrome` is a blocking API, so every session runs inside
//! `tokio::task::spawn_blocking`. Callers pass a closure over the open
//! tab and get back whatever they extracted, typically one or more DOM
//! snapshots that the pure parse functions consume afterwards.

use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::fetch::DESKTOP_UA;
use crate::SourceError;

/// Pause after a scroll step, giving lazy content time to land.
const SCROLL_PAUSE: Duration = Duration::from_millis(1200);

/// Pause after clicking a "load more" control.
const LOAD_MORE_PAUSE: Duration = Duration::from_millis(2500);

/// Consecutive rounds with no new items before giving up on load-more.
const STABLE_ROUNDS: u32 = 3;

/// Hard cap on load-more rounds, in case the count never stabilizes.
const MAX_LOAD_ROUNDS: u32 = 100;

/// Run `f` against a fresh headless-browser tab on the blocking pool.
///
/// The browser is launched per session and torn down when the closure
/// returns; scrape runs are long and infrequent enough that reuse is not
/// worth keeping a Chromium process alive.
pub async fn with_tab<T, F>(url: String, f: F) -> Result<T, SourceError>
where
    T: Send + 'static,
    F: FnOnce(&Arc<Tab>) -> anyhow::Result<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || -> anyhow::Result<T> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((1366, 900)))
            .build()
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let browser = Browser::new(options)?;
        let tab = browser.new_tab()?;
        tab.set_user_agent(DESKTOP_UA, None, None)?;
        tab.navigate_to(&url)?;
        tab.wait_until_navigated()?;
        f(&tab)
    })
    .await
    .map_err(|e| SourceError::Browser(format!("browser task panicked: {e}")))?;

    result.map_err(|e| SourceError::Browser(e.to_string()))
}

/// Click the first present selector from `selectors`, if any.
///
/// Used to dismiss cookie banners and signup modals; absence of every
/// selector is the normal case and not an error.
pub fn dismiss_popups(tab: &Arc<Tab>, selectors: &[&str]) -> bool {
    for selector in selectors {
        if let Ok(element) = tab.find_element(selector) {
            if element.click().is_ok() {
                std::thread::sleep(Duration::from_millis(800));
                return true;
            }
        }
    }
    false
}

/// Scroll the viewport down `rounds` times, pausing between steps.
pub fn scroll_page(tab: &Arc<Tab>, rounds: u32) -> anyhow::Result<()> {
    for _ in 0..rounds {
        tab.evaluate("window.scrollBy(0, window.innerHeight * 0.7)", false)?;
        std::thread::sleep(SCROLL_PAUSE);
    }
    Ok(())
}

/// Click `selector` if present. Returns whether a click happened.
pub fn click_if_present(tab: &Arc<Tab>, selector: &str) -> bool {
    match tab.find_element(selector) {
        Ok(element) => element.click().is_ok(),
        Err(_) => false,
    }
}

/// Drive a load-more board until its item count stops growing, then
/// return the final DOM snapshot.
///
/// Each round: dismiss popups, scroll, click the load-more control, and
/// count `item_selector` matches. Stops after [`STABLE_ROUNDS`] rounds
/// without growth or [`MAX_LOAD_ROUNDS`] total.
pub fn expand_until_stable(
    tab: &Arc<Tab>,
    item_selector: &str,
    load_more_selector: &str,
    popup_selectors: &[&str],
) -> anyhow::Result<String> {
    let mut prev_count = 0usize;
    let mut stable = 0u32;

    for round in 0..MAX_LOAD_ROUNDS {
        dismiss_popups(tab, popup_selectors);
        scroll_page(tab, 3)?;

        if click_if_present(tab, load_more_selector) {
            std::thread::sleep(LOAD_MORE_PAUSE);
        }

        let count = tab
            .find_elements(item_selector)
            .map(|els| els.len())
            .unwrap_or(0);
        tracing::debug!(round, count, "Load-more round complete");

        if count == prev_count {
            stable += 1;
            if stable >= STABLE_ROUNDS {
                break;
            }
        } else {
            stable = 0;
            prev_count = count;
        }
    }

    tab.get_content().map_err(|e| anyhow::anyhow!("{e}"))
}
