/// Live browser and network tests
/// These tests require Chrome/Chromium and internet access
/// Run with: cargo test --test live_tests -- --ignored
use manga_scraper_core::browser::{
    run_in_browser, ChromeLauncher, InterceptionPolicy, InterceptionRule, SessionOptions, WaitFor,
};
use manga_scraper_core::sources::mangahasu::MangaHasu;
use manga_scraper_core::sources::mangapark::MangaPark;
use manga_scraper_core::sources::Catalog;
use std::sync::Arc;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quick_options() -> SessionOptions {
    SessionOptions {
        timeout: Duration::from_secs(45),
        wait_timeout: Duration::from_secs(20),
        ..SessionOptions::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium and internet
async fn test_chrome_reads_rendered_dom() {
    init_logging();

    let heading = run_in_browser(
        Arc::new(ChromeLauncher::new()),
        &quick_options(),
        Arc::new(InterceptionPolicy::allow_all()),
        |page| {
            page.navigate("https://example.com")?;
            page.wait_for(&WaitFor::selector("h1"))?;
            Ok(page.document()?.first_text("h1"))
        },
    )
    .await
    .expect("Chrome/Chromium not installed");

    assert_eq!(heading.as_deref(), Some("Example Domain"));
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium and internet
async fn test_stealth_script_hides_webdriver() {
    init_logging();

    let webdriver = run_in_browser(
        Arc::new(ChromeLauncher::new()),
        &quick_options(),
        Arc::new(InterceptionPolicy::allow_all()),
        |page| {
            page.navigate("https://example.com")?;
            page.evaluate("navigator.webdriver === true")
        },
    )
    .await
    .expect("Chrome/Chromium not installed");

    assert_eq!(webdriver, serde_json::Value::Bool(false));
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium and internet
async fn test_blocked_document_fails_navigation() {
    init_logging();

    let policy = InterceptionPolicy::new(vec![InterceptionRule::block_domains(["example.com"])]);
    let result = run_in_browser(
        Arc::new(ChromeLauncher::new()),
        &quick_options(),
        Arc::new(policy),
        |page| {
            page.navigate("https://example.com")?;
            page.wait_for_selector("h1")
        },
    )
    .await;

    let err = result.expect_err("navigation to a blocked domain should fail");
    assert!(err.is_automation(), "unexpected error: {}", err);
}

#[tokio::test]
#[ignore] // Requires internet
async fn test_mangapark_search() {
    init_logging();

    let catalog = Catalog::new(MangaPark::new()).expect("client");
    match catalog.search("one piece", 1).await {
        Ok(results) => {
            println!("✓ {} results", results.len());
            for manga in results.iter().take(3) {
                println!("  - {} ({} authors)", manga.title, manga.authors.len());
            }
        }
        Err(e) => eprintln!("⚠ Search failed (may be network issue): {}", e),
    }
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium and internet
async fn test_mangahasu_latest() {
    init_logging();

    let catalog = Catalog::new(MangaHasu::new()).expect("client");
    match catalog.latest(1).await {
        Ok(results) => {
            println!("✓ {} latest releases", results.len());
            assert!(results.iter().all(|m| m.url.starts_with("https://")));
        }
        Err(e) => eprintln!("⚠ Latest failed (site may be blocking): {}", e),
    }
}
