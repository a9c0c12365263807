/// Browser session lifecycle tests
/// A fake launcher stands in for Chrome and counts process teardowns
use manga_scraper_core::browser::{
    run_in_browser, InterceptionPolicy, Launcher, PageLoader, SessionOptions, WaitFor,
};
use manga_scraper_core::extract::Document;
use manga_scraper_core::http_client::HttpFetcher;
use manga_scraper_core::pipeline::{FetchStage, FetchTracker};
use manga_scraper_core::sources::mangahasu::MangaHasu;
use manga_scraper_core::sources::Catalog;
use manga_scraper_core::{Result, ScrapeError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SEARCH_PAGE: &str = r#"
<ul class="list_manga">
  <li>
    <div class="wrapper_imgage"><img data-src="/covers/solo.jpg"></div>
    <a class="name-manga" href="/solo-leveling-p1.html"><h3>Solo Leveling</h3></a>
    <a class="name-author">Chugong</a>
  </li>
  <li>
    <a class="name-manga" href="https://mangahasu.se/omniscient-reader-p2.html"><h3>Omniscient Reader</h3></a>
  </li>
</ul>
"#;

struct FakePage {
    html: &'static str,
    delay: Duration,
}

impl PageLoader for FakePage {
    fn load(&self, _url: &str, condition: &WaitFor, tracker: &mut FetchTracker) -> Result<Document> {
        tracker.advance(FetchStage::Navigating);
        std::thread::sleep(self.delay);

        tracker.advance(FetchStage::WaitingForSelector);
        let doc = Document::parse(self.html);
        if let WaitFor::Selector(selector) = condition {
            if doc.select(selector).is_empty() {
                return Err(tracker.fail(ScrapeError::automation_msg(format!(
                    "Timed out waiting for selector {}",
                    selector
                ))));
            }
        }

        tracker.advance(FetchStage::Extracting);
        Ok(doc)
    }
}

struct FakeLauncher {
    html: &'static str,
    delay: Duration,
    fail_launch: bool,
    launched: AtomicUsize,
    terminated: AtomicUsize,
    policies: Mutex<Vec<Arc<InterceptionPolicy>>>,
}

impl FakeLauncher {
    fn serving(html: &'static str) -> Self {
        Self {
            html,
            delay: Duration::ZERO,
            fail_launch: false,
            launched: AtomicUsize::new(0),
            terminated: AtomicUsize::new(0),
            policies: Mutex::new(Vec::new()),
        }
    }

    fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl Launcher for FakeLauncher {
    type Process = usize;
    type Page = FakePage;

    fn launch(&self, _options: &SessionOptions, policy: Arc<InterceptionPolicy>) -> Result<(usize, FakePage)> {
        if self.fail_launch {
            return Err(ScrapeError::automation_msg("Failed to launch browser"));
        }
        self.policies.lock().unwrap().push(policy);
        let id = self.launched.fetch_add(1, Ordering::SeqCst);
        Ok((
            id,
            FakePage {
                html: self.html,
                delay: self.delay,
            },
        ))
    }

    fn terminate(&self, _process: usize) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

fn options(timeout: Duration) -> SessionOptions {
    SessionOptions {
        timeout,
        ..SessionOptions::default()
    }
}

fn allow_all() -> Arc<InterceptionPolicy> {
    Arc::new(InterceptionPolicy::allow_all())
}

#[tokio::test]
async fn test_teardown_after_success() {
    let launcher = Arc::new(FakeLauncher::serving(SEARCH_PAGE));

    let titles = run_in_browser(
        Arc::clone(&launcher),
        &options(Duration::from_secs(5)),
        allow_all(),
        |page| {
            let mut tracker = FetchTracker::new("https://mangahasu.se/");
            let doc = page.load("https://mangahasu.se/", &WaitFor::selector("ul.list_manga"), &mut tracker)?;
            Ok(doc.select_text("a.name-manga h3"))
        },
    )
    .await
    .unwrap();

    assert_eq!(titles, vec!["Solo Leveling", "Omniscient Reader"]);
    assert_eq!(launcher.launched(), 1);
    assert_eq!(launcher.terminated(), 1);
}

#[tokio::test]
async fn test_teardown_after_script_error() {
    let launcher = Arc::new(FakeLauncher::serving(SEARCH_PAGE));

    let result: Result<usize> = run_in_browser(
        Arc::clone(&launcher),
        &options(Duration::from_secs(5)),
        allow_all(),
        |page| {
            let mut tracker = FetchTracker::new("u");
            let doc = page.load("u", &WaitFor::selector("div.never-rendered"), &mut tracker);
            assert_eq!(tracker.stage(), FetchStage::Failed);
            doc.map(|d| d.select("li").len())
        },
    )
    .await;

    assert!(result.unwrap_err().is_automation());
    assert_eq!(launcher.terminated(), 1);
}

#[tokio::test]
async fn test_teardown_after_panic() {
    let launcher = Arc::new(FakeLauncher::serving(SEARCH_PAGE));

    let result: Result<()> = run_in_browser(
        Arc::clone(&launcher),
        &options(Duration::from_secs(5)),
        allow_all(),
        |_page| panic!("page script blew up"),
    )
    .await;

    assert!(result.unwrap_err().is_automation());
    assert_eq!(launcher.terminated(), 1);
}

#[tokio::test]
async fn test_launch_failure_is_automation_error() {
    let launcher = Arc::new(FakeLauncher {
        fail_launch: true,
        ..FakeLauncher::serving(SEARCH_PAGE)
    });

    let result: Result<()> = run_in_browser(
        Arc::clone(&launcher),
        &options(Duration::from_secs(5)),
        allow_all(),
        |_page| Ok(()),
    )
    .await;

    assert!(result.unwrap_err().is_automation());
    assert_eq!(launcher.terminated(), 0);
}

#[tokio::test]
async fn test_timeout_tears_down_once() {
    let launcher = Arc::new(FakeLauncher {
        delay: Duration::from_millis(800),
        ..FakeLauncher::serving(SEARCH_PAGE)
    });

    let result = run_in_browser(
        Arc::clone(&launcher),
        &options(Duration::from_millis(200)),
        allow_all(),
        |page| {
            let mut tracker = FetchTracker::new("u");
            page.load("u", &WaitFor::ContentLoaded, &mut tracker).map(|_| ())
        },
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("timed out"));
    assert_eq!(launcher.terminated(), 1);

    // The abandoned script finishing later must not tear down again
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(launcher.terminated(), 1);
}

#[tokio::test]
async fn test_cancellation_tears_down() {
    let launcher = Arc::new(FakeLauncher {
        delay: Duration::from_millis(800),
        ..FakeLauncher::serving(SEARCH_PAGE)
    });

    let task_launcher = Arc::clone(&launcher);
    let handle = tokio::spawn(async move {
        run_in_browser(task_launcher, &options(Duration::from_secs(5)), allow_all(), |page| {
            let mut tracker = FetchTracker::new("u");
            page.load("u", &WaitFor::ContentLoaded, &mut tracker).map(|_| ())
        })
        .await
    });

    for _ in 0..100 {
        if launcher.launched() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(launcher.launched(), 1);

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    assert_eq!(launcher.terminated(), 1);

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(launcher.terminated(), 1);
}

#[tokio::test]
async fn test_sessions_do_not_share_processes() {
    let launcher = Arc::new(FakeLauncher::serving(SEARCH_PAGE));
    let opts = options(Duration::from_secs(5));

    let (a, b) = tokio::join!(
        run_in_browser(Arc::clone(&launcher), &opts, allow_all(), |_page| Ok(1)),
        run_in_browser(Arc::clone(&launcher), &opts, allow_all(), |_page| Ok(2)),
    );

    assert_eq!(a.unwrap() + b.unwrap(), 3);
    assert_eq!(launcher.launched(), 2);
    assert_eq!(launcher.terminated(), 2);
}

#[tokio::test]
async fn test_catalog_browser_search() {
    let launcher = Arc::new(FakeLauncher::serving(SEARCH_PAGE));
    let catalog = Catalog::with_parts(
        MangaHasu::new(),
        HttpFetcher::new().unwrap(),
        Arc::clone(&launcher),
        options(Duration::from_secs(5)),
    );

    let results = catalog.search("solo", 1).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Solo Leveling");
    assert_eq!(results[0].url, "https://mangahasu.se/solo-leveling-p1.html");
    assert_eq!(results[0].cover_url.as_deref(), Some("https://mangahasu.se/covers/solo.jpg"));
    assert_eq!(results[0].authors, vec!["Chugong"]);
    assert!(results[1].authors.is_empty());
    assert_eq!(launcher.terminated(), 1);

    let policies = launcher.policies.lock().unwrap();
    assert!(!policies[0].allows("https://mangahasu.se/cover.jpg", "image"));
    assert!(policies[0].allows("https://mangahasu.se/", "document"));
}

#[tokio::test]
async fn test_catalog_validation_never_launches() {
    let launcher = Arc::new(FakeLauncher::serving(SEARCH_PAGE));
    let catalog = Catalog::with_parts(
        MangaHasu::new(),
        HttpFetcher::new().unwrap(),
        Arc::clone(&launcher),
        options(Duration::from_secs(5)),
    );

    assert!(matches!(catalog.search("  ", 1).await, Err(ScrapeError::Validation(_))));
    assert!(matches!(catalog.latest(0).await, Err(ScrapeError::Validation(_))));
    assert!(matches!(
        catalog.manga_meta("https://example.com/x").await,
        Err(ScrapeError::Validation(_))
    ));
    assert_eq!(launcher.launched(), 0);
}

#[tokio::test]
async fn test_catalog_missing_wait_selector_fails() {
    let launcher = Arc::new(FakeLauncher::serving(SEARCH_PAGE));
    let catalog = Catalog::with_parts(
        MangaHasu::new(),
        HttpFetcher::new().unwrap(),
        Arc::clone(&launcher),
        options(Duration::from_secs(5)),
    );

    let err = catalog
        .manga_meta("https://mangahasu.se/solo-leveling-p1.html")
        .await
        .unwrap_err();

    assert!(err.is_automation());
    assert_eq!(launcher.terminated(), 1);
}

#[tokio::test]
async fn test_listener_observes_same_outcome() {
    use manga_scraper_core::channel::listener;
    use manga_scraper_core::models::Manga;

    let launcher = Arc::new(FakeLauncher::serving(SEARCH_PAGE));
    let catalog = Catalog::with_parts(
        MangaHasu::new(),
        HttpFetcher::new().unwrap(),
        Arc::clone(&launcher),
        options(Duration::from_secs(5)),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let results = catalog
        .search_with(
            "solo",
            1,
            Some(listener(move |outcome: std::result::Result<&Vec<Manga>, &ScrapeError>| {
                if let Ok(found) = outcome {
                    sink.lock().unwrap().extend(found.iter().map(|m| m.title.clone()));
                }
            })),
        )
        .await
        .unwrap();

    let titles: Vec<String> = results.into_iter().map(|m| m.title).collect();
    assert_eq!(*seen.lock().unwrap(), titles);

    let failed = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&failed);
    let err = catalog
        .latest_with(
            0,
            Some(listener(move |outcome: std::result::Result<&Vec<_>, &ScrapeError>| {
                *sink.lock().unwrap() = outcome.err().map(|e| e.to_string());
            })),
        )
        .await
        .unwrap_err();
    assert_eq!(failed.lock().unwrap().as_deref(), Some(err.to_string().as_str()));
}

#[test]
fn test_config_interception_table_overrides_adapter_policy() {
    use manga_scraper_core::config::Config;
    use manga_scraper_core::sources::mangapark::MangaPark;
    use manga_scraper_core::sources::FetchMode;

    let config = Config::from_toml(
        r#"
        [interception.resource]
        method = "unblock"
        type = ["document"]
        "#,
    )
    .unwrap();

    let catalog = Catalog::from_config(MangaHasu::new(), &config).unwrap();
    match catalog.fetch_mode() {
        FetchMode::Browser(policy) => {
            assert!(policy.allows("https://mangahasu.se/", "document"));
            assert!(!policy.allows("https://mangahasu.se/app.js", "script"));
        }
        FetchMode::Plain => panic!("mangahasu must use the browser path"),
    }

    let plain = Catalog::from_config(MangaPark::new(), &config).unwrap();
    assert!(matches!(plain.fetch_mode(), FetchMode::Plain));

    let defaults = Catalog::from_config(MangaHasu::new(), &Config::default()).unwrap();
    match defaults.fetch_mode() {
        FetchMode::Browser(policy) => assert!(policy.allows("https://mangahasu.se/app.js", "script")),
        FetchMode::Plain => panic!("mangahasu must use the browser path"),
    }
}

#[tokio::test]
async fn test_session_receives_configured_policy() {
    use manga_scraper_core::browser::InterceptionRule;

    let launcher = Arc::new(FakeLauncher::serving(SEARCH_PAGE));
    let catalog = Catalog::with_parts(
        MangaHasu::new(),
        HttpFetcher::new().unwrap(),
        Arc::clone(&launcher),
        options(Duration::from_secs(5)),
    )
    .with_policy(InterceptionPolicy::new(vec![InterceptionRule::allow_resources(["document"])]));

    catalog.search("solo", 1).await.unwrap();

    let policies = launcher.policies.lock().unwrap();
    assert_eq!(policies.len(), 1);
    assert!(!policies[0].allows("https://mangahasu.se/app.js", "script"));
}
