//! Browser session manager.
//!
//! [`run_in_browser`] launches one browser process, hands its page to a
//! caller-supplied script and terminates the process on every exit path:
//! script success, script error, panic, timeout, or the caller dropping
//! the returned future. Termination happens exactly once.

use super::config::{random_user_agent, SessionOptions};
use super::intercept::{self, InterceptionPolicy};
use super::page::BrowserPage;
use super::stealth::STEALTH_SCRIPT;
use crate::error::{Result, ScrapeError};
use headless_chrome::protocol::cdp::Page::AddScriptToEvaluateOnNewDocument;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Starts and stops browser processes.
pub trait Launcher: Send + Sync + 'static {
    /// Owning handle of the OS process
    type Process: Send + 'static;
    /// Page handed to page scripts
    type Page;

    /// Start a process with `policy` installed and the stealth script
    /// registered, before any navigation.
    fn launch(
        &self,
        options: &SessionOptions,
        policy: Arc<InterceptionPolicy>,
    ) -> Result<(Self::Process, Self::Page)>;

    fn terminate(&self, process: Self::Process);
}

/// Headless Chrome via the DevTools protocol
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    /// Chrome binary; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
}

impl ChromeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            chrome_path: Some(path.into()),
        }
    }
}

impl Launcher for ChromeLauncher {
    type Process = Browser;
    type Page = BrowserPage;

    fn launch(
        &self,
        options: &SessionOptions,
        policy: Arc<InterceptionPolicy>,
    ) -> Result<(Browser, BrowserPage)> {
        let user_agent = random_user_agent();
        let args = options.chrome_args(user_agent);
        let arg_refs: Vec<&OsStr> = args.iter().map(|a| a.as_os_str()).collect();

        let launch_options = LaunchOptions::default_builder()
            .headless(options.headless())
            .sandbox(false)
            .window_size(Some(options.window_size))
            .path(self.chrome_path.clone())
            .idle_browser_timeout(options.timeout)
            .args(arg_refs)
            .build()
            .map_err(|e| ScrapeError::automation("Invalid browser launch options", e))?;

        log::info!(
            "Launching browser (headless={}, proxy={:?})",
            options.headless(),
            options.proxy
        );
        let browser = Browser::new(launch_options)
            .map_err(|e| ScrapeError::automation("Failed to launch browser", e))?;

        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::automation("Failed to open a tab", e))?;
        tab.set_default_timeout(options.wait_timeout);

        tab.set_user_agent(user_agent, Some("en-US,en;q=0.9"), None)
            .map_err(|e| ScrapeError::automation("Failed to set user agent", e))?;

        tab.call_method(AddScriptToEvaluateOnNewDocument {
            source: STEALTH_SCRIPT.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(|e| ScrapeError::automation("Failed to register stealth script", e))?;

        intercept::install(&tab, policy, options.debug)?;

        Ok((browser, BrowserPage::new(tab, options.wait_timeout)))
    }

    fn terminate(&self, browser: Browser) {
        log::debug!("Closing browser process {:?}", browser.get_process_id());
        drop(browser);
    }
}

enum SlotState<P> {
    Pending,
    Live(P),
    Closed,
}

/// The process of one session, shared by the worker running the page
/// script and the future awaiting it. Whoever closes it first terminates
/// the process.
struct ProcessSlot<L: Launcher> {
    launcher: Arc<L>,
    state: Mutex<SlotState<L::Process>>,
}

impl<L: Launcher> ProcessSlot<L> {
    fn new(launcher: Arc<L>) -> Self {
        Self {
            launcher,
            state: Mutex::new(SlotState::Pending),
        }
    }

    /// Hand a freshly launched process to the slot. If the session was
    /// already closed the process is terminated on the spot.
    fn install(&self, process: L::Process) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            SlotState::Pending => {
                *state = SlotState::Live(process);
                Ok(())
            }
            _ => {
                drop(state);
                log::debug!("Session closed during launch, terminating browser");
                self.launcher.terminate(process);
                Err(ScrapeError::Cancelled)
            }
        }
    }

    fn close(&self) {
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *state, SlotState::Closed)
        };
        if let SlotState::Live(process) = previous {
            self.launcher.terminate(process);
            log::debug!("Browser session torn down");
        }
    }
}

struct TeardownGuard<L: Launcher>(Arc<ProcessSlot<L>>);

impl<L: Launcher> Drop for TeardownGuard<L> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Run `page_script` against a fresh browser session.
///
/// Launch, navigation and wait failures surface as
/// [`ScrapeError::Automation`]; so does exceeding `options.timeout`. Either
/// the script's full result or an error is returned, never both.
pub async fn run_in_browser<L, T, F>(
    launcher: Arc<L>,
    options: &SessionOptions,
    policy: Arc<InterceptionPolicy>,
    page_script: F,
) -> Result<T>
where
    L: Launcher,
    T: Send + 'static,
    F: FnOnce(&L::Page) -> Result<T> + Send + 'static,
{
    let slot = Arc::new(ProcessSlot::new(Arc::clone(&launcher)));
    let _teardown = TeardownGuard(Arc::clone(&slot));

    let worker_options = options.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let _teardown = TeardownGuard(Arc::clone(&slot));
        let (process, page) = launcher.launch(&worker_options, policy)?;
        slot.install(process)?;
        page_script(&page)
    });

    match tokio::time::timeout(options.timeout, worker).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ScrapeError::automation("Page script aborted", join_err)),
        Err(_) => Err(ScrapeError::automation_msg(format!(
            "Browser operation timed out after {:?}",
            options.timeout
        ))),
    }
}
