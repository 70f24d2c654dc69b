//! Process life cycle: wire the screen, the registries and the three tasks
//!
//! ```ignore
//! use matcha::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), matcha::Error> {
//!     App::new(text("hello"))
//!         .with_config(RuntimeConfig { mouse: false, ..Default::default() })
//!         .run()
//!         .await
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::component::Element;
use crate::config::RuntimeConfig;
use crate::context::AppHandle;
use crate::error::Error;
use crate::layout::Packer;
use crate::reconciler::Reconciler;
use crate::scheduler::{dispatch_loop, ingest_loop, RenderTrigger, Scheduler};
use crate::screen::{CrosstermScreen, Screen};
use crate::style::{DefaultStyleResolver, StyleResolver};

/// A root element plus the settings to run it with
pub struct App {
    root: Element,
    config: RuntimeConfig,
    resolver: Arc<dyn StyleResolver>,
}

impl App {
    pub fn new(root: impl Into<Element>) -> Self {
        Self {
            root: root.into(),
            config: RuntimeConfig::default(),
            resolver: Arc::new(DefaultStyleResolver),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the resolver that turns text and styles into cell grids.
    pub fn with_style_resolver(mut self, resolver: Arc<dyn StyleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run on the process terminal until quit.
    pub async fn run(self) -> Result<(), Error> {
        self.config.validate()?;
        let screen = CrosstermScreen::new()?.with_config(&self.config);
        self.run_with(screen).await
    }

    /// Run on `screen` until quit is raised or its event source ends.
    ///
    /// Configuration and screen initialization errors are returned before
    /// any task starts. A missing mouse is logged and the run continues
    /// without pointer events. The screen is shut down on every exit path
    /// after a successful initialization.
    pub async fn run_with<S: Screen>(self, mut screen: S) -> Result<(), Error> {
        let Self {
            root,
            config,
            resolver,
        } = self;
        config.validate()?;

        screen.initialize()?;
        if config.mouse {
            match screen.enable_mouse() {
                Ok(()) => debug!("mouse capture enabled"),
                Err(err) if err.is_capability_absent() => {
                    warn!(error = %err, "continuing without pointer events");
                }
                Err(err) => {
                    let _ = screen.shutdown();
                    return Err(err.into());
                }
            }
        }

        let cancel = CancellationToken::new();
        let (trigger, requests) = RenderTrigger::channel(config.render_queue);
        let app = AppHandle::new(trigger, cancel.clone());
        let (trees_tx, trees_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::channel(config.event_queue);
        let source = screen.events(cancel.clone());

        let scheduler = Scheduler::new(
            root,
            Reconciler::new(app.clone()),
            Packer::new(resolver),
            screen,
            trees_tx,
        );

        info!(
            frame_interval_ms = config.frame_interval.as_millis() as u64,
            render_batch = config.render_batch,
            "runtime started"
        );
        let dispatch = tokio::spawn(dispatch_loop(
            events_rx,
            trees_rx,
            app.clone(),
            config.exit_on_ctrl_c,
        ));
        let ingest = tokio::spawn(ingest_loop(source, events_tx, cancel.clone()));
        let render = tokio::spawn(scheduler.run(
            requests,
            config.frame_interval,
            config.render_batch,
            cancel.clone(),
        ));

        let rendered = render.await;
        cancel.cancel();
        for (name, task) in [("dispatch", dispatch), ("ingest", ingest)] {
            if let Err(err) = task.await {
                error!(task = name, error = %err, "runtime task failed");
            }
        }

        let (mut screen, result) = rendered.map_err(|err| {
            error!(error = %err, "render task failed");
            Error::Task(err)
        })?;
        let shutdown = screen.shutdown();
        info!(ok = result.is_ok(), "runtime stopped");
        result?;
        shutdown?;
        Ok(())
    }
}

/// Run `root` on the process terminal with the default configuration.
pub async fn run(root: impl Into<Element>) -> Result<(), Error> {
    App::new(root).run().await
}
