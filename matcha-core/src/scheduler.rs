//! Render scheduling and the runtime task loops
//!
//! Three tasks cooperate through bounded queues and one cancellation token:
//!
//! - the render loop ([`Scheduler::run`]) coalesces render requests and runs
//!   build, pack and paint, then publishes the finished tree,
//! - the dispatch loop ([`dispatch_loop`]) routes input events through the
//!   latest published tree,
//! - the ingest loop ([`ingest_loop`]) pulls events from the screen.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::component::Element;
use crate::context::AppHandle;
use crate::dispatch::Dispatcher;
use crate::error::{panic_message, Error, ScreenError};
use crate::event::EventKind;
use crate::grid::Grid;
use crate::layout::Packer;
use crate::node::Tree;
use crate::reconciler::Reconciler;
use crate::screen::{EventStream, Screen};

/// Latest published tree; `None` until the first frame is painted
pub type TreeSnapshot = Option<Arc<Tree>>;

/// Sending half of the render request queue
///
/// Requests are fire-and-forget. When the queue is full a frame is already
/// pending, so the request is dropped.
#[derive(Debug, Clone)]
pub struct RenderTrigger {
    tx: mpsc::Sender<()>,
}

impl RenderTrigger {
    /// Create a trigger and its receiving end.
    pub fn channel(capacity: usize) -> (Self, RenderRequests) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, RenderRequests { rx })
    }

    /// Ask for a render.
    pub fn request(&self) {
        match self.tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => trace!("render queue full; request coalesced"),
            Err(TrySendError::Closed(())) => trace!("render loop stopped; request ignored"),
        }
    }
}

/// Receiving half of the render request queue
#[derive(Debug)]
pub struct RenderRequests {
    rx: mpsc::Receiver<()>,
}

impl RenderRequests {
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Discard queued requests and return how many there were.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

/// Counts pending render requests
///
/// A frame is due once `batch` requests have accumulated, or on the next
/// tick if at least one is pending.
#[derive(Debug, Clone, Copy)]
pub struct Coalescer {
    pending: usize,
    batch: usize,
}

impl Coalescer {
    pub fn new(batch: usize) -> Self {
        Self {
            pending: 0,
            batch: batch.max(1),
        }
    }

    /// Record one request. Returns `true` when the batch is full.
    pub fn push(&mut self) -> bool {
        self.pending += 1;
        if self.pending >= self.batch {
            self.pending = 0;
            true
        } else {
            false
        }
    }

    /// Called on each tick. Returns `true` if anything was pending.
    pub fn on_tick(&mut self) -> bool {
        std::mem::take(&mut self.pending) > 0
    }

    pub fn pending(&self) -> usize {
        self.pending
    }
}

/// Life cycle of the render loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Rendering,
    Quit,
}

/// Owns the root element and the screen; produces frames
pub struct Scheduler<S> {
    root: Element,
    reconciler: Reconciler,
    packer: Packer,
    screen: S,
    trees: watch::Sender<TreeSnapshot>,
    phase: Phase,
    frames: u64,
}

impl<S: Screen> Scheduler<S> {
    pub fn new(
        root: Element,
        reconciler: Reconciler,
        packer: Packer,
        screen: S,
        trees: watch::Sender<TreeSnapshot>,
    ) -> Self {
        Self {
            root,
            reconciler,
            packer,
            screen,
            trees,
            phase: Phase::Idle,
            frames: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Frames painted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one build, pack and paint cycle, then publish the tree.
    ///
    /// A panic during build or pack (hook order violations included) is
    /// returned as [`Error::RenderPanicked`].
    pub fn render_frame(&mut self) -> Result<(), Error> {
        self.phase = Phase::Rendering;
        let reconciler = &self.reconciler;
        let packer = &self.packer;
        let root = &self.root;

        let built = catch_unwind(AssertUnwindSafe(|| {
            let mut tree = reconciler.build(root);
            let grid = packer.pack(&mut tree, 0, 0);
            (tree, grid)
        }));
        let (tree, grid) = match built {
            Ok(frame) => frame,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "render pass panicked");
                self.phase = Phase::Idle;
                return Err(Error::RenderPanicked(message));
            }
        };

        paint(&mut self.screen, &grid)?;
        self.trees.send_replace(Some(Arc::new(tree)));
        self.frames += 1;
        self.phase = Phase::Idle;
        trace!(frame = self.frames, width = grid.width(), height = grid.height(), "frame painted");
        Ok(())
    }

    /// Paint an initial frame, then render coalesced requests until `cancel`.
    ///
    /// Hands the screen back so the caller can shut it down.
    pub async fn run(
        mut self,
        mut requests: RenderRequests,
        frame_interval: Duration,
        batch: usize,
        cancel: CancellationToken,
    ) -> (S, Result<(), Error>) {
        let result = self.render_loop(&mut requests, frame_interval, batch, &cancel).await;
        if result.is_err() {
            cancel.cancel();
        }
        self.phase = Phase::Quit;
        info!(frames = self.frames, "render loop stopped");
        (self.screen, result)
    }

    async fn render_loop(
        &mut self,
        requests: &mut RenderRequests,
        frame_interval: Duration,
        batch: usize,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.render_frame()?;

        let mut coalescer = Coalescer::new(batch);
        let mut tick = interval_at(Instant::now() + frame_interval, frame_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Ok(()),

                request = requests.recv() => {
                    if request.is_none() {
                        debug!("render request queue closed");
                        return Ok(());
                    }
                    if coalescer.push() {
                        trace!(batch, "render batch full");
                        self.render_frame()?;
                    }
                }

                _ = tick.tick() => {
                    let pending = coalescer.pending();
                    if coalescer.on_tick() {
                        trace!(pending, "render on tick");
                        self.render_frame()?;
                    }
                }
            }
        }
    }
}

fn paint<S: Screen>(screen: &mut S, grid: &Grid) -> Result<(), ScreenError> {
    let size = screen.size()?;
    screen.clear()?;
    let area = grid.area();
    for (row, cells) in grid.rows().enumerate() {
        let y = area.y as usize + row;
        if y >= size.height as usize {
            break;
        }
        for (col, cell) in cells.iter().enumerate() {
            let x = area.x as usize + col;
            if x >= size.width as usize {
                break;
            }
            screen.write_cell(x as u16, y as u16, cell.symbol, &cell.combining, cell.style);
        }
    }
    screen.show()
}

/// Route events from `events` through the latest tree until `cancel`.
///
/// Events that arrive before the first tree is published are dropped. A
/// resize always requests a render. An unhandled Ctrl+C raises the quit
/// signal when `exit_on_ctrl_c` is set.
pub async fn dispatch_loop(
    mut events: mpsc::Receiver<EventKind>,
    trees: watch::Receiver<TreeSnapshot>,
    app: AppHandle,
    exit_on_ctrl_c: bool,
) {
    let dispatcher = Dispatcher::new(&app);
    let cancel = app.cancel_token().clone();

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if let EventKind::Resize(width, height) = event {
            debug!(width, height, "terminal resized");
            app.request_render();
        }

        let Some(tree) = trees.borrow().clone() else {
            trace!(?event, "no tree yet; event dropped");
            continue;
        };

        let outcome = dispatcher.dispatch(&tree, &event);
        if !outcome.is_handled() && exit_on_ctrl_c && event.is_ctrl_c() {
            info!("ctrl+c not handled; quitting");
            app.quit();
        }
    }
    debug!("dispatch loop stopped");
}

/// Forward screen events into the bounded event queue until `cancel`.
///
/// When the queue is full the newest event is dropped so the input source
/// is never blocked. The end of the source raises the quit signal.
pub async fn ingest_loop(
    mut source: EventStream,
    events: mpsc::Sender<EventKind>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = source.next() => next,
        };

        let Some(event) = next else {
            info!("input source closed; quitting");
            cancel.cancel();
            break;
        };

        match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "event queue full; dropping newest event");
            }
            Err(TrySendError::Closed(_)) => break,
        }
    }
    debug!("ingest loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{column, text, Component};
    use crate::context::Context;
    use crate::testing::{char_key, ctrl_key, TestScreen};

    #[test]
    fn test_coalescer_batches() {
        let mut c = Coalescer::new(3);
        assert!(!c.push());
        assert!(!c.push());
        assert!(c.push());
        assert_eq!(c.pending(), 0);
        assert!(!c.on_tick());
        c.push();
        assert!(c.on_tick());
        assert!(!c.on_tick());
    }

    #[test]
    fn test_trigger_coalesces_when_full() {
        let (trigger, mut requests) = RenderTrigger::channel(2);
        for _ in 0..5 {
            trigger.request();
        }
        assert_eq!(requests.drain(), 2);
    }

    #[test]
    fn test_trigger_after_receiver_dropped() {
        let (trigger, requests) = RenderTrigger::channel(2);
        drop(requests);
        trigger.request();
    }

    struct Fixture {
        app: AppHandle,
        requests: RenderRequests,
        trees: watch::Receiver<TreeSnapshot>,
        scheduler: Scheduler<TestScreen>,
        probe: crate::testing::ScreenProbe,
    }

    fn fixture(root: Element) -> Fixture {
        let (screen, probe) = TestScreen::new(10, 4);
        let (trigger, requests) = RenderTrigger::channel(64);
        let app = AppHandle::new(trigger, CancellationToken::new());
        let (tx, trees) = watch::channel(None);
        let scheduler = Scheduler::new(
            root,
            Reconciler::new(app.clone()),
            Packer::default(),
            screen,
            tx,
        );
        Fixture {
            app,
            requests,
            trees,
            scheduler,
            probe,
        }
    }

    #[test]
    fn test_render_frame_publishes_tree() {
        let mut f = fixture(column([text("A"), text("BB")]));
        assert!(f.trees.borrow().is_none());

        f.scheduler.render_frame().unwrap();
        assert_eq!(f.scheduler.frames(), 1);
        assert_eq!(f.scheduler.phase(), Phase::Idle);
        let tree = f.trees.borrow().clone().unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(f.probe.frames(), 1);
        assert_eq!(&f.probe.last_frame_lines()[..2], &["A         ", "BB        "]);
    }

    struct Broken;

    impl Component for Broken {
        fn render(&self, _ctx: &mut Context<'_>) -> Element {
            panic!("cannot render");
        }
    }

    #[test]
    fn test_render_panic_becomes_error() {
        let mut f = fixture(Element::component(Broken));
        let err = f.scheduler.render_frame().unwrap_err();
        assert!(matches!(err, Error::RenderPanicked(ref m) if m == "cannot render"));
        assert!(f.trees.borrow().is_none());
        assert_eq!(f.probe.frames(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_batch_size_renders_once() {
        let Fixture {
            app,
            requests,
            scheduler,
            probe,
            ..
        } = fixture(text("x"));
        let cancel = app.cancel_token().clone();

        for _ in 0..8 {
            app.request_render();
        }
        let handle = tokio::spawn(scheduler.run(
            requests,
            Duration::from_millis(40),
            8,
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(1)).await;
        // initial frame plus one for the full batch
        assert_eq!(probe.frames(), 2);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(probe.frames(), 2);

        cancel.cancel();
        let (_screen, result) = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_burst_renders_on_tick() {
        let Fixture {
            app,
            requests,
            scheduler,
            probe,
            ..
        } = fixture(text("x"));
        let cancel = app.cancel_token().clone();
        let handle = tokio::spawn(scheduler.run(
            requests,
            Duration::from_millis(40),
            8,
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(probe.frames(), 1);

        for _ in 0..3 {
            app.request_render();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(probe.frames(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(probe.frames(), 2);

        cancel.cancel();
        handle.await.unwrap().1.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_loop_drops_events_before_first_tree() {
        let (trigger, _requests) = RenderTrigger::channel(8);
        let app = AppHandle::new(trigger, CancellationToken::new());
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = hits.clone();
        app.handlers().register(
            "root".into(),
            Arc::new(move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                true
            }),
        );

        let (tx, rx) = mpsc::channel(8);
        let (tree_tx, tree_rx) = watch::channel(None);
        let task = tokio::spawn(dispatch_loop(rx, tree_rx, app.clone(), true));

        tx.send(EventKind::Key(char_key('a'))).await.unwrap();
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        let mut tree = Tree::new();
        tree.push(crate::node::Node::new(
            crate::node::ComponentId::root(),
            crate::node::NodeKind::Column,
            None,
        ));
        tree_tx.send_replace(Some(Arc::new(tree)));
        tx.send(EventKind::Key(char_key('b'))).await.unwrap();

        drop(tx);
        task.await.unwrap();
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unhandled_ctrl_c_quits() {
        let (trigger, _requests) = RenderTrigger::channel(8);
        let app = AppHandle::new(trigger, CancellationToken::new());
        let mut tree = Tree::new();
        tree.push(crate::node::Node::new(
            crate::node::ComponentId::root(),
            crate::node::NodeKind::Column,
            None,
        ));
        let (_tree_tx, tree_rx) = watch::channel(Some(Arc::new(tree)));
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(dispatch_loop(rx, tree_rx, app.clone(), true));

        tx.send(EventKind::Key(ctrl_key('c'))).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("dispatch loop should stop")
            .unwrap();
        assert!(app.is_quit());
    }

    #[tokio::test]
    async fn test_resize_requests_render() {
        let (trigger, mut requests) = RenderTrigger::channel(8);
        let app = AppHandle::new(trigger, CancellationToken::new());
        let (_tree_tx, tree_rx) = watch::channel(None);
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(dispatch_loop(rx, tree_rx, app, false));

        tx.send(EventKind::Resize(80, 24)).await.unwrap();
        drop(tx);
        task.await.unwrap();
        assert_eq!(requests.drain(), 1);
    }

    #[tokio::test]
    async fn test_ingest_drops_newest_when_full() {
        let source: EventStream = Box::pin(tokio_stream::iter(vec![
            EventKind::Tick,
            EventKind::Interrupt,
            EventKind::FocusLost,
        ]));
        let (tx, mut rx) = mpsc::channel(2);
        let cancel = CancellationToken::new();

        ingest_loop(source, tx, cancel.clone()).await;

        assert_eq!(rx.recv().await, Some(EventKind::Tick));
        assert_eq!(rx.recv().await, Some(EventKind::Interrupt));
        assert_eq!(rx.recv().await, None);
        // source exhausted
        assert!(cancel.is_cancelled());
    }
}
