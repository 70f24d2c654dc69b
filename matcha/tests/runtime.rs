use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use matcha::prelude::*;
use matcha::testing::{char_key, ctrl_key, mouse_down, ScreenProbe, TestScreen};
use matcha::ScreenError;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> RuntimeConfig {
    RuntimeConfig {
        frame_interval: Duration::from_millis(10),
        ..RuntimeConfig::default()
    }
}

fn spawn_app(root: Element) -> (JoinHandle<Result<(), Error>>, ScreenProbe) {
    let (screen, probe) = TestScreen::new(10, 4);
    let handle = tokio::spawn(App::new(root).with_config(fast_config()).run_with(screen));
    (handle, probe)
}

async fn finish(handle: JoinHandle<Result<(), Error>>) -> Result<(), Error> {
    timeout(WAIT, handle)
        .await
        .expect("run did not stop")
        .expect("run task panicked")
}

async fn wait_for_line(probe: &ScreenProbe, row: usize, expected: &str) {
    let found = timeout(WAIT, async {
        loop {
            if probe.last_frame_lines().get(row).map(String::as_str) == Some(expected) {
                return;
            }
            let shown = probe.frames();
            probe.wait_for_frames(shown + 1).await;
        }
    })
    .await;
    assert!(found.is_ok(), "row {row} never became {expected:?}");
}

#[tokio::test]
async fn test_first_frame_is_painted() {
    let (handle, mut probe) = spawn_app(column([text("A"), text("BB")]));

    probe.wait_for_frames(1).await;
    assert_eq!(
        probe.last_frame_lines(),
        vec!["A         ", "BB        ", "          ", "          "]
    );

    probe.close_input();
    finish(handle).await.unwrap();
    assert!(probe.is_shut_down());
}

struct Counter;

impl Component for Counter {
    fn render(&self, ctx: &mut Context<'_>) -> Element {
        let (count, set_count) = ctx.use_state(|| 0u32);
        ctx.use_event(move |event| {
            if event.char() == Some('+') {
                set_count.update(|n| n + 1);
                return true;
            }
            false
        });
        text(format!("count {count}"))
    }
}

#[tokio::test]
async fn test_state_update_repaints() {
    let (handle, probe) = spawn_app(Element::component(Counter));
    probe.wait_for_frames(1).await;

    probe.send(EventKind::Key(char_key('+')));
    probe.send(EventKind::Key(char_key('+')));
    wait_for_line(&probe, 0, "count 2   ").await;

    // ctrl+c is not handled by the counter, so the runtime quits
    probe.send(EventKind::Key(ctrl_key('c')));
    finish(handle).await.unwrap();
    assert!(probe.is_shut_down());
}

struct Buttons {
    hits: [Arc<AtomicUsize>; 2],
}

impl Component for Buttons {
    fn render(&self, _ctx: &mut Context<'_>) -> Element {
        row(self
            .hits
            .iter()
            .enumerate()
            .map(|(i, hits)| {
                Element::component(Button {
                    label: if i == 0 { "[one]" } else { "[two]" },
                    hits: hits.clone(),
                })
            }))
    }
}

struct Button {
    label: &'static str,
    hits: Arc<AtomicUsize>,
}

impl Component for Button {
    fn render(&self, ctx: &mut Context<'_>) -> Element {
        let hits = self.hits.clone();
        ctx.use_event(move |event| {
            if event.position().is_some() {
                hits.fetch_add(1, Ordering::SeqCst);
                return true;
            }
            false
        });
        text(self.label)
    }
}

#[tokio::test]
async fn test_click_routes_to_component_under_pointer() {
    let hits = [Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0))];
    let (handle, mut probe) = spawn_app(Element::component(Buttons { hits: hits.clone() }));
    probe.wait_for_frames(1).await;

    probe.send(mouse_down(6, 0));
    probe.send(mouse_down(7, 0));
    probe.send(mouse_down(1, 0));
    // below the painted tree: dropped
    probe.send(mouse_down(1, 3));

    let counted = timeout(WAIT, async {
        while hits[0].load(Ordering::SeqCst) + hits[1].load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(counted.is_ok());

    probe.close_input();
    finish(handle).await.unwrap();
    assert_eq!(hits[0].load(Ordering::SeqCst), 1);
    assert_eq!(hits[1].load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_quit_request_stops_run() {
    struct Quitter;

    impl Component for Quitter {
        fn render(&self, ctx: &mut Context<'_>) -> Element {
            let app = ctx.handle();
            ctx.use_event(move |event| {
                if event.is_key("q") {
                    app.quit();
                    return true;
                }
                false
            });
            text("q quits")
        }
    }

    let (handle, probe) = spawn_app(Element::component(Quitter));
    probe.wait_for_frames(1).await;
    probe.send(EventKind::Key(char_key('q')));
    finish(handle).await.unwrap();
    assert!(probe.is_shut_down());
}

#[tokio::test]
async fn test_render_panic_is_reported_after_shutdown() {
    struct Broken;

    impl Component for Broken {
        fn render(&self, _ctx: &mut Context<'_>) -> Element {
            panic!("broken component");
        }
    }

    let (handle, probe) = spawn_app(Element::component(Broken));
    let err = finish(handle).await.unwrap_err();
    assert!(matches!(err, Error::RenderPanicked(ref message) if message == "broken component"));
    assert!(probe.is_shut_down());
    assert_eq!(probe.frames(), 0);
}

#[tokio::test]
async fn test_unavailable_screen_is_returned() {
    let (screen, probe) = TestScreen::new(10, 4);
    let err = App::new(text("x"))
        .run_with(screen.unavailable())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Screen(ScreenError::Unavailable(_))));
    assert_eq!(probe.frames(), 0);
}
