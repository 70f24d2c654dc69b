use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;
use ratatui::Terminal;

use matcha::prelude::*;
use matcha::testing::RenderHarness;
use matcha::{process_raw_event, DispatchOutcome, Grid, RawEvent};

/// Paints a packed grid at its own position
struct GridView<'a>(&'a Grid);

impl Widget for GridView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let origin = self.0.area();
        for (dy, row) in self.0.rows().enumerate() {
            for (dx, cell) in row.iter().enumerate() {
                let x = origin.x + dx as u16;
                let y = origin.y + dy as u16;
                if x >= area.right() || y >= area.bottom() {
                    continue;
                }
                if let Some(target) = buf.cell_mut((x, y)) {
                    target.set_symbol(&cell.grapheme()).set_style(cell.style);
                }
            }
        }
    }
}

#[test]
fn test_grid_paints_into_ratatui_terminal() {
    let title = TextStyle::default().fg(Color::Yellow).bold();
    let boxed = TextStyle::default().borders(Borders::ALL);
    let mut harness = RenderHarness::new(column([styled("menu", title), styled("ok", boxed)]));
    let grid = harness.render();

    let mut terminal = Terminal::new(TestBackend::new(6, 5)).unwrap();
    terminal
        .draw(|frame| frame.render_widget(GridView(&grid), frame.area()))
        .unwrap();

    let buffer = terminal.backend().buffer();
    let lines: Vec<String> = (0..buffer.area.height)
        .map(|y| {
            (0..buffer.area.width)
                .map(|x| buffer[(x, y)].symbol().to_string())
                .collect()
        })
        .collect();
    assert_eq!(lines, vec!["menu  ", "┌──┐  ", "│ok│  ", "└──┘  ", "      "]);
    assert_eq!(buffer[(0, 0)].fg, Color::Yellow);
    assert!(buffer[(0, 0)].modifier.contains(Modifier::BOLD));
    assert_eq!(buffer[(0, 1)].fg, Color::Reset);
}

struct Counter;

impl Component for Counter {
    fn render(&self, ctx: &mut Context<'_>) -> Element {
        let (count, set_count) = ctx.use_state(|| 0i32);
        ctx.use_event(move |event| {
            if event.is_key("+") || event.is_key("ctrl+up") {
                set_count.update(|n| n + 1);
                return true;
            }
            if event.position().is_some() {
                set_count.set(0);
                return true;
            }
            false
        });
        text(format!("{count}"))
    }
}

#[test]
fn test_crossterm_events_reach_components() {
    let mut harness = RenderHarness::new(Element::component(Counter));
    assert_eq!(harness.render_lines(), vec!["0"]);

    let plus = Event::Key(KeyEvent::new(KeyCode::Char('+'), KeyModifiers::NONE));
    let ctrl_up = Event::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::CONTROL));
    for raw in [plus, ctrl_up] {
        let outcome = harness.dispatch(process_raw_event(RawEvent::from(raw)));
        assert!(outcome.is_handled());
    }
    assert_eq!(harness.render_lines(), vec!["2"]);

    let click = Event::Mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column: 0,
        row: 0,
        modifiers: KeyModifiers::NONE,
    });
    let outcome = harness.dispatch(process_raw_event(RawEvent::from(click)));
    assert_eq!(outcome, DispatchOutcome::Handled("root".into()));
    assert_eq!(harness.render_lines(), vec!["0"]);

    let resize = Event::Resize(80, 24);
    assert_eq!(
        process_raw_event(RawEvent::from(resize)),
        EventKind::Resize(80, 24)
    );
}
