//! Headless showcase: builds a small menu tree and drives it with synthetic
//! input, printing what the widgets do. Run with `RUST_LOG=debug` to see the
//! router's diagnostics.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use perch_core::input::{Event, Key, PointerButton};
use perch_core::{Anchor, Color, Point, Position, Size};
use perch_surface::Pixmap;
use perch_text::{FixedShaper, Font, TextShaper};
use perch_ui::{
    Display, DisplayMode, Dropdown, Element, Router, Screen, TextField, Widget, action,
};

struct HeadlessDisplay {
    size: Size,
    frames: usize,
}

impl Display for HeadlessDisplay {
    fn window_size(&self) -> Size {
        self.size
    }

    fn set_mode(&mut self, mode: DisplayMode) -> Size {
        self.size = match mode {
            DisplayMode::Fullscreen => Size::new(1920, 1080),
            DisplayMode::Windowed(size) => size,
        };
        self.size
    }

    fn present(&mut self, _frame: &Pixmap) {
        self.frames += 1;
    }
}

fn press(x: i32, y: i32) -> Event {
    Event::PointerDown {
        button: PointerButton::Primary,
        pos: Point::new(x, y),
    }
}

fn release(x: i32, y: i32) -> Event {
    Event::PointerUp {
        button: PointerButton::Primary,
        pos: Point::new(x, y),
    }
}

fn main() {
    env_logger::init();

    let shaper: Rc<dyn TextShaper> = match Font::system_default(16.0) {
        Ok(font) => Rc::new(font),
        Err(err) => {
            log::warn!("system font unavailable ({err}), using the fixed-advance shaper");
            Rc::new(FixedShaper {
                advance: 8.0,
                height: 16,
            })
        }
    };

    let mut display = HeadlessDisplay {
        size: Size::new(640, 360),
        frames: 0,
    };
    let mut screen = Screen::new(
        display.window_size(),
        Some(Pixmap::solid(Size::new(640, 360), Color(24, 24, 32, 255))),
        false,
    );

    let clicks = Rc::new(Cell::new(0));
    let counter = clicks.clone();
    screen.root.add(Element::Button(
        Widget::new(
            Position::Pixels(40.0, 40.0),
            Pixmap::solid(Size::new(120, 32), Color(70, 70, 90, 255)),
            action(move || counter.set(counter.get() + 1)),
        )
        .name("counter")
        .anchor(Anchor::TOP_LEFT),
    ));

    let field_key = screen.root.add(Element::Field(
        TextField::new(
            Position::Pixels(40.0, 100.0),
            Pixmap::solid(Size::new(200, 28), Color(50, 50, 60, 255)),
            shaper.clone(),
        )
        .name("name-field")
        .anchor(Anchor::TOP_LEFT)
        .on_commit(action(|| println!("name committed"))),
    ));

    let chosen = Rc::new(RefCell::new(String::from("<none>")));
    let mut dropdown = Dropdown::new(
        Position::Pixels(40.0, 160.0),
        Pixmap::solid(Size::new(140, 24), Color(70, 70, 90, 255)),
        Pixmap::solid(Size::new(140, 24), Color(40, 40, 50, 255)),
        shaper,
    )
    .name("palette")
    .anchor(Anchor::TOP_LEFT);
    for label in ["ruby", "teal", "gold"] {
        let chosen = chosen.clone();
        dropdown = dropdown.option(label, action(move || *chosen.borrow_mut() = label.into()));
    }
    screen.root.add(Element::Dropdown(dropdown));

    let mut router = Router::new();
    let mut script: Vec<Event> = vec![
        // click the counter button twice
        press(100, 56),
        release(100, 56),
        press(100, 56),
        release(100, 56),
        // activate the text field and type a name
        press(50, 114),
        release(50, 114),
    ];
    for c in "perch".chars() {
        script.push(Event::KeyDown {
            ch: Some(c),
            key: Key::Character(c),
        });
    }
    script.extend([
        Event::KeyDown {
            ch: None,
            key: Key::Enter,
        },
        // fold the palette out, scroll one row, pick the visible second row
        press(100, 172),
        release(100, 172),
        Event::Wheel {
            delta: 4.8,
            precise: false,
        },
        press(100, 196),
        release(100, 196),
        // press empty space to fold the list back up
        press(600, 340),
        release(600, 340),
    ]);

    for event in &script {
        if router.dispatch(&mut screen, event) {
            screen.draw_screen(&mut display);
        }
    }
    screen.draw_screen(&mut display);

    let field_text = match screen.root.child(field_key) {
        Some(Element::Field(field)) => field.current_text().to_owned(),
        _ => String::new(),
    };
    println!("button clicks: {}", clicks.get());
    println!("name field:    {field_text:?}");
    println!("palette pick:  {}", chosen.borrow());
    println!("frames drawn:  {}", display.frames);

    screen.toggle_fullscreen(&mut display);
    println!("fullscreen:    {:?}", screen.size());
    screen.toggle_fullscreen(&mut display);
    println!("windowed:      {:?}", screen.size());
}
