//! Input abstraction layer.
//!
//! Normalizes mouse and touch events from the editor canvas into a unified
//! `InputEvent` consumed by the brush tool. Coordinates are image pixels;
//! the bridge converts from screen space before constructing events.

/// Which button started a gesture. Touch and pen contacts report `Primary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Map a DOM `PointerEvent.button` code.
    pub fn from_dom(code: i16) -> Self {
        match code {
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => PointerButton::Primary,
        }
    }
}

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start).
    PointerDown {
        x: f32,
        y: f32,
        button: PointerButton,
    },

    /// Pointer moved, pressed or not.
    PointerMove { x: f32, y: f32 },

    /// Pointer released.
    PointerUp { x: f32, y: f32 },
}

impl InputEvent {
    pub fn down(x: f32, y: f32) -> Self {
        InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        match *self {
            InputEvent::PointerDown { x, y, .. }
            | InputEvent::PointerMove { x, y }
            | InputEvent::PointerUp { x, y } => (x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_button_codes() {
        assert_eq!(PointerButton::from_dom(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_dom(2), PointerButton::Secondary);
        assert_eq!(PointerButton::from_dom(-1), PointerButton::Primary);
    }

    #[test]
    fn position_of_every_variant() {
        assert_eq!(InputEvent::down(1.0, 2.0).position(), (1.0, 2.0));
        assert_eq!(InputEvent::PointerMove { x: 3.0, y: 4.0 }.position(), (3.0, 4.0));
        assert_eq!(InputEvent::PointerUp { x: 5.0, y: 6.0 }.position(), (5.0, 6.0));
    }
}
