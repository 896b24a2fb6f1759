use emath::{Pos2, Rect, Vec2, pos2};

/// Pan offset and zoom of the diagram. A graph point `p` is shown at `p * zoom + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// The rectangle of graph coordinates shown in a container of the given size.
    #[must_use]
    pub fn visible_rect(&self, size: Vec2) -> Rect {
        Rect::from_min_size(
            pos2(-self.x / self.zoom, -self.y / self.zoom),
            size / self.zoom,
        )
    }

    /// The viewport under which `rect` (in graph coordinates) fills a container of width `width`.
    #[must_use]
    pub fn fitting(rect: Rect, width: f32) -> Self {
        let zoom = if rect.width() > 0.0 {
            width / rect.width()
        } else {
            1.0
        };
        Self {
            x: -rect.min.x * zoom,
            y: -rect.min.y * zoom,
            zoom,
        }
    }

    #[must_use]
    pub fn to_screen(&self, pos: Pos2) -> Pos2 {
        pos2(pos.x * self.zoom + self.x, pos.y * self.zoom + self.y)
    }
}
