use egui::{Pos2, Rect, Vec2, epaint::CubicBezierShape};

/// Geometry of one edge in graph coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum EdgePath {
    Line([Pos2; 2]),
    Cubic([Pos2; 4]),
    Polyline(Vec<Pos2>),
}

pub trait ContainsPoint {
    /// Check if a point lies on a line or curve (with the given tolerance).
    fn contains_point(&self, point: Pos2, tolerance: f32) -> bool;
}

impl ContainsPoint for [Pos2; 2] {
    fn contains_point(&self, point: Pos2, tolerance: f32) -> bool {
        distance_to_segment(point, self[0], self[1]) <= tolerance
    }
}

const SAMPLES: u8 = 32;

impl ContainsPoint for [Pos2; 4] {
    fn contains_point(&self, point: Pos2, tolerance: f32) -> bool {
        if !Rect::from_points(self).expand(tolerance).contains(point) {
            return false;
        }
        let bezier = CubicBezierShape::from_points_stroke(
            *self,
            false,
            egui::Color32::TRANSPARENT,
            egui::Stroke::NONE,
        );
        let samples: Vec<Pos2> = (0..=SAMPLES)
            .map(|t| bezier.sample(f32::from(t) / f32::from(SAMPLES)))
            .collect();
        samples.contains_point(point, tolerance)
    }
}

impl ContainsPoint for [Pos2] {
    fn contains_point(&self, point: Pos2, tolerance: f32) -> bool {
        self.windows(2)
            .any(|w| distance_to_segment(point, w[0], w[1]) <= tolerance)
    }
}

impl ContainsPoint for Vec<Pos2> {
    fn contains_point(&self, point: Pos2, tolerance: f32) -> bool {
        self.as_slice().contains_point(point, tolerance)
    }
}

fn distance_to_segment(point: Pos2, start: Pos2, end: Pos2) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_sq();
    if length_sq == 0.0 {
        return point.distance(start);
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    point.distance(start + t * segment)
}

impl EdgePath {
    #[must_use]
    pub fn start(&self) -> Pos2 {
        match self {
            Self::Line(points) => points[0],
            Self::Cubic(points) => points[0],
            Self::Polyline(points) => points.first().copied().unwrap_or(Pos2::ZERO),
        }
    }

    #[must_use]
    pub fn end(&self) -> Pos2 {
        match self {
            Self::Line(points) => points[1],
            Self::Cubic(points) => points[3],
            Self::Polyline(points) => points.last().copied().unwrap_or(Pos2::ZERO),
        }
    }

    /// Unit direction in which the path arrives at its end.
    #[must_use]
    pub fn end_direction(&self) -> Vec2 {
        let toward = match self {
            Self::Line([start, end]) => *end - *start,
            Self::Cubic([start, _, c2, end]) => {
                if *end == *c2 {
                    *end - *start
                } else {
                    *end - *c2
                }
            }
            Self::Polyline(points) => last_step(points.iter().rev()),
        };
        toward.normalized()
    }

    /// Unit direction in which the path leaves its start, pointing backwards.
    #[must_use]
    pub fn start_direction(&self) -> Vec2 {
        let toward = match self {
            Self::Line([start, end]) => *start - *end,
            Self::Cubic([start, c1, _, end]) => {
                if *start == *c1 {
                    *start - *end
                } else {
                    *start - *c1
                }
            }
            Self::Polyline(points) => last_step(points.iter()),
        };
        toward.normalized()
    }

    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        match self {
            Self::Line(points) => Rect::from_points(points),
            Self::Cubic(points) => Rect::from_points(points),
            Self::Polyline(points) => Rect::from_points(points),
        }
    }

    #[must_use]
    pub fn contains_point(&self, point: Pos2, tolerance: f32) -> bool {
        match self {
            Self::Line(points) => points.contains_point(point, tolerance),
            Self::Cubic(points) => points.contains_point(point, tolerance),
            Self::Polyline(points) => points.contains_point(point, tolerance),
        }
    }
}

/// Vector from the second distinct point of `points` to the first.
fn last_step<'a>(mut points: impl Iterator<Item = &'a Pos2>) -> Vec2 {
    let Some(&first) = points.next() else {
        return Vec2::ZERO;
    };
    points
        .find(|&&p| p != first)
        .map_or(Vec2::ZERO, |&p| first - p)
}

#[cfg(test)]
mod tests {
    use egui::{pos2, vec2};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(pos2(5.0, 0.0), true)]
    #[case(pos2(5.0, 0.9), true)]
    #[case(pos2(5.0, 1.1), false)]
    #[case(pos2(-0.5, 0.0), true)]
    #[case(pos2(12.0, 0.0), false)]
    fn line_hit_test(#[case] point: Pos2, #[case] expected: bool) {
        let path = EdgePath::Line([pos2(0.0, 0.0), pos2(10.0, 0.0)]);
        assert_eq!(path.contains_point(point, 1.0), expected);
    }

    #[rstest]
    #[case(pos2(0.0, 5.0), true)]
    #[case(pos2(5.0, 10.0), true)]
    #[case(pos2(5.0, 5.0), false)]
    fn polyline_hit_test(#[case] point: Pos2, #[case] expected: bool) {
        let path = EdgePath::Polyline(vec![pos2(0.0, 0.0), pos2(0.0, 10.0), pos2(10.0, 10.0)]);
        assert_eq!(path.contains_point(point, 1.0), expected);
    }

    #[test]
    fn cubic_hit_test() {
        let path = EdgePath::Cubic([
            pos2(0.0, 0.0),
            pos2(0.0, 50.0),
            pos2(100.0, 50.0),
            pos2(100.0, 100.0),
        ]);
        assert!(path.contains_point(pos2(50.0, 50.0), 2.0));
        assert!(path.contains_point(pos2(0.0, 0.0), 2.0));
        assert!(!path.contains_point(pos2(0.0, 100.0), 2.0));
    }

    #[test]
    fn directions() {
        let path = EdgePath::Polyline(vec![
            pos2(0.0, 0.0),
            pos2(0.0, 10.0),
            pos2(10.0, 10.0),
            pos2(10.0, 10.0),
        ]);
        assert_eq!(path.end_direction(), vec2(1.0, 0.0));
        assert_eq!(path.start_direction(), vec2(0.0, -1.0));

        let path = EdgePath::Cubic([pos2(0.0, 0.0), pos2(0.0, 0.0), pos2(0.0, 0.0), pos2(0.0, 4.0)]);
        assert_eq!(path.end_direction(), vec2(0.0, 1.0));
    }
}
