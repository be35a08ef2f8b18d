// Types and geometric predicates shared by all stages of the baking process.

pub use crate::mesh::{CameraId, Mesh, Point2, Point3, Visibility};

pub type Vector2 = nalgebra::Vector2<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Point<const D: usize> = nalgebra::Point<f64, D>;

/// Linear RGB with components in [0, 1].
pub type Color = Vector3;

/// Weights of the third and the second triangle corners, in this order.
pub type Barycentric = Vector2;

// Pixels closer than sqrt(1/2) to a triangle belong to it, so that pixels
// lying on an edge between two triangles are never dropped.
const PIXEL_TOLERANCE: f64 = 0.5 + f64::EPSILON;

/// Returns the squared distance from `p` to the closed triangle `abc` along
/// with the barycentric weights of the nearest triangle point.
pub fn closest_point_in_triangle(
    p: Point2,
    [a, b, c]: [Point2; 3],
) -> (f64, [f64; 3]) {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let corner = |q: Point2, l: [f64; 3]| ((p - q).norm_squared(), l);
    let on_segment = |l: [f64; 3]| {
        let q = a + ab * l[1] + ac * l[2];
        ((p - q).norm_squared(), l)
    };

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return corner(a, [1.0, 0.0, 0.0]);
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return corner(b, [0.0, 1.0, 0.0]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return on_segment([1.0 - v, v, 0.0]);
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return corner(c, [0.0, 0.0, 1.0]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return on_segment([1.0 - w, 0.0, w]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return on_segment([0.0, 1.0 - w, w]);
    }

    let sum = va + vb + vc;
    if sum.abs() <= f64::EPSILON {
        // Degenerate triangle, all corners are collinear.
        return corner(a, [1.0, 0.0, 0.0]);
    }
    let v = vb / sum;
    let w = vc / sum;
    on_segment([1.0 - v - w, v, w])
}

/// Tests whether the center of `pixel` lies inside `triangle` (within half
/// a pixel). Barycentric coordinates are returned in either case.
pub fn point_in_triangle(
    triangle: &[Point2; 3],
    pixel: (u32, u32),
) -> (bool, Barycentric) {
    let center = Point2::new(pixel.0 as f64 + 0.5, pixel.1 as f64 + 0.5);
    let (dist, [_, l2, l3]) = closest_point_in_triangle(center, *triangle);
    (dist < PIXEL_TOLERANCE, Barycentric::new(l3, l2))
}

pub fn barycentric_to_cartesian<const D: usize>(
    triangle: &[Point<D>; 3],
    coords: &Barycentric,
) -> Point<D> {
    triangle[0]
        + (triangle[2] - triangle[0]) * coords.x
        + (triangle[1] - triangle[0]) * coords.y
}

#[cfg(test)]
mod test {
    use super::*;

    use base::assert_eq_f32;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_triangle(rng: &mut StdRng) -> [Point2; 3] {
        let mut f = || {
            let x = rng.gen_range(0.0..64.0);
            let y = rng.gen_range(0.0..64.0);
            Point2::new(x, y)
        };
        [f(), f(), f()]
    }

    fn cross(a: Vector2, b: Vector2) -> f64 {
        a.x * b.y - a.y * b.x
    }

    fn area(t: &[Point2; 3]) -> f64 {
        cross(t[1] - t[0], t[2] - t[0]).abs() / 2.0
    }

    fn strictly_inside(p: Point2, t: &[Point2; 3]) -> bool {
        let s0 = cross(t[1] - t[0], p - t[0]);
        let s1 = cross(t[2] - t[1], p - t[1]);
        let s2 = cross(t[0] - t[2], p - t[2]);
        (s0 > 1e-9 && s1 > 1e-9 && s2 > 1e-9)
            || (s0 < -1e-9 && s1 < -1e-9 && s2 < -1e-9)
    }

    #[test]
    fn test_pixel_inside_triangle() {
        let triangle = [
            Point2::new(0.0, 0.0),
            Point2::new(8.0, 0.0),
            Point2::new(0.0, 8.0),
        ];
        let (inside, bary) = point_in_triangle(&triangle, (1, 1));
        assert!(inside);
        assert_eq_f32!(bary.x, 1.5 / 8.0);
        assert_eq_f32!(bary.y, 1.5 / 8.0);

        let (inside, _) = point_in_triangle(&triangle, (6, 6));
        assert!(!inside);
    }

    #[test]
    fn test_barycentric_of_outside_pixel() {
        let triangle = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(0.0, 4.0),
        ];
        // Nearest point is the corner (4, 0).
        let (inside, bary) = point_in_triangle(&triangle, (10, 0));
        assert!(!inside);
        let p = barycentric_to_cartesian(&triangle, &bary);
        assert_eq_f32!(p.x, 4.0);
        assert_eq_f32!(p.y, 0.0);
    }

    #[test]
    fn test_interior_points_round_trip() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut checked = 0;
        while checked < 200 {
            let triangle = random_triangle(&mut rng);
            if area(&triangle) < 4.0 {
                continue;
            }

            let (l2, l3): (f64, f64) = (rng.gen(), rng.gen());
            if l2 + l3 > 0.95 || l2 < 0.05 || l3 < 0.05 {
                continue;
            }
            let p = triangle[0]
                + (triangle[2] - triangle[0]) * l2
                + (triangle[1] - triangle[0]) * l3;

            let (dist, [_, b2, b3]) = closest_point_in_triangle(p, triangle);
            assert!(dist < 1e-9);
            let bary = Barycentric::new(b3, b2);
            assert_eq_f32!(bary.x, l2, 1e-6);
            assert_eq_f32!(bary.y, l3, 1e-6);

            let q = barycentric_to_cartesian(&triangle, &bary);
            assert_eq_f32!(q.x, p.x, 1e-6);
            assert_eq_f32!(q.y, p.y, 1e-6);

            let triangle3 = [
                Point3::new(triangle[0].x, triangle[0].y, 1.0),
                Point3::new(triangle[1].x, triangle[1].y, 2.0),
                Point3::new(triangle[2].x, triangle[2].y, 3.0),
            ];
            let q3 = barycentric_to_cartesian(&triangle3, &bary);
            assert_eq_f32!(q3.x, p.x, 1e-6);
            assert_eq_f32!(q3.y, p.y, 1e-6);
            assert_eq_f32!(q3.z, 1.0 + 2.0 * l2 + l3, 1e-6);
            checked += 1;
        }
    }

    #[test]
    fn test_pixels_inside_are_found() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let triangle = random_triangle(&mut rng);
            for y in 0..64 {
                for x in 0..64 {
                    let center = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
                    if strictly_inside(center, &triangle) {
                        let (inside, bary) =
                            point_in_triangle(&triangle, (x, y));
                        assert!(inside);
                        let p = barycentric_to_cartesian(&triangle, &bary);
                        assert_eq_f32!(p.x, center.x, 1e-6);
                        assert_eq_f32!(p.y, center.y, 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    fn test_shared_edge_has_no_gap() {
        let left = [
            Point2::new(0.0, 0.0),
            Point2::new(13.0, 16.0),
            Point2::new(0.0, 16.0),
        ];
        let right = [
            Point2::new(0.0, 0.0),
            Point2::new(16.0, 0.0),
            Point2::new(13.0, 16.0),
        ];
        // Scan every pixel crossed by the shared edge.
        for y in 0..16u32 {
            let x0 = (13.0 * y as f64 / 16.0).floor() as u32;
            let x1 = ((13.0 * (y + 1) as f64 / 16.0).floor() as u32).min(15);
            for x in x0..=x1 {
                let in_left = point_in_triangle(&left, (x, y)).0;
                let in_right = point_in_triangle(&right, (x, y)).0;
                assert!(in_left || in_right, "gap at pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_degenerate_triangle() {
        let p = Point2::new(1.0, 1.0);
        let (dist, l) = closest_point_in_triangle(
            Point2::new(1.5, 1.5),
            [p, p, p],
        );
        assert_eq_f32!(dist, 0.5);
        assert_eq!(l, [1.0, 0.0, 0.0]);
    }
}
