use nalgebra::{Point3, Vector3};

/// Default epsilon for on-plane equality testing of points [mm].
pub const EPSILON: f64 = 1e-10;

// Squared-norm tolerances below which a cross product is considered null.
const COLLINEAR_TOL: f64 = 1e-14;
const PARALLEL_TOL: f64 = 1e-14;
const ZERO_VECTOR_TOL: f64 = 1e-12;

#[derive(thiserror::Error, Debug)]
pub enum GeometryError {
    #[error("collinear points: {a}, {b}, {c}")]
    Collinear {
        a: Point3<f64>,
        b: Point3<f64>,
        c: Point3<f64>,
    },
    #[error("parallel lines through ({p10}, {p11}) and ({p20}, {p21})")]
    ParallelLines {
        p10: Point3<f64>,
        p11: Point3<f64>,
        p20: Point3<f64>,
        p21: Point3<f64>,
    },
    #[error("zero-length vector from {origin} to {point}")]
    ZeroLengthVector {
        origin: Point3<f64>,
        point: Point3<f64>,
    },
    #[error("vertical tilt chord: front {front}, back {back}")]
    VerticalChord {
        front: Point3<f64>,
        back: Point3<f64>,
    },
}

/// Plane in normal form `Ax + By + Cz + D = 0` with normal `(A,B,C)` and offset `D`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}
impl Plane {
    /// Plane with the given normal passing through `anchor`
    pub fn through(normal: Vector3<f64>, anchor: &Point3<f64>) -> Self {
        let offset = -anchor.coords.dot(&normal);
        Self { normal, offset }
    }
    /// Unsigned distance of `p` from the plane [mm]
    pub fn distance_to(&self, p: &Point3<f64>) -> f64 {
        (p.coords.dot(&self.normal) + self.offset).abs() / self.normal.norm()
    }
    /// Orthogonal projection of `p` onto the plane
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        let off = (p.coords.dot(&self.normal) + self.offset) / self.normal.norm_squared();
        p - self.normal * off
    }
    pub fn contains(&self, p: &Point3<f64>, tol: f64) -> bool {
        self.distance_to(p) <= tol
    }
}

/// Radius and center of the circle through three points in space
pub fn circle_through_three_points(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Result<(f64, Point3<f64>), GeometryError> {
    let t = b - a;
    let u = c - a;
    let v = c - b;
    let w = t.cross(&u);
    let wsl = w.norm_squared();
    if wsl < COLLINEAR_TOL {
        return Err(GeometryError::Collinear {
            a: *a,
            b: *b,
            c: *c,
        });
    }
    let iwsl2 = 1. / (2. * wsl);
    let tt = t.norm_squared();
    let uu = u.norm_squared();
    let center = a + (u * tt * u.dot(&v) - t * uu * t.dot(&v)) * iwsl2;
    let radius = (tt * uu * v.norm_squared() * iwsl2 * 0.5).sqrt();
    Ok((radius, center))
}

/// Intersection of two coplanar lines, each given by two points
///
/// Solves for the parameter along the first line's direction; the caller is
/// responsible for only passing lines known to intersect.
pub fn line_line_intersection(
    line1: (&Point3<f64>, &Point3<f64>),
    line2: (&Point3<f64>, &Point3<f64>),
) -> Result<Point3<f64>, GeometryError> {
    let (p10, p11) = line1;
    let (p20, p21) = line2;
    let d1 = p11 - p10;
    let d2 = p21 - p20;
    let n = d1.cross(&d2);
    let n2 = n.norm_squared();
    if n2 < PARALLEL_TOL {
        return Err(GeometryError::ParallelLines {
            p10: *p10,
            p11: *p11,
            p20: *p20,
            p21: *p21,
        });
    }
    let t = (p20 - p10).cross(&d2).dot(&n) / n2;
    Ok(p10 + d1 * t)
}

/// Angle ∠p1-origin-p2 [deg]
pub fn angle_between(
    origin: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
) -> Result<f64, GeometryError> {
    let u = p1 - origin;
    let v = p2 - origin;
    let uu = u.norm_squared();
    let vv = v.norm_squared();
    if uu < ZERO_VECTOR_TOL {
        return Err(GeometryError::ZeroLengthVector {
            origin: *origin,
            point: *p1,
        });
    }
    if vv < ZERO_VECTOR_TOL {
        return Err(GeometryError::ZeroLengthVector {
            origin: *origin,
            point: *p2,
        });
    }
    let cos_theta = (u.dot(&v) / (uu * vv).sqrt()).clamp(-1., 1.);
    Ok(cos_theta.acos().to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra as na;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn circle_center_is_equidistant() {
        let a = Point3::new(1., 0., 0.);
        let b = Point3::new(0., 1., 0.);
        let c = Point3::new(-1., 0., 0.);
        let (radius, center) = circle_through_three_points(&a, &b, &c).unwrap();
        assert!(approx_eq(radius, 1., 1e-12));
        assert!(approx_eq((a - center).norm(), radius, 1e-12));
        assert!(approx_eq((b - center).norm(), radius, 1e-12));
        assert!(approx_eq((c - center).norm(), radius, 1e-12));
    }

    #[test]
    fn circle_through_random_points() {
        for _ in 0..10 {
            let a: Point3<f64> = (na::Vector3::new_random() * 100f64).into();
            let b: Point3<f64> = (na::Vector3::new_random() * 100f64).into();
            let c: Point3<f64> = (na::Vector3::new_random() * 100f64).into();
            match circle_through_three_points(&a, &b, &c) {
                // huge radii mean a nearly collinear triple, too
                // ill-conditioned for a tight tolerance
                Ok((radius, center)) if radius < 1e3 => {
                    for p in [&a, &b, &c] {
                        let d = (p - center).norm();
                        assert!(
                            approx_eq(d, radius, 1e-9 * radius.max(1.)),
                            "|{}-{}| = {} != {}",
                            p,
                            center,
                            d,
                            radius
                        );
                    }
                }
                Ok(_) => (),
                // randomly collinear triples are legitimate rejections
                Err(GeometryError::Collinear { .. }) => (),
                Err(e) => panic!("{}", e),
            }
        }
    }

    #[test]
    fn known_random_circles_are_recovered() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let radius = rng.gen_range(10f64..1e3);
            let center = Point3::new(
                rng.gen_range(-1e2..1e2),
                rng.gen_range(-1e2..1e2),
                rng.gen_range(-1e2..1e2),
            );
            let n = Vector3::new(
                rng.gen_range(-1f64..1.),
                rng.gen_range(-1f64..1.),
                rng.gen_range(0.1f64..1.),
            )
            .normalize();
            let e1 = n.cross(&Vector3::x()).normalize();
            let e2 = n.cross(&e1);
            let on_circle = |t: f64| center + (e1 * t.cos() + e2 * t.sin()) * radius;
            let t0 = rng.gen_range(0f64..1.);
            let (r, c) =
                circle_through_three_points(&on_circle(t0), &on_circle(t0 + 1.7), &on_circle(t0 + 3.9))
                    .unwrap();
            assert!(approx_eq(r, radius, 1e-9 * radius));
            assert!((c - center).norm() <= 1e-9 * radius);
        }
    }

    #[test]
    fn collinear_points_are_rejected() {
        let a = Point3::new(0., 0., 0.);
        let b = Point3::new(1., 1., 1.);
        let c = Point3::new(2., 2., 2.);
        assert!(matches!(
            circle_through_three_points(&a, &b, &c),
            Err(GeometryError::Collinear { .. })
        ));
    }

    #[test]
    fn point_on_plane_projects_to_itself() {
        let plane = Plane::through(Vector3::new(0., 0., 1.), &Point3::new(0., 0., 5.));
        let p = Point3::new(3., -2., 5.);
        assert!(approx_eq(plane.distance_to(&p), 0., EPSILON));
        assert!((plane.project(&p) - p).norm() <= EPSILON);
    }

    #[test]
    fn point_off_plane_distance_and_projection() {
        let plane = Plane::through(Vector3::new(0., 0., 2.), &Point3::origin());
        let p = Point3::new(1., 2., 7.);
        assert!(approx_eq(plane.distance_to(&p), 7., 1e-12));
        let proj = plane.project(&p);
        assert!((proj - Point3::new(1., 2., 0.)).norm() <= 1e-12);
        assert!(plane.contains(&proj, EPSILON));
    }

    #[test]
    fn lines_intersect_at_known_point() {
        let x = Point3::new(2., 3., 4.);
        let d1 = Vector3::new(1., 0., 1.);
        let d2 = Vector3::new(0., 1., -1.);
        let line1 = (x - d1 * 2., x + d1);
        let line2 = (x - d2, x + d2 * 3.);
        let p = line_line_intersection((&line1.0, &line1.1), (&line2.0, &line2.1)).unwrap();
        assert!((p - x).norm() <= 1e-12);
    }

    #[test]
    fn parallel_lines_are_rejected() {
        let d = Vector3::new(1., 2., 0.);
        let a = Point3::origin();
        let b = Point3::new(0., 0., 1.);
        let r = line_line_intersection((&a, &(a + d)), (&b, &(b + d)));
        assert!(matches!(r, Err(GeometryError::ParallelLines { .. })));
    }

    #[test]
    fn right_angle_between_axes() {
        let o = Point3::origin();
        let p1 = Point3::new(1., 0., 0.);
        let p2 = Point3::new(0., 5., 0.);
        assert!(approx_eq(angle_between(&o, &p1, &p2).unwrap(), 90., 1e-12));
    }

    #[test]
    fn zero_length_arm_is_rejected() {
        let o = Point3::new(1., 1., 1.);
        let p2 = Point3::new(2., 1., 1.);
        assert!(matches!(
            angle_between(&o, &o, &p2),
            Err(GeometryError::ZeroLengthVector { .. })
        ));
    }
}
