//! Painter's-algorithm ordering for alpha-blended drawables.
//!
//! Blended surfaces are composited correctly only when drawn farthest first. The
//! order depends on the camera, so it is recomputed every frame from each
//! drawable's distance along the camera's forward axis.

use cgmath::{InnerSpace, Point3, Vector3};

/// Signed distance of `position` in front of the camera, measured along `forward`.
pub fn camera_depth(position: Point3<f32>, eye: Point3<f32>, forward: Vector3<f32>) -> f32 {
    (position - eye).dot(forward)
}

/// Indices of `items` ordered farthest to nearest.
///
/// The sort is stable: drawables at equal depth keep their declaration order, so
/// the order within a frame is total and deterministic.
pub fn back_to_front<T>(
    items: &[T],
    position: impl Fn(&T) -> Point3<f32>,
    eye: Point3<f32>,
    forward: Vector3<f32>,
) -> Vec<usize> {
    let depths: Vec<f32> = items
        .iter()
        // + 0.0 folds -0.0 into 0.0 so zero depths tie under total_cmp
        .map(|item| camera_depth(position(item), eye, forward) + 0.0)
        .collect();
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| depths[b].total_cmp(&depths[a]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;

    const FORWARD_Z: Vector3<f32> = Vector3::new(0.0, 0.0, 1.0);

    #[test]
    fn farther_drawable_comes_first() {
        let eye = Point3::new(0.0, 0.0, 0.0);
        // d_A = 5, d_B = 8
        let positions = [Point3::new(0.0, 0.0, 5.0), Point3::new(0.0, 0.0, 8.0)];
        assert_eq!(back_to_front(&positions, |p| *p, eye, FORWARD_Z), vec![1, 0]);

        // d_A = 9, d_B = 3
        let positions = [Point3::new(0.0, 0.0, 9.0), Point3::new(0.0, 0.0, 3.0)];
        assert_eq!(back_to_front(&positions, |p| *p, eye, FORWARD_Z), vec![0, 1]);
    }

    #[test]
    fn order_follows_the_camera_around() {
        let a = Point3::new(0.0, 0.0, -1.0);
        let b = Point3::new(0.0, 0.0, 1.0);
        let positions = [a, b];

        let front = OrbitCamera::new(0.0, 0.0, 5.0);
        assert_eq!(camera_depth(a, front.eye(), front.forward()), 4.0);
        assert_eq!(camera_depth(b, front.eye(), front.forward()), 6.0);
        assert_eq!(back_to_front(&positions, |p| *p, front.eye(), front.forward()), vec![1, 0]);

        let behind = OrbitCamera::new(std::f32::consts::PI, 0.0, 5.0);
        assert_eq!(back_to_front(&positions, |p| *p, behind.eye(), behind.forward()), vec![0, 1]);
    }

    #[test]
    fn ties_keep_declaration_order() {
        let eye = Point3::new(0.0, 0.0, 0.0);
        // all at depth 2 except the last
        let positions = [
            Point3::new(-1.0, 0.0, 2.0),
            Point3::new(1.0, 0.0, 2.0),
            Point3::new(0.0, 3.0, 2.0),
            Point3::new(0.0, 0.0, 7.0),
        ];
        assert_eq!(back_to_front(&positions, |p| *p, eye, FORWARD_Z), vec![3, 0, 1, 2]);
    }

    #[test]
    fn zero_depths_tie_whatever_their_sign() {
        let eye = Point3::new(0.0, 0.0, 0.0);
        let forward = Vector3::new(-1.0, -1.0, -1.0).normalize();
        let positions = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, -1.0, 0.0)];
        assert!(camera_depth(positions[0], eye, forward).is_sign_negative());
        assert!(camera_depth(positions[1], eye, forward).is_sign_positive());
        assert_eq!(back_to_front(&positions, |p| *p, eye, forward), vec![0, 1]);
    }

    #[test]
    fn drawables_behind_the_camera_sort_last() {
        let eye = Point3::new(0.0, 0.0, 0.0);
        let positions = [Point3::new(0.0, 0.0, -3.0), Point3::new(0.0, 0.0, 1.0)];
        assert_eq!(back_to_front(&positions, |p| *p, eye, FORWARD_Z), vec![1, 0]);
    }

    #[test]
    fn handles_any_count() {
        let eye = Point3::new(0.0, 0.0, 0.0);
        let positions: Vec<Point3<f32>> = (0..32).map(|i| Point3::new(0.0, 0.0, i as f32)).collect();
        let order = back_to_front(&positions, |p| *p, eye, FORWARD_Z);
        let expected: Vec<usize> = (0..32).rev().collect();
        assert_eq!(order, expected);
        assert!(back_to_front::<Point3<f32>>(&[], |p| *p, eye, FORWARD_Z).is_empty());
    }
}
