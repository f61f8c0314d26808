use nalgebra as na;

/// `P = K [R | t]`.
pub fn projection_matrix(
    k: &na::Matrix3<f64>,
    r: &na::Matrix3<f64>,
    t: &na::Vector3<f64>,
) -> na::Matrix3x4<f64> {
    let mut rt = na::Matrix3x4::zeros();
    rt.fixed_view_mut::<3, 3>(0, 0).copy_from(r);
    rt.fixed_view_mut::<3, 1>(0, 3).copy_from(t);
    k * rt
}

/// Triangulates one 3D point per correspondence from two projection
/// matrices; output order and length follow the input.
///
/// Each view contributes the two DLT rows `x * p3 - p1` and `y * p3 - p2`
/// of the homogeneous system, solved by SVD with the right-singular vector
/// of the smallest singular value, then dehomogenized.
///
/// No cheirality filtering happens here: a correspondence whose geometry
/// puts it behind a camera still yields a point. Callers that need a clean
/// cloud must filter on depth themselves.
pub fn triangulate_pair(
    p1: &na::Matrix3x4<f64>,
    p2: &na::Matrix3x4<f64>,
    pts1: &[na::Vector2<f64>],
    pts2: &[na::Vector2<f64>],
) -> Vec<na::Point3<f64>> {
    debug_assert_eq!(pts1.len(), pts2.len());
    pts1.iter()
        .zip(pts2.iter())
        .map(|(x1, x2)| triangulate_point(p1, p2, x1, x2))
        .collect()
}

fn triangulate_point(
    p1: &na::Matrix3x4<f64>,
    p2: &na::Matrix3x4<f64>,
    x1: &na::Vector2<f64>,
    x2: &na::Vector2<f64>,
) -> na::Point3<f64> {
    let mut design = na::Matrix4::zeros();
    design.row_mut(0).copy_from(&(x1.x * p1.row(2) - p1.row(0)));
    design.row_mut(1).copy_from(&(x1.y * p1.row(2) - p1.row(1)));
    design.row_mut(2).copy_from(&(x2.x * p2.row(2) - p2.row(0)));
    design.row_mut(3).copy_from(&(x2.y * p2.row(2) - p2.row(1)));

    let svd = design.svd(false, true);
    // Singular values come back in decreasing order; the null-space vector
    // sits in the last row of V^T.
    let v_t = svd.v_t.unwrap();
    let h = v_t.row(3);
    na::Point3::new(h[0] / h[3], h[1] / h[3], h[2] / h[3])
}
