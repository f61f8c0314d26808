use glam::Vec3;
use sparse_sfm::io::{object_from_json, object_to_json, write_ply};
use sparse_sfm::reconstruction::ReconstructionConfig;
use sparse_sfm::types::{CameraIntrinsics, Point3D};

fn temp_path(name: &str) -> String {
    std::env::temp_dir()
        .join(name)
        .to_string_lossy()
        .to_string()
}

#[test]
fn test_ply_output_format() {
    let points = vec![
        Point3D::new(Vec3::new(1.0, 2.0, 3.0)),
        Point3D::new(Vec3::new(4.0, 5.0, 6.0)),
    ];
    let path = temp_path("sparse_sfm_two_points.ply");
    write_ply(&path, &points).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let expected = "ply\n\
                    format ascii 1.0\n\
                    element vertex 2\n\
                    property float x\n\
                    property float y\n\
                    property float z\n\
                    property uchar red\n\
                    property uchar green\n\
                    property uchar blue\n\
                    end_header\n\
                    1 2 3 255 255 255\n\
                    4 5 6 255 255 255\n";
    assert_eq!(contents, expected);
}

#[test]
fn test_ply_empty_cloud_has_header_only() {
    let path = temp_path("sparse_sfm_empty.ply");
    write_ply(&path, &[]).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("element vertex 0\n"));
    assert!(contents.ends_with("end_header\n"));
}

#[test]
fn test_ply_keeps_custom_colors() {
    let points = vec![Point3D::with_color(Vec3::new(0.5, -1.5, 2.0), [10, 20, 30])];
    let path = temp_path("sparse_sfm_colored.ply");
    write_ply(&path, &points).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.ends_with("0.5 -1.5 2 10 20 30\n"));
}

#[test]
fn test_config_json_round_trip() {
    let config = ReconstructionConfig::default();
    let path = temp_path("sparse_sfm_config.json");
    object_to_json(&path, &config);
    let loaded: ReconstructionConfig = object_from_json(&path);

    assert_eq!(loaded.ratio_threshold, config.ratio_threshold);
    assert_eq!(loaded.min_matches, config.min_matches);
    assert_eq!(loaded.ransac.inlier_threshold, config.ransac.inlier_threshold);
    assert_eq!(loaded.ransac.confidence, config.ransac.confidence);
    assert_eq!(loaded.ransac.max_iterations, config.ransac.max_iterations);
    assert_eq!(loaded.ransac.min_inliers, config.ransac.min_inliers);
}

#[test]
fn test_intrinsics_json_round_trip() {
    let intrinsics = CameraIntrinsics::new(984.2, 980.8, 690.0, 233.2);
    let path = temp_path("sparse_sfm_intrinsics.json");
    object_to_json(&path, &intrinsics);
    let loaded: CameraIntrinsics = object_from_json(&path);

    assert_eq!(loaded.fx, intrinsics.fx);
    assert_eq!(loaded.fy, intrinsics.fy);
    assert_eq!(loaded.cx, intrinsics.cx);
    assert_eq!(loaded.cy, intrinsics.cy);
}
