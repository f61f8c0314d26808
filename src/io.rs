use std::io::Write;

use serde::{Serialize, de::DeserializeOwned};

use crate::types::Point3D;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &str, object: &T) {
    let j = serde_json::to_string_pretty(object).unwrap();
    let mut file = std::fs::File::create(output_path).unwrap();
    file.write_all(j.as_bytes()).unwrap();
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &str) -> T {
    let contents =
        std::fs::read_to_string(file_path).expect("Should have been able to read the file");
    serde_json::from_str(&contents).unwrap()
}

/// Writes an ASCII PLY point cloud, one `x y z r g b` line per point.
///
/// Viewable in MeshLab, Blender and friends.
pub fn write_ply(output_path: &str, points: &[Point3D]) -> std::io::Result<()> {
    let mut s = String::new();
    s += "ply\n";
    s += "format ascii 1.0\n";
    s += format!("element vertex {}\n", points.len()).as_str();
    s += "property float x\n";
    s += "property float y\n";
    s += "property float z\n";
    s += "property uchar red\n";
    s += "property uchar green\n";
    s += "property uchar blue\n";
    s += "end_header\n";
    for p in points {
        s += format!(
            "{} {} {} {} {} {}\n",
            p.position.x, p.position.y, p.position.z, p.color[0], p.color[1], p.color[2]
        )
        .as_str();
    }
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(s.as_bytes())
}
