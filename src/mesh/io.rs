//! Mesh loading and saving
//!
//! Uses RON (Rusty Object Notation) for human-readable mesh files.
//! Textures are not stored; meshes keep a texture name and callers attach
//! the texture with `Mesh::resolve_texture`.

use std::fs;
use std::path::Path;

use super::Mesh;
use crate::error::LoadError;

/// Load a mesh from a RON file
pub fn load_mesh<P: AsRef<Path>>(path: P) -> Result<Mesh, LoadError> {
    let contents = fs::read_to_string(path)?;
    load_mesh_from_str(&contents)
}

/// Save a mesh to a RON file
pub fn save_mesh<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<(), LoadError> {
    fs::write(path, mesh_to_string(mesh)?)?;
    Ok(())
}

/// Serialize a mesh to pretty RON
pub fn mesh_to_string(mesh: &Mesh) -> Result<String, LoadError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(2)
        .indentor("  ".to_string());
    Ok(ron::ser::to_string_pretty(mesh, config)?)
}

/// Load a mesh from a RON string (for embedded meshes or testing)
pub fn load_mesh_from_str(s: &str) -> Result<Mesh, LoadError> {
    let mut mesh: Mesh = ron::from_str(s)?;

    // Bounds are not serialized
    mesh.recalculate_bounds();

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Material;
    use glam::Vec3;

    #[test]
    fn test_round_trip_keeps_faces_and_material() {
        let mut cube = super::super::Mesh::cube();
        cube.material = Some(Material { specular_exponent: 32, ..Default::default() });
        let text = mesh_to_string(&cube).unwrap();
        let loaded = load_mesh_from_str(&text).unwrap();
        assert_eq!(loaded.faces, cube.faces);
        assert_eq!(loaded.vertices, cube.vertices);
        assert_eq!(loaded.material, cube.material);
        assert_eq!(loaded.bounding_box, cube.bounding_box);
        assert!(loaded.texture.is_none());
    }

    #[test]
    fn test_hand_written_mesh() {
        let text = r#"(
            name: "tri",
            vertices: [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 2.0, 0.0)],
            faces: [1, 0, 1, 2, 0],
        )"#;
        let mesh = load_mesh_from_str(text).unwrap();
        assert!(mesh.normals.is_none());
        assert_eq!(mesh.bounding_box.max, Vec3::new(1.0, 2.0, 0.0));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.ron");
        save_mesh(&super::super::Mesh::cube(), &path).unwrap();
        let loaded = load_mesh(&path).unwrap();
        assert_eq!(loaded.triangles().count(), 12);
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(load_mesh_from_str("(name: 3"), Err(LoadError::Parse(_))));
    }
}
