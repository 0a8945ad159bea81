//! Mesh loading from OBJ files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::Vec3;

use pantilt_core::{PantiltError, Result};

use crate::geometry::{Mesh, Topology, Vertex};

/// Loads OBJ meshes and keeps each parsed file for reuse.
///
/// The cache belongs to this instance; two loaders never share state.
#[derive(Debug, Default)]
pub struct AssetLoader {
    cache: HashMap<PathBuf, Mesh>,
}

impl AssetLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every model in an OBJ file into one triangle mesh.
    ///
    /// Vertices take the file's vertex colors when present and `color`
    /// otherwise. Repeated loads of the same path return the cached mesh
    /// recolored.
    pub fn load_obj(&mut self, path: impl AsRef<Path>, color: Vec3) -> Result<Mesh> {
        let path = path.as_ref();
        if let Some(mesh) = self.cache.get(path) {
            log::debug!("asset cache hit for {}", path.display());
            return Ok(recolor(mesh, color));
        }

        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|err| PantiltError::AssetLoad {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        let mut mesh = Mesh::new(Topology::Triangles);
        let mut has_colors = true;
        for model in models {
            let m = model.mesh;
            let vertex_offset = u32::try_from(mesh.vertices.len()).unwrap_or(u32::MAX);
            let colored = m.vertex_color.len() == m.positions.len();
            has_colors &= colored;

            for (i, p) in m.positions.chunks_exact(3).enumerate() {
                let c = if colored {
                    Vec3::from_slice(&m.vertex_color[i * 3..i * 3 + 3])
                } else {
                    Vec3::NAN
                };
                mesh.vertices.push(Vertex::new(Vec3::from_slice(p), c));
            }
            mesh.indices
                .extend(m.indices.iter().map(|i| i + vertex_offset));
        }

        if mesh.indices.is_empty() {
            return Err(PantiltError::AssetLoad {
                path: path.display().to_string(),
                reason: "file contains no faces".to_string(),
            });
        }

        log::info!(
            "loaded {} ({} vertices, {} triangles)",
            path.display(),
            mesh.vertices.len(),
            mesh.primitive_count()
        );

        // Uncolored vertices are marked NaN and filled on the way out.
        if has_colors {
            self.cache.insert(path.to_path_buf(), mesh.clone());
            Ok(mesh)
        } else {
            let out = recolor(&mesh, color);
            self.cache.insert(path.to_path_buf(), mesh);
            Ok(out)
        }
    }

    /// Number of files currently cached.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Drops all cached meshes.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

fn recolor(mesh: &Mesh, color: Vec3) -> Mesh {
    let mut out = mesh.clone();
    for v in &mut out.vertices {
        if v.color.iter().any(|c| c.is_nan()) {
            v.color = color.to_array();
        }
    }
    out
}
