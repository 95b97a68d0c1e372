//! Recording mesh sink: a stand-in renderer that remembers what it was told.

use trail_env::{EnvError, MeshBuffers, MeshSink};

/// Captures every call the runtime makes on the render side.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    alpha: f32,
    visible: bool,
    last_mesh: MeshBuffers,

    /// Uploads above this many vertices are rejected
    vertex_limit: Option<usize>,

    uploads: u64,
    alpha_writes: u64,
    visibility_changes: u64,
    finalize_count: u64,
}

impl RecordingSink {
    /// Creates a visible sink whose material starts at `alpha`.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            visible: true,
            last_mesh: MeshBuffers::default(),
            vertex_limit: None,
            uploads: 0,
            alpha_writes: 0,
            visibility_changes: 0,
            finalize_count: 0,
        }
    }

    /// Rejects uploads larger than `max_vertices`, like a fixed-size GPU buffer.
    pub fn with_vertex_limit(mut self, max_vertices: usize) -> Self {
        self.vertex_limit = Some(max_vertices);
        self
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Geometry from the last accepted upload.
    pub fn last_mesh(&self) -> &MeshBuffers {
        &self.last_mesh
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn alpha_writes(&self) -> u64 {
        self.alpha_writes
    }

    pub fn visibility_changes(&self) -> u64 {
        self.visibility_changes
    }

    pub fn finalize_count(&self) -> u64 {
        self.finalize_count
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MeshSink for RecordingSink {
    fn global_alpha(&self) -> f32 {
        self.alpha
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.alpha_writes += 1;
    }

    fn set_visible(&mut self, visible: bool) {
        if visible != self.visible {
            self.visibility_changes += 1;
        }
        self.visible = visible;
    }

    fn upload(&mut self, mesh: &MeshBuffers) -> Result<(), EnvError> {
        if let Some(limit) = self.vertex_limit {
            if mesh.vertices.len() > limit {
                return Err(EnvError::rejected(format!(
                    "{} vertices exceeds buffer of {}",
                    mesh.vertices.len(),
                    limit
                )));
            }
        }

        self.last_mesh.clone_from(mesh);
        self.uploads += 1;
        Ok(())
    }

    fn finalize(&mut self) {
        self.finalize_count += 1;
    }
}
