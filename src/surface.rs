use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Output size negotiated with the display surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Non-owning reference to the display target the camera renders into.
///
/// The compositor owns the real surface; cloning this only copies the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceTarget {
    id: u64,
    name: Arc<str>,
}

impl SurfaceTarget {
    pub fn new(id: u64, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SurfaceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

#[derive(Debug, Clone, Default)]
struct SurfaceState {
    exists: bool,
    target: Option<SurfaceTarget>,
}

/// Records display surface transitions reported by the host.
///
/// Knows nothing about focus or capture; the session controller decides what
/// each transition means for the camera device.
#[derive(Debug, Default)]
pub struct SurfaceTracker {
    state: SurfaceState,
    dimensions: Dimensions,
}

impl SurfaceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready(&mut self, target: SurfaceTarget) {
        info!("Surface ready: {}", target);
        self.state.target = Some(target);
        self.state.exists = true;
    }

    /// Record the size the surface reported. Dimensions survive device release.
    pub fn resized(&mut self, width: u32, height: u32) -> Dimensions {
        self.dimensions = Dimensions::new(width, height);
        debug!("Surface resized to {}", self.dimensions);
        self.dimensions
    }

    pub fn gone(&mut self) {
        info!("Surface destroyed");
        self.state.exists = false;
        self.state.target = None;
    }

    pub fn exists(&self) -> bool {
        self.state.exists
    }

    pub fn target(&self) -> Option<&SurfaceTarget> {
        self.state.target.as_ref()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}
