use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::compile::{
    compile_program, synthesize_fragment, AttributeLocation, AttributeTable, ShaderError,
    UniformLayout, UniformLocation,
};
use crate::context::GraphicsContext;
use crate::geometry::{GeometryManager, GeometryVariant};
use crate::projection::{ProjectionManager, ProjectionVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey {
    pub geometry: GeometryVariant,
    pub projection: ProjectionVariant,
}

impl ProgramKey {
    pub fn new(geometry: GeometryVariant, projection: ProjectionVariant) -> Self {
        Self {
            geometry,
            projection,
        }
    }
}

impl Default for ProgramKey {
    fn default() -> Self {
        Self::new(GeometryVariant::DEFAULT, ProjectionVariant::DEFAULT)
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.geometry, self.projection)
    }
}

#[derive(Debug)]
pub struct ProgramEntry<P> {
    pub key: ProgramKey,
    pub program: P,
    pub uniforms: UniformLayout,
    pub attributes: AttributeTable,
    pub fragment_source: String,
}

/// Shared reference to a cached program. Clones point at the same entry.
#[derive(Debug)]
pub struct ProgramHandle<P>(Arc<ProgramEntry<P>>);

impl<P> ProgramHandle<P> {
    pub fn key(&self) -> ProgramKey {
        self.0.key
    }

    pub fn program(&self) -> &P {
        &self.0.program
    }

    pub fn uniforms(&self) -> &UniformLayout {
        &self.0.uniforms
    }

    pub fn attributes(&self) -> &AttributeTable {
        &self.0.attributes
    }

    pub fn fragment_source(&self) -> &str {
        &self.0.fragment_source
    }

    pub fn same_entry(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<P> Clone for ProgramHandle<P> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
}

/// Builds, links and caches one program per (geometry, projection) pair.
///
/// Entries are created on first request and live for the whole session.
/// A failed build leaves both the cache and the active program untouched.
pub struct ShaderManager<P> {
    geometry: GeometryManager,
    projection: ProjectionManager,
    cache: HashMap<ProgramKey, ProgramHandle<P>>,
    active: Option<ProgramHandle<P>>,
    stats: CacheStats,
}

impl<P> ShaderManager<P> {
    pub fn new() -> Self {
        Self {
            geometry: GeometryManager::new(),
            projection: ProjectionManager::new(),
            cache: HashMap::new(),
            active: None,
            stats: CacheStats::default(),
        }
    }

    /// Synthesizes the fragment source for a pair without compiling it.
    pub fn fragment_source(&self, key: ProgramKey) -> String {
        synthesize_fragment(
            self.geometry.code(key.geometry),
            self.projection.code(key.projection),
        )
    }

    pub fn create_program<C>(
        &mut self,
        context: &mut C,
        geometry: GeometryVariant,
        projection: ProjectionVariant,
    ) -> Result<ProgramHandle<P>, ShaderError>
    where
        C: GraphicsContext<Program = P>,
    {
        let key = ProgramKey::new(geometry, projection);
        if let Some(handle) = self.cache.get(&key) {
            self.stats.hits += 1;
            debug!(program = %key, "program cache hit");
            return Ok(handle.clone());
        }
        self.stats.misses += 1;

        let label = key.to_string();
        let built = compile_program(&label, self.fragment_source(key)).and_then(|shader| {
            let program = context.link_program(&shader)?;
            Ok(ProgramEntry {
                key,
                program,
                uniforms: shader.uniforms,
                attributes: shader.attributes,
                fragment_source: shader.fragment_source,
            })
        });

        match built {
            Ok(entry) => {
                let handle = ProgramHandle(Arc::new(entry));
                debug!(
                    program = %key,
                    uniforms = handle.uniforms().len(),
                    "compiled program"
                );
                self.cache.insert(key, handle.clone());
                Ok(handle)
            }
            Err(err) => {
                self.stats.failures += 1;
                warn!(program = %key, error = %err, "program build failed");
                Err(err)
            }
        }
    }

    pub fn use_program(&mut self, handle: &ProgramHandle<P>) {
        self.active = Some(handle.clone());
    }

    pub fn active(&self) -> Option<&ProgramHandle<P>> {
        self.active.as_ref()
    }

    /// Location of `name` in the active program; `None` when absent.
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.active.as_ref()?.uniforms().location(name)
    }

    pub fn attribute_location(&self, name: &str) -> Option<AttributeLocation> {
        self.active.as_ref()?.attributes().location(name)
    }

    pub fn cached(&self, key: ProgramKey) -> Option<&ProgramHandle<P>> {
        self.cache.get(&key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl<P> Default for ShaderManager<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{UniformKind, POSITION_ATTRIBUTE};
    use crate::headless::{HeadlessContext, HeadlessProgram};
    use crate::types::SurfaceSize;

    fn context() -> HeadlessContext {
        HeadlessContext::new(SurfaceSize::new(320, 200))
    }

    #[test]
    fn every_pair_compiles_and_is_cached() {
        let mut ctx = context();
        let mut manager = ShaderManager::<HeadlessProgram>::new();
        for geometry in GeometryVariant::ALL {
            for projection in ProjectionVariant::ALL {
                let first = manager
                    .create_program(&mut ctx, geometry, projection)
                    .unwrap_or_else(|err| panic!("{geometry}/{projection}: {err}"));
                let second = manager
                    .create_program(&mut ctx, geometry, projection)
                    .unwrap();
                assert!(first.same_entry(&second));
                assert_eq!(first.key(), ProgramKey::new(geometry, projection));
            }
        }
        assert_eq!(manager.len(), 9);
        assert_eq!(
            manager.stats(),
            CacheStats {
                hits: 9,
                misses: 9,
                failures: 0
            }
        );
        assert_eq!(ctx.log().links, 9);
    }

    #[test]
    fn switching_programs_keeps_earlier_entries() {
        let mut ctx = context();
        let mut manager = ShaderManager::<HeadlessProgram>::new();
        let first = manager
            .create_program(&mut ctx, GeometryVariant::Hypercube, ProjectionVariant::Perspective)
            .unwrap();
        manager.use_program(&first);
        for geometry in GeometryVariant::ALL {
            for projection in ProjectionVariant::ALL {
                let handle = manager
                    .create_program(&mut ctx, geometry, projection)
                    .unwrap();
                manager.use_program(&handle);
            }
        }
        let cached = manager
            .cached(ProgramKey::new(
                GeometryVariant::Hypercube,
                ProjectionVariant::Perspective,
            ))
            .unwrap();
        assert!(cached.same_entry(&first));
        assert_eq!(manager.len(), 9);
        assert_eq!(ctx.log().links, 9);
    }

    #[test]
    fn link_failure_keeps_active_program() {
        let mut ctx = context();
        let mut manager = ShaderManager::<HeadlessProgram>::new();
        let default = manager
            .create_program(&mut ctx, GeometryVariant::Hypercube, ProjectionVariant::Perspective)
            .unwrap();
        manager.use_program(&default);

        ctx.fail_links(true);
        let err = manager
            .create_program(&mut ctx, GeometryVariant::Hypersphere, ProjectionVariant::Perspective)
            .unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
        assert!(manager.active().unwrap().same_entry(&default));
        assert!(manager
            .cached(ProgramKey::new(
                GeometryVariant::Hypersphere,
                ProjectionVariant::Perspective
            ))
            .is_none());
        assert_eq!(manager.stats().failures, 1);

        ctx.fail_links(false);
        assert!(manager
            .create_program(&mut ctx, GeometryVariant::Hypersphere, ProjectionVariant::Perspective)
            .is_ok());
    }

    #[test]
    fn locations_come_from_active_program() {
        let mut ctx = context();
        let mut manager = ShaderManager::<HeadlessProgram>::new();
        assert!(manager.uniform_location("u_time").is_none());

        let handle = manager
            .create_program(&mut ctx, GeometryVariant::Hypertetrahedron, ProjectionVariant::Stereographic)
            .unwrap();
        manager.use_program(&handle);
        assert_eq!(
            manager.uniform_location("u_time").map(|loc| loc.kind),
            Some(UniformKind::Float)
        );
        assert!(manager.uniform_location("iMouse").is_none());
        assert!(manager.attribute_location(POSITION_ATTRIBUTE).is_some());
        assert!(manager.attribute_location("a_texcoord").is_none());
    }
}
