use crate::backend::{Filter, RenderBackend, TargetDesc};
use knotlab_common::{Extent, TargetHandle};
use std::collections::BTreeMap;

/// Issues target handles and keeps the backend's offscreen storage in sync.
///
/// Every live target shares the canvas extent. Resizing recreates storage behind
/// the existing handles, so materials holding a handle never dangle.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    live: BTreeMap<TargetHandle, TargetDesc>,
    next: u32,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        extent: Extent,
        filter: Filter,
    ) -> Result<TargetHandle, B::Error> {
        let handle = TargetHandle(self.next);
        let desc = TargetDesc { extent, filter };
        backend.create_target(handle, &desc)?;
        self.next += 1;
        self.live.insert(handle, desc);
        tracing::debug!("allocated {handle} at {extent}");
        Ok(handle)
    }

    /// Recreate every live target at `extent`.
    pub fn resize_all<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        extent: Extent,
    ) -> Result<(), B::Error> {
        for (handle, desc) in self.live.iter_mut() {
            if desc.extent == extent {
                continue;
            }
            let resized = TargetDesc {
                extent,
                filter: desc.filter,
            };
            backend.create_target(*handle, &resized)?;
            *desc = resized;
        }
        Ok(())
    }

    pub fn release<B: RenderBackend>(&mut self, backend: &mut B, handle: TargetHandle) {
        if self.live.remove(&handle).is_some() {
            backend.destroy_target(handle);
        }
    }

    pub fn release_all<B: RenderBackend>(&mut self, backend: &mut B) {
        for handle in std::mem::take(&mut self.live).into_keys() {
            backend.destroy_target(handle);
        }
    }

    pub fn get(&self, handle: TargetHandle) -> Option<&TargetDesc> {
        self.live.get(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetHandle, &TargetDesc)> {
        self.live.iter().map(|(h, d)| (*h, d))
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
