//! Handle registry: loaders and the collection/mesh handles derived from them.
//!
//! Every object handed across the C boundary lives in one slot of a dense
//! array. A handle packs the slot index with the slot's generation; releasing
//! a slot bumps its generation, so handles to destroyed loaders or to the
//! meshes of a previous load are rejected instead of dereferenced.

use asset::{LoadOptions, Loader, Mesh, MeshVertex};
use parking_lot::Mutex;

use crate::error::{BindingError, BindingResult};

/// Handle value crossing the C boundary. `0` is the null handle.
pub type RawHandle = u64;

pub const NULL_HANDLE: RawHandle = 0;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Generations start at 1, so a packed handle is never 0.
    #[inline]
    pub fn to_raw(self) -> RawHandle {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    #[inline]
    pub fn from_raw(raw: RawHandle) -> Option<Self> {
        let generation = (raw >> 32) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self {
            index: raw as u32,
            generation,
        })
    }
}

/// A loader plus the handles issued for its current collection.
#[derive(Debug)]
pub struct LoaderEntry {
    pub loader: Loader,
    collection: Option<Handle>,
    /// Mesh handles by mesh index, issued lazily.
    meshes: Vec<Option<Handle>>,
}

impl LoaderEntry {
    fn new(loader: Loader) -> Self {
        Self {
            loader,
            collection: None,
            meshes: Vec::new(),
        }
    }

    fn take_derived(&mut self) -> Vec<Handle> {
        self.collection
            .take()
            .into_iter()
            .chain(self.meshes.drain(..).flatten())
            .collect()
    }
}

#[derive(Debug)]
pub enum Entry {
    Loader(LoaderEntry),
    Collection { loader: Handle },
    Mesh { loader: Handle, index: usize },
}

/// Dense slot storage with per-slot generations and a free list.
#[derive(Debug)]
pub struct Registry {
    entries: Vec<Option<Entry>>,
    generations: Vec<u32>,
    free: Vec<u32>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            generations: Vec::new(),
            free: Vec::new(),
        }
    }

    fn insert(&mut self, entry: Entry) -> Handle {
        if let Some(index) = self.free.pop() {
            let i = index as usize;
            self.entries[i] = Some(entry);
            return Handle {
                index,
                generation: self.generations[i],
            };
        }

        let index = self.entries.len() as u32;
        self.entries.push(Some(entry));
        self.generations.push(1);
        Handle {
            index,
            generation: 1,
        }
    }

    #[inline]
    pub fn is_alive(&self, h: Handle) -> bool {
        let i = h.index as usize;
        i < self.entries.len() && self.generations[i] == h.generation && self.entries[i].is_some()
    }

    fn get(&self, h: Handle) -> BindingResult<&Entry> {
        if !self.is_alive(h) {
            return Err(BindingError::InvalidHandle);
        }
        self.entries[h.index as usize]
            .as_ref()
            .ok_or(BindingError::InvalidHandle)
    }

    fn get_mut(&mut self, h: Handle) -> BindingResult<&mut Entry> {
        if !self.is_alive(h) {
            return Err(BindingError::InvalidHandle);
        }
        self.entries[h.index as usize]
            .as_mut()
            .ok_or(BindingError::InvalidHandle)
    }

    fn remove(&mut self, h: Handle) -> Option<Entry> {
        if !self.is_alive(h) {
            return None;
        }
        let i = h.index as usize;
        let entry = self.entries[i].take();
        // Skip 0 on wrap-around so packed handles stay non-null.
        self.generations[i] = self.generations[i].wrapping_add(1).max(1);
        self.free.push(h.index);
        entry
    }

    fn release_all(&mut self, handles: Vec<Handle>) {
        for h in handles {
            self.remove(h);
        }
    }

    pub fn create_loader(&mut self, options: LoadOptions) -> Handle {
        let h = self.insert(Entry::Loader(LoaderEntry::new(Loader::with_options(options))));
        log::debug!("Created loader {:#x}", h.to_raw());
        h
    }

    /// Release a loader and every collection/mesh handle derived from it.
    pub fn destroy_loader(&mut self, h: Handle) -> BindingResult<()> {
        self.loader_entry(h)?;
        if let Some(Entry::Loader(mut entry)) = self.remove(h) {
            let derived = entry.take_derived();
            log::debug!(
                "Destroyed loader {:#x} ({} derived handle(s) released)",
                h.to_raw(),
                derived.len()
            );
            self.release_all(derived);
        }
        Ok(())
    }

    /// First half of a load: drop the current meshes, releasing the handles
    /// issued for them, and return the options to parse with. The caller
    /// parses without holding the registry, then calls [`Self::finish_load`].
    pub fn begin_load(&mut self, h: Handle) -> BindingResult<LoadOptions> {
        self.unload(h)?;
        Ok(*self.loader(h)?.options())
    }

    /// Second half of a load: install the parsed loader. Fails with
    /// `InvalidHandle` if `h` was destroyed while parsing.
    pub fn finish_load(&mut self, h: Handle, staged: Loader) -> BindingResult<()> {
        let entry = self.loader_entry_mut(h)?;
        entry.loader = staged;
        // A concurrent query may have issued handles against the empty state.
        let derived = entry.take_derived();
        self.release_all(derived);
        Ok(())
    }

    /// Drop the loaded meshes and release the handles issued for them.
    fn unload(&mut self, h: Handle) -> BindingResult<()> {
        let entry = self.loader_entry_mut(h)?;
        entry.loader.clear();
        let derived = entry.take_derived();
        self.release_all(derived);
        Ok(())
    }

    pub fn loader(&self, h: Handle) -> BindingResult<&Loader> {
        self.loader_entry(h).map(|entry| &entry.loader)
    }

    fn loader_entry(&self, h: Handle) -> BindingResult<&LoaderEntry> {
        match self.get(h)? {
            Entry::Loader(entry) => Ok(entry),
            _ => Err(BindingError::WrongKind),
        }
    }

    fn loader_entry_mut(&mut self, h: Handle) -> BindingResult<&mut LoaderEntry> {
        match self.get_mut(h)? {
            Entry::Loader(entry) => Ok(entry),
            _ => Err(BindingError::WrongKind),
        }
    }

    /// Collection handle and mesh count. An empty loader has no collection handle.
    pub fn collection(&mut self, h: Handle) -> BindingResult<(Option<Handle>, usize)> {
        let entry = self.loader_entry(h)?;
        let count = entry.loader.mesh_count();
        if count == 0 {
            return Ok((None, 0));
        }
        if let Some(existing) = entry.collection {
            return Ok((Some(existing), count));
        }

        let collection = self.insert(Entry::Collection { loader: h });
        self.loader_entry_mut(h)?.collection = Some(collection);
        Ok((Some(collection), count))
    }

    pub fn mesh_at(&mut self, collection: Handle, index: usize) -> BindingResult<Handle> {
        let loader = match self.get(collection)? {
            Entry::Collection { loader } => *loader,
            _ => return Err(BindingError::WrongKind),
        };
        let entry = self.loader_entry(loader)?;
        let len = entry.loader.mesh_count();
        if index >= len {
            return Err(BindingError::OutOfRange { index, len });
        }
        if let Some(Some(existing)) = entry.meshes.get(index) {
            return Ok(*existing);
        }

        let mesh = self.insert(Entry::Mesh { loader, index });
        let entry = self.loader_entry_mut(loader)?;
        if entry.meshes.len() < len {
            entry.meshes.resize(len, None);
        }
        entry.meshes[index] = Some(mesh);
        Ok(mesh)
    }

    pub fn mesh(&self, h: Handle) -> BindingResult<&Mesh> {
        let (loader, index) = match self.get(h)? {
            Entry::Mesh { loader, index } => (*loader, *index),
            _ => return Err(BindingError::WrongKind),
        };
        self.loader(loader)?
            .mesh(index)
            .ok_or(BindingError::InvalidHandle)
    }

    pub fn vertex(&self, h: Handle, index: usize) -> BindingResult<&MeshVertex> {
        let vertices = &self.mesh(h)?.vertices;
        vertices.get(index).ok_or(BindingError::OutOfRange {
            index,
            len: vertices.len(),
        })
    }
}

static REGISTRY: Mutex<Registry> = parking_lot::const_mutex(Registry::new());

/// Run `f` with exclusive access to the process-wide registry.
pub fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    f(&mut REGISTRY.lock())
}
