use crate::{
    config::AllocatorRedirects,
    host::{ModuleHandle, ModuleResolver},
    plugin::RelocationEntry,
};
use alloc::string::String;
use core::hash::{Hash, Hasher};
use foldhash::{SharedSeed, fast::FoldHasher};
use hashbrown::HashTable;

const HASHER: FoldHasher<'static> = FoldHasher::with_seed(0, SharedSeed::global_fixed());

struct CacheEntry {
    name: String,
    handle: Option<ModuleHandle>,
}

/// Module handles acquired while relocating one plugin.
///
/// Failed acquisitions are cached as well, so a missing module is only asked
/// for once per plugin.
pub(crate) struct ModuleCache {
    map: HashTable<CacheEntry>,
}

impl ModuleCache {
    pub(crate) fn new() -> Self {
        Self {
            map: HashTable::new(),
        }
    }

    fn hash(name: &[u8]) -> u64 {
        let mut hasher = HASHER.clone();
        name.hash(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn acquire<M>(&mut self, modules: &mut M, name: &str) -> Option<ModuleHandle>
    where
        M: ModuleResolver + ?Sized,
    {
        let hash = Self::hash(name.as_bytes());
        if let Some(entry) = self.map.find(hash, |entry| entry.name == name) {
            return entry.handle;
        }
        let handle = modules.acquire(name);
        self.map.insert_unique(
            hash,
            CacheEntry {
                name: String::from(name),
                handle,
            },
            |entry| Self::hash(entry.name.as_bytes()),
        );
        handle
    }
}

/// Resolves the imports of one plugin.
pub(crate) struct SymbolResolver<'a> {
    redirects: &'a AllocatorRedirects,
    cache: ModuleCache,
}

impl<'a> SymbolResolver<'a> {
    pub(crate) fn new(redirects: &'a AllocatorRedirects) -> Self {
        Self {
            redirects,
            cache: ModuleCache::new(),
        }
    }

    /// Address of the symbol `entry` imports.
    ///
    /// Redirected allocator symbols are looked up in the redirect module first.
    /// If that lookup fails the entry's own import is tried.
    pub(crate) fn resolve<M>(&mut self, modules: &mut M, entry: &RelocationEntry) -> Option<usize>
    where
        M: ModuleResolver + ?Sized,
    {
        if let Some(export) = self.redirects.lookup(entry.name()) {
            let module = self.redirects.module();
            let addr = self
                .cache
                .acquire(modules, module)
                .and_then(|handle| modules.find_export(handle, true, export));
            if let Some(addr) = addr.filter(|addr| *addr != 0) {
                #[cfg(feature = "log")]
                log::trace!(
                    "binding [{}] to redirected export [{}] of [{}]: 0x{:x}",
                    entry.name(),
                    export,
                    module,
                    addr
                );
                return Some(addr);
            }
        }

        let import = entry.import();
        let addr = self
            .cache
            .acquire(modules, import.module())
            .and_then(|handle| modules.find_export(handle, import.is_data(), entry.name()))
            .filter(|addr| *addr != 0)?;
        #[cfg(feature = "log")]
        log::trace!(
            "binding [{}] to [{}]: 0x{:x}",
            entry.name(),
            import.module(),
            addr
        );
        Some(addr)
    }
}
