//! Resolving plugin imports and writing them into plugin memory.

mod resolve;

use crate::{
    Result,
    config::AllocatorRedirects,
    host::{CacheControl, ModuleResolver, RelocationApplier, RelocationCategory, RelocationRequest},
    plugin::{PluginState, RelocationEntry, TrampolineId},
    registry::{Registry, TrampolinePool},
    relocate_error, symbol_error,
};
use alloc::format;
use resolve::SymbolResolver;

/// Relocates one plugin.
///
/// Entries are applied in order. The first entry whose symbol cannot be
/// resolved, or that the primitive rejects, stops the list and its error is
/// returned; entries applied before it stay applied. Either way the whole
/// trampoline pool is flushed from the data cache and invalidated in the
/// instruction cache before returning, since the primitive may have written
/// new stubs into it.
pub fn relocate_one<H>(
    host: &mut H,
    redirects: &AllocatorRedirects,
    entries: &[RelocationEntry],
    trampolines: &mut TrampolinePool,
    owner: TrampolineId,
) -> Result<()>
where
    H: ModuleResolver + RelocationApplier + CacheControl + ?Sized,
{
    let mut resolver = SymbolResolver::new(redirects);
    let result = entries.iter().try_for_each(|entry| {
        let addr = resolver.resolve(host, entry).ok_or_else(|| {
            symbol_error(format!(
                "failed to find export [{}] in [{}]",
                entry.name(),
                entry.import().module()
            ))
        })?;
        host.apply(
            &RelocationRequest::new(entry, addr),
            trampolines,
            RelocationCategory::Import,
            owner,
        )
        .map_err(|err| relocate_error(format!("[{}]: {}", entry.name(), err.msg())))
    });

    host.flush_data(trampolines.address(), trampolines.byte_len());
    host.invalidate_instruction(trampolines.address(), trampolines.byte_len());
    result
}

/// Relocates every plugin that has linking information, in registry order.
///
/// A failing plugin is logged and skipped; it keeps whatever entries were
/// applied before the failure and may hold trampoline slots. It is not marked
/// [`PluginState::RELOCATED`].
pub fn relocate_all<H>(host: &mut H, redirects: &AllocatorRedirects, registry: &mut Registry)
where
    H: ModuleResolver + RelocationApplier + CacheControl + ?Sized,
{
    let (plugins, trampolines) = registry.split_mut();
    for plugin in plugins.iter_mut() {
        let Some(info) = plugin.info() else {
            #[cfg(feature = "log")]
            log::warn!("skipping relocation of inert plugin [{}]", plugin.meta().name());
            continue;
        };
        #[cfg(feature = "log")]
        log::debug!("doing relocations for plugin [{}]", plugin.meta().name());
        match relocate_one(
            host,
            redirects,
            info.relocations(),
            trampolines,
            info.trampoline_id(),
        ) {
            Ok(()) => plugin.mark(PluginState::RELOCATED),
            Err(_err) => {
                #[cfg(feature = "log")]
                log::error!(
                    "relocation of plugin [{}] failed: {}",
                    plugin.meta().name(),
                    _err
                );
            }
        }
    }
}
