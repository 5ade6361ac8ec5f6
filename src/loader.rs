//! Turning plugin binaries into registry entries.

use crate::{
    capacity_error,
    host::PluginFactory,
    memory::{HeapHandle, PluginData},
    plugin::{PluginContainer, TrampolineId},
    registry::Registry,
};
use alloc::{format, vec::Vec};

/// Loads `binaries` into `registry`, returning how many plugins were added.
///
/// Metadata is read for every binary first; a binary without readable
/// metadata is dropped. Then plugin information is built for each remaining
/// binary, in the same order, with strictly increasing trampoline ids starting
/// at [`Registry::next_trampoline_id`] (0 for an empty registry). A plugin
/// whose information cannot be built still consumes its id and is kept as an
/// inert entry.
///
/// Once the registry is full the remaining binaries are dropped before any
/// memory is allocated for them; entries already in the registry are never
/// touched.
pub fn load<F>(
    registry: &mut Registry,
    factory: &mut F,
    binaries: impl IntoIterator<Item = PluginData>,
    heap: HeapHandle,
) -> usize
where
    F: PluginFactory + ?Sized,
{
    let mut candidates = Vec::new();
    for data in binaries {
        #[cfg(feature = "log")]
        log::debug!("load meta information");
        match factory.load_meta_information(&data) {
            Ok(meta) => candidates.push(PluginContainer::new(meta, data)),
            Err(_err) => {
                #[cfg(feature = "log")]
                log::error!("failed to get meta information: {}", _err);
            }
        }
    }

    let mut next_id = registry.next_trampoline_id().get();
    let mut loaded = 0;
    for mut container in candidates {
        if registry.is_full() {
            let _err = capacity_error(format!(
                "no room for plugin [{}], {} plugins already loaded",
                container.meta().name(),
                registry.len()
            ));
            #[cfg(feature = "log")]
            log::error!("dropping plugin: {}", _err);
            continue;
        }

        let id = TrampolineId::new(next_id);
        next_id += 1;
        container.assign_trampoline_id(id);
        match factory.load_plugin_info(container.data(), heap, registry.trampolines_mut(), id) {
            Ok(info) => {
                for entry in info.relocations() {
                    if let Err(_err) = registry.modules_mut().record(entry.import().module()) {
                        #[cfg(feature = "log")]
                        log::warn!(
                            "cannot record import module [{}]: {}",
                            entry.import().module(),
                            _err
                        );
                    }
                }
                container.set_info(info);
            }
            Err(_err) => {
                #[cfg(feature = "log")]
                log::error!(
                    "failed to load plugin [{}]: {}",
                    container.meta().name(),
                    _err
                );
            }
        }

        if registry.insert(container).is_ok() {
            loaded += 1;
        }
    }
    loaded
}
