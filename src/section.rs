//! Zero-filling of uninitialised data.

use crate::{plugin::PluginState, registry::Registry};

/// Name of the small uninitialised data section.
pub const SBSS_SECTION: &str = ".sbss";
/// Name of the uninitialised data section.
pub const BSS_SECTION: &str = ".bss";

/// Clears `.sbss` and `.bss` of every plugin that has linking information.
///
/// Must run after the plugin memory is allocated and relocated and before any
/// hook or patched function can read plugin globals. It does not depend on
/// relocation having succeeded.
pub fn zero_uninitialized_data(registry: &mut Registry) {
    for plugin in registry.plugins_mut() {
        let Some(info) = plugin.info() else {
            continue;
        };
        for name in [SBSS_SECTION, BSS_SECTION] {
            if let Some(section) = info.section(name) {
                #[cfg(feature = "log")]
                log::debug!(
                    "[{}] memset {} 0x{:08x} ({})",
                    plugin.meta().name(),
                    name,
                    section.address(),
                    section.size()
                );
                section.region().zero();
            }
        }
        plugin.mark(PluginState::BSS_CLEARED);
    }
}
