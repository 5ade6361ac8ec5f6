#![allow(dead_code)]

use plugin_backend::{
    Result, custom_error, load_info_error, parse_metadata_error, relocate_error,
    hooks::{HookContext, HookEntry, HookStage},
    host::{
        CacheControl, FunctionPatcher, HeapAllocator, LoadNotification, ModuleEvent, ModuleHandle,
        ModuleResolver, PluginFactory, RelocationApplier, RelocationCategory, RelocationRequest,
    },
    memory::{Data, HeapHandle, Image, MemoryRegion, MemoryType, PluginData, RegionKind, Section, Text},
    patch::FunctionPatch,
    plugin::{
        ImportInfo, MetaInformation, PluginInfo, RelocationEntry, RelocationKind, SectionInfo,
        TrampolineId,
    },
    registry::TrampolinePool,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Ordered record of everything the host and the plugins observed.
pub type Log = Rc<RefCell<Vec<String>>>;

pub const BINARY_HEAP: HeapHandle = HeapHandle::new(0x5000);
pub const PLUGIN_HEAP: HeapHandle = HeapHandle::new(0x6000);
pub const FILL: u8 = 0xAA;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Entries of `log` starting with `prefix`, prefix stripped.
pub fn events(log: &Log, prefix: &str) -> Vec<String> {
    log.borrow()
        .iter()
        .filter_map(|event| event.strip_prefix(prefix).map(String::from))
        .collect()
}

pub fn position(log: &Log, event: &str) -> usize {
    log.borrow()
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("event [{event}] not in log {:?}", log.borrow()))
}

/// Leaks `bytes` and wraps them as a region of kind `K`.
pub fn leak<K: RegionKind>(bytes: Vec<u8>) -> MemoryRegion<K> {
    let bytes = bytes.leak();
    unsafe { MemoryRegion::from_raw_parts(bytes.as_mut_ptr() as usize, bytes.len()) }
}

pub fn import(symbol: &str, module: &str) -> RelocationEntry {
    RelocationEntry::new(
        symbol,
        RelocationKind::new(1),
        0,
        0,
        0,
        ImportInfo::new(module, false),
    )
}

pub fn data_import(symbol: &str, module: &str) -> RelocationEntry {
    RelocationEntry::new(
        symbol,
        RelocationKind::new(1),
        0,
        0,
        0,
        ImportInfo::new(module, true),
    )
}

pub struct MockHost {
    log: Log,
    modules: HashMap<String, ModuleHandle>,
    exports: HashMap<(ModuleHandle, bool, String), usize>,
    rejected: HashSet<String>,
    far: HashSet<String>,
    resident: HashSet<String>,
    notifications: Vec<LoadNotification>,
    refuse_notifications: bool,
}

impl MockHost {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            modules: HashMap::new(),
            exports: HashMap::new(),
            rejected: HashSet::new(),
            far: HashSet::new(),
            resident: HashSet::new(),
            notifications: Vec::new(),
            refuse_notifications: false,
        }
    }

    /// A resident module exporting `exports` as functions.
    pub fn with_module(mut self, name: &str, exports: &[(&str, usize)]) -> Self {
        let handle = self.handle(name);
        for (symbol, addr) in exports {
            self.exports.insert((handle, false, symbol.to_string()), *addr);
        }
        self
    }

    pub fn with_data_export(mut self, module: &str, symbol: &str, addr: usize) -> Self {
        let handle = self.handle(module);
        self.exports.insert((handle, true, symbol.to_string()), addr);
        self
    }

    /// Applying a relocation against `symbol` fails.
    pub fn rejecting(mut self, symbol: &str) -> Self {
        self.rejected.insert(symbol.to_string());
        self
    }

    /// `symbol` is out of direct branch range and needs a trampoline.
    pub fn far(mut self, symbol: &str) -> Self {
        self.far.insert(symbol.to_string());
        self
    }

    pub fn refusing_notifications(mut self) -> Self {
        self.refuse_notifications = true;
        self
    }

    fn handle(&mut self, name: &str) -> ModuleHandle {
        self.resident.insert(name.to_string());
        let next = self.modules.len() + 1;
        *self
            .modules
            .entry(name.to_string())
            .or_insert(ModuleHandle::new(next))
    }

    /// Simulates the host's dynamic loader bringing in `name`.
    pub fn load_module(&mut self, name: &str) {
        let handle = self.handle(name);
        for notify in self.notifications.iter_mut() {
            notify(ModuleEvent::Loaded(handle));
        }
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }

    fn push(&self, event: String) {
        self.log.borrow_mut().push(event);
    }
}

impl ModuleResolver for MockHost {
    fn acquire(&mut self, name: &str) -> Option<ModuleHandle> {
        self.push(format!("acquire:{name}"));
        self.modules.get(name).copied()
    }

    fn find_export(&mut self, module: ModuleHandle, is_data: bool, name: &str) -> Option<usize> {
        self.exports
            .get(&(module, is_data, name.to_string()))
            .copied()
    }

    fn add_load_notification(&mut self, callback: LoadNotification) -> Result<()> {
        if self.refuse_notifications {
            return Err(custom_error("dynamic loader refused the callback"));
        }
        self.notifications.push(callback);
        Ok(())
    }
}

impl RelocationApplier for MockHost {
    fn apply(
        &mut self,
        request: &RelocationRequest<'_>,
        trampolines: &mut TrampolinePool,
        category: RelocationCategory,
        owner: TrampolineId,
    ) -> Result<()> {
        assert_eq!(category, RelocationCategory::Import);
        if self.rejected.contains(request.symbol()) {
            return Err(relocate_error("target out of range"));
        }
        if self.far.contains(request.symbol()) {
            let slot = trampolines
                .claim(owner)
                .ok_or_else(|| relocate_error("no free trampoline"))?;
            slot.code_mut()[0] = request.symbol_address() as u32;
        }
        self.push(format!(
            "apply:{}=0x{:x}",
            request.symbol(),
            request.symbol_address()
        ));
        Ok(())
    }
}

impl FunctionPatcher for MockHost {
    fn install(&mut self, patches: &mut [FunctionPatch]) {
        for patch in patches.iter_mut() {
            if patch.is_patched() || !self.resident.contains(patch.library()) {
                continue;
            }
            patch.mark_patched(patch.replacement() + 1);
            self.push(format!("install:{}", patch.function()));
        }
    }

    fn restore(&mut self, patches: &mut [FunctionPatch]) {
        for patch in patches.iter_mut() {
            if patch.take_original().is_some() {
                self.push(format!("restore:{}", patch.function()));
            }
        }
    }
}

impl HeapAllocator for MockHost {
    fn free_mem2(&mut self, region: MemoryRegion<Image>) {
        self.push(format!("free_mem2:0x{:x}", region.base()));
    }

    fn free_to_exp_heap<K: RegionKind>(&mut self, heap: HeapHandle, region: MemoryRegion<K>) {
        self.push(format!(
            "free_exp:{}:0x{:x}:0x{:x}",
            K::NAME,
            heap.raw(),
            region.base()
        ));
    }
}

impl CacheControl for MockHost {
    fn flush_data(&mut self, address: usize, len: usize) {
        self.push(format!("flush:0x{address:x}+{len}"));
    }

    fn invalidate_instruction(&mut self, address: usize, len: usize) {
        self.push(format!("invalidate:0x{address:x}+{len}"));
    }
}

/// Description of a plugin binary understood by [`MockFactory`].
#[derive(Clone)]
pub struct FakePlugin {
    pub name: &'static str,
    pub memory_type: MemoryType,
    pub keep_buffer: bool,
    fail_meta: bool,
    fail_info: bool,
    claim_on_load: bool,
    relocations: Vec<RelocationEntry>,
    patches: Vec<(&'static str, &'static str)>,
    hooks: Vec<HookStage>,
    sections: Vec<(&'static str, usize)>,
}

impl FakePlugin {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            memory_type: MemoryType::Mem2,
            keep_buffer: true,
            fail_meta: false,
            fail_info: false,
            claim_on_load: false,
            relocations: Vec::new(),
            patches: Vec::new(),
            hooks: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn relocation(mut self, entry: RelocationEntry) -> Self {
        self.relocations.push(entry);
        self
    }

    pub fn patch(mut self, library: &'static str, function: &'static str) -> Self {
        self.patches.push((library, function));
        self
    }

    pub fn hook(mut self, stage: HookStage) -> Self {
        self.hooks.push(stage);
        self
    }

    pub fn all_hooks(mut self) -> Self {
        self.hooks.extend(HookStage::ALL);
        self
    }

    /// A section filled with [`FILL`].
    pub fn section(mut self, name: &'static str, len: usize) -> Self {
        self.sections.push((name, len));
        self
    }

    pub fn memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = memory_type;
        self
    }

    pub fn without_buffer(mut self) -> Self {
        self.keep_buffer = false;
        self
    }

    pub fn failing_meta(mut self) -> Self {
        self.fail_meta = true;
        self
    }

    pub fn failing_info(mut self) -> Self {
        self.fail_info = true;
        self
    }

    /// Claims a trampoline slot while the plugin information is built.
    pub fn claiming_on_load(mut self) -> Self {
        self.claim_on_load = true;
        self
    }

    pub fn binary(&self) -> PluginData {
        if self.keep_buffer {
            PluginData::new(
                leak::<Image>(self.name.as_bytes().to_vec()),
                self.memory_type,
                BINARY_HEAP,
            )
        } else {
            PluginData::without_buffer(self.memory_type, BINARY_HEAP)
        }
    }
}

/// Builds plugins from [`FakePlugin`]s. A binary is identified by its name.
pub struct MockFactory {
    log: Log,
    plugins: Vec<FakePlugin>,
    /// Plugin names and ids in the order their information was requested.
    pub info_requests: Vec<(String, TrampolineId)>,
}

impl MockFactory {
    pub fn new(log: &Log, plugins: &[FakePlugin]) -> Self {
        Self {
            log: log.clone(),
            plugins: plugins.to_vec(),
            info_requests: Vec::new(),
        }
    }

    pub fn binaries(&self) -> Vec<PluginData> {
        self.plugins.iter().map(FakePlugin::binary).collect()
    }

    fn plugin_for(&self, name: &str) -> Option<&FakePlugin> {
        self.plugins.iter().find(|plugin| plugin.name == name)
    }

    fn name_of(data: &PluginData) -> String {
        String::from_utf8_lossy(data.bytes()).into_owned()
    }
}

impl PluginFactory for MockFactory {
    fn load_meta_information(&mut self, data: &PluginData) -> Result<MetaInformation> {
        let name = Self::name_of(data);
        let plugin = self
            .plugin_for(&name)
            .ok_or_else(|| parse_metadata_error("unknown binary"))?;
        if plugin.fail_meta {
            return Err(parse_metadata_error(format!("[{name}] has no meta section")));
        }
        Ok(MetaInformation::new(&name)
            .with_author("tests")
            .with_version("1.0")
            .with_size(data.buffer_len()))
    }

    fn load_plugin_info(
        &mut self,
        data: &PluginData,
        heap: HeapHandle,
        trampolines: &mut TrampolinePool,
        trampoline_id: TrampolineId,
    ) -> Result<PluginInfo> {
        assert_eq!(heap, PLUGIN_HEAP);
        let name = Self::name_of(data);
        self.info_requests.push((name.clone(), trampoline_id));
        let plugin = self
            .plugin_for(&name)
            .cloned()
            .ok_or_else(|| load_info_error("unknown binary"))?;
        if plugin.claim_on_load {
            trampolines
                .claim(trampoline_id)
                .ok_or_else(|| load_info_error("no free trampoline"))?;
        }
        if plugin.fail_info {
            return Err(load_info_error(format!("[{name}] is not a valid plugin")));
        }

        let mut info = PluginInfo::new(trampoline_id)
            .with_text(leak::<Text>(vec![0; 64]))
            .with_data(leak::<Data>(vec![0; 64]));
        for entry in plugin.relocations {
            info.add_relocation(entry)?;
        }
        for (section, len) in plugin.sections {
            info.add_section(SectionInfo::new(section, leak::<Section>(vec![FILL; len])))?;
        }
        for (index, (library, function)) in plugin.patches.into_iter().enumerate() {
            info.add_function(FunctionPatch::new(library, function, 0x1000 + index * 0x10, 0))?;
        }
        for stage in plugin.hooks {
            let log = self.log.clone();
            info.add_hook(HookEntry::new(
                stage,
                move |stage: HookStage, ctx: &HookContext<'_>| {
                    log.borrow_mut()
                        .push(format!("hook:{}:{}", stage, ctx.meta().name()));
                },
            ))?;
        }
        Ok(info)
    }
}
