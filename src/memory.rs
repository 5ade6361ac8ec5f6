//! Typed handles for memory owned by plugins.
//!
//! Addresses handed out by the host allocators are wrapped in [`MemoryRegion`],
//! tagged with the kind of memory they describe. A text region cannot be passed
//! where a plugin image is expected, and the raw address never leaves the
//! handle except through explicit accessors.

use core::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
}

/// Marker trait for the kinds of plugin memory.
pub trait RegionKind: sealed::Sealed {
    /// Human readable name used in log messages.
    const NAME: &'static str;
}

macro_rules! region_kind {
    ($(#[$doc:meta])* $name:ident, $display:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {}

        impl sealed::Sealed for $name {}

        impl RegionKind for $name {
            const NAME: &'static str = $display;
        }
    };
}

region_kind!(
    /// The raw plugin binary as it was read from storage.
    Image,
    "image"
);
region_kind!(
    /// Executable memory allocated for a plugin.
    Text,
    "text"
);
region_kind!(
    /// Data memory allocated for a plugin.
    Data,
    "data"
);
region_kind!(
    /// A single section inside a plugin's loaded memory.
    Section,
    "section"
);

/// A contiguous range of host memory of kind `K`.
#[derive(Debug, PartialEq, Eq)]
pub struct MemoryRegion<K: RegionKind> {
    base: usize,
    len: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K: RegionKind> Clone for MemoryRegion<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: RegionKind> Copy for MemoryRegion<K> {}

impl<K: RegionKind> MemoryRegion<K> {
    /// Wraps `len` bytes starting at `base`.
    ///
    /// # Safety
    /// `base..base + len` must be valid, writable memory for as long as the
    /// region (or any copy of it) is used by the backend.
    #[inline]
    pub const unsafe fn from_raw_parts(base: usize, len: usize) -> Self {
        Self {
            base,
            len,
            _kind: PhantomData,
        }
    }

    #[inline]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First address past the region.
    #[inline]
    pub const fn end(&self) -> usize {
        self.base + self.len
    }

    #[inline]
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.end()
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.base as *mut u8
    }

    /// Views the region as bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: validity of the range is the contract of `from_raw_parts`.
        unsafe { core::slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    /// Overwrites the whole region with zeroes.
    pub(crate) fn zero(&self) {
        if self.len == 0 {
            return;
        }
        // SAFETY: validity of the range is the contract of `from_raw_parts`.
        unsafe { core::ptr::write_bytes(self.as_ptr(), 0, self.len) };
    }
}

/// Opaque handle of a host heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HeapHandle(usize);

impl HeapHandle {
    #[inline]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(&self) -> usize {
        self.0
    }
}

/// How a plugin binary buffer was allocated, which decides how it is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryType {
    /// Allocated from the bulk MEM2 region with the default allocator.
    Mem2,
    /// Allocated from an expanding heap, see [`PluginData::heap`].
    ExpHeap,
    /// A tag no deallocator is known for.
    Unknown(i32),
}

impl MemoryType {
    /// Decodes the raw tag stored alongside a plugin buffer.
    pub const fn from_raw(tag: i32) -> Self {
        match tag {
            0 => MemoryType::Mem2,
            1 => MemoryType::ExpHeap,
            other => MemoryType::Unknown(other),
        }
    }

    pub const fn raw(&self) -> i32 {
        match self {
            MemoryType::Mem2 => 0,
            MemoryType::ExpHeap => 1,
            MemoryType::Unknown(tag) => *tag,
        }
    }
}

/// The raw binary of a plugin together with its allocation strategy.
#[derive(Debug, Clone)]
pub struct PluginData {
    buffer: Option<MemoryRegion<Image>>,
    buffer_len: usize,
    memory_type: MemoryType,
    heap: HeapHandle,
}

impl PluginData {
    /// Describes a plugin binary held in `buffer`.
    pub fn new(buffer: MemoryRegion<Image>, memory_type: MemoryType, heap: HeapHandle) -> Self {
        Self {
            buffer_len: buffer.len(),
            buffer: Some(buffer),
            memory_type,
            heap,
        }
    }

    /// A plugin whose binary was not kept in memory.
    pub fn without_buffer(memory_type: MemoryType, heap: HeapHandle) -> Self {
        Self {
            buffer: None,
            buffer_len: 0,
            memory_type,
            heap,
        }
    }

    #[inline]
    pub fn buffer(&self) -> Option<MemoryRegion<Image>> {
        self.buffer
    }

    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// The binary contents, empty when no buffer is kept.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.buffer.as_ref().map_or(&[], |buffer| buffer.as_bytes())
    }

    #[inline]
    pub fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    #[inline]
    pub fn heap(&self) -> HeapHandle {
        self.heap
    }

    /// Hands the buffer out for freeing and zeroes the recorded length.
    pub(crate) fn take_buffer(&mut self) -> Option<MemoryRegion<Image>> {
        self.buffer_len = 0;
        self.buffer.take()
    }
}
