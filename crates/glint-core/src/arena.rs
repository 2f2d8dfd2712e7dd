//! Page-based bump allocator that owns every AST node of a compilation.
//!
//! [`PoolAllocator`] hands out memory from fixed-size pages and never frees
//! individual allocations. Memory comes back in bulk, either by popping to a
//! checkpoint recorded with [`PoolAllocator::push`] or by releasing everything
//! with [`PoolAllocator::pop_all`]. Requests larger than a page get a dedicated
//! block that is returned to the system when popped; ordinary pages go to a
//! free list and are reused.
//!
//! Values placed in the pool are never dropped, so the typed helpers only
//! accept types without drop glue (checked in debug builds).

use std::alloc::{self, Layout};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

use crate::error::ArenaError;

/// Page size used by [`PoolAllocator::default`].
pub const DEFAULT_PAGE_SIZE: usize = 8 * 1024;

/// Smallest page size the pool accepts.
pub const MIN_PAGE_SIZE: usize = 4 * 1024;

/// Alignment used by [`PoolAllocator::default`].
pub const DEFAULT_ALIGNMENT: usize = 16;

// ============================================================================
// Pages
// ============================================================================

struct Page {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Page {
    fn acquire(layout: Layout) -> Result<Page, ArenaError> {
        debug_assert!(layout.size() > 0);
        // SAFETY: every page layout has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        NonNull::new(raw)
            .map(|ptr| Page { ptr, layout })
            .ok_or(ArenaError::OutOfMemory {
                requested: layout.size(),
            })
    }

    fn release(self) {
        // SAFETY: `ptr` was returned by `alloc::alloc` with exactly this layout
        // and pages are released at most once.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    pages: usize,
    offset: usize,
    live_bytes: usize,
}

#[derive(Clone, Copy)]
struct LastAllocation {
    ptr: NonNull<u8>,
    start: usize,
    size: usize,
}

struct PoolState {
    /// Pages and dedicated blocks currently handing out memory; the last one
    /// is the page being bumped.
    in_use: Vec<Page>,
    /// Recycled single pages.
    free: Vec<Page>,
    /// Offset into the last page. Equal to the page size when the next
    /// allocation must start a fresh page.
    offset: usize,
    stack: Vec<Checkpoint>,
    last: Option<LastAllocation>,
    live_bytes: usize,
    allocation_count: usize,
    total_bytes: usize,
}

impl PoolState {
    /// Carve `size` bytes aligned to `align` out of the current page.
    fn bump(&mut self, size: usize, align: usize, page_size: usize) -> Option<NonNull<u8>> {
        let page = self.in_use.last()?;
        let addr = (page.ptr.as_ptr() as usize).checked_add(self.offset)?;
        let padding = addr.wrapping_neg() & (align - 1);
        let start = self.offset.checked_add(padding)?;
        let end = start.checked_add(size)?;
        if end > page_size {
            return None;
        }
        // SAFETY: `start <= end <= page_size <= page.layout.size()`, so the
        // result stays inside (or one past the end of) the page.
        let ptr = unsafe { NonNull::new_unchecked(page.ptr.as_ptr().add(start)) };
        self.offset = end;
        self.last = Some(LastAllocation { ptr, start, size });
        Some(ptr)
    }
}

// ============================================================================
// PoolAllocator
// ============================================================================

/// Bump allocator with checkpoint semantics.
///
/// Allocation goes through `&self` so that many arena references can be alive
/// at once; `push`, `pop` and `pop_all` take `&mut self`, which statically
/// guarantees no reference into released memory survives.
///
/// # Examples
///
/// ```
/// use glint_core::PoolAllocator;
///
/// let mut pool = PoolAllocator::default();
/// let before = pool.live_bytes();
///
/// pool.push();
/// let name = pool.alloc_str("gl_FragColor");
/// assert_eq!(name, "gl_FragColor");
/// pool.pop();
///
/// assert_eq!(pool.live_bytes(), before);
/// ```
pub struct PoolAllocator {
    page_size: usize,
    alignment: usize,
    page_layout: Layout,
    state: RefCell<PoolState>,
    locked: Cell<bool>,
}

// SAFETY: the pool exclusively owns its pages. It is not `Sync` (interior
// mutability through `RefCell`), so moving it to another thread while no
// borrows are outstanding cannot race.
unsafe impl Send for PoolAllocator {}

impl Default for PoolAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_ALIGNMENT)
    }
}

impl PoolAllocator {
    /// Create a pool.
    ///
    /// The alignment is rounded up to a power of two no smaller than a
    /// pointer, and the page size is raised to at least [`MIN_PAGE_SIZE`] and
    /// to a multiple of the alignment.
    pub fn new(page_size: usize, alignment: usize) -> Self {
        let alignment = alignment
            .max(mem::size_of::<usize>())
            .checked_next_power_of_two()
            .unwrap_or(DEFAULT_ALIGNMENT);
        let page_size = page_size.max(MIN_PAGE_SIZE).next_multiple_of(alignment);
        let page_layout = match Layout::from_size_align(page_size, alignment) {
            Ok(layout) => layout,
            Err(_) => {
                panic!("pool page layout overflows (size {page_size}, align {alignment})")
            }
        };

        Self {
            page_size,
            alignment,
            page_layout,
            state: RefCell::new(PoolState {
                in_use: Vec::new(),
                free: Vec::new(),
                offset: page_size,
                stack: Vec::new(),
                last: None,
                live_bytes: 0,
                allocation_count: 0,
                total_bytes: 0,
            }),
            locked: Cell::new(false),
        }
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Allocate `size` bytes aligned to the pool alignment.
    pub fn allocate(&self, size: usize) -> Result<NonNull<u8>, ArenaError> {
        let layout = Layout::from_size_align(size, self.alignment).map_err(|_| {
            ArenaError::InvalidLayout {
                size,
                align: self.alignment,
            }
        })?;
        self.allocate_layout(layout)
    }

    /// Allocate memory for `layout`, aligned to the larger of its alignment
    /// and the pool alignment.
    pub fn allocate_layout(&self, layout: Layout) -> Result<NonNull<u8>, ArenaError> {
        if self.locked.get() {
            return Err(ArenaError::Locked);
        }

        let size = layout.size();
        let align = layout.align().max(self.alignment);
        let mut state = self.state.borrow_mut();
        state.allocation_count += 1;
        state.total_bytes = state.total_bytes.saturating_add(size);

        if let Some(ptr) = state.bump(size, align, self.page_size) {
            state.live_bytes += size;
            return Ok(ptr);
        }

        let worst_case = size
            .checked_add(align - 1)
            .ok_or(ArenaError::OutOfMemory { requested: size })?;

        if worst_case > self.page_size {
            let ptr = self.acquire_dedicated(&mut state, size, align)?;
            state.live_bytes += size;
            return Ok(ptr);
        }

        let page = match state.free.pop() {
            Some(page) => page,
            None => {
                tracing::trace!(page_size = self.page_size, "acquiring pool page");
                Page::acquire(self.page_layout)?
            }
        };
        state.in_use.push(page);
        state.offset = 0;

        let ptr = state
            .bump(size, align, self.page_size)
            .ok_or(ArenaError::OutOfMemory { requested: size })?;
        state.live_bytes += size;
        Ok(ptr)
    }

    fn acquire_dedicated(
        &self,
        state: &mut PoolState,
        size: usize,
        align: usize,
    ) -> Result<NonNull<u8>, ArenaError> {
        let block_size = size
            .checked_next_multiple_of(self.page_size)
            .ok_or(ArenaError::OutOfMemory { requested: size })?
            .max(self.page_size);
        let layout = Layout::from_size_align(block_size, align)
            .map_err(|_| ArenaError::InvalidLayout { size, align })?;

        tracing::trace!(block_size, "acquiring dedicated multi-page block");
        let block = Page::acquire(layout)?;
        let ptr = block.ptr;
        state.in_use.push(block);
        // The next ordinary allocation starts a fresh page.
        state.offset = self.page_size;
        state.last = None;
        Ok(ptr)
    }

    /// Resize an allocation.
    ///
    /// A `None` pointer behaves like [`allocate_layout`](Self::allocate_layout)
    /// with `new_size`; a `new_size` of zero returns `None`. Shrinking always
    /// happens in place. Growing the most recent allocation happens in place
    /// when its page has room, otherwise a new block is allocated and the old
    /// contents are copied over.
    ///
    /// # Safety
    ///
    /// A `Some` pointer must have been returned by this pool, must not have
    /// been released by `pop`, and must be valid for reads of
    /// `old_layout.size()` bytes.
    pub unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_layout: Layout,
        new_size: usize,
    ) -> Result<Option<NonNull<u8>>, ArenaError> {
        let new_layout = Layout::from_size_align(new_size, old_layout.align()).map_err(|_| {
            ArenaError::InvalidLayout {
                size: new_size,
                align: old_layout.align(),
            }
        })?;

        let Some(ptr) = ptr else {
            return self.allocate_layout(new_layout).map(Some);
        };
        if new_size == 0 {
            return Ok(None);
        }
        if self.locked.get() {
            return Err(ArenaError::Locked);
        }
        let old_size = old_layout.size();

        {
            let mut state = self.state.borrow_mut();
            if let Some(last) = state.last
                && last.ptr == ptr
                && last.start + new_size <= self.page_size
            {
                state.offset = last.start + new_size;
                state.live_bytes = state.live_bytes - last.size + new_size;
                state.last = Some(LastAllocation {
                    size: new_size,
                    ..last
                });
                return Ok(Some(ptr));
            }
        }

        if new_size <= old_size {
            return Ok(Some(ptr));
        }

        let fresh = self.allocate_layout(new_layout)?;
        // SAFETY: the caller guarantees `ptr` is readable for `old_size` bytes;
        // `fresh` is a new allocation of `new_size > old_size` bytes, so the
        // two regions cannot overlap.
        unsafe { ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), old_size) };
        Ok(Some(fresh))
    }

    /// Record a checkpoint. The next allocation starts on a fresh page.
    pub fn push(&mut self) {
        let page_size = self.page_size;
        let state = self.state.get_mut();
        state.stack.push(Checkpoint {
            pages: state.in_use.len(),
            offset: state.offset,
            live_bytes: state.live_bytes,
        });
        state.offset = page_size;
        state.last = None;
    }

    /// Release everything allocated since the most recent `push`, or
    /// everything at all when no checkpoint is outstanding.
    pub fn pop(&mut self) {
        let base = self.base_checkpoint();
        let checkpoint = self.state.get_mut().stack.pop().unwrap_or(base);
        self.release_to(checkpoint);
    }

    /// Release every allocation and discard all checkpoints.
    pub fn pop_all(&mut self) {
        let base = self.base_checkpoint();
        self.state.get_mut().stack.clear();
        self.release_to(base);
    }

    fn base_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pages: 0,
            offset: self.page_size,
            live_bytes: 0,
        }
    }

    fn release_to(&mut self, checkpoint: Checkpoint) {
        let page_layout = self.page_layout;
        let state = self.state.get_mut();
        let mut recycled = 0usize;
        while state.in_use.len() > checkpoint.pages {
            let Some(page) = state.in_use.pop() else {
                break;
            };
            if page.layout == page_layout {
                state.free.push(page);
                recycled += 1;
            } else {
                page.release();
            }
        }
        state.offset = checkpoint.offset;
        state.live_bytes = checkpoint.live_bytes;
        state.last = None;
        tracing::trace!(recycled, remaining = state.in_use.len(), "pool popped");
    }

    /// Refuse further allocations until [`unlock`](Self::unlock).
    pub fn lock(&self) {
        debug_assert!(!self.locked.get(), "pool locked twice");
        self.locked.set(true);
    }

    pub fn unlock(&self) {
        debug_assert!(self.locked.get(), "unlocking a pool that is not locked");
        self.locked.set(false);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Bytes handed out and not yet released by a pop.
    pub fn live_bytes(&self) -> usize {
        self.state.borrow().live_bytes
    }

    /// Number of allocation requests served over the pool's lifetime.
    pub fn allocation_count(&self) -> usize {
        self.state.borrow().allocation_count
    }

    /// Sum of all requested sizes over the pool's lifetime.
    pub fn total_bytes_requested(&self) -> usize {
        self.state.borrow().total_bytes
    }

    /// Pages and dedicated blocks currently in use.
    pub fn page_count(&self) -> usize {
        self.state.borrow().in_use.len()
    }

    /// Recycled pages waiting on the free list.
    pub fn free_page_count(&self) -> usize {
        self.state.borrow().free.len()
    }

    /// Outstanding checkpoints.
    pub fn depth(&self) -> usize {
        self.state.borrow().stack.len()
    }

    // ========================================================================
    // Typed helpers
    // ========================================================================

    /// Move `value` into the pool.
    pub fn try_alloc<T>(&self, value: T) -> Result<&mut T, ArenaError> {
        debug_assert!(!mem::needs_drop::<T>(), "pool values are never dropped");
        let ptr = self.allocate_layout(Layout::new::<T>())?.cast::<T>();
        // SAFETY: fresh, suitably aligned memory for one `T` that nothing else
        // references for as long as `self` is borrowed.
        unsafe {
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Move `value` into the pool, aborting on out-of-memory.
    ///
    /// # Panics
    ///
    /// Panics when the pool is locked.
    pub fn alloc<T>(&self, value: T) -> &mut T {
        match self.try_alloc(value) {
            Ok(value) => value,
            Err(err) => allocation_failed(Layout::new::<T>(), err),
        }
    }

    /// Copy a slice into the pool.
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> &mut [T] {
        let layout = array_layout::<T>(src.len());
        let ptr = match self.allocate_layout(layout) {
            Ok(ptr) => ptr.cast::<T>(),
            Err(err) => allocation_failed(layout, err),
        };
        // SAFETY: the destination is fresh memory for `src.len()` values.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            slice::from_raw_parts_mut(ptr.as_ptr(), src.len())
        }
    }

    /// Collect an exact-size iterator into a pool slice.
    pub fn alloc_slice_fill_iter<T, I>(&self, iter: I) -> &mut [T]
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        debug_assert!(!mem::needs_drop::<T>(), "pool values are never dropped");
        let iter = iter.into_iter();
        let len = iter.len();
        let layout = array_layout::<T>(len);
        let ptr = match self.allocate_layout(layout) {
            Ok(ptr) => ptr.cast::<T>(),
            Err(err) => allocation_failed(layout, err),
        };

        let mut written = 0;
        for value in iter.take(len) {
            // SAFETY: `written < len`, inside the fresh allocation.
            unsafe { ptr.as_ptr().add(written).write(value) };
            written += 1;
        }
        // SAFETY: exactly `written` values were initialized.
        unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), written) }
    }

    /// Copy a string into the pool.
    pub fn alloc_str(&self, src: &str) -> &mut str {
        let bytes = self.alloc_slice_copy(src.as_bytes());
        // SAFETY: the bytes were copied from a valid `str`.
        unsafe { std::str::from_utf8_unchecked_mut(bytes) }
    }
}

impl Drop for PoolAllocator {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for page in state.in_use.drain(..).chain(state.free.drain(..)) {
            page.release();
        }
    }
}

impl fmt::Debug for PoolAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("PoolAllocator")
            .field("page_size", &self.page_size)
            .field("alignment", &self.alignment)
            .field("pages", &state.in_use.len())
            .field("free_pages", &state.free.len())
            .field("depth", &state.stack.len())
            .field("live_bytes", &state.live_bytes)
            .field("locked", &self.locked.get())
            .finish()
    }
}

fn array_layout<T>(len: usize) -> Layout {
    match Layout::array::<T>(len) {
        Ok(layout) => layout,
        Err(_) => panic!("pool slice of {len} elements overflows"),
    }
}

#[cold]
fn allocation_failed(layout: Layout, err: ArenaError) -> ! {
    match err {
        ArenaError::Locked => panic!("allocation from a locked pool"),
        _ => alloc::handle_alloc_error(layout),
    }
}

// ============================================================================
// PoolVec
// ============================================================================

/// A growable vector of `Copy` values living in a [`PoolAllocator`].
///
/// Growth goes through [`PoolAllocator::reallocate`], so a vector that is
/// the most recent allocation extends in place.
pub struct PoolVec<'p, T> {
    pool: &'p PoolAllocator,
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    _marker: PhantomData<&'p mut [T]>,
}

impl<'p, T: Copy> PoolVec<'p, T> {
    pub fn new_in(pool: &'p PoolAllocator) -> Self {
        let cap = if mem::size_of::<T>() == 0 { usize::MAX } else { 0 };
        Self {
            pool,
            ptr: NonNull::dangling(),
            len: 0,
            cap,
            _marker: PhantomData,
        }
    }

    pub fn with_capacity_in(capacity: usize, pool: &'p PoolAllocator) -> Self {
        let mut vec = Self::new_in(pool);
        if capacity > vec.cap {
            vec.grow_to(capacity);
        }
        vec
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn push(&mut self, value: T) {
        if self.len == self.cap {
            self.grow_to(self.cap.saturating_mul(2).max(4));
        }
        // SAFETY: `len < cap` after growing.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    pub fn extend_from_slice(&mut self, values: &[T]) {
        let needed = self.len + values.len();
        if needed > self.cap {
            self.grow_to(needed.max(self.cap.saturating_mul(2)));
        }
        // SAFETY: capacity covers `len + values.len()` and the source cannot
        // alias memory this vector has not handed out yet.
        unsafe {
            ptr::copy_nonoverlapping(values.as_ptr(), self.ptr.as_ptr().add(self.len), values.len())
        };
        self.len = needed;
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` elements are initialized.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Give up growth and keep the elements for the pool's lifetime.
    pub fn into_slice(self) -> &'p [T] {
        // SAFETY: the first `len` elements are initialized and live as long
        // as the pool borrow.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn grow_to(&mut self, new_cap: usize) {
        let new_layout = array_layout::<T>(new_cap);
        let old_layout = array_layout::<T>(self.cap);
        let old_ptr = (self.cap > 0).then(|| self.ptr.cast::<u8>());
        // SAFETY: `old_ptr`, when present, is this vector's own pool block of
        // `old_layout.size()` bytes.
        let grown = unsafe { self.pool.reallocate(old_ptr, old_layout, new_layout.size()) };
        match grown {
            Ok(Some(ptr)) => {
                self.ptr = ptr.cast::<T>();
                self.cap = new_cap;
            }
            Ok(None) => allocation_failed(new_layout, ArenaError::OutOfMemory { requested: 0 }),
            Err(err) => allocation_failed(new_layout, err),
        }
    }
}

impl<T: Copy> Extend<T> for PoolVec<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for PoolVec<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
