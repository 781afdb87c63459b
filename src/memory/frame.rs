// Physical Frame Allocator for the tsos kernel core
use core::fmt;

use crate::config::{BITMAP_WORDS, BITS_PER_WORD, FRAME_SIZE, MAX_FRAMES};

/// A physical frame, identified by its index (address = index * FRAME_SIZE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frame(usize);

impl Frame {
    pub const fn from_index(index: usize) -> Self {
        Frame(index)
    }

    /// Frame that holds the physical address `addr`.
    pub const fn containing(addr: u64) -> Self {
        Frame(addr as usize / FRAME_SIZE)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    pub const fn start_address(self) -> u64 {
        (self.0 * FRAME_SIZE) as u64
    }
}

/// Boot-time sizing problem reported by [`FrameAllocator::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameInitError {
    /// The kernel's own region does not fit in physical memory.
    ReservedExceedsMemory { reserved: usize, pages: usize },
}

impl fmt::Display for FrameInitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameInitError::ReservedExceedsMemory { reserved, pages } => {
                write!(f, "{} reserved frames exceed {} available", reserved, pages)
            }
        }
    }
}

/// Bitmap allocator over physical frames. A set bit means the frame is in use.
pub struct FrameAllocator {
    bitmap: [u32; BITMAP_WORDS],
    total_pages: usize,
    used_pages: usize,
}

impl FrameAllocator {
    /// An allocator with no memory; every allocation fails until [`init`](Self::init).
    pub const fn new() -> Self {
        Self {
            bitmap: [0; BITMAP_WORDS],
            total_pages: 0,
            used_pages: 0,
        }
    }

    /// Size the allocator and claim the frames under `kernel_reserved_bytes`.
    ///
    /// Memory past what the bitmap can describe is left unused.
    ///
    /// Reserved frames go through the same path as ordinary allocations, so
    /// afterwards they cannot be told apart from frames handed out later.
    pub fn init(
        &mut self,
        total_memory_bytes: usize,
        kernel_reserved_bytes: usize,
    ) -> Result<(), FrameInitError> {
        let mut pages = total_memory_bytes / FRAME_SIZE;
        if pages > MAX_FRAMES {
            log::warn!(
                "frame allocator: tracking {} of {} frames, {} KiB unused",
                MAX_FRAMES,
                pages,
                (pages - MAX_FRAMES) * FRAME_SIZE / 1024
            );
            pages = MAX_FRAMES;
        }
        let reserved = kernel_reserved_bytes / FRAME_SIZE;
        if reserved > pages {
            return Err(FrameInitError::ReservedExceedsMemory { reserved, pages });
        }

        self.total_pages = pages;
        self.used_pages = 0;
        self.bitmap.iter_mut().for_each(|word| *word = 0);

        for _ in 0..reserved {
            self.allocate();
        }

        log::info!(
            "frame allocator: {} frames, {} reserved for the kernel",
            pages,
            reserved
        );
        Ok(())
    }

    /// Hand out the lowest free frame, or `None` once every frame is in use.
    pub fn allocate(&mut self) -> Option<Frame> {
        if self.used_pages >= self.total_pages {
            return None;
        }

        let words = self.total_pages.div_ceil(BITS_PER_WORD);
        let (word_index, word) = self.bitmap[..words]
            .iter()
            .enumerate()
            .find(|(_, word)| **word != u32::MAX)?;
        let bit = (!*word).trailing_zeros() as usize;
        let index = word_index * BITS_PER_WORD + bit;
        // Only the padding bits past `total_pages` are clear in the last word.
        if index >= self.total_pages {
            return None;
        }

        self.bitmap[word_index] |= 1 << bit;
        self.used_pages += 1;
        Some(Frame(index))
    }

    /// Return a frame to the pool.
    ///
    /// Freeing a frame that is already free or out of range does nothing.
    pub fn free(&mut self, frame: Frame) {
        if frame.0 >= self.total_pages {
            return;
        }
        let (word, mask) = Self::locate(frame);
        if self.bitmap[word] & mask != 0 {
            self.bitmap[word] &= !mask;
            self.used_pages -= 1;
        }
    }

    pub fn is_allocated(&self, frame: Frame) -> bool {
        if frame.0 >= self.total_pages {
            return false;
        }
        let (word, mask) = Self::locate(frame);
        self.bitmap[word] & mask != 0
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn used_pages(&self) -> usize {
        self.used_pages
    }

    pub fn free_pages(&self) -> usize {
        self.total_pages - self.used_pages
    }

    fn locate(frame: Frame) -> (usize, u32) {
        (frame.0 / BITS_PER_WORD, 1 << (frame.0 % BITS_PER_WORD))
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}
