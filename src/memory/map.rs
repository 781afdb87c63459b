// Boot memory map sizing

/// What the firmware says a physical range can be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Usable,
    Reserved,
}

/// One entry of the boot memory map, `[start, end)` in physical addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    pub kind: RegionKind,
}

impl MemoryRegion {
    pub const fn new(start: u64, end: u64, kind: RegionKind) -> Self {
        Self { start, end, kind }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Total bytes of usable memory reported by the boot memory map.
///
/// This is the figure handed to the frame allocator as `total_memory_bytes`.
pub fn usable_bytes<I>(regions: I) -> usize
where
    I: IntoIterator<Item = MemoryRegion>,
{
    let total = regions
        .into_iter()
        .filter(|region| region.kind == RegionKind::Usable)
        .fold(0u64, |sum, region| sum.saturating_add(region.len()));
    usize::try_from(total).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_usable_regions_count() {
        let map = [
            MemoryRegion::new(0, 0x9_f000, RegionKind::Usable),
            MemoryRegion::new(0x9_f000, 0x10_0000, RegionKind::Reserved),
            MemoryRegion::new(0x10_0000, 0x800_0000, RegionKind::Usable),
            MemoryRegion::new(0xfffc_0000, 0x1_0000_0000, RegionKind::Reserved),
        ];
        assert_eq!(usable_bytes(map), 0x9_f000 + 0x7f0_0000);
    }

    #[test]
    fn inverted_regions_contribute_nothing() {
        let map = [MemoryRegion::new(0x2000, 0x1000, RegionKind::Usable)];
        assert!(map[0].is_empty());
        assert_eq!(usable_bytes(map), 0);
    }

    #[test]
    fn empty_map_has_no_memory() {
        assert_eq!(usable_bytes(core::iter::empty()), 0);
    }
}
