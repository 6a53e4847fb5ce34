use bitflags::bitflags;

bitflags! {
    /// Aspects of a node that are stale and must be recomputed
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        /// Path data or world transform changed
        const GEOMETRY = 1 << 0;
        /// Paint, opacity or visibility changed
        const STYLE = 1 << 1;
        /// Cached world bounding box is out of date
        const BBOX = 1 << 2;
        /// Children were added or removed
        const STRUCTURE = 1 << 3;
    }
}
