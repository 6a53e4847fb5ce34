/// Forces and velocities below this magnitude are treated as no movement.
pub const DYNA_EPSILON: f64 = 1.0e-6;

/// Stroke width never thins below this fraction of the nominal width.
pub const MIN_WIDTH_FRACTION: f64 = 0.02;

/// Offset of each nib edge from the pen centre, per unit of width.
pub const NIB_HALF_SCALE: f64 = 0.05;

/// Physical mass range the user mass (0..1) is mapped into.
pub const MASS_RANGE: (f64, f64) = (1.0, 160.0);

/// Physical drag range the squared user drag (0..1) is mapped into.
pub const DRAG_RANGE: (f64, f64) = (0.0, 0.5);

/// Physical thinning range the user thinning (-1..1) is mapped into.
pub const THINNING_RANGE: (f64, f64) = (0.0, 160.0);

/// Least-squares refits attempted after the first fit misses tolerance.
pub const FIT_MAX_ITERATIONS: usize = 4;

/// A first fit within this multiple of the tolerance is worth refining.
pub const FIT_REFINE_RATIO: f64 = 3.0;

/// Distance accuracy of nearest-point queries on fitted segments.
pub const NEAREST_ACCURACY: f64 = 1.0e-9;
