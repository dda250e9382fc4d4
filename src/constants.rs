pub const DEFAULT_MAX_DEPTH: usize = 4;
pub const DEFAULT_MIN_SAMPLES_PER_LEAF: usize = 5;
pub const INTERCEPT_NAME: &str = "Intercept";
/// Indentation used when rendering a tree, per level.
pub const RENDER_INDENT: &str = "      ";
