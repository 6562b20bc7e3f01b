// Text artifacts written into the snapshot: the interception shim and the
// rewritten root document

pub mod rewrite;
pub mod shim;

pub use rewrite::{RewriteReport, apply_rewrites};
pub use shim::INTERCEPT_SHIM;
