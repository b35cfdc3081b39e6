//! Surface classification: labels, the external lookup contract, and the
//! memoizing cache in front of it.

mod cache;
mod lookup;
mod types;

pub use cache::{CacheKey, CacheStats, SurfaceCache, DEFAULT_KEY_PRECISION};
pub use lookup::{LookupError, LookupFuture, SurfaceLookup};
pub use types::SurfaceType;
