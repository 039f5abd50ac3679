//! URL-synchronized list state.

pub mod location;
pub mod params;
pub mod sync;

pub use location::{LocationStore, MemoryLocation, QueryString};
pub use params::{
    parse_page, Filter, JobQueryParams, ParamPatch, ViewState, ALL, DEFAULT_PAGE_SIZE,
    RECOGNIZED_KEYS,
};
pub use sync::QueryStateSync;
