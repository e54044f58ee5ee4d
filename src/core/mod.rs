//! Window records and handle normalization shared by every layer

pub mod ident;
pub mod records;

pub use records::{MetaRecord, OutputInfo, Rect, WindowRecord};
