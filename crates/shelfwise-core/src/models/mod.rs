pub mod book;
pub mod category;
pub mod tag;

pub use book::*;
pub use category::*;
pub use tag::*;
