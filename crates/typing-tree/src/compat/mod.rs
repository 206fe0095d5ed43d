//! Foreign model formats.
//!
//! - [`rpart`]: JSON export of an R `rpart` classification tree

pub mod rpart;
