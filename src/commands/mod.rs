pub mod arrange;
pub mod extract;
pub mod info;
pub mod merge;
pub mod mix;
pub mod rh;
pub mod rotate;
pub mod split;
