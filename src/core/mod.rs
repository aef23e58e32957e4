pub mod geometry;
pub mod model;
pub mod natural_sort;
